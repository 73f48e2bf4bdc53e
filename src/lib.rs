// src/lib.rs

pub mod cli;
pub mod client;
pub mod config;
pub mod constants;
pub mod downloader;
pub mod error;
pub mod extractor;
pub mod models;
pub mod symbols;
pub mod ui;
pub mod utils;

use crate::{
    cli::Cli,
    client::SessionClient,
    config::{AppConfig, EnvOverrides, Secrets},
    downloader::{DownloadManager, DownloadStats, MirrorJob},
    error::AppResult,
    extractor::{ContentExtractor, SnapshotExtractor},
};
use log::{debug, info};
use std::sync::Arc;

/// 一次运行的执行上下文，构造一次后按引用传入各个阶段
#[derive(Clone)]
pub struct RunContext {
    pub manager: DownloadManager,
    pub config: Arc<AppConfig>,
    pub http_client: Arc<SessionClient>,
}

impl RunContext {
    pub fn new(config: Arc<AppConfig>) -> AppResult<Self> {
        let http_client = Arc::new(SessionClient::new(&config)?);
        Ok(Self {
            manager: DownloadManager::new(),
            config,
            http_client,
        })
    }
}

/// 库的公共入口点，由 `main.rs` 调用
pub async fn run_from_cli(args: Arc<Cli>) -> AppResult<DownloadStats> {
    debug!("CLI 参数: {:?}", args);
    let env = EnvOverrides::from_env();
    let config = AppConfig::new(&args, &env)?;
    debug!("加载的应用配置: {:?}", config);
    let secrets = Secrets::load(&args.config_dir, &env)?;

    let extractor = SnapshotExtractor::new(config.tree_snapshot.clone());
    run(config, &secrets, &extractor).await
}

/// 先取得内容树和会话，再执行镜像任务。
/// 只有配置与认证错误会从这里返回，单个资源的失败只计入统计。
pub async fn run(
    config: AppConfig,
    secrets: &Secrets,
    extractor: &dyn ContentExtractor,
) -> AppResult<DownloadStats> {
    let config = Arc::new(config);
    info!(
        "下载方式: {:?}，课程: {}",
        config.downloader,
        config.course_ids.join(", ")
    );
    let crawl = extractor.extract(&config, secrets).await?;
    let context = RunContext::new(config)?;
    MirrorJob::new(context).run(&crawl).await
}
