// src/extractor/mod.rs

pub mod snapshot;

pub use snapshot::SnapshotExtractor;

use crate::{
    config::{AppConfig, Secrets},
    error::*,
    models::{ContentTree, SessionToken},
};
use async_trait::async_trait;

/// 外部爬虫的产出：已登录的会话凭据和完整的课程内容树。
#[derive(Debug, Clone)]
pub struct Crawl {
    pub session: SessionToken,
    pub tree: ContentTree,
}

/// 内容来源。实现方负责登录平台并遍历课程页面，
/// 下载引擎只消费其结果。
#[async_trait]
pub trait ContentExtractor: Send + Sync {
    async fn extract(&self, config: &AppConfig, secrets: &Secrets) -> AppResult<Crawl>;
}
