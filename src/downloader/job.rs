// src/downloader/job.rs

use super::{
    DownloadStats, Dispatcher, Preparer, manifest, resolver::FilenameResolver, retry::RetryPolicy,
};
use crate::{
    RunContext,
    config::DownloaderKind,
    error::*,
    extractor::Crawl,
    models::{Course, DownloadDescriptor},
    symbols, ui, utils,
};
use anyhow::Context;
use indicatif::ProgressBar;
use log::{debug, info};
use std::{fs, path::Path};

/// 一次完整的镜像运行：逐课程、逐章节地准备并分发资源，
/// 在清单模式下于最后统一写出清单文件。
pub struct MirrorJob {
    context: RunContext,
}

impl MirrorJob {
    pub fn new(context: RunContext) -> Self {
        Self { context }
    }

    pub async fn run(&self, crawl: &Crawl) -> AppResult<DownloadStats> {
        let config = &self.context.config;
        fs::create_dir_all(&config.output_dir)
            .with_context(|| format!("无法创建保存目录 '{}'", config.output_dir.display()))?;
        let output_root = dunce::canonicalize(&config.output_dir)?;
        info!("文件将保存到目录: \"{}\"", output_root.display());
        println!(
            "\n{} 文件将保存到目录: \"{}\"",
            *symbols::INFO,
            output_root.display()
        );

        let manager = &self.context.manager;
        manager.start_run(crawl.tree.resource_count());

        let resolver = FilenameResolver::new(
            self.context.http_client.clone(),
            RetryPolicy::from_config(config),
        );
        let check_existing = match config.downloader {
            DownloaderKind::Internal => true,
            DownloaderKind::ExternalManifest => config.dedupe_manifest,
        };
        let preparer = Preparer::new(
            resolver,
            manager.clone(),
            check_existing,
            config.probe_concurrency,
        );
        let mut dispatcher = Dispatcher::new(
            self.context.http_client.clone(),
            config.downloader,
            manager.clone(),
        );

        for course in &crawl.tree.courses {
            self.run_course(crawl, course, &output_root, &preparer, &mut dispatcher)
                .await;
        }

        if config.downloader == DownloaderKind::ExternalManifest {
            manifest::write(&config.manifest_path, &dispatcher.into_manifest())?;
        }

        manager.print_report();
        Ok(manager.get_stats())
    }

    async fn run_course(
        &self,
        crawl: &Crawl,
        course: &Course,
        output_root: &Path,
        preparer: &Preparer,
        dispatcher: &mut Dispatcher,
    ) {
        ui::print_header(&format!("课程 {} - {}", course.id, course.name));
        info!("开始处理课程 '{}' (ID: {})", course.name, course.id);
        let course_dir = output_root.join(utils::sanitize_segment(&course.name));
        let manifested_before = dispatcher.manifest_len();

        for section in &course.sections {
            info!("  章节: '{}' ({} 个资源)", section.name, section.resource_count());
            let section_dir = course_dir.join(utils::sanitize_segment(&section.name));
            let batch = preparer
                .prepare_section(&crawl.session, &section_dir, section)
                .await;
            debug!("章节 '{}' 待分发 {} 个文件", section.name, batch.len());
            self.drain(&section.name, batch, dispatcher).await;
        }

        if self.context.config.downloader == DownloaderKind::ExternalManifest {
            info!(
                "课程 '{}' 共加入下载清单 {} 个文件",
                course.name,
                dispatcher.manifest_len() - manifested_before
            );
        }
    }

    /// 分发一个章节的整批描述；批次在此被消费，不会带入下一个章节。
    async fn drain(
        &self,
        section_name: &str,
        batch: Vec<DownloadDescriptor>,
        dispatcher: &mut Dispatcher,
    ) {
        if batch.is_empty() {
            return;
        }
        let pbar = match self.context.config.downloader {
            DownloaderKind::Internal => ui::new_tasks_progress_bar(
                batch.len() as u64,
                &utils::truncate_text(section_name, 24),
            ),
            DownloaderKind::ExternalManifest => ProgressBar::hidden(),
        };

        for descriptor in batch {
            pbar.set_message(descriptor.local_file_name.clone());
            let name = descriptor.local_file_name.clone();
            let outcome = dispatcher.dispatch(descriptor).await;
            let (symbol, color_fn, text) = outcome.get_display_info();
            pbar.println(format!("{} {}", symbol, color_fn(format!("{}: {}", text, name).into())));
            pbar.inc(1);
        }
        pbar.finish_and_clear();
    }
}
