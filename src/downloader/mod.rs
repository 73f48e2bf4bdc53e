// src/downloader/mod.rs

mod dispatcher;
mod job;
pub mod manifest;
mod preparer;
pub mod resolver;
pub mod retry;

pub use dispatcher::Dispatcher;
pub use job::MirrorJob;
pub use preparer::Preparer;

use crate::{symbols, ui};
use colored::*;
use itertools::Itertools;
use log::{debug, info, warn};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DownloadStats {
    pub total: usize,
    pub downloaded: usize,
    pub manifested: usize,
    pub skipped: usize,
    pub unresolved: usize,
    pub failed: usize,
}

/// 整个运行的统计数据，在准备阶段与分发阶段之间共享。
#[derive(Clone, Default)]
pub struct DownloadManager {
    stats: Arc<Mutex<DownloadStats>>,
    skipped_downloads: Arc<Mutex<Vec<(String, String)>>>,
    failed_downloads: Arc<Mutex<Vec<(String, String)>>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl DownloadManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start_run(&self, total_resources: usize) {
        info!("开始新一轮同步，资源总数: {}", total_resources);
        *lock(&self.stats) = DownloadStats {
            total: total_resources,
            ..Default::default()
        };
        lock(&self.skipped_downloads).clear();
        lock(&self.failed_downloads).clear();
    }

    pub fn record_downloaded(&self) {
        lock(&self.stats).downloaded += 1;
    }

    pub fn record_manifested(&self) {
        lock(&self.stats).manifested += 1;
    }

    pub fn record_skip(&self, filename: &str, reason: &str) {
        debug!("跳过文件 '{}'，原因: {}", filename, reason);
        lock(&self.stats).skipped += 1;
        lock(&self.skipped_downloads).push((filename.to_string(), reason.to_string()));
    }

    /// 探测重试次数用尽，资源无法确定文件名
    pub fn record_unresolved(&self, filename: &str, reason: &str) {
        warn!("无法解析资源 '{}': {}", filename, reason);
        lock(&self.stats).unresolved += 1;
        lock(&self.failed_downloads).push((filename.to_string(), reason.to_string()));
    }

    pub fn record_failure(&self, filename: &str, reason: &str) {
        warn!("文件 '{}' 处理失败: {}", filename, reason);
        lock(&self.stats).failed += 1;
        lock(&self.failed_downloads).push((filename.to_string(), reason.to_string()));
    }

    pub fn get_stats(&self) -> DownloadStats {
        lock(&self.stats).clone()
    }

    pub fn print_report(&self) {
        let stats = self.get_stats();
        info!(
            "同步报告: Total={}, Downloaded={}, Manifested={}, Skipped={}, Unresolved={}, Failed={}",
            stats.total,
            stats.downloaded,
            stats.manifested,
            stats.skipped,
            stats.unresolved,
            stats.failed
        );

        let skipped = lock(&self.skipped_downloads);
        let failed = lock(&self.failed_downloads);
        if !skipped.is_empty() || !failed.is_empty() {
            ui::print_sub_header("同步详情报告");
            if !skipped.is_empty() {
                println!("\n{} 跳过的文件 ({}个):", *symbols::INFO, skipped.len());
                print_grouped_report(&skipped, |s| s.cyan());
            }
            if !failed.is_empty() {
                println!("\n{} 未完成的文件 ({}个):", *symbols::ERROR, failed.len());
                print_grouped_report(&failed, |s| s.red());
            }
        }

        ui::print_sub_header("任务总结");
        println!(
            "{} | {} | {} | {}",
            format!("已下载: {}", stats.downloaded).green(),
            format!("已写入清单: {}", stats.manifested).cyan(),
            format!("跳过: {}", stats.skipped).yellow(),
            format!("失败: {}", stats.unresolved + stats.failed).red(),
        );
    }
}

fn print_grouped_report(items: &[(String, String)], color_fn: fn(ColoredString) -> ColoredString) {
    let grouped = items
        .iter()
        .map(|(filename, reason)| (reason, filename))
        .into_group_map();
    for reason in grouped.keys().sorted() {
        println!("  - {}", color_fn(format!("原因: {}", reason).into()));
        for filename in grouped[reason].iter().sorted() {
            println!("    - {}", filename);
        }
    }
}
