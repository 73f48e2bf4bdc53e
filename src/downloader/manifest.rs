// src/downloader/manifest.rs

//! aria2c 的输入文件格式：每个资源一块，首行为 URL，
//! 后跟缩进的 `key=value` 选项行，块之间以空行分隔。

use crate::{error::AppResult, models::DownloadDescriptor};
use anyhow::Context;
use log::info;
use std::{fmt, fs, path::Path, path::PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestBlock {
    pub url: String,
    pub header: String,
    pub dir: PathBuf,
    pub out: String,
}

impl From<&DownloadDescriptor> for ManifestBlock {
    fn from(descriptor: &DownloadDescriptor) -> Self {
        Self {
            url: descriptor.source_url.clone(),
            header: format!("Cookie:{}", descriptor.session.cookie_header()),
            dir: descriptor.local_dir.clone(),
            out: descriptor.local_file_name.clone(),
        }
    }
}

impl fmt::Display for ManifestBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.url)?;
        writeln!(f, "  header={}", self.header)?;
        writeln!(f, "  dir={}", self.dir.display())?;
        writeln!(f, "  out={}", self.out)?;
        writeln!(f)
    }
}

pub fn render(blocks: &[ManifestBlock]) -> String {
    blocks.iter().map(ToString::to_string).collect()
}

/// 在运行结束时一次性写出清单。没有任何条目时不创建文件，返回 `false`。
pub fn write(path: &Path, blocks: &[ManifestBlock]) -> AppResult<bool> {
    if blocks.is_empty() {
        info!("没有需要下载的新文件，不生成下载清单。");
        return Ok(false);
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("无法创建清单目录 '{}'", parent.display()))?;
    }
    fs::write(path, render(blocks))
        .with_context(|| format!("写入下载清单 '{}' 失败", path.display()))?;
    info!(
        "已将 {} 条下载记录写入 '{}'",
        blocks.len(),
        path.display()
    );
    Ok(true)
}
