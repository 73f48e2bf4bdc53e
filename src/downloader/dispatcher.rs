// src/downloader/dispatcher.rs

use super::{DownloadManager, manifest::ManifestBlock};
use crate::{
    client::SessionClient,
    config::DownloaderKind,
    constants,
    error::*,
    models::{DownloadDescriptor, Outcome},
};
use futures::StreamExt;
use log::{debug, info};
use std::{fs, io::Write, sync::Arc};

/// 把准备好的下载描述交给当前运行固定的下载方式：
/// 直接下载，或者追加到外部下载器的清单中。
pub struct Dispatcher {
    client: Arc<SessionClient>,
    mode: DownloaderKind,
    manager: DownloadManager,
    manifest: Vec<ManifestBlock>,
}

impl Dispatcher {
    pub fn new(client: Arc<SessionClient>, mode: DownloaderKind, manager: DownloadManager) -> Self {
        Self {
            client,
            mode,
            manager,
            manifest: Vec::new(),
        }
    }

    /// 消费一个下载描述。内部下载失败不会重试，也不会中断运行。
    pub async fn dispatch(&mut self, descriptor: DownloadDescriptor) -> Outcome {
        match self.mode {
            DownloaderKind::Internal => match self.transfer(&descriptor).await {
                Ok(bytes) => {
                    info!(
                        "已下载 '{}' ({} 字节)",
                        descriptor.target_path().display(),
                        bytes
                    );
                    self.manager.record_downloaded();
                    Outcome::Downloaded
                }
                Err(e) => {
                    self.manager
                        .record_failure(&descriptor.local_file_name, &e.to_string());
                    Outcome::Skipped
                }
            },
            DownloaderKind::ExternalManifest => {
                debug!("加入下载清单: '{}'", descriptor.local_file_name);
                self.manifest.push(ManifestBlock::from(&descriptor));
                self.manager.record_manifested();
                Outcome::Manifested
            }
        }
    }

    pub fn manifest_len(&self) -> usize {
        self.manifest.len()
    }

    pub fn into_manifest(self) -> Vec<ManifestBlock> {
        self.manifest
    }

    /// 先写入目标目录中的临时文件，完整写完后再原子重命名为目标文件，
    /// 失败时临时文件随 `NamedTempFile` 一起删除。
    async fn transfer(&self, descriptor: &DownloadDescriptor) -> AppResult<u64> {
        fs::create_dir_all(&descriptor.local_dir)?;
        let res = self
            .client
            .get(&descriptor.source_url, &descriptor.session)
            .await?;

        let mut temp = tempfile::Builder::new()
            .prefix(constants::TEMP_FILE_PREFIX)
            .suffix(".part")
            .tempfile_in(&descriptor.local_dir)?;

        let mut written = 0u64;
        let mut stream = res.bytes_stream();
        while let Some(chunk_result) = stream.next().await {
            let chunk = chunk_result?;
            temp.write_all(&chunk)?;
            written += chunk.len() as u64;
        }
        temp.as_file().sync_all()?;
        temp.persist(descriptor.target_path())?;
        Ok(written)
    }
}
