// src/downloader/preparer.rs

use super::{DownloadManager, resolver::FilenameResolver};
use crate::{
    constants,
    models::{DownloadDescriptor, ResourceRef, Section, SessionToken},
    utils,
};
use futures::{StreamExt, stream};
use log::{debug, error};
use std::{
    fs,
    path::{Path, PathBuf},
};

/// 下载准备阶段：为每个叶子资源建目录、探测文件名、检查本地是否已存在。
pub struct Preparer {
    resolver: FilenameResolver,
    manager: DownloadManager,
    check_existing: bool,
    concurrency: usize,
}

impl Preparer {
    pub fn new(
        resolver: FilenameResolver,
        manager: DownloadManager,
        check_existing: bool,
        concurrency: usize,
    ) -> Self {
        Self {
            resolver,
            manager,
            check_existing,
            concurrency: concurrency.max(1),
        }
    }

    /// 准备一个章节的全部资源（先是章节下的文件，然后依次是各文件夹中的文件），
    /// 返回本章节独立的一批下载描述。批次顺序始终等于遍历顺序。
    pub async fn prepare_section(
        &self,
        session: &SessionToken,
        section_dir: &Path,
        section: &Section,
    ) -> Vec<DownloadDescriptor> {
        let leaves: Vec<(PathBuf, &ResourceRef)> = section
            .files
            .iter()
            .map(|resource| (section_dir.to_path_buf(), resource))
            .chain(section.folders.iter().flat_map(|folder| {
                let folder_dir = section_dir.join(utils::sanitize_segment(&folder.name));
                folder
                    .files
                    .iter()
                    .map(move |resource| (folder_dir.clone(), resource))
            }))
            .collect();

        stream::iter(leaves)
            .map(|(dir, resource)| async move { self.prepare(session, &dir, resource).await })
            .buffered(self.concurrency)
            .collect::<Vec<_>>()
            .await
            .into_iter()
            .flatten()
            .collect()
    }

    /// 准备单个资源；返回 `None` 表示已存在、无法解析或目录不可用。
    pub async fn prepare(
        &self,
        session: &SessionToken,
        local_dir: &Path,
        resource: &ResourceRef,
    ) -> Option<DownloadDescriptor> {
        debug!(
            "      └─ 准备资源: \"{}\" @ \"{}\"",
            resource.display_name, resource.source_url
        );
        let proposed = resource.proposed_file_name();

        if let Err(e) = fs::create_dir_all(local_dir) {
            error!("无法创建目录 '{}': {}", local_dir.display(), e);
            self.manager.record_failure(&proposed, &format!("无法创建目录: {}", e));
            return None;
        }

        if self.check_existing
            && let Some(existing) = find_existing_file(local_dir, &proposed)
        {
            self.manager.record_skip(&existing, "文件已存在");
            return None;
        }

        match self
            .resolver
            .resolve(session, &resource.source_url, &proposed, local_dir)
            .await
        {
            Ok(descriptor) => {
                if self.check_existing && descriptor.target_path().is_file() {
                    self.manager
                        .record_skip(&descriptor.local_file_name, "文件已存在");
                    return None;
                }
                Some(descriptor)
            }
            Err(e) => {
                self.manager.record_unresolved(&proposed, &e.to_string());
                None
            }
        }
    }
}

/// 探测前的本地检查：目录中存在与提议名称同名的文件，
/// 或者“提议名称 + 单个扩展名”的文件，即视为已下载。
fn find_existing_file(dir: &Path, proposed: &str) -> Option<String> {
    let name = utils::sanitize_segment(proposed);
    if dir.join(&name).is_file() {
        return Some(name);
    }
    fs::read_dir(dir)
        .ok()?
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_ok_and(|t| t.is_file()))
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .filter(|file| !file.starts_with(constants::TEMP_FILE_PREFIX))
        .find(|file| {
            file.rsplit_once('.').is_some_and(|(stem, _)| stem == name)
                && utils::extension_of(file).is_some()
        })
}
