// src/downloader/resolver.rs

use super::retry::RetryPolicy;
use crate::{
    client::SessionClient,
    constants,
    error::*,
    models::{DownloadDescriptor, SessionToken},
    utils,
};
use log::debug;
use reqwest::header;
use std::{path::Path, sync::Arc};
use url::Url;

/// 一次成功探测的结果
#[derive(Debug, Clone)]
struct Probe {
    final_url: Url,
    extension: Option<String>,
}

/// 通过探测请求确定资源的真实扩展名，并生成最终的本地文件名。
pub struct FilenameResolver {
    client: Arc<SessionClient>,
    policy: RetryPolicy,
}

impl FilenameResolver {
    pub fn new(client: Arc<SessionClient>, policy: RetryPolicy) -> Self {
        Self { client, policy }
    }

    /// 探测 `source_url` 并构造下载描述。
    ///
    /// 每次失败都会按重试策略重新探测；次数用尽时返回
    /// [`AppError::PermanentResource`]，调用方应记录并跳过该资源。
    pub async fn resolve(
        &self,
        session: &SessionToken,
        source_url: &str,
        proposed_name: &str,
        local_dir: &Path,
    ) -> AppResult<DownloadDescriptor> {
        let probe = self
            .policy
            .run(|attempt| self.probe(session, source_url, attempt))
            .await
            .map_err(|exhausted| {
                if exhausted.last_error.is_fatal() {
                    return exhausted.last_error;
                }
                debug!(
                    "探测 '{}' 连续 {} 次失败，最后一次错误: {}",
                    source_url, exhausted.attempts, exhausted.last_error
                );
                AppError::PermanentResource {
                    url: source_url.to_string(),
                    attempts: exhausted.attempts,
                }
            })?;

        let local_file_name = utils::finalize_file_name(proposed_name, probe.extension.as_deref());
        debug!(
            "'{}' 最终地址为 '{}'，本地文件名: '{}'",
            source_url, probe.final_url, local_file_name
        );
        Ok(DownloadDescriptor {
            session: session.clone(),
            source_url: source_url.to_string(),
            local_file_name,
            local_dir: local_dir.to_path_buf(),
        })
    }

    async fn probe(
        &self,
        session: &SessionToken,
        source_url: &str,
        attempt: u32,
    ) -> AppResult<Probe> {
        debug!("探测 '{}' (第 {} 次尝试)", source_url, attempt + 1);
        let transient = |reason: String| AppError::TransientResource {
            url: source_url.to_string(),
            reason,
        };

        let res = self
            .client
            .probe(source_url, session)
            .await
            .map_err(|e| transient(e.to_string()))?;

        let final_url = res.url().clone();
        if final_url.path().ends_with(constants::LOGIN_PATH_SUFFIX) {
            return Err(transient("被重定向到登录页，会话可能已失效".to_string()));
        }

        let extension = utils::extension_from_url(&final_url).or_else(|| {
            res.headers()
                .get(header::CONTENT_DISPOSITION)
                .and_then(|v| v.to_str().ok())
                .and_then(utils::parse_content_disposition)
                .and_then(|name| utils::extension_of(&name))
        });
        // 探测请求的响应体直接丢弃
        drop(res);

        Ok(Probe {
            final_url,
            extension,
        })
    }
}
