// src/downloader/retry.rs

use crate::{config::AppConfig, error::AppError};
use log::debug;
use std::{future::Future, time::Duration};

/// 有界重试策略：最多执行 `max_attempts` 次，两次尝试之间等待 `delay`。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.max_attempts, config.retry_delay)
    }

    /// 依次以尝试序号 0, 1, 2… 调用 `op`，直到成功或次数用尽。
    /// 致命错误 (配置/认证) 不重试，直接返回。
    pub async fn run<T, F, Fut>(&self, mut op: F) -> Result<T, Exhausted>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, AppError>>,
    {
        let mut attempt = 0;
        loop {
            match op(attempt).await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_fatal() || attempt + 1 >= self.max_attempts => {
                    return Err(Exhausted {
                        attempts: attempt + 1,
                        last_error: e,
                    });
                }
                Err(e) => {
                    debug!("第 {} 次尝试失败: {}，准备重试", attempt + 1, e);
                    if !self.delay.is_zero() {
                        tokio::time::sleep(self.delay).await;
                    }
                    attempt += 1;
                }
            }
        }
    }
}

/// 重试次数用尽时返回最后一次的错误。
#[derive(Debug)]
pub struct Exhausted {
    pub attempts: u32,
    pub last_error: AppError,
}
