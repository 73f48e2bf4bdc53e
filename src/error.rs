// src/error.rs

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("配置错误: {0}")]
    Config(String),
    #[error("认证失败: {0}")]
    Auth(String),
    #[error("资源 '{url}' 请求失败: {reason}")]
    TransientResource { url: String, reason: String },
    #[error("资源 '{url}' 在 {attempts} 次尝试后仍无法解析")]
    PermanentResource { url: String, attempts: u32 },
    #[error("网络请求失败: {0}")]
    Network(#[from] reqwest::Error),
    #[error("I/O 错误: {0}")]
    Io(#[from] std::io::Error),
    #[error("临时文件持久化失败: {0}")]
    TempFilePersist(#[from] tempfile::PersistError),
    #[error("未知错误: {0}")]
    Other(#[from] anyhow::Error),
}

impl AppError {
    /// 只有配置错误和认证错误会终止整个运行，其余错误都局限于单个资源。
    pub fn is_fatal(&self) -> bool {
        matches!(self, AppError::Config(_) | AppError::Auth(_))
    }
}

pub type AppResult<T> = Result<T, AppError>;
