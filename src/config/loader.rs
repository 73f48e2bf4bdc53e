// src/config/loader.rs

use crate::{
    constants,
    error::{AppError, AppResult},
};
use log::{debug, info, warn};
use serde::de::DeserializeOwned;
use std::{
    fs,
    path::{Path, PathBuf},
};

/// 启动时一次性读取的环境变量，之后配置加载只依赖这个值，便于测试。
#[derive(Debug, Clone, Default)]
pub struct EnvOverrides {
    pub course_ids: Option<String>,
    pub downloader: Option<String>,
    pub moodle_username: Option<String>,
    pub moodle_password: Option<String>,
}

impl EnvOverrides {
    pub fn from_env() -> Self {
        let read = |key: &str| {
            std::env::var(key).ok().inspect(|_| debug!("检测到环境变量 {}", key))
        };
        Self {
            course_ids: read(constants::env::COURSE_IDS),
            downloader: read(constants::env::DOWNLOADER),
            moodle_username: read(constants::env::MOODLE_USERNAME),
            moodle_password: read(constants::env::MOODLE_PASSWORD),
        }
    }
}

/// 优先选择本地覆盖文件 (`*.local.yaml`)，其次是共享文件。
pub(crate) fn locate(dir: &Path, local: &str, shared: &str) -> Option<PathBuf> {
    [local, shared]
        .into_iter()
        .map(|name| dir.join(name))
        .find(|path| path.is_file())
}

/// 读取并解析 YAML 文件；两个候选文件都不存在时返回默认值，
/// 由环境变量补全，最终是否可用交给后续校验决定。
pub(crate) fn load_yaml_or_default<T>(dir: &Path, local: &str, shared: &str) -> AppResult<T>
where
    T: DeserializeOwned + Default,
{
    let Some(path) = locate(dir, local, shared) else {
        warn!(
            "目录 '{}' 中未找到 '{}' 或 '{}'，仅使用默认值与环境变量。",
            dir.display(),
            local,
            shared
        );
        return Ok(T::default());
    };
    info!("加载配置文件 '{}'", path.display());
    let content = fs::read_to_string(&path).map_err(|e| {
        AppError::Config(format!("读取配置文件 '{}' 失败: {}", path.display(), e))
    })?;
    if content.trim().is_empty() {
        return Ok(T::default());
    }
    serde_yaml::from_str(&content).map_err(|e| {
        AppError::Config(format!("解析配置文件 '{}' 失败: {}", path.display(), e))
    })
}
