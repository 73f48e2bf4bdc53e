// src/models/mod.rs

pub mod tree;

pub use tree::{ContentTree, Course, Folder, ResourceRef, Section};

use crate::{constants, symbols};
use colored::{ColoredString, Colorize};
use std::{fmt, path::PathBuf, sync::Arc};

/// 一次运行内共享的会话凭据（Moodle 的会话 Cookie 值），创建后只读。
#[derive(Clone, PartialEq, Eq)]
pub struct SessionToken(Arc<str>);

impl SessionToken {
    pub fn new(value: impl Into<String>) -> Self {
        Self(Arc::from(value.into()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }

    /// `Cookie` 请求头的值，例如 `MoodleSession=abc`
    pub fn cookie_header(&self) -> String {
        format!("{}={}", constants::SESSION_COOKIE_NAME, self.0)
    }
}

// 避免 Token 出现在日志里
impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionToken(***)")
    }
}

/// 经过探测后完全确定的下载描述，只在当前章节的处理窗口内存在。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadDescriptor {
    pub session: SessionToken,
    pub source_url: String,
    pub local_file_name: String,
    pub local_dir: PathBuf,
}

impl DownloadDescriptor {
    pub fn target_path(&self) -> PathBuf {
        self.local_dir.join(&self.local_file_name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Downloaded,
    Skipped,
    Manifested,
}

impl Outcome {
    pub fn get_display_info(
        &self,
    ) -> (
        &'static ColoredString,
        fn(ColoredString) -> ColoredString,
        &'static str,
    ) {
        match self {
            Outcome::Downloaded => (&symbols::OK, |s| s.green(), "下载完成"),
            Outcome::Manifested => (&symbols::INFO, |s| s.cyan(), "已写入下载清单"),
            Outcome::Skipped => (&symbols::WARN, |s| s.yellow(), "下载失败，已跳过"),
        }
    }
}
