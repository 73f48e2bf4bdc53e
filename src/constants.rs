// src/constants.rs

use std::time::Duration;

pub const UI_WIDTH: usize = 88;
pub const CONFIG_DIR_NAME: &str = concat!(".", clap::crate_name!());
pub const LOG_FILE_NAME: &str = concat!(clap::crate_name!(), ".log");
pub const LOG_FALLBACK_FILE_NAME: &str = "fallback.log";
pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// Moodle 用于保存登录状态的 Cookie 名称
pub const SESSION_COOKIE_NAME: &str = "MoodleSession";
/// 登录页路径；探测请求被重定向到这里说明会话已失效
pub const LOGIN_PATH_SUFFIX: &str = "/login/index.php";

pub const DEFAULT_SAVE_DIR: &str = "downloads";
pub const DEFAULT_MANIFEST_FILE: &str = "aria2c_input.txt";
pub const DEFAULT_TREE_SNAPSHOT: &str = "content_tree.json";
pub const UNNAMED_FILE: &str = "unnamed";
/// 内部下载时的临时文件前缀，完成后原子重命名为目标文件
pub const TEMP_FILE_PREFIX: &str = ".moodle-dl-";
pub const MAX_EXTENSION_LEN: usize = 12;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

pub const COURSE_ID_COMMENT_MARKER: char = '#';

pub mod files {
    pub const CONFIG_LOCAL: &str = "config.local.yaml";
    pub const CONFIG_SHARED: &str = "config.yaml";
    pub const SECRETS_LOCAL: &str = "secrets.local.yaml";
    pub const SECRETS_SHARED: &str = "secrets.yaml";
}

pub mod env {
    pub const COURSE_IDS: &str = "COURSE_IDS";
    pub const DOWNLOADER: &str = "DOWNLOADER";
    pub const MOODLE_USERNAME: &str = "MOODLE_USERNAME";
    pub const MOODLE_PASSWORD: &str = "MOODLE_PASSWORD";
}
