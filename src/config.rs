// src/config.rs

pub mod loader;
pub mod secrets;

pub use loader::EnvOverrides;
pub use secrets::Secrets;

use self::loader::load_yaml_or_default;
use crate::{
    cli::{Cli, DownloaderArg},
    constants,
    error::{AppError, AppResult},
};
use log::info;
use serde::Deserialize;
use std::{path::PathBuf, str::FromStr, time::Duration};

/// 下载方式，整个运行期间固定不变
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DownloaderKind {
    #[default]
    Internal,
    ExternalManifest,
}

impl FromStr for DownloaderKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "internal" => Ok(Self::Internal),
            "external-manifest" | "aria2" => Ok(Self::ExternalManifest),
            other => Err(AppError::Config(format!(
                "未知的下载方式 '{}' (可选: internal, external-manifest)",
                other
            ))),
        }
    }
}

impl From<DownloaderArg> for DownloaderKind {
    fn from(arg: DownloaderArg) -> Self {
        match arg {
            DownloaderArg::Internal => Self::Internal,
            DownloaderArg::ExternalManifest => Self::ExternalManifest,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct NetworkConfig {
    pub timeout_secs: Option<u64>,
    pub connect_timeout_secs: Option<u64>,
    pub max_attempts: Option<u32>,
    pub retry_delay_ms: Option<u64>,
    pub probe_concurrency: Option<usize>,
}

/// `config.yaml` / `config.local.yaml` 的文件结构
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct FileConfig {
    #[serde(rename = "courseIDs", default)]
    pub course_ids: Option<Vec<serde_yaml::Value>>,
    pub downloader: Option<String>,
    pub output_dir: Option<PathBuf>,
    pub manifest_path: Option<PathBuf>,
    pub tree_snapshot: Option<PathBuf>,
    pub dedupe_manifest: Option<bool>,
    #[serde(default)]
    pub network: NetworkConfig,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub course_ids: Vec<String>,
    pub downloader: DownloaderKind,
    pub output_dir: PathBuf,
    pub manifest_path: PathBuf,
    pub tree_snapshot: PathBuf,
    pub dedupe_manifest: bool,
    pub user_agent: String,
    pub connect_timeout: Duration,
    pub timeout: Duration,
    pub max_attempts: u32,
    pub retry_delay: Duration,
    pub probe_concurrency: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            course_ids: Vec::new(),
            downloader: DownloaderKind::Internal,
            output_dir: PathBuf::from(constants::DEFAULT_SAVE_DIR),
            manifest_path: PathBuf::from(constants::DEFAULT_MANIFEST_FILE),
            tree_snapshot: PathBuf::from(constants::DEFAULT_TREE_SNAPSHOT),
            dedupe_manifest: true,
            user_agent: constants::USER_AGENT.into(),
            connect_timeout: constants::DEFAULT_CONNECT_TIMEOUT,
            timeout: constants::DEFAULT_TIMEOUT,
            max_attempts: constants::DEFAULT_MAX_ATTEMPTS,
            retry_delay: Duration::ZERO,
            probe_concurrency: 1,
        }
    }
}

impl AppConfig {
    /// 按 文件 < 环境变量 < 命令行 的优先级合并配置并校验。
    pub fn new(args: &Cli, env: &EnvOverrides) -> AppResult<Self> {
        let file: FileConfig = load_yaml_or_default(
            &args.config_dir,
            constants::files::CONFIG_LOCAL,
            constants::files::CONFIG_SHARED,
        )?;
        Self::from_sources(file, env, args)
    }

    pub fn from_sources(file: FileConfig, env: &EnvOverrides, args: &Cli) -> AppResult<Self> {
        let defaults = Self::default();

        let raw_course_ids = match &env.course_ids {
            Some(value) => {
                info!("使用环境变量 {}。", constants::env::COURSE_IDS);
                value.split(',').map(str::to_string).collect()
            }
            None => file
                .course_ids
                .unwrap_or_default()
                .iter()
                .map(yaml_scalar_to_string)
                .collect::<AppResult<Vec<_>>>()?,
        };

        let downloader = match (args.downloader, &env.downloader, &file.downloader) {
            (Some(arg), _, _) => arg.into(),
            (None, Some(value), _) => {
                info!("使用环境变量 {}。", constants::env::DOWNLOADER);
                value.parse()?
            }
            (None, None, Some(value)) => value.parse()?,
            (None, None, None) => defaults.downloader,
        };

        let network = file.network;
        let config = Self {
            course_ids: normalize_course_ids(raw_course_ids)?,
            downloader,
            output_dir: args
                .output
                .clone()
                .or(file.output_dir)
                .unwrap_or(defaults.output_dir),
            manifest_path: args
                .manifest
                .clone()
                .or(file.manifest_path)
                .unwrap_or(defaults.manifest_path),
            tree_snapshot: args
                .tree
                .clone()
                .or(file.tree_snapshot)
                .unwrap_or(defaults.tree_snapshot),
            dedupe_manifest: file.dedupe_manifest.unwrap_or(defaults.dedupe_manifest),
            user_agent: defaults.user_agent,
            connect_timeout: network
                .connect_timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.connect_timeout),
            timeout: network
                .timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.timeout),
            max_attempts: network.max_attempts.unwrap_or(defaults.max_attempts),
            retry_delay: network
                .retry_delay_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.retry_delay),
            probe_concurrency: network
                .probe_concurrency
                .unwrap_or(defaults.probe_concurrency),
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> AppResult<()> {
        if self.max_attempts == 0 {
            return Err(AppError::Config("network.maxAttempts 必须至少为 1".into()));
        }
        if self.probe_concurrency == 0 {
            return Err(AppError::Config("network.probeConcurrency 必须至少为 1".into()));
        }
        if self.timeout.is_zero() {
            return Err(AppError::Config("network.timeoutSecs 必须大于 0".into()));
        }
        Ok(())
    }
}

fn yaml_scalar_to_string(value: &serde_yaml::Value) -> AppResult<String> {
    match value {
        serde_yaml::Value::Number(n) => Ok(n.to_string()),
        serde_yaml::Value::String(s) => Ok(s.clone()),
        other => Err(AppError::Config(format!(
            "课程 ID 格式不正确 (courseIDs): {:?}",
            other
        ))),
    }
}

/// 去除空白与以 `#` 开头的注释条目，其余条目必须全部是数字。
fn normalize_course_ids(raw: Vec<String>) -> AppResult<Vec<String>> {
    let ids: Vec<String> = raw
        .into_iter()
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty() && !id.starts_with(constants::COURSE_ID_COMMENT_MARKER))
        .collect();

    if ids.is_empty() {
        return Err(AppError::Config("未配置课程 ID (courseIDs)".into()));
    }
    if let Some(bad) = ids.iter().find(|id| id.parse::<u64>().is_err()) {
        return Err(AppError::Config(format!(
            "课程 ID 格式不正确 (courseIDs): '{}'",
            bad
        )));
    }
    Ok(ids)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn cli(extra: &[&str]) -> Cli {
        let mut argv = vec!["moodle-dl"];
        argv.extend_from_slice(extra);
        Cli::parse_from(argv)
    }

    fn file_config(yaml: &str) -> FileConfig {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn test_course_ids_accept_numbers_and_strings_and_skip_comments() {
        let file = file_config(
            "courseIDs: [123, \"456\", \"#789\", \" 42 \"]\ndownloader: internal\n",
        );
        let config = AppConfig::from_sources(file, &EnvOverrides::default(), &cli(&[])).unwrap();
        assert_eq!(config.course_ids, ["123", "456", "42"]);
        assert_eq!(config.downloader, DownloaderKind::Internal);
    }

    #[test]
    fn test_empty_course_list_is_rejected() {
        let file = file_config("courseIDs: [\"#1\"]\n");
        let err = AppConfig::from_sources(file, &EnvOverrides::default(), &cli(&[])).unwrap_err();
        assert!(matches!(err, AppError::Config(ref msg) if msg.contains("courseIDs")));
    }

    #[test]
    fn test_non_numeric_course_id_is_rejected() {
        let file = file_config("courseIDs: [123, abc]\n");
        let err = AppConfig::from_sources(file, &EnvOverrides::default(), &cli(&[])).unwrap_err();
        assert!(matches!(err, AppError::Config(ref msg) if msg.contains("abc")));
    }

    #[test]
    fn test_unknown_downloader_is_rejected() {
        let file = file_config("courseIDs: [1]\ndownloader: wget\n");
        let err = AppConfig::from_sources(file, &EnvOverrides::default(), &cli(&[])).unwrap_err();
        assert!(matches!(err, AppError::Config(ref msg) if msg.contains("wget")));
    }

    #[test]
    fn test_aria2_is_an_alias_for_manifest_mode() {
        let file = file_config("courseIDs: [1]\ndownloader: aria2\n");
        let config = AppConfig::from_sources(file, &EnvOverrides::default(), &cli(&[])).unwrap();
        assert_eq!(config.downloader, DownloaderKind::ExternalManifest);
    }

    #[test]
    fn test_precedence_file_then_env_then_cli() {
        let file = file_config("courseIDs: [1]\ndownloader: internal\noutputDir: from-file\n");
        let env = EnvOverrides {
            course_ids: Some("10,#11,12".into()),
            downloader: Some("external-manifest".into()),
            ..Default::default()
        };

        let config = AppConfig::from_sources(file.clone(), &env, &cli(&[])).unwrap();
        assert_eq!(config.course_ids, ["10", "12"]);
        assert_eq!(config.downloader, DownloaderKind::ExternalManifest);
        assert_eq!(config.output_dir, PathBuf::from("from-file"));

        let config = AppConfig::from_sources(
            file,
            &env,
            &cli(&["--downloader", "internal", "--output", "from-cli"]),
        )
        .unwrap();
        assert_eq!(config.downloader, DownloaderKind::Internal);
        assert_eq!(config.output_dir, PathBuf::from("from-cli"));
    }

    #[test]
    fn test_network_defaults_and_overrides() {
        let file = file_config("courseIDs: [1]\n");
        let config = AppConfig::from_sources(file, &EnvOverrides::default(), &cli(&[])).unwrap();
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.max_attempts, 3);
        assert!(config.dedupe_manifest);

        let file = file_config("courseIDs: [1]\nnetwork:\n  maxAttempts: 0\n");
        assert!(AppConfig::from_sources(file, &EnvOverrides::default(), &cli(&[])).is_err());
    }
}
