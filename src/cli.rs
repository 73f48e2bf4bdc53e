// src/cli.rs

use clap::{Parser, ValueEnum, command, crate_version};
use std::path::PathBuf;

/// 定义日志输出级别
#[derive(ValueEnum, Copy, Clone, Debug, PartialEq, Eq)]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for log::LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Off => log::LevelFilter::Off,
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// 命令行上可选的下载方式，覆盖配置文件和环境变量
#[derive(ValueEnum, Copy, Clone, Debug, PartialEq, Eq)]
pub enum DownloaderArg {
    /// 由本程序直接下载
    Internal,
    /// 只生成 aria2c 输入清单
    #[value(name = "external-manifest", alias = "aria2")]
    ExternalManifest,
}

#[derive(Parser, Debug, Clone)]
#[command(
    version = crate_version!(),
    about,
    long_about = None,
)]
pub struct Cli {
    /// 存放 config(.local).yaml 与 secrets(.local).yaml 的目录
    #[arg(long, value_name = "DIR", default_value_os_t = PathBuf::from("."))]
    pub config_dir: PathBuf,
    /// 外部爬虫导出的课程内容快照 (JSON)
    #[arg(short, long, value_name = "FILE")]
    pub tree: Option<PathBuf>,
    /// 设置文件保存目录
    #[arg(short, long, value_name = "DIR")]
    pub output: Option<PathBuf>,
    /// 下载方式: 直接下载或生成外部下载器清单
    #[arg(short, long, value_enum)]
    pub downloader: Option<DownloaderArg>,
    /// 外部下载器清单的输出路径
    #[arg(short, long, value_name = "FILE")]
    pub manifest: Option<PathBuf>,
    /// 设置日志输出级别
    #[arg(long, value_enum, default_value_t = LogLevel::Info, global = true)]
    pub log_level: LogLevel,
}
