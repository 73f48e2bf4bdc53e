// src/main.rs

use clap::Parser;
use colored::*;
use fern::colors::{Color, ColoredLevelConfig};
use log::{LevelFilter, error, warn};
use moodle_dl::{cli::Cli, constants, error::AppError, run_from_cli, ui};
use std::{env, fs, path::PathBuf, sync::Arc};

#[tokio::main]
async fn main() {
    // 为 Windows 终端启用 ANSI 颜色支持。
    #[cfg(windows)]
    {
        colored::control::set_virtual_terminal(true).ok();
    }

    let args = Arc::new(Cli::parse());
    init_logger(args.log_level.into());

    if let Err(e) = run_from_cli(args).await {
        error!("程序执行出错: {}", e);
        if let AppError::Config(msg) = &e {
            ui::box_message(
                "配置错误",
                &[
                    msg.as_str(),
                    "",
                    "请检查 config(.local).yaml / secrets(.local).yaml 或对应的环境变量。",
                ],
                |s| s.red(),
            );
        }
        eprintln!("\n{} {}", "[X]".red(), format!("程序执行出错: {}", e).red());
        std::process::exit(1);
    }
}

fn log_file_path() -> PathBuf {
    match dirs::home_dir() {
        Some(home) => home
            .join(constants::CONFIG_DIR_NAME)
            .join(constants::LOG_FILE_NAME),
        None => {
            eprintln!("警告: 无法获取用户主目录，日志将写入临时目录。");
            env::temp_dir()
                .join(clap::crate_name!())
                .join(constants::LOG_FILE_NAME)
        }
    }
}

/// 控制台按 `--log-level` 输出，日志文件至少记录到 debug 级别。
fn init_logger(console_level: LevelFilter) {
    let colors = ColoredLevelConfig::new()
        .error(Color::Red)
        .warn(Color::Yellow)
        .info(Color::Green)
        .debug(Color::Cyan)
        .trace(Color::BrightBlack);

    let console = fern::Dispatch::new()
        .level(console_level)
        .format(move |out, message, record| {
            out.finish(format_args!("[{:<5}] {}", colors.color(record.level()), message))
        })
        .chain(std::io::stderr());

    let mut root = fern::Dispatch::new()
        .level(console_level.max(LevelFilter::Debug))
        .level_for("reqwest", LevelFilter::Info)
        .level_for("hyper_util", LevelFilter::Info)
        .chain(console);

    let path = log_file_path();
    if let Some(dir) = path.parent()
        && let Err(e) = fs::create_dir_all(dir)
    {
        eprintln!("警告: 无法创建日志目录 {:?}: {}", dir, e);
    }
    let mut fallback_used = None;
    let file_appender = fern::log_file(&path).or_else(|e| {
        eprintln!(
            "警告: 无法打开主日志文件 {:?} : {}。将尝试使用备用日志文件。",
            path, e
        );
        let fallback = env::temp_dir().join(format!(
            "{}-{}",
            clap::crate_name!(),
            constants::LOG_FALLBACK_FILE_NAME
        ));
        let file = fern::log_file(&fallback);
        fallback_used = Some(fallback);
        file
    });

    match file_appender {
        Ok(file) => {
            root = root.chain(
                fern::Dispatch::new()
                    .level(console_level.max(LevelFilter::Debug))
                    .format(|out, message, record| {
                        out.finish(format_args!(
                            "[{}] [{:<5}] [{}:{}] - {}",
                            chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f"),
                            record.level(),
                            record.target(),
                            record.line().unwrap_or(0),
                            message
                        ))
                    })
                    .chain(file),
            );
        }
        Err(e) => eprintln!("警告: 无法创建日志文件: {}。日志将不会被记录到文件。", e),
    }

    if let Err(e) = root.apply() {
        eprintln!("警告: 日志系统初始化失败: {}", e);
        return;
    }
    if let Some(fallback) = fallback_used {
        warn!("日志将写入备用文件: {:?}", fallback);
    }
}
