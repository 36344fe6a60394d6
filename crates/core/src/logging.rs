//! 日志初始化
//!
//! 控制台输出格式由 `logging.format` 决定；启用文件日志时额外追加写入一份不带颜色的文本日志。
//! `RUST_LOG` 环境变量优先于配置中的日志级别。

use std::path::Path;

use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::config::{LogConfig, OutputFormat};

/// 持有文件日志的后台写入线程，drop 时刷新剩余日志
#[must_use = "dropping the guard stops the file log writer"]
pub struct LoggingGuard {
    _file_guard: Option<WorkerGuard>,
}

pub fn init_logging(config: &LogConfig) -> Result<LoggingGuard> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(config.level.to_string()));

    let console_layer = match config.format {
        OutputFormat::Json => fmt::layer().json().boxed(),
        OutputFormat::Pretty => fmt::layer().pretty().boxed(),
        OutputFormat::Text => fmt::layer().with_target(true).boxed(),
    };

    let (file_layer, file_guard) = match file_target(config) {
        Some(path) => {
            let (directory, file_name) = split_log_path(path)?;
            std::fs::create_dir_all(&directory)
                .with_context(|| format!("创建日志目录失败: {}", directory.display()))?;

            let appender = tracing_appender::rolling::never(&directory, file_name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(true)
                .with_thread_ids(true)
                .boxed();
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .context("初始化日志系统失败")?;

    Ok(LoggingGuard {
        _file_guard: file_guard,
    })
}

fn file_target(config: &LogConfig) -> Option<&str> {
    if config.enable_file_logging {
        config.log_file_path.as_deref()
    } else {
        None
    }
}

fn split_log_path(path: &str) -> Result<(std::path::PathBuf, String)> {
    let path = Path::new(path);
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| anyhow::anyhow!("无效的日志文件路径: {}", path.display()))?
        .to_string();
    let directory = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => std::path::PathBuf::from("."),
    };
    Ok((directory, file_name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_log_path() {
        let (dir, name) = split_log_path("logs/application.log").unwrap();
        assert_eq!(dir, std::path::PathBuf::from("logs"));
        assert_eq!(name, "application.log");

        let (dir, name) = split_log_path("records.log").unwrap();
        assert_eq!(dir, std::path::PathBuf::from("."));
        assert_eq!(name, "records.log");
    }

    #[test]
    fn test_file_target_respects_flag() {
        let mut config = LogConfig::default();
        assert_eq!(file_target(&config), Some("logs/application.log"));

        config.enable_file_logging = false;
        assert_eq!(file_target(&config), None);
    }
}
