use anyhow::{Context, Result};
use config::{Config as ConfigBuilder, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::path::Path;

use super::{
    database::DatabaseConfig, logging::LogConfig, reports::ReportConfig, worker::WorkerConfig,
};
use crate::config::validation::ConfigValidator;
use crate::errors::RecordsResult;

const DEFAULT_CONFIG_PATHS: [&str; 2] = ["config/records.toml", "records.toml"];

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub worker: WorkerConfig,
    pub logging: LogConfig,
    pub reports: ReportConfig,
}

impl AppConfig {
    /// 加载配置：默认值 -> 配置文件 -> 环境变量
    ///
    /// 显式指定的配置文件不存在时返回错误；未指定时依次尝试默认路径，都不存在则只使用默认值。
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let defaults = Self::default();
        let mut builder = ConfigBuilder::builder()
            .set_default("database.url", defaults.database.url)?
            .set_default("database.create_if_missing", defaults.database.create_if_missing)?
            .set_default(
                "database.busy_timeout_seconds",
                defaults.database.busy_timeout_seconds as i64,
            )?
            .set_default("worker.pool_size", defaults.worker.pool_size as i64)?
            .set_default(
                "worker.graceful_timeout_seconds",
                defaults.worker.graceful_timeout_seconds as i64,
            )?
            .set_default(
                "worker.forced_timeout_seconds",
                defaults.worker.forced_timeout_seconds as i64,
            )?
            .set_default(
                "worker.simulated_delay_ms",
                defaults.worker.simulated_delay_ms as i64,
            )?
            .set_default("logging.level", defaults.logging.level.to_string())?
            .set_default("logging.format", "pretty")?
            .set_default("logging.enable_file_logging", defaults.logging.enable_file_logging)?
            .set_default("logging.log_file_path", "logs/application.log")?
            .set_default("reports.directory", defaults.reports.directory)?;

        if let Some(path) = config_path {
            if Path::new(path).exists() {
                builder = builder.add_source(File::new(path, FileFormat::Toml));
            } else {
                return Err(anyhow::anyhow!("配置文件不存在: {}", path));
            }
        } else if let Some(path) = DEFAULT_CONFIG_PATHS
            .iter()
            .find(|path| Path::new(path).exists())
        {
            builder = builder.add_source(File::new(path, FileFormat::Toml));
        }

        builder = builder.add_source(
            Environment::with_prefix("RECORDS")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config: AppConfig = builder
            .build()
            .context("构建配置失败")?
            .try_deserialize()
            .context("反序列化配置失败")?;

        config.validate()?;

        Ok(config)
    }

    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(toml_str).context("解析TOML配置失败")?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("序列化配置为TOML失败")
    }
}

impl ConfigValidator for AppConfig {
    fn validate(&self) -> RecordsResult<()> {
        self.database.validate()?;
        self.worker.validate()?;
        self.logging.validate()?;
        self.reports.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::models::{LogLevel, OutputFormat};
    use std::io::Write;

    #[test]
    fn test_default_config_is_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.worker.pool_size, 4);
        assert_eq!(config.database.url, "sqlite:student_management.db");
    }

    #[test]
    fn test_toml_roundtrip_preserves_sections() {
        let config = AppConfig::default();
        let toml_str = config.to_toml().unwrap();
        assert!(toml_str.contains("[worker]"));
        assert!(toml_str.contains("[database]"));

        let parsed = AppConfig::from_toml(&toml_str).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_from_toml_rejects_invalid_values() {
        let mut config = AppConfig::default();
        config.worker.pool_size = 0;
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(AppConfig::from_toml(&toml_str).is_err());
    }

    #[test]
    fn test_load_from_file_overrides_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[database]
url = "sqlite::memory:"

[worker]
pool_size = 3
graceful_timeout_seconds = 5

[logging]
level = "debug"
format = "json"
"#
        )
        .unwrap();

        let path = file.path().to_str().unwrap().to_string();
        let config = AppConfig::load(Some(&path)).unwrap();

        assert_eq!(config.database.url, "sqlite::memory:");
        assert_eq!(config.worker.pool_size, 3);
        assert_eq!(config.worker.graceful_timeout_seconds, 5);
        assert_eq!(config.worker.forced_timeout_seconds, 60);
        assert_eq!(config.logging.level, LogLevel::Debug);
        assert_eq!(config.logging.format, OutputFormat::Json);
        assert_eq!(config.reports.directory, "reports");
    }

    #[test]
    fn test_load_missing_explicit_file_fails() {
        let result = AppConfig::load(Some("/definitely/not/here/records.toml"));
        assert!(result.is_err());
    }
}
