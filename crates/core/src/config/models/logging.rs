use serde::{Deserialize, Serialize};

use crate::config::validation::ConfigValidator;
use crate::errors::{RecordsError, RecordsResult};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl std::str::FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            _ => Err(format!(
                "Invalid log level: {s}. Valid levels: trace, debug, info, warn, error"
            )),
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogLevel::Trace => write!(f, "trace"),
            LogLevel::Debug => write!(f, "debug"),
            LogLevel::Info => write!(f, "info"),
            LogLevel::Warn => write!(f, "warn"),
            LogLevel::Error => write!(f, "error"),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Json,
    Text,
    #[default]
    Pretty,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "text" => Ok(OutputFormat::Text),
            "pretty" => Ok(OutputFormat::Pretty),
            _ => Err(format!(
                "Invalid output format: {s}. Valid formats: json, text, pretty"
            )),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LogConfig {
    pub level: LogLevel,
    pub format: OutputFormat,
    /// 是否同时追加写入日志文件
    pub enable_file_logging: bool,
    pub log_file_path: Option<String>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            format: OutputFormat::Pretty,
            enable_file_logging: true,
            log_file_path: Some("logs/application.log".to_string()),
        }
    }
}

impl ConfigValidator for LogConfig {
    fn validate(&self) -> RecordsResult<()> {
        if !self.enable_file_logging {
            return Ok(());
        }
        match &self.log_file_path {
            None => Err(RecordsError::Configuration(
                "logging.log_file_path is required when file logging is enabled".to_string(),
            )),
            Some(path) if path.trim().is_empty() || path.ends_with('/') => Err(
                RecordsError::Configuration("logging.log_file_path must name a file".to_string()),
            ),
            Some(_) => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_parsing() {
        assert_eq!("INFO".parse::<LogLevel>().unwrap(), LogLevel::Info);
        assert_eq!("warning".parse::<LogLevel>().unwrap(), LogLevel::Warn);
        assert!("verbose".parse::<LogLevel>().is_err());
        assert_eq!(LogLevel::Debug.to_string(), "debug");
    }

    #[test]
    fn test_output_format_parsing() {
        assert_eq!("json".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert_eq!("Pretty".parse::<OutputFormat>().unwrap(), OutputFormat::Pretty);
        assert!("xml".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn test_log_config_validation() {
        assert!(LogConfig::default().validate().is_ok());

        let config = LogConfig {
            log_file_path: None,
            ..LogConfig::default()
        };
        assert!(config.validate().is_err());

        let config = LogConfig {
            enable_file_logging: false,
            log_file_path: None,
            ..LogConfig::default()
        };
        assert!(config.validate().is_ok());

        let config = LogConfig {
            log_file_path: Some("logs/".to_string()),
            ..LogConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
