use serde::{Deserialize, Serialize};

use crate::config::validation::{ConfigValidator, ValidationUtils};
use crate::errors::RecordsResult;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DatabaseConfig {
    pub url: String,
    pub create_if_missing: bool,
    pub busy_timeout_seconds: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite:student_management.db".to_string(),
            create_if_missing: true,
            busy_timeout_seconds: 5,
        }
    }
}

impl DatabaseConfig {
    /// 内存数据库，主要用于测试
    pub fn in_memory() -> Self {
        Self {
            url: "sqlite::memory:".to_string(),
            ..Self::default()
        }
    }
}

impl ConfigValidator for DatabaseConfig {
    fn validate(&self) -> RecordsResult<()> {
        ValidationUtils::validate_sqlite_url(&self.url, "database.url")?;
        ValidationUtils::validate_timeout_seconds(
            self.busy_timeout_seconds,
            "database.busy_timeout_seconds",
        )?;
        Ok(())
    }
}
