use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::config::validation::{ConfigValidator, ValidationUtils};
use crate::errors::RecordsResult;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReportConfig {
    pub directory: String,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            directory: "reports".to_string(),
        }
    }
}

impl ReportConfig {
    pub fn directory_path(&self) -> PathBuf {
        PathBuf::from(&self.directory)
    }
}

impl ConfigValidator for ReportConfig {
    fn validate(&self) -> RecordsResult<()> {
        ValidationUtils::validate_not_empty(&self.directory, "reports.directory")
    }
}
