use crate::errors::{RecordsError, RecordsResult};

/// Trait for configuration validation
pub trait ConfigValidator {
    fn validate(&self) -> RecordsResult<()>;
}

/// General validation utilities
pub struct ValidationUtils;

impl ValidationUtils {
    /// Validate that a string is not empty
    pub fn validate_not_empty(value: &str, field_name: &str) -> RecordsResult<()> {
        if value.trim().is_empty() {
            return Err(RecordsError::Configuration(format!(
                "{field_name} cannot be empty"
            )));
        }
        Ok(())
    }

    /// Validate that a timeout is reasonable
    pub fn validate_timeout_seconds(timeout_seconds: u64, field_name: &str) -> RecordsResult<()> {
        if timeout_seconds == 0 {
            return Err(RecordsError::Configuration(format!(
                "{field_name} must be greater than 0"
            )));
        }
        if timeout_seconds > 3600 {
            return Err(RecordsError::Configuration(format!(
                "{field_name} must be less than or equal to 3600"
            )));
        }
        Ok(())
    }

    /// Validate that a count is reasonable
    pub fn validate_count(count: usize, field_name: &str) -> RecordsResult<()> {
        if count == 0 {
            return Err(RecordsError::Configuration(format!(
                "{field_name} must be greater than 0"
            )));
        }
        if count > 10000 {
            return Err(RecordsError::Configuration(format!(
                "{field_name} must be less than or equal to 10000"
            )));
        }
        Ok(())
    }

    pub fn validate_sqlite_url(url: &str, field_name: &str) -> RecordsResult<()> {
        Self::validate_not_empty(url, field_name)?;
        if !url.starts_with("sqlite:") {
            return Err(RecordsError::Configuration(format!(
                "{field_name} must start with sqlite:"
            )));
        }
        Ok(())
    }
}
