use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::validation::{ConfigValidator, ValidationUtils};
use crate::errors::RecordsResult;

/// 批处理任务池配置
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkerConfig {
    /// 并发worker数量
    pub pool_size: usize,
    /// 优雅关闭等待时间
    pub graceful_timeout_seconds: u64,
    /// 强制取消后的等待时间
    pub forced_timeout_seconds: u64,
    /// 模拟处理耗时
    pub simulated_delay_ms: u64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            pool_size: 4,
            graceful_timeout_seconds: 60,
            forced_timeout_seconds: 60,
            simulated_delay_ms: 1000,
        }
    }
}

impl WorkerConfig {
    pub fn graceful_timeout(&self) -> Duration {
        Duration::from_secs(self.graceful_timeout_seconds)
    }

    pub fn forced_timeout(&self) -> Duration {
        Duration::from_secs(self.forced_timeout_seconds)
    }

    pub fn simulated_delay(&self) -> Duration {
        Duration::from_millis(self.simulated_delay_ms)
    }
}

impl ConfigValidator for WorkerConfig {
    fn validate(&self) -> RecordsResult<()> {
        ValidationUtils::validate_count(self.pool_size, "worker.pool_size")?;
        ValidationUtils::validate_timeout_seconds(
            self.graceful_timeout_seconds,
            "worker.graceful_timeout_seconds",
        )?;
        ValidationUtils::validate_timeout_seconds(
            self.forced_timeout_seconds,
            "worker.forced_timeout_seconds",
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_worker_config_validation() {
        let config = WorkerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.graceful_timeout(), Duration::from_secs(60));
        assert_eq!(config.simulated_delay(), Duration::from_millis(1000));

        let mut invalid_config = config.clone();
        invalid_config.pool_size = 0;
        assert!(invalid_config.validate().is_err());

        let mut invalid_config = config.clone();
        invalid_config.forced_timeout_seconds = 0;
        assert!(invalid_config.validate().is_err());

        // 模拟耗时允许为0
        let mut config = config;
        config.simulated_delay_ms = 0;
        assert!(config.validate().is_ok());
    }
}
