use thiserror::Error;

/// 记录管理系统错误类型定义
#[derive(Debug, Error)]
pub enum RecordsError {
    #[error("配置错误: {0}")]
    Configuration(String),

    #[error("数据库连接错误: {context}: {source}")]
    Connection {
        context: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("数据库连接未打开")]
    ConnectionClosed,

    #[error("数据库错误: {0}")]
    Database(#[from] sqlx::Error),

    #[error("{entity}未找到: {id}")]
    NotFound { entity: &'static str, id: i64 },

    #[error("验证失败: {0}")]
    Validation(String),

    #[error("任务处理错误: {0}")]
    Processing(String),

    #[error("任务已取消")]
    Cancelled,

    #[error("任务池已关闭，不再接受新任务")]
    PoolShutdown,

    #[error("IO错误: {0}")]
    Io(#[from] std::io::Error),
}

impl RecordsError {
    pub fn connection(context: impl Into<String>, source: sqlx::Error) -> Self {
        RecordsError::Connection {
            context: context.into(),
            source,
        }
    }

    pub fn not_found(entity: &'static str, id: i64) -> Self {
        RecordsError::NotFound { entity, id }
    }

    /// 取消是控制信号而不是失败
    pub fn is_cancellation(&self) -> bool {
        matches!(self, RecordsError::Cancelled)
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, RecordsError::NotFound { .. })
    }
}

/// 统一的Result类型
pub type RecordsResult<T> = std::result::Result<T, RecordsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = RecordsError::not_found("学生", 42);
        assert_eq!(err.to_string(), "学生未找到: 42");
        assert!(err.is_not_found());

        let err = RecordsError::Configuration("pool_size must be greater than 0".to_string());
        assert!(err.to_string().contains("pool_size"));
    }

    #[test]
    fn test_cancellation_is_not_a_failure_kind() {
        assert!(RecordsError::Cancelled.is_cancellation());
        assert!(!RecordsError::Processing("boom".to_string()).is_cancellation());
        assert!(!RecordsError::PoolShutdown.is_cancellation());
    }

    #[test]
    fn test_connection_error_keeps_source() {
        use std::error::Error as _;

        let err = RecordsError::connection("提交事务失败", sqlx::Error::PoolClosed);
        assert!(err.to_string().starts_with("数据库连接错误: 提交事务失败"));
        assert!(err.source().is_some());
    }
}
