//! 配置管理
//!
//! 配置来源按优先级从低到高依次为：内置默认值、TOML配置文件、`RECORDS_` 前缀的环境变量。
//! 环境变量使用 `__` 分隔嵌套字段，例如 `RECORDS_WORKER__POOL_SIZE=8`。

pub mod models;
pub mod validation;

pub use models::*;
pub use validation::{ConfigValidator, ValidationUtils};
