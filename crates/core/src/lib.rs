pub mod config;
pub mod errors;
pub mod logging;

pub use self::config::*;
pub use self::errors::*;
pub use self::logging::{init_logging, LoggingGuard};
