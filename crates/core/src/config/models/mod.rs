pub mod app_config;
pub mod database;
pub mod logging;
pub mod reports;
pub mod worker;

pub use app_config::*;
pub use database::*;
pub use logging::*;
pub use reports::*;
pub use worker::*;
