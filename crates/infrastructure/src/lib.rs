pub mod database;
pub mod reports;

pub use database::*;
pub use reports::{ReportService, SummaryStatistics};
