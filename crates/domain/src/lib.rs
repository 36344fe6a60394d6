pub mod entities;
pub mod repositories;
pub mod services;

pub use entities::*;
pub use records_core::{RecordsError, RecordsResult};
pub use repositories::*;
pub use services::*;
