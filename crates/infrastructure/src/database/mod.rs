pub mod connection_manager;
pub mod manager;
pub mod schema;
pub mod sqlite;

pub use connection_manager::{ConnectionManager, ConnectionState, TransactionScope, TransactionStats};
pub use manager::DatabaseManager;
pub use sqlite::{SqliteCourseRepository, SqliteGradeRepository, SqliteStudentRepository};
