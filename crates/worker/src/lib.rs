pub mod handlers;
pub mod partition;
pub mod processor;
pub mod scheduler;
pub mod task;

pub use handlers::{ContactNormalizationHandler, StudentNameHandler};
pub use processor::RecordProcessor;
pub use scheduler::{DispatchReceipt, PoolState, SchedulerStats, ShutdownOutcome, TaskScheduler};
pub use task::{BatchTask, ChunkHandler, TaskOutcome};
pub use tokio_util::sync::CancellationToken;
