use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::task::{BatchTask, ChunkHandler, TaskOutcome};

/// 单个任务的执行单元：处理器内部的错误和 panic 都不会越过 `run`
pub struct RecordProcessor<R>
where
    R: Send + Sync + 'static,
{
    task: BatchTask<R>,
    handler: Arc<dyn ChunkHandler<R>>,
}

impl<R> RecordProcessor<R>
where
    R: Send + Sync + 'static,
{
    pub fn new(task: BatchTask<R>, handler: Arc<dyn ChunkHandler<R>>) -> Self {
        Self { task, handler }
    }

    pub fn task(&self) -> &BatchTask<R> {
        &self.task
    }

    pub async fn run(&self, cancel: &CancellationToken) -> TaskOutcome {
        let label = self.task.label();

        if cancel.is_cancelled() {
            info!("任务 '{}' 在开始前被取消", label);
            return TaskOutcome::Cancelled;
        }

        info!(
            "任务 '{}' 开始 (批次 {}), 处理 {} 条记录, 处理器: {}",
            label,
            self.task.batch(),
            self.task.len(),
            self.handler.name()
        );

        let result = AssertUnwindSafe(self.handler.handle(&self.task, cancel))
            .catch_unwind()
            .await;

        match result {
            Ok(Ok(processed)) => {
                info!("任务 '{}' 完成, 处理了 {} 条记录", label, processed);
                TaskOutcome::Completed { processed }
            }
            Ok(Err(e)) if e.is_cancellation() => {
                warn!("任务 '{}' 被中断", label);
                TaskOutcome::Cancelled
            }
            Ok(Err(e)) => {
                error!("任务 '{}' 执行出错: {}", label, e);
                TaskOutcome::Failed {
                    error: e.to_string(),
                }
            }
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                error!("任务 '{}' 发生panic: {}", label, message);
                TaskOutcome::Failed {
                    error: format!("panic: {message}"),
                }
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
