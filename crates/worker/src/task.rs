use std::sync::Arc;

use async_trait::async_trait;
use records_core::RecordsResult;
use tokio_util::sync::CancellationToken;

/// 提交给任务池的一块记录
///
/// 标签 `Task-{n}` 在一次分发内从1开始编号，只用于日志；批次号在调度器内单调递增。
#[derive(Debug, Clone)]
pub struct BatchTask<R> {
    batch: u64,
    index: usize,
    label: String,
    records: Arc<[R]>,
}

impl<R> BatchTask<R> {
    pub fn new(batch: u64, index: usize, records: Arc<[R]>) -> Self {
        Self {
            batch,
            index,
            label: format!("Task-{}", index + 1),
            records,
        }
    }

    pub fn batch(&self) -> u64 {
        self.batch
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn records(&self) -> &[R] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    Completed { processed: usize },
    Failed { error: String },
    Cancelled,
}

/// 一块记录的实际处理步骤
///
/// 实现应在耗时步骤之间检查 `cancel`，被取消时返回 `RecordsError::Cancelled`。
#[async_trait]
pub trait ChunkHandler<R>: Send + Sync
where
    R: Send + Sync + 'static,
{
    fn name(&self) -> &str;

    /// 返回处理的记录数
    async fn handle(&self, task: &BatchTask<R>, cancel: &CancellationToken) -> RecordsResult<usize>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_is_one_based() {
        let task = BatchTask::new(3, 0, Arc::from(vec![1, 2, 3]));
        assert_eq!(task.label(), "Task-1");
        assert_eq!(task.batch(), 3);
        assert_eq!(task.records(), &[1, 2, 3]);

        let task = BatchTask::new(3, 9, Arc::from(Vec::<i32>::new()));
        assert_eq!(task.label(), "Task-10");
        assert!(task.is_empty());
    }
}
