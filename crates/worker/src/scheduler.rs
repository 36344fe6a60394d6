//! 固定大小的任务池
//!
//! `pool_size` 个工作线程从同一个多消费者队列中取任务。关闭分三个阶段：
//! 关闭队列后等待剩余任务完成；超时则通过取消令牌中断所有任务并丢弃队列；
//! 再次超时则记录致命错误并中止工作线程。

use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use records_core::{RecordsError, RecordsResult, WorkerConfig};
use tokio::sync::Mutex;
use tokio::task::JoinSet;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::partition::{chunk_size, partition};
use crate::processor::RecordProcessor;
use crate::task::{BatchTask, ChunkHandler, TaskOutcome};

/// 任务池状态，只会向前推进
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum PoolState {
    Running = 0,
    ShuttingDownGracefully = 1,
    ShutdownForced = 2,
    Terminated = 3,
}

impl PoolState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => PoolState::Running,
            1 => PoolState::ShuttingDownGracefully,
            2 => PoolState::ShutdownForced,
            _ => PoolState::Terminated,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShutdownOutcome {
    /// 所有任务在优雅关闭时限内完成
    Graceful,
    /// 取消后在强制关闭时限内全部退出
    Forced,
    /// 强制关闭后仍有工作线程未退出，已被中止
    Abandoned { unfinished_workers: usize },
    AlreadyShutdown,
}

/// 一次分发的回执；`batch` 为0表示没有提交任何任务
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchReceipt {
    pub batch: u64,
    pub chunk_sizes: Vec<usize>,
}

impl DispatchReceipt {
    fn empty() -> Self {
        Self {
            batch: 0,
            chunk_sizes: Vec::new(),
        }
    }

    pub fn task_count(&self) -> usize {
        self.chunk_sizes.len()
    }

    pub fn record_count(&self) -> usize {
        self.chunk_sizes.iter().sum()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchedulerStats {
    pub submitted: u64,
    pub completed: u64,
    pub failed: u64,
    pub cancelled: u64,
}

impl SchedulerStats {
    pub fn pending(&self) -> u64 {
        self.submitted
            .saturating_sub(self.completed + self.failed + self.cancelled)
    }
}

#[derive(Default)]
struct StatsCounters {
    submitted: AtomicU64,
    completed: AtomicU64,
    failed: AtomicU64,
    cancelled: AtomicU64,
}

impl StatsCounters {
    fn snapshot(&self) -> SchedulerStats {
        SchedulerStats {
            submitted: self.submitted.load(Ordering::SeqCst),
            completed: self.completed.load(Ordering::SeqCst),
            failed: self.failed.load(Ordering::SeqCst),
            cancelled: self.cancelled.load(Ordering::SeqCst),
        }
    }

    fn record(&self, outcome: &TaskOutcome) {
        let counter = match outcome {
            TaskOutcome::Completed { .. } => &self.completed,
            TaskOutcome::Failed { .. } => &self.failed,
            TaskOutcome::Cancelled => &self.cancelled,
        };
        counter.fetch_add(1, Ordering::SeqCst);
    }
}

pub struct TaskScheduler<R>
where
    R: Send + Sync + 'static,
{
    pool_size: usize,
    handler_name: String,
    sender: async_channel::Sender<BatchTask<R>>,
    // 用于在强制关闭时清空队列
    backlog: async_channel::Receiver<BatchTask<R>>,
    cancel: CancellationToken,
    workers: Mutex<Option<JoinSet<()>>>,
    state: AtomicU8,
    stats: Arc<StatsCounters>,
    next_batch: AtomicU64,
}

impl<R> TaskScheduler<R>
where
    R: Clone + Send + Sync + 'static,
{
    /// 创建任务池并立即启动 `pool_size` 个工作线程，必须在tokio运行时中调用
    pub fn new(pool_size: usize, handler: Arc<dyn ChunkHandler<R>>) -> RecordsResult<Self> {
        if pool_size == 0 {
            return Err(RecordsError::Configuration(
                "pool_size must be greater than 0".to_string(),
            ));
        }
        if tokio::runtime::Handle::try_current().is_err() {
            return Err(RecordsError::Configuration(
                "TaskScheduler 必须在tokio运行时中创建".to_string(),
            ));
        }

        let (sender, receiver) = async_channel::unbounded();
        let cancel = CancellationToken::new();
        let stats = Arc::new(StatsCounters::default());
        let handler_name = handler.name().to_string();

        let mut workers = JoinSet::new();
        for worker_id in 1..=pool_size {
            workers.spawn(worker_loop(
                worker_id,
                receiver.clone(),
                Arc::clone(&handler),
                cancel.clone(),
                Arc::clone(&stats),
            ));
        }

        info!(
            "任务池已初始化, 工作线程数: {}, 处理器: {}",
            pool_size, handler_name
        );

        Ok(Self {
            pool_size,
            handler_name,
            sender,
            backlog: receiver,
            cancel,
            workers: Mutex::new(Some(workers)),
            state: AtomicU8::new(PoolState::Running as u8),
            stats,
            next_batch: AtomicU64::new(1),
        })
    }

    pub fn from_config(config: &WorkerConfig, handler: Arc<dyn ChunkHandler<R>>) -> RecordsResult<Self> {
        Self::new(config.pool_size, handler)
    }

    /// 切分记录并提交所有任务，立即返回
    pub fn dispatch(&self, records: &[R]) -> RecordsResult<DispatchReceipt> {
        if self.is_shutdown() {
            warn!("任务池已关闭，拒绝新的分发");
            return Err(RecordsError::PoolShutdown);
        }

        if records.is_empty() {
            warn!("没有需要处理的记录");
            return Ok(DispatchReceipt::empty());
        }

        let batch = self.next_batch.fetch_add(1, Ordering::SeqCst);
        let chunks = partition(records, self.pool_size);
        info!(
            "批次 {}: {} 条记录切分为 {} 块 (每块 {} 条)",
            batch,
            records.len(),
            chunks.len(),
            chunk_size(records.len(), self.pool_size)
        );

        let mut chunk_sizes = Vec::with_capacity(chunks.len());
        for (index, chunk) in chunks.into_iter().enumerate() {
            let task = BatchTask::new(batch, index, chunk);
            let size = task.len();
            self.stats.submitted.fetch_add(1, Ordering::SeqCst);
            if self.sender.try_send(task).is_err() {
                self.stats.submitted.fetch_sub(1, Ordering::SeqCst);
                warn!(
                    "批次 {} 提交中途任务池已关闭, 已提交 {} 个任务",
                    batch,
                    chunk_sizes.len()
                );
                return Err(RecordsError::PoolShutdown);
            }
            chunk_sizes.push(size);
        }

        info!("批次 {}: 已提交 {} 个任务", batch, chunk_sizes.len());
        Ok(DispatchReceipt { batch, chunk_sizes })
    }
}

impl<R> TaskScheduler<R>
where
    R: Send + Sync + 'static,
{
    pub fn pool_size(&self) -> usize {
        self.pool_size
    }

    pub fn handler_name(&self) -> &str {
        &self.handler_name
    }

    pub fn state(&self) -> PoolState {
        PoolState::from_u8(self.state.load(Ordering::SeqCst))
    }

    /// 关闭一旦开始即返回 true
    pub fn is_shutdown(&self) -> bool {
        self.state() != PoolState::Running
    }

    pub fn stats(&self) -> SchedulerStats {
        self.stats.snapshot()
    }

    fn advance_state(&self, state: PoolState) {
        self.state.fetch_max(state as u8, Ordering::SeqCst);
    }

    /// 关闭任务池，总等待时间不超过 `graceful_timeout + forced_timeout`
    pub async fn shutdown(&self, graceful_timeout: Duration, forced_timeout: Duration) -> ShutdownOutcome {
        if self
            .state
            .compare_exchange(
                PoolState::Running as u8,
                PoolState::ShuttingDownGracefully as u8,
                Ordering::SeqCst,
                Ordering::SeqCst,
            )
            .is_err()
        {
            info!("任务池已经关闭, 忽略重复的关闭请求");
            return ShutdownOutcome::AlreadyShutdown;
        }

        info!(
            "开始关闭任务池, 等待剩余任务完成 (超时: {:?}), 待处理任务: {}",
            graceful_timeout,
            self.stats().pending()
        );
        self.sender.close();

        let Some(mut workers) = self.workers.lock().await.take() else {
            self.advance_state(PoolState::Terminated);
            return ShutdownOutcome::Graceful;
        };

        if timeout(graceful_timeout, drain(&mut workers)).await.is_ok() {
            // 工作线程全部退出后队列里仍可能留有任务
            let stranded = self.discard_backlog();
            if stranded > 0 {
                warn!("工作线程已全部退出, {} 个排队任务未被执行", stranded);
            }
            self.advance_state(PoolState::Terminated);
            info!("任务池已优雅关闭");
            return ShutdownOutcome::Graceful;
        }

        warn!("任务未能在 {:?} 内完成, 强制关闭任务池", graceful_timeout);
        self.advance_state(PoolState::ShutdownForced);
        self.cancel.cancel();
        let discarded = self.discard_backlog();
        if discarded > 0 {
            warn!("丢弃了 {} 个排队中的任务", discarded);
        }

        if timeout(forced_timeout, drain(&mut workers)).await.is_ok() {
            self.advance_state(PoolState::Terminated);
            info!("任务池已强制关闭");
            return ShutdownOutcome::Forced;
        }

        let unfinished_workers = workers.len();
        error!(
            "任务池未能终止: {} 个工作线程在 {:?} 内没有响应取消, 已中止",
            unfinished_workers, forced_timeout
        );
        workers.abort_all();
        self.advance_state(PoolState::Terminated);

        ShutdownOutcome::Abandoned { unfinished_workers }
    }

    fn discard_backlog(&self) -> usize {
        let mut discarded = 0;
        while let Ok(task) = self.backlog.try_recv() {
            debug!("丢弃任务 '{}' (批次 {})", task.label(), task.batch());
            self.stats.cancelled.fetch_add(1, Ordering::SeqCst);
            discarded += 1;
        }
        discarded
    }
}

impl<R> Drop for TaskScheduler<R>
where
    R: Send + Sync + 'static,
{
    fn drop(&mut self) {
        if !self.is_shutdown() {
            warn!("任务池未关闭即被释放, 取消所有工作线程");
        }
        self.sender.close();
        self.cancel.cancel();
    }
}

async fn drain(workers: &mut JoinSet<()>) {
    while let Some(result) = workers.join_next().await {
        if let Err(e) = result {
            if e.is_panic() {
                error!("工作线程异常退出: {}", e);
            }
        }
    }
}

async fn worker_loop<R>(
    worker_id: usize,
    receiver: async_channel::Receiver<BatchTask<R>>,
    handler: Arc<dyn ChunkHandler<R>>,
    cancel: CancellationToken,
    stats: Arc<StatsCounters>,
) where
    R: Send + Sync + 'static,
{
    debug!("工作线程 {} 已启动", worker_id);

    loop {
        let task = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!("工作线程 {} 收到取消信号", worker_id);
                break;
            }
            task = receiver.recv() => match task {
                Ok(task) => task,
                Err(_) => break,
            },
        };

        let outcome = RecordProcessor::new(task, Arc::clone(&handler))
            .run(&cancel)
            .await;
        stats.record(&outcome);

        if outcome == TaskOutcome::Cancelled && cancel.is_cancelled() {
            break;
        }
    }

    debug!("工作线程 {} 已退出", worker_id);
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct CountingHandler;

    #[async_trait]
    impl ChunkHandler<u32> for CountingHandler {
        fn name(&self) -> &str {
            "counting"
        }

        async fn handle(&self, task: &BatchTask<u32>, _cancel: &CancellationToken) -> RecordsResult<usize> {
            Ok(task.len())
        }
    }

    #[test]
    fn test_zero_pool_size_rejected() {
        let result = TaskScheduler::<u32>::new(0, Arc::new(CountingHandler));
        assert!(matches!(result, Err(RecordsError::Configuration(_))));
    }

    #[test]
    fn test_requires_runtime() {
        let result = TaskScheduler::<u32>::new(2, Arc::new(CountingHandler));
        assert!(matches!(result, Err(RecordsError::Configuration(_))));
    }

    #[test]
    fn test_pool_state_ordering() {
        assert!(PoolState::Running < PoolState::ShuttingDownGracefully);
        assert!(PoolState::ShutdownForced < PoolState::Terminated);
        assert_eq!(PoolState::from_u8(2), PoolState::ShutdownForced);
    }

    #[test]
    fn test_pending_count() {
        let stats = SchedulerStats {
            submitted: 5,
            completed: 2,
            failed: 1,
            cancelled: 1,
        };
        assert_eq!(stats.pending(), 1);
    }

    #[tokio::test]
    async fn test_state_transitions_on_graceful_shutdown() {
        let scheduler = TaskScheduler::<u32>::new(2, Arc::new(CountingHandler)).unwrap();
        assert_eq!(scheduler.state(), PoolState::Running);
        assert!(!scheduler.is_shutdown());

        let receipt = scheduler.dispatch(&[1, 2, 3, 4, 5]).unwrap();
        assert_eq!(receipt.batch, 1);
        assert_eq!(receipt.chunk_sizes, vec![2, 2, 1]);

        let outcome = scheduler
            .shutdown(Duration::from_secs(5), Duration::from_secs(1))
            .await;
        assert_eq!(outcome, ShutdownOutcome::Graceful);
        assert_eq!(scheduler.state(), PoolState::Terminated);
        assert_eq!(scheduler.stats().completed, 3);
        assert_eq!(scheduler.stats().pending(), 0);
    }
}
