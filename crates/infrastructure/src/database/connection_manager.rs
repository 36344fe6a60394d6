//! 单连接事务管理
//!
//! 整个应用只持有一条物理连接。每次 `acquire` 都会拿到互斥锁并开启显式事务，
//! 锁随 [`TransactionScope`] 一起释放，因此并发调用方的 获取-执行-提交/回滚 周期严格串行。

use std::str::FromStr;
use std::time::Duration;

use futures::future::BoxFuture;
use records_core::{DatabaseConfig, RecordsError, RecordsResult};
use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection};
use sqlx::{ConnectOptions, Connection};
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Uninitialized,
    Open,
    Closed,
}

/// 连接和事务计数，用于诊断和测试
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransactionStats {
    pub connections_opened: u64,
    pub transactions_begun: u64,
    pub commits: u64,
    pub rollbacks: u64,
    /// 被遗弃的事务在下一次获取时回滚的次数
    pub recovered: u64,
}

struct ConnectionSlot {
    connection: Option<SqliteConnection>,
    state: ConnectionState,
    needs_rollback: bool,
    stats: TransactionStats,
}

pub struct ConnectionManager {
    options: SqliteConnectOptions,
    slot: Mutex<ConnectionSlot>,
}

impl ConnectionManager {
    /// 只构建连接参数，第一次 `acquire` 时才真正建立连接
    pub fn new(config: &DatabaseConfig) -> RecordsResult<Self> {
        let options = SqliteConnectOptions::from_str(&config.url)
            .map_err(|e| RecordsError::connection(format!("解析数据库地址失败: {}", config.url), e))?
            .create_if_missing(config.create_if_missing)
            .foreign_keys(true)
            .busy_timeout(Duration::from_secs(config.busy_timeout_seconds));

        Ok(Self {
            options,
            slot: Mutex::new(ConnectionSlot {
                connection: None,
                state: ConnectionState::Uninitialized,
                needs_rollback: false,
                stats: TransactionStats::default(),
            }),
        })
    }

    pub fn from_url(url: &str) -> RecordsResult<Self> {
        Self::new(&DatabaseConfig {
            url: url.to_string(),
            ..DatabaseConfig::default()
        })
    }

    /// 获取共享连接并开启事务
    ///
    /// 返回的作用域持有互斥锁，调用方必须以 `commit` 或 `rollback` 结束它。
    pub async fn acquire(&self) -> RecordsResult<TransactionScope<'_>> {
        let mut slot = self.slot.lock().await;

        if slot.connection.is_none() {
            let connection = self
                .options
                .connect()
                .await
                .map_err(|e| RecordsError::connection("建立数据库连接失败", e))?;
            slot.connection = Some(connection);
            slot.state = ConnectionState::Open;
            slot.needs_rollback = false;
            slot.stats.connections_opened += 1;
            info!("数据库连接已建立");
        }

        if slot.needs_rollback {
            let connection = slot
                .connection
                .as_mut()
                .ok_or(RecordsError::ConnectionClosed)?;
            match sqlx::query("ROLLBACK").execute(&mut *connection).await {
                Ok(_) => info!("已回滚上一个未完成的事务"),
                Err(e) => warn!("回滚遗留事务失败: {}", e),
            }
            slot.needs_rollback = false;
            slot.stats.recovered += 1;
        }

        let inner = &mut *slot;
        let connection = inner
            .connection
            .as_mut()
            .ok_or(RecordsError::ConnectionClosed)?;
        // BEGIN 执行后、作用域建立前被中止时，由下一次获取回滚
        inner.needs_rollback = true;
        let begun = sqlx::query("BEGIN").execute(&mut *connection).await;
        inner.needs_rollback = false;
        begun.map_err(|e| RecordsError::connection("开启事务失败", e))?;
        slot.stats.transactions_begun += 1;

        Ok(TransactionScope {
            slot,
            resolved: false,
        })
    }

    /// 在一个事务中执行 `f`：成功提交，失败回滚后返回原错误
    pub async fn transaction<T, F>(&self, operation: &str, f: F) -> RecordsResult<T>
    where
        F: for<'c> FnOnce(&'c mut SqliteConnection) -> BoxFuture<'c, RecordsResult<T>>,
    {
        let mut scope = self.acquire().await?;

        let result = match scope.connection() {
            Ok(connection) => f(connection).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(value) => {
                scope.commit().await?;
                debug!("{} 事务已提交", operation);
                Ok(value)
            }
            Err(e) => {
                if let Err(rollback_error) = scope.rollback().await {
                    error!("{} 回滚失败: {}", operation, rollback_error);
                }
                if e.is_not_found() {
                    debug!("{} 已回滚: {}", operation, e);
                } else {
                    warn!("{} 失败，事务已回滚: {}", operation, e);
                }
                Err(e)
            }
        }
    }

    /// 关闭连接；关闭失败只记录日志
    pub async fn close(&self) {
        let mut slot = self.slot.lock().await;
        if let Some(connection) = slot.connection.take() {
            match connection.close().await {
                Ok(()) => info!("数据库连接已关闭"),
                Err(e) => warn!("关闭数据库连接失败: {}", e),
            }
            slot.state = ConnectionState::Closed;
        }
        slot.needs_rollback = false;
    }

    pub async fn state(&self) -> ConnectionState {
        self.slot.lock().await.state
    }

    pub async fn stats(&self) -> TransactionStats {
        self.slot.lock().await.stats
    }
}

/// 一次事务的作用域，持有共享连接的互斥锁
///
/// 未提交也未回滚就被丢弃时（例如所在任务被中止），连接会被标记，
/// 下一次 `acquire` 先回滚这个遗留事务。
pub struct TransactionScope<'a> {
    slot: MutexGuard<'a, ConnectionSlot>,
    resolved: bool,
}

impl TransactionScope<'_> {
    pub fn connection(&mut self) -> RecordsResult<&mut SqliteConnection> {
        self.slot
            .connection
            .as_mut()
            .ok_or(RecordsError::ConnectionClosed)
    }

    /// 提交失败时立即尝试回滚，仍失败则留给下一次获取处理
    pub async fn commit(mut self) -> RecordsResult<()> {
        let result = self.execute_resolution("COMMIT").await;
        if result.is_err() {
            if self.execute_resolution("ROLLBACK").await.is_ok() {
                self.slot.stats.rollbacks += 1;
            } else {
                self.slot.needs_rollback = true;
            }
        } else {
            self.slot.stats.commits += 1;
        }
        self.resolved = true;
        result.map_err(|e| RecordsError::connection("提交事务失败", e))
    }

    pub async fn rollback(mut self) -> RecordsResult<()> {
        let result = self.execute_resolution("ROLLBACK").await;
        match &result {
            Ok(()) => self.slot.stats.rollbacks += 1,
            Err(_) => self.slot.needs_rollback = true,
        }
        self.resolved = true;
        result.map_err(|e| RecordsError::connection("回滚事务失败", e))
    }

    /// 没有打开的连接时什么也不做
    async fn execute_resolution(&mut self, statement: &'static str) -> Result<(), sqlx::Error> {
        match self.slot.connection.as_mut() {
            Some(connection) => sqlx::query(statement)
                .execute(&mut *connection)
                .await
                .map(|_| ()),
            None => Ok(()),
        }
    }
}

impl Drop for TransactionScope<'_> {
    fn drop(&mut self) {
        if !self.resolved {
            self.slot.needs_rollback = true;
            warn!("事务作用域未提交也未回滚即被释放，将在下次获取连接时回滚");
        }
    }
}
