//! 记录切分
//!
//! 块大小只由记录数和池大小决定：`max(1, len / pool_size)`，最后一块可能更短。
//! 块数可能超过池大小，多出来的任务在队列中等待。

use std::sync::Arc;

pub fn chunk_size(len: usize, pool_size: usize) -> usize {
    (len / pool_size.max(1)).max(1)
}

/// 按顺序切成互不重叠的连续块，每块持有自己的记录副本
pub fn partition<R: Clone>(records: &[R], pool_size: usize) -> Vec<Arc<[R]>> {
    if records.is_empty() {
        return Vec::new();
    }

    let size = chunk_size(records.len(), pool_size);
    records.chunks(size).map(Arc::from).collect()
}
