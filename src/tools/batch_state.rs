//! 批处理状态管理模块
//!
//! 提供统一的批处理统计管理，支持串行和并行两种模式。
//! 一个文件对只要有任一指标失败即计为失败，失败原因按 [`ErrorCategory`] 分组。

use crate::error::ErrorCategory;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// 批处理统计快照
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchStatsSnapshot {
    /// 全部指标成功的文件对数
    pub processed: usize,
    /// 至少一个指标失败的文件对数
    pub failed: usize,
    /// 错误分类统计（错误类型 -> 失败条目），按类别排序保证输出稳定
    pub error_stats: BTreeMap<ErrorCategory, Vec<String>>,
}

impl BatchStatsSnapshot {
    pub fn total(&self) -> usize {
        self.processed + self.failed
    }
}

/// 串行批处理统计（单线程）
#[derive(Debug, Default)]
pub struct SerialBatchStats {
    processed: usize,
    failed: usize,
    error_stats: BTreeMap<ErrorCategory, Vec<String>>,
}

impl SerialBatchStats {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn inc_processed(&mut self) -> usize {
        self.processed += 1;
        self.processed
    }

    /// 记录一个失败的文件对及其所有失败条目
    pub fn inc_failed(&mut self, failures: Vec<(ErrorCategory, String)>) -> usize {
        self.failed += 1;
        for (category, entry) in failures {
            self.error_stats.entry(category).or_default().push(entry);
        }
        self.failed
    }

    pub fn snapshot(&self) -> BatchStatsSnapshot {
        BatchStatsSnapshot {
            processed: self.processed,
            failed: self.failed,
            error_stats: self.error_stats.clone(),
        }
    }
}

/// 并行批处理统计（多线程安全）
///
/// 使用原子类型和锁，克隆后共享同一份状态
#[derive(Debug, Clone, Default)]
pub struct ParallelBatchStats {
    processed: Arc<AtomicUsize>,
    failed: Arc<AtomicUsize>,
    error_stats: Arc<Mutex<BTreeMap<ErrorCategory, Vec<String>>>>,
}

impl ParallelBatchStats {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn inc_processed(&self) -> usize {
        self.processed.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn inc_failed(&self, failures: Vec<(ErrorCategory, String)>) -> usize {
        let count = self.failed.fetch_add(1, Ordering::Relaxed) + 1;

        // 锁中毒时丢弃分类明细，计数仍然有效
        if let Ok(mut stats) = self.error_stats.lock() {
            for (category, entry) in failures {
                stats.entry(category).or_default().push(entry);
            }
        }

        count
    }

    pub fn snapshot(&self) -> BatchStatsSnapshot {
        BatchStatsSnapshot {
            processed: self.processed.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            error_stats: self
                .error_stats
                .lock()
                .map(|stats| stats.clone())
                .unwrap_or_default(),
        }
    }
}
