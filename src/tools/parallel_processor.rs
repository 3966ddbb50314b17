//! 多文件对并行处理模块
//!
//! 使用rayon实现文件对级并行处理，结果按配对序号重新排序，报告顺序与串行模式一致。

use super::batch_state::ParallelBatchStats;
use super::pairing::PairingPlan;
use super::processor::{BatchOptions, BatchReport, PairReport, evaluate_pair, print_pair_result};
use crate::error::{EvalResult, MetricError};
use crate::metrics::{MetricEvaluator, columns_for};
use rayon::prelude::*;
use std::io::Write;

/// 多文件对并行处理
///
/// - 使用rayon线程池精确控制并发度
/// - 线程安全的统计信息收集
/// - 索引排序保证输出顺序
///
/// 线程池创建失败时返回 `ResourceError`，由调用方决定是否降级串行。
pub fn run_batch_parallel(
    evaluator: &MetricEvaluator,
    plan: &PairingPlan,
    options: &BatchOptions,
    parallel_degree: usize,
) -> EvalResult<BatchReport> {
    println!("[INFO] 启用多文件并行处理 / Parallel processing: {parallel_degree} 并发度");

    let stats = ParallelBatchStats::new();
    let total = plan.pairs.len();

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(parallel_degree)
        .thread_name(|i| format!("eval-worker-{i}"))
        .build()
        .map_err(|e| MetricError::ResourceError(format!("线程池创建失败: {e}")))?;

    let mut pairs: Vec<PairReport> = pool.install(|| {
        plan.pairs
            .par_iter()
            .map(|record| {
                let report = evaluate_pair(evaluator, record, &options.metrics);

                if report.has_failures() {
                    stats.inc_failed(report.failure_entries());
                } else {
                    stats.inc_processed();
                }

                // 逐对详情只在verbose下打印，否则只打进度点
                if options.verbose {
                    println!(
                        "[PROCESSING] [{}/{}] {} vs {}",
                        report.index + 1,
                        total,
                        report.clean_file,
                        report.processed_file
                    );
                    print_pair_result(&report, total, true);
                } else {
                    print!(".");
                    std::io::stdout().flush().ok();
                }

                report
            })
            .collect()
    });

    if !options.verbose {
        println!();
    }

    // 按原始配对顺序排序结果
    pairs.sort_by_key(|r| r.index);

    Ok(BatchReport {
        metrics: options.metrics.clone(),
        columns: columns_for(&options.metrics),
        pairs,
        stats: stats.snapshot(),
        diagnostics: plan.diagnostics.clone(),
    })
}
