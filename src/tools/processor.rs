//! 文件对处理模块
//!
//! 每个文件对只加载一次波形，然后依次计算所选指标。任何失败都记录在该文件对的结果中，
//! 不会中止批处理。

use super::batch_state::{BatchStatsSnapshot, SerialBatchStats};
use super::pairing::{PairingDiagnostic, PairingPlan, PairingRecord};
use crate::error::{ErrorCategory, EvalResult, MetricError};
use crate::metrics::{
    MetricColumn, MetricEvaluator, MetricFailure, MetricKind, MetricOutcome, MetricResult,
    columns_for,
};

/// 批处理选项
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchOptions {
    /// 所选指标（固定顺序）
    pub metrics: Vec<MetricKind>,
    pub verbose: bool,
}

/// 一个文件对的全部指标结果
#[derive(Debug, Clone, PartialEq)]
pub struct PairReport {
    /// 配对序号
    pub index: usize,
    pub clean_file: String,
    pub processed_file: String,
    /// 按列顺序排列
    pub outcomes: Vec<MetricOutcome>,
}

impl PairReport {
    pub fn outcome(&self, column: MetricColumn) -> Option<&MetricOutcome> {
        self.outcomes.iter().find(|o| o.column() == column)
    }

    pub fn failures(&self) -> impl Iterator<Item = &MetricFailure> {
        self.outcomes.iter().filter_map(|o| match o {
            MetricOutcome::Failed(f) => Some(f),
            MetricOutcome::Scored(_) => None,
        })
    }

    pub fn has_failures(&self) -> bool {
        self.outcomes.iter().any(MetricOutcome::is_failure)
    }

    pub fn scored_count(&self) -> usize {
        self.outcomes.iter().filter(|o| !o.is_failure()).count()
    }

    /// 失败条目（用于统计，每个指标一条，STOI/ESTOI等多列指标只记一次）
    pub fn failure_entries(&self) -> Vec<(ErrorCategory, String)> {
        let mut entries: Vec<(ErrorCategory, String)> = Vec::new();
        let mut seen = Vec::new();
        for failure in self.failures() {
            let kind = failure.column.kind();
            if seen.contains(&kind) {
                continue;
            }
            seen.push(kind);
            entries.push((
                failure.category,
                format!(
                    "{} vs {} [{}]",
                    self.clean_file,
                    self.processed_file,
                    kind.name()
                ),
            ));
        }
        entries
    }
}

/// 整个批处理的结果
#[derive(Debug, Clone, PartialEq)]
pub struct BatchReport {
    pub metrics: Vec<MetricKind>,
    pub columns: Vec<MetricColumn>,
    /// 按配对序号排列
    pub pairs: Vec<PairReport>,
    pub stats: BatchStatsSnapshot,
    pub diagnostics: Vec<PairingDiagnostic>,
}

impl BatchReport {
    /// 是否至少有一个分数
    pub fn has_any_score(&self) -> bool {
        self.results().next().is_some()
    }

    /// 所有成功的分数，按文件对与列顺序
    pub fn results(&self) -> impl Iterator<Item = &MetricResult> {
        self.pairs
            .iter()
            .flat_map(|p| p.outcomes.iter())
            .filter_map(|o| match o {
                MetricOutcome::Scored(r) => Some(r),
                MetricOutcome::Failed(_) => None,
            })
    }
}

/// 评估一个文件对
///
/// 每个波形只加载一次。只有选中了需要参考信号的指标时才加载clean文件；
/// 加载失败只记在依赖该文件的指标上（processed失败影响全部指标，
/// clean失败不影响DNSMOS）。
pub fn evaluate_pair(
    evaluator: &MetricEvaluator,
    record: &PairingRecord,
    metrics: &[MetricKind],
) -> PairReport {
    let clean_file = record.clean_name();
    let processed_file = record.processed_name();
    let mut outcomes = Vec::new();

    let processed = evaluator.load(&record.processed);
    let clean = metrics
        .iter()
        .any(MetricKind::needs_reference)
        .then(|| evaluator.load(&record.clean));

    for (path, loaded) in [
        (&processed_file, Some(&processed)),
        (&clean_file, clean.as_ref()),
    ] {
        if let Some(Err(e)) = loaded {
            tracing::warn!(file = %path, "failed to load audio: {e}");
        }
    }

    for &kind in metrics {
        let evaluated = match (&processed, clean.as_ref()) {
            (Err(e), _) => {
                push_failures(&mut outcomes, kind, &clean_file, &processed_file, e);
                continue;
            }
            (Ok(_), Some(Err(e))) if kind.needs_reference() => {
                push_failures(&mut outcomes, kind, &clean_file, &processed_file, e);
                continue;
            }
            (Ok(processed), clean) => {
                evaluator.evaluate(kind, clean.and_then(|c| c.as_ref().ok()), processed)
            }
        };

        match evaluated {
            Ok(scores) => {
                outcomes.extend(scores.into_iter().map(|(column, score)| {
                    MetricOutcome::Scored(MetricResult {
                        column,
                        score,
                        clean_file: clean_file.clone(),
                        processed_file: processed_file.clone(),
                    })
                }));
            }
            Err(e) => {
                tracing::warn!(
                    metric = kind.name(),
                    clean = %clean_file,
                    processed = %processed_file,
                    "metric failed: {e}"
                );
                push_failures(&mut outcomes, kind, &clean_file, &processed_file, &e);
            }
        }
    }

    PairReport {
        index: record.index,
        clean_file,
        processed_file,
        outcomes,
    }
}

fn push_failures(
    outcomes: &mut Vec<MetricOutcome>,
    kind: MetricKind,
    clean_file: &str,
    processed_file: &str,
    error: &MetricError,
) {
    outcomes.extend(kind.columns().iter().map(|&column| {
        MetricOutcome::Failed(MetricFailure::from_error(
            column,
            clean_file,
            processed_file,
            error,
        ))
    }));
}

/// 控制台输出单个文件对的结果
pub fn print_pair_result(report: &PairReport, total: usize, verbose: bool) {
    let scores: Vec<String> = report
        .outcomes
        .iter()
        .filter_map(|o| match o {
            MetricOutcome::Scored(r) => {
                Some(format!("{}: {}", r.column, r.column.format_score(r.score)))
            }
            MetricOutcome::Failed(_) => None,
        })
        .collect();

    if !scores.is_empty() {
        println!("   • {}", scores.join(", "));
    }

    if !report.has_failures() {
        if verbose {
            println!("   [OK] 处理成功 / Processing succeeded");
        }
        return;
    }

    let mut reported = Vec::new();
    for failure in report.failures() {
        let kind = failure.column.kind();
        if reported.contains(&kind) {
            continue;
        }
        reported.push(kind);
        println!(
            "[FAIL] [{}/{}] {} vs {} - {} [{}] {}",
            report.index + 1,
            total,
            report.clean_file,
            report.processed_file,
            kind.name(),
            failure.category.display_name(),
            failure.message
        );
    }
}

/// 把一个文件对计入统计
pub(crate) fn record_pair_stats(report: &PairReport, stats: &mut SerialBatchStats) {
    if report.has_failures() {
        stats.inc_failed(report.failure_entries());
    } else {
        stats.inc_processed();
    }
}

/// 串行批处理
pub fn run_batch_serial(
    evaluator: &MetricEvaluator,
    plan: &PairingPlan,
    options: &BatchOptions,
) -> BatchReport {
    let total = plan.pairs.len();
    let mut stats = SerialBatchStats::new();
    let mut pairs = Vec::with_capacity(total);

    for record in &plan.pairs {
        println!(
            "[PROCESSING] [{}/{}] {} vs {}",
            record.index + 1,
            total,
            record.clean_name(),
            record.processed_name()
        );

        let report = evaluate_pair(evaluator, record, &options.metrics);
        print_pair_result(&report, total, options.verbose);
        record_pair_stats(&report, &mut stats);
        pairs.push(report);
    }

    BatchReport {
        metrics: options.metrics.clone(),
        columns: columns_for(&options.metrics),
        pairs,
        stats: stats.snapshot(),
        diagnostics: plan.diagnostics.clone(),
    }
}

/// 批处理入口：并发度大于1时尝试并行，线程池不可用时回退串行
pub fn run_batch(
    evaluator: &MetricEvaluator,
    plan: &PairingPlan,
    options: &BatchOptions,
    parallel_files: Option<usize>,
) -> EvalResult<BatchReport> {
    let degree = parallel_files
        .map(|d| super::utils::effective_parallel_degree(d, Some(plan.pairs.len())))
        .unwrap_or(1);

    if degree <= 1 {
        return Ok(run_batch_serial(evaluator, plan, options));
    }

    match super::parallel_processor::run_batch_parallel(evaluator, plan, options, degree) {
        Ok(report) => Ok(report),
        Err(e) => {
            eprintln!(
                "[WARNING] 并行处理失败 / Parallel processing failed: {e}，回退到串行模式 / fallback to serial"
            );
            Ok(run_batch_serial(evaluator, plan, options))
        }
    }
}
