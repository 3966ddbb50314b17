//! 报告输出模块
//!
//! 把 [`BatchReport`] 序列化为控制台表格、CSV或JSON。列顺序固定：
//! `clean_file`, `processed_file`, 然后是所选指标的列。失败的单元格写 `failed`。
//! 没有任何分数时返回 [`ReportOutcome::NoResults`]，不生成空表。

use super::batch_state::BatchStatsSnapshot;
use super::constants::report::{
    CLEAN_COLUMN, FAILED_MARKER, NO_RESULTS_MESSAGE, PROCESSED_COLUMN,
};
use super::processor::{BatchReport, PairReport};
use crate::error::{self, EvalResult};
use crate::metrics::{MetricColumn, MetricOutcome};
use chrono::Local;
use comfy_table::{Cell, CellAlignment, ContentArrangement, Table, presets::UTF8_FULL};
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// 报告格式
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ReportFormat {
    #[default]
    Text,
    Csv,
    Json,
}

impl FromStr for ReportFormat {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "txt" | "table" => Ok(ReportFormat::Text),
            "csv" => Ok(ReportFormat::Csv),
            "json" => Ok(ReportFormat::Json),
            _ => Err(format!("Unknown format: {s} (expected text|csv|json)")),
        }
    }
}

impl fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportFormat::Text => f.write_str("text"),
            ReportFormat::Csv => f.write_str("csv"),
            ReportFormat::Json => f.write_str("json"),
        }
    }
}

impl ReportFormat {
    /// 由输出文件扩展名推断格式
    pub fn from_path(path: &Path) -> Option<Self> {
        super::utils::extract_extension_lowercase(path).and_then(|ext| ext.parse().ok())
    }

    /// 显式格式优先，其次输出扩展名，默认文本
    pub fn resolve(explicit: Option<ReportFormat>, output: Option<&Path>) -> Self {
        explicit
            .or_else(|| output.and_then(Self::from_path))
            .unwrap_or_default()
    }
}

/// 报告输出结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportOutcome {
    /// 没有计算出任何分数
    NoResults,
    /// 输出到标准输出
    Printed,
    /// 写入文件
    Written(PathBuf),
}

/// 当前时间戳
pub fn timestamp() -> String {
    Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

/// 报告表头
pub fn header_row(report: &BatchReport) -> Vec<String> {
    [CLEAN_COLUMN, PROCESSED_COLUMN]
        .into_iter()
        .map(str::to_string)
        .chain(report.columns.iter().map(|c| c.header().to_string()))
        .collect()
}

/// 结构化输出的单元格（完整精度）
fn raw_cell(pair: &PairReport, column: MetricColumn) -> String {
    match pair.outcome(column) {
        Some(MetricOutcome::Scored(r)) => format_raw_score(r.score),
        Some(MetricOutcome::Failed(_)) | None => FAILED_MARKER.to_string(),
    }
}

/// 控制台单元格（按指标精度）
fn display_cell(pair: &PairReport, column: MetricColumn) -> String {
    match pair.outcome(column) {
        Some(MetricOutcome::Scored(r)) => column.format_score(r.score),
        Some(MetricOutcome::Failed(_)) | None => FAILED_MARKER.to_string(),
    }
}

fn format_raw_score(score: f64) -> String {
    if score.is_infinite() {
        if score > 0.0 { "inf" } else { "-inf" }.to_string()
    } else {
        score.to_string()
    }
}

// ==================== 文本 ====================

/// 渲染控制台/文本报告
pub fn render_text(report: &BatchReport, generated_at: &str) -> String {
    let mut output = String::new();

    output.push_str("=====================================\n");
    output.push_str("   Speech Metric Evaluation Report\n");
    output.push_str("   语音指标评估报告\n");
    output.push_str("=====================================\n");
    output.push_str(&format!("时间戳 / Timestamp: {generated_at}\n"));
    output.push_str(&format!(
        "指标 / Metrics: {}\n\n",
        report
            .metrics
            .iter()
            .map(|m| m.name())
            .collect::<Vec<_>>()
            .join(", ")
    ));

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(header_row(report));

    for pair in &report.pairs {
        let mut row = vec![
            Cell::new(&pair.clean_file),
            Cell::new(&pair.processed_file),
        ];
        row.extend(report.columns.iter().map(|&column| {
            Cell::new(display_cell(pair, column)).set_alignment(CellAlignment::Right)
        }));
        table.add_row(row);
    }

    output.push_str(&table.to_string());
    output.push('\n');
    output.push_str(&create_footer(&report.stats, report));
    output
}

/// 统计页脚
fn create_footer(stats: &BatchStatsSnapshot, report: &BatchReport) -> String {
    const VERSION: &str = env!("CARGO_PKG_VERSION");
    let mut output = String::new();

    output.push('\n');
    output.push_str("=====================================\n");
    output.push_str("批量处理统计 / Batch statistics:\n");
    output.push_str(&format!("   文件对总数 / Total pairs: {}\n", stats.total()));
    output.push_str(&format!("   全部成功 / Succeeded: {}\n", stats.processed));
    output.push_str(&format!("   存在失败 / With failures: {}\n", stats.failed));

    if !stats.error_stats.is_empty() {
        output.push_str("   失败分类 / Failures by category:\n");
        for (category, entries) in &stats.error_stats {
            output.push_str(&format!(
                "      {}: {}\n",
                category.display_name(),
                entries.len()
            ));
            for entry in entries {
                output.push_str(&format!("         {entry}\n"));
            }
        }
    }

    for diagnostic in &report.diagnostics {
        output.push_str(&format!("[WARNING] {diagnostic}\n"));
    }

    output.push('\n');
    output.push_str(&format!("生成工具 / Generated by: speech-eval-tool v{VERSION}\n"));
    output
}

// ==================== CSV ====================

/// 渲染CSV（表头 + 每个文件对一行）
pub fn render_csv(report: &BatchReport) -> EvalResult<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer
        .write_record(header_row(report))
        .map_err(|e| error::format_error("CSV写入失败", e))?;

    for pair in &report.pairs {
        let mut record = vec![pair.clean_file.clone(), pair.processed_file.clone()];
        record.extend(report.columns.iter().map(|&c| raw_cell(pair, c)));
        writer
            .write_record(&record)
            .map_err(|e| error::format_error("CSV写入失败", e))?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| error::format_error("CSV写入失败", e))?;
    String::from_utf8(bytes).map_err(|e| error::format_error("CSV编码失败", e))
}

// ==================== JSON ====================

#[derive(Serialize)]
struct JsonReport<'a> {
    generated_at: &'a str,
    columns: Vec<String>,
    metrics: Vec<JsonColumn>,
    pairs: Vec<Map<String, Value>>,
    summary: JsonSummary,
}

/// 指标列的身份：列名、指标名与变体
#[derive(Serialize)]
struct JsonColumn {
    column: &'static str,
    metric: &'static str,
    variant: Option<&'static str>,
}

#[derive(Serialize)]
struct JsonSummary {
    total: usize,
    succeeded: usize,
    with_failures: usize,
    failures_by_category: Map<String, Value>,
    diagnostics: Vec<String>,
}

fn json_cell(pair: &PairReport, column: MetricColumn) -> Value {
    match pair.outcome(column) {
        Some(MetricOutcome::Scored(r)) => serde_json::Number::from_f64(r.score)
            .map(Value::Number)
            .unwrap_or_else(|| Value::String(format_raw_score(r.score))),
        Some(MetricOutcome::Failed(_)) | None => Value::String(FAILED_MARKER.to_string()),
    }
}

/// 渲染JSON（每个文件对一个对象，无穷分数写作字符串）
pub fn render_json(report: &BatchReport, generated_at: &str) -> EvalResult<String> {
    let pairs = report
        .pairs
        .iter()
        .map(|pair| {
            let mut object = Map::new();
            object.insert(CLEAN_COLUMN.to_string(), Value::from(pair.clean_file.as_str()));
            object.insert(
                PROCESSED_COLUMN.to_string(),
                Value::from(pair.processed_file.as_str()),
            );
            for &column in &report.columns {
                object.insert(column.header().to_string(), json_cell(pair, column));
            }
            object
        })
        .collect();

    let failures_by_category = report
        .stats
        .error_stats
        .iter()
        .map(|(category, entries)| {
            (
                category.display_name().to_string(),
                Value::from(entries.clone()),
            )
        })
        .collect();

    let json = JsonReport {
        generated_at,
        columns: header_row(report),
        metrics: report
            .columns
            .iter()
            .map(|c| JsonColumn {
                column: c.header(),
                metric: c.name(),
                variant: c.variant(),
            })
            .collect(),
        pairs,
        summary: JsonSummary {
            total: report.stats.total(),
            succeeded: report.stats.processed,
            with_failures: report.stats.failed,
            failures_by_category,
            diagnostics: report.diagnostics.iter().map(|d| d.to_string()).collect(),
        },
    };

    serde_json::to_string_pretty(&json).map_err(|e| error::format_error("JSON序列化失败", e))
}

// ==================== 输出 ====================

/// 按格式渲染
pub fn render(report: &BatchReport, format: ReportFormat) -> EvalResult<String> {
    let generated_at = timestamp();
    match format {
        ReportFormat::Text => Ok(render_text(report, &generated_at)),
        ReportFormat::Csv => render_csv(report),
        ReportFormat::Json => render_json(report, &generated_at),
    }
}

/// 输出报告：指定路径时写文件，否则打印到标准输出
pub fn emit_report(
    report: &BatchReport,
    format: ReportFormat,
    output: Option<&Path>,
) -> EvalResult<ReportOutcome> {
    if !report.has_any_score() {
        println!("{NO_RESULTS_MESSAGE}");
        return Ok(ReportOutcome::NoResults);
    }

    let content = render(report, format)?;

    match output {
        Some(path) => {
            std::fs::write(path, content)?;
            println!("[OK] 报告已保存 / Report saved to {}", path.display());
            Ok(ReportOutcome::Written(path.to_path_buf()))
        }
        None => {
            println!("{content}");
            Ok(ReportOutcome::Printed)
        }
    }
}
