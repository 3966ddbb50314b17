//! 指标标识与结果记录
//!
//! `MetricKind` 是用户选择的指标（STOI会同时产出STOI与ESTOI），
//! `MetricColumn` 是报告中的一列，列顺序固定：
//! STOI, ESTOI, PESQ, SI-SDR, DNSMOS_P808, DNSMOS_SIG, DNSMOS_BAK, DNSMOS_OVR。

pub mod facade;

pub use facade::{
    EvaluationConfig, MetricEvaluator, compute_dnsmos, compute_pesq, compute_si_sdr, compute_stoi,
};

use crate::error::{ErrorCategory, MetricError};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// 可选择的指标
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum MetricKind {
    Stoi,
    Pesq,
    SiSdr,
    Dnsmos,
}

impl MetricKind {
    pub const ALL: [MetricKind; 4] = [
        MetricKind::Stoi,
        MetricKind::Pesq,
        MetricKind::SiSdr,
        MetricKind::Dnsmos,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            MetricKind::Stoi => "STOI",
            MetricKind::Pesq => "PESQ",
            MetricKind::SiSdr => "SI-SDR",
            MetricKind::Dnsmos => "DNSMOS",
        }
    }

    /// 该指标在报告中占用的列
    pub fn columns(&self) -> &'static [MetricColumn] {
        match self {
            MetricKind::Stoi => &[MetricColumn::Stoi, MetricColumn::Estoi],
            MetricKind::Pesq => &[MetricColumn::Pesq],
            MetricKind::SiSdr => &[MetricColumn::SiSdr],
            MetricKind::Dnsmos => &[
                MetricColumn::DnsmosP808,
                MetricColumn::DnsmosSig,
                MetricColumn::DnsmosBak,
                MetricColumn::DnsmosOvr,
            ],
        }
    }

    /// 是否需要参考（clean）信号
    pub fn needs_reference(&self) -> bool {
        !matches!(self, MetricKind::Dnsmos)
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for MetricKind {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "stoi" | "estoi" => Ok(MetricKind::Stoi),
            "pesq" => Ok(MetricKind::Pesq),
            "si-sdr" | "si_sdr" | "sisdr" => Ok(MetricKind::SiSdr),
            "dnsmos" => Ok(MetricKind::Dnsmos),
            other => Err(format!(
                "Unknown metric: {other} (expected stoi, pesq, si-sdr, dnsmos)"
            )),
        }
    }
}

/// 指标去重并按固定顺序排列
pub fn normalize_metric_list(mut kinds: Vec<MetricKind>) -> Vec<MetricKind> {
    kinds.sort();
    kinds.dedup();
    kinds
}

/// 报告中的一列
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum MetricColumn {
    Stoi,
    Estoi,
    Pesq,
    SiSdr,
    DnsmosP808,
    DnsmosSig,
    DnsmosBak,
    DnsmosOvr,
}

impl MetricColumn {
    pub const ALL: [MetricColumn; 8] = [
        MetricColumn::Stoi,
        MetricColumn::Estoi,
        MetricColumn::Pesq,
        MetricColumn::SiSdr,
        MetricColumn::DnsmosP808,
        MetricColumn::DnsmosSig,
        MetricColumn::DnsmosBak,
        MetricColumn::DnsmosOvr,
    ];

    /// 表头
    pub fn header(&self) -> &'static str {
        match self {
            MetricColumn::Stoi => "STOI",
            MetricColumn::Estoi => "ESTOI",
            MetricColumn::Pesq => "PESQ",
            MetricColumn::SiSdr => "SI-SDR",
            MetricColumn::DnsmosP808 => "DNSMOS_P808",
            MetricColumn::DnsmosSig => "DNSMOS_SIG",
            MetricColumn::DnsmosBak => "DNSMOS_BAK",
            MetricColumn::DnsmosOvr => "DNSMOS_OVR",
        }
    }

    /// 指标名（不含变体）
    pub fn name(&self) -> &'static str {
        self.kind().name()
    }

    /// 变体名（ESTOI、DNSMOS子分数）
    pub fn variant(&self) -> Option<&'static str> {
        match self {
            MetricColumn::Estoi => Some("ESTOI"),
            MetricColumn::DnsmosP808 => Some("P808"),
            MetricColumn::DnsmosSig => Some("SIG"),
            MetricColumn::DnsmosBak => Some("BAK"),
            MetricColumn::DnsmosOvr => Some("OVR"),
            MetricColumn::Stoi | MetricColumn::Pesq | MetricColumn::SiSdr => None,
        }
    }

    pub fn kind(&self) -> MetricKind {
        match self {
            MetricColumn::Stoi | MetricColumn::Estoi => MetricKind::Stoi,
            MetricColumn::Pesq => MetricKind::Pesq,
            MetricColumn::SiSdr => MetricKind::SiSdr,
            MetricColumn::DnsmosP808
            | MetricColumn::DnsmosSig
            | MetricColumn::DnsmosBak
            | MetricColumn::DnsmosOvr => MetricKind::Dnsmos,
        }
    }

    /// 控制台显示精度
    pub fn format_score(&self, score: f64) -> String {
        if score.is_infinite() {
            return if score > 0.0 { "inf" } else { "-inf" }.to_string();
        }
        match self {
            MetricColumn::Pesq => format!("{score:.2}"),
            MetricColumn::SiSdr => format!("{score:.3} dB"),
            _ => format!("{score:.3}"),
        }
    }
}

impl fmt::Display for MetricColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.header())
    }
}

/// 所选指标对应的列（固定顺序）
pub fn columns_for(kinds: &[MetricKind]) -> Vec<MetricColumn> {
    MetricColumn::ALL
        .into_iter()
        .filter(|c| kinds.contains(&c.kind()))
        .collect()
}

/// 单个成功的指标分数
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricResult {
    pub column: MetricColumn,
    pub score: f64,
    pub clean_file: String,
    pub processed_file: String,
}

/// 单个失败的指标计算
#[derive(Debug, Clone, PartialEq)]
pub struct MetricFailure {
    pub column: MetricColumn,
    pub clean_file: String,
    pub processed_file: String,
    pub category: ErrorCategory,
    pub message: String,
}

impl MetricFailure {
    pub fn from_error(
        column: MetricColumn,
        clean_file: &str,
        processed_file: &str,
        error: &MetricError,
    ) -> Self {
        Self {
            column,
            clean_file: clean_file.to_string(),
            processed_file: processed_file.to_string(),
            category: ErrorCategory::from_metric_error(error),
            message: error.to_string(),
        }
    }
}

/// 每个（文件对, 列）一个结果
#[derive(Debug, Clone, PartialEq)]
pub enum MetricOutcome {
    Scored(MetricResult),
    Failed(MetricFailure),
}

impl MetricOutcome {
    pub fn column(&self) -> MetricColumn {
        match self {
            MetricOutcome::Scored(r) => r.column,
            MetricOutcome::Failed(f) => f.column,
        }
    }

    pub fn score(&self) -> Option<f64> {
        match self {
            MetricOutcome::Scored(r) => Some(r.score),
            MetricOutcome::Failed(_) => None,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, MetricOutcome::Failed(_))
    }
}
