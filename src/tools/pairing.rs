//! 文件配对
//!
//! 两种策略：
//! - 按位置（默认）：第i个排序后的clean文件对应第i个processed文件，多余的文件丢弃并给出数量不符诊断。
//! - 按文件名：每个clean文件寻找同名processed文件，找不到时给出单文件警告，不中止批处理。

use super::utils;
use std::collections::HashMap;
use std::ffi::OsStr;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// 配对策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PairingMode {
    #[default]
    Positional,
    ByName,
}

impl FromStr for PairingMode {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "positional" | "order" => Ok(PairingMode::Positional),
            "by-name" | "by_name" | "name" => Ok(PairingMode::ByName),
            _ => Err(format!(
                "Unknown pairing mode: {s} (expected positional|by-name)"
            )),
        }
    }
}

impl fmt::Display for PairingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PairingMode::Positional => f.write_str("positional"),
            PairingMode::ByName => f.write_str("by-name"),
        }
    }
}

/// 一个clean文件与一个processed文件的对应关系
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairingRecord {
    /// 配对序号（报告顺序）
    pub index: usize,
    pub clean: PathBuf,
    pub processed: PathBuf,
}

impl PairingRecord {
    pub fn clean_name(&self) -> String {
        utils::extract_filename_lossy(&self.clean)
    }

    pub fn processed_name(&self) -> String {
        utils::extract_filename_lossy(&self.processed)
    }
}

/// 配对诊断信息
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PairingDiagnostic {
    /// 按位置配对时两个目录的文件数不同
    CountMismatch {
        clean: usize,
        processed: usize,
        dropped: usize,
    },
    /// 按文件名配对时缺少同名processed文件
    MissingCounterpart { clean: String },
}

impl fmt::Display for PairingDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PairingDiagnostic::CountMismatch {
                clean,
                processed,
                dropped,
            } => write!(
                f,
                "文件数不一致 / file count mismatch: clean={clean}, processed={processed}; \
                 {dropped} 个文件未配对 / unpaired files dropped"
            ),
            PairingDiagnostic::MissingCounterpart { clean } => write!(
                f,
                "找不到同名处理文件 / processed file not found for {clean}"
            ),
        }
    }
}

/// 一次运行的配对结果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PairingPlan {
    pub pairs: Vec<PairingRecord>,
    pub diagnostics: Vec<PairingDiagnostic>,
}

impl PairingPlan {
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

/// 按策略配对（输入应已排序）
pub fn pair_files(clean: &[PathBuf], processed: &[PathBuf], mode: PairingMode) -> PairingPlan {
    let plan = match mode {
        PairingMode::Positional => pair_positional(clean, processed),
        PairingMode::ByName => pair_by_name(clean, processed),
    };

    for diagnostic in &plan.diagnostics {
        tracing::warn!(%mode, "{diagnostic}");
    }

    plan
}

fn pair_positional(clean: &[PathBuf], processed: &[PathBuf]) -> PairingPlan {
    let pairs = clean
        .iter()
        .zip(processed)
        .enumerate()
        .map(|(index, (c, p))| PairingRecord {
            index,
            clean: c.clone(),
            processed: p.clone(),
        })
        .collect();

    let mut diagnostics = Vec::new();
    if clean.len() != processed.len() {
        diagnostics.push(PairingDiagnostic::CountMismatch {
            clean: clean.len(),
            processed: processed.len(),
            dropped: clean.len().abs_diff(processed.len()),
        });
    }

    PairingPlan { pairs, diagnostics }
}

fn pair_by_name(clean: &[PathBuf], processed: &[PathBuf]) -> PairingPlan {
    let by_name: HashMap<&OsStr, &PathBuf> = processed
        .iter()
        .filter_map(|p| p.file_name().map(|name| (name, p)))
        .collect();

    let mut plan = PairingPlan::default();
    for c in clean {
        match c.file_name().and_then(|name| by_name.get(name)) {
            Some(p) => plan.pairs.push(PairingRecord {
                index: plan.pairs.len(),
                clean: c.clone(),
                processed: (*p).clone(),
            }),
            None => plan
                .diagnostics
                .push(PairingDiagnostic::MissingCounterpart {
                    clean: utils::extract_filename_lossy(c),
                }),
        }
    }
    plan
}
