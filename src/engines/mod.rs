//! 外部评分引擎
//!
//! PESQ / STOI / DNSMOS 算法不在本仓库实现，只定义稳定的能力接口：
//! 核心逻辑面向trait编程，测试可用返回固定分数的假引擎替换真实引擎。
//!
//! 引擎实例在批处理开始时显式构造一次，按只读引用传给每个文件对，批处理结束时随 [`EngineSet`] 一起释放。

pub mod command;

pub use command::ExternalCommandEngine;

use crate::error::EvalResult;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// PESQ工作模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum PesqMode {
    /// 窄带（8kHz或16kHz）
    Narrowband,
    /// 宽带（仅16kHz）
    #[default]
    Wideband,
}

impl PesqMode {
    /// 引擎约定的模式标识
    pub fn as_str(&self) -> &'static str {
        match self {
            PesqMode::Narrowband => "nb",
            PesqMode::Wideband => "wb",
        }
    }

    /// 该模式允许的采样率
    pub fn supports_rate(&self, sample_rate: u32) -> bool {
        match self {
            PesqMode::Narrowband => matches!(sample_rate, 8000 | 16000),
            PesqMode::Wideband => sample_rate == 16000,
        }
    }
}

impl fmt::Display for PesqMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PesqMode {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "nb" | "narrowband" => Ok(PesqMode::Narrowband),
            "wb" | "wideband" => Ok(PesqMode::Wideband),
            _ => Err(format!("Unknown PESQ mode: {s} (expected nb|wb)")),
        }
    }
}

/// STOI与ESTOI分数
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StoiScores {
    pub stoi: f64,
    pub estoi: f64,
}

/// DNSMOS四项子分数
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DnsmosScores {
    pub p808_mos: f64,
    pub mos_sig: f64,
    pub mos_bak: f64,
    pub mos_ovr: f64,
}

/// PESQ评分引擎
pub trait PesqEngine: Send + Sync {
    fn name(&self) -> &'static str;

    /// 输入为等长、同采样率的单声道信号
    fn pesq(
        &self,
        sample_rate: u32,
        reference: &[f32],
        degraded: &[f32],
        mode: PesqMode,
    ) -> EvalResult<f64>;
}

/// STOI评分引擎
pub trait StoiEngine: Send + Sync {
    fn name(&self) -> &'static str;

    /// `extended` 为true时计算ESTOI
    fn stoi(
        &self,
        reference: &[f32],
        degraded: &[f32],
        sample_rate: u32,
        extended: bool,
    ) -> EvalResult<f64>;
}

/// DNSMOS评分引擎（无参考）
pub trait DnsmosEngine: Send + Sync {
    fn name(&self) -> &'static str;

    fn dnsmos(&self, sample_rate: u32, processed: &[f32]) -> EvalResult<DnsmosScores>;
}

/// 一次运行所用的引擎集合
#[derive(Clone, Default)]
pub struct EngineSet {
    pub pesq: Option<Arc<dyn PesqEngine>>,
    pub stoi: Option<Arc<dyn StoiEngine>>,
    pub dnsmos: Option<Arc<dyn DnsmosEngine>>,
}

impl EngineSet {
    /// 不含任何引擎（只能计算SI-SDR）
    pub fn empty() -> Self {
        Self::default()
    }

    /// 同一个外部命令同时承担三种指标
    pub fn from_command(engine: ExternalCommandEngine) -> Self {
        let shared = Arc::new(engine);
        Self {
            pesq: Some(shared.clone()),
            stoi: Some(shared.clone()),
            dnsmos: Some(shared),
        }
    }

    pub fn with_pesq(mut self, engine: Arc<dyn PesqEngine>) -> Self {
        self.pesq = Some(engine);
        self
    }

    pub fn with_stoi(mut self, engine: Arc<dyn StoiEngine>) -> Self {
        self.stoi = Some(engine);
        self
    }

    pub fn with_dnsmos(mut self, engine: Arc<dyn DnsmosEngine>) -> Self {
        self.dnsmos = Some(engine);
        self
    }
}

impl fmt::Debug for EngineSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineSet")
            .field("pesq", &self.pesq.as_ref().map(|e| e.name()))
            .field("stoi", &self.stoi.as_ref().map(|e| e.name()))
            .field("dnsmos", &self.dnsmos.as_ref().map(|e| e.name()))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pesq_mode_parsing() {
        assert_eq!("wb".parse::<PesqMode>().unwrap(), PesqMode::Wideband);
        assert_eq!("NB".parse::<PesqMode>().unwrap(), PesqMode::Narrowband);
        assert!("xb".parse::<PesqMode>().is_err());
    }

    #[test]
    fn test_pesq_mode_rates() {
        assert!(PesqMode::Wideband.supports_rate(16000));
        assert!(!PesqMode::Wideband.supports_rate(8000));
        assert!(PesqMode::Narrowband.supports_rate(8000));
        assert!(!PesqMode::Narrowband.supports_rate(44100));
    }

    #[test]
    fn test_empty_engine_set() {
        let set = EngineSet::empty();
        assert!(set.pesq.is_none() && set.stoi.is_none() && set.dnsmos.is_none());
    }
}
