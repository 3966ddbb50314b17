//! Speech Eval Tool
//!
//! 语音增强/分离结果的客观指标评估：SI-SDR（本仓库实现）以及
//! PESQ、STOI/ESTOI、DNSMOS（委托给外部评分引擎）。
//!
//! ## 核心特性
//! - 信号调理：带限重采样、下混为单声道、按起点截断对齐
//! - SI-SDR：零均值、最小二乘投影、完美重建返回无穷哨兵值
//! - 指标门面：每个指标自带前置条件（STOI只接受16kHz，PESQ先重采样）
//! - 批处理：按位置或按文件名配对，逐对隔离失败，输出表格/CSV/JSON报告

pub mod audio;
pub mod core;
pub mod engines;
pub mod error;
pub mod metrics;
pub mod processing;
pub mod tools;

// 重新导出核心类型
pub use audio::{FileWaveformLoader, Waveform, WaveformLoader};
pub use core::{SI_SDR_INFINITE, SiSdrEstimator, SiSdrResult, si_sdr};
pub use engines::{
    DnsmosEngine, DnsmosScores, EngineSet, ExternalCommandEngine, PesqEngine, PesqMode,
    StoiEngine, StoiScores,
};
pub use error::{ErrorCategory, EvalResult, MetricError};
pub use metrics::{
    EvaluationConfig, MetricColumn, MetricEvaluator, MetricFailure, MetricKind, MetricOutcome,
    MetricResult,
};
pub use processing::{ConditionedPair, PolyphaseResampler, condition_pair};
