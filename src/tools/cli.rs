//! 命令行接口模块
//!
//! 负责命令行参数解析与配置构造。单对工具（si-sdr/pesq/stoi/dnsmos）与批处理共用同一个二进制。

use super::constants::{defaults, rates};
use super::formatter::ReportFormat;
use super::pairing::PairingMode;
use crate::engines::{EngineSet, ExternalCommandEngine, PesqMode};
use crate::error::{EvalResult, MetricError};
use crate::metrics::{EvaluationConfig, MetricKind, normalize_metric_list};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// 应用程序版本信息
const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser, Debug)]
#[command(name = "speech-eval")]
#[command(about = "语音质量与可懂度指标评估 / Objective speech metric evaluation (PESQ, STOI/ESTOI, SI-SDR, DNSMOS)")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// 显示详细处理信息
    /// Show verbose output
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,
}

/// 解析PESQ目标采样率（只接受8000或16000）
fn parse_pesq_rate(value: &str) -> Result<u32, String> {
    let rate: u32 = value
        .parse()
        .map_err(|_| format!("无效的采样率 / invalid sample rate: {value}"))?;
    if rates::PESQ_RATES.contains(&rate) {
        Ok(rate)
    } else {
        Err(format!(
            "PESQ只支持8000或16000 Hz / PESQ supports 8000 or 16000 Hz, got {rate}"
        ))
    }
}

/// 外部评分引擎参数
#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineArgs {
    /// 外部评分引擎命令（按空白切分）
    /// External scoring engine command (split on whitespace)
    #[arg(long, short = 'e', env = defaults::ENGINE_ENV_VAR)]
    pub engine: Option<String>,
}

impl EngineArgs {
    /// 构造引擎集合；未配置时为空集合（只能计算SI-SDR）
    pub fn engine_set(&self) -> EvalResult<EngineSet> {
        match self.engine.as_deref() {
            Some(command) if !command.trim().is_empty() => Ok(EngineSet::from_command(
                ExternalCommandEngine::from_command_line(command)?,
            )),
            _ => Ok(EngineSet::empty()),
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// 计算单对文件的SI-SDR
    /// Compute SI-SDR for one file pair
    #[command(name = "si-sdr")]
    SiSdr {
        clean: PathBuf,
        processed: PathBuf,
    },

    /// 计算单对文件的PESQ
    /// Compute PESQ for one file pair
    Pesq {
        clean: PathBuf,
        processed: PathBuf,

        /// 目标采样率（8000或16000）
        /// Target sample rate (8000 or 16000)
        #[arg(long, default_value_t = defaults::PESQ_TARGET_RATE, value_parser = parse_pesq_rate)]
        target_rate: u32,

        /// PESQ模式：wb, nb
        /// PESQ mode: wb, nb
        #[arg(long, default_value = "wb")]
        mode: PesqMode,

        #[command(flatten)]
        engine: EngineArgs,
    },

    /// 计算单对文件的STOI与ESTOI（需要16kHz）
    /// Compute STOI and ESTOI for one file pair (16 kHz only)
    Stoi {
        clean: PathBuf,
        processed: PathBuf,

        #[command(flatten)]
        engine: EngineArgs,
    },

    /// 计算单个文件的DNSMOS（无参考）
    /// Compute DNSMOS for one processed file (reference-free)
    Dnsmos {
        processed: PathBuf,

        /// DNSMOS输入采样率
        /// DNSMOS input sample rate
        #[arg(long, default_value_t = defaults::DNSMOS_RATE)]
        sr: u32,

        #[command(flatten)]
        engine: EngineArgs,
    },

    /// 批量评估两个目录
    /// Evaluate two directories
    Batch(BatchArgs),
}

#[derive(Args, Debug, Clone)]
pub struct BatchArgs {
    pub clean_dir: PathBuf,
    pub processed_dir: PathBuf,

    /// 指标列表（逗号分隔）：stoi, pesq, si-sdr, dnsmos
    /// Comma separated metrics: stoi, pesq, si-sdr, dnsmos
    #[arg(long, short = 'm', value_delimiter = ',')]
    pub metrics: Vec<MetricKind>,

    /// 配对策略：positional, by-name
    /// Pairing mode: positional, by-name
    #[arg(long, default_value = "positional")]
    pub pairing: PairingMode,

    /// 音频扩展名
    /// Audio file extension
    #[arg(long, default_value = defaults::AUDIO_EXTENSION)]
    pub ext: String,

    /// 输出报告路径
    /// Report output path
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,

    /// 报告格式：text, csv, json（默认由输出扩展名推断）
    /// Report format: text, csv, json (inferred from --output by default)
    #[arg(long, short = 'f')]
    pub format: Option<ReportFormat>,

    /// PESQ目标采样率
    /// PESQ target sample rate
    #[arg(long, default_value_t = defaults::PESQ_TARGET_RATE, value_parser = parse_pesq_rate)]
    pub target_rate: u32,

    /// PESQ模式
    /// PESQ mode
    #[arg(long, default_value = "wb")]
    pub mode: PesqMode,

    /// DNSMOS输入采样率
    /// DNSMOS input sample rate
    #[arg(long, default_value_t = defaults::DNSMOS_RATE)]
    pub sr: u32,

    /// 并行处理的文件对数量（1为串行）
    /// Number of file pairs processed in parallel (1 = serial)
    #[arg(long, default_value_t = defaults::PARALLEL_FILES_DEGREE)]
    pub parallel_files: usize,

    #[command(flatten)]
    pub engine: EngineArgs,
}

impl BatchArgs {
    /// 所选指标，未指定时使用默认集合
    pub fn metric_kinds(&self) -> Vec<MetricKind> {
        if self.metrics.is_empty() {
            defaults::BATCH_METRICS.to_vec()
        } else {
            normalize_metric_list(self.metrics.clone())
        }
    }

    pub fn evaluation_config(&self) -> EvaluationConfig {
        EvaluationConfig {
            pesq_rate: self.target_rate,
            pesq_mode: self.mode,
            dnsmos_rate: self.sr,
        }
    }

    pub fn report_format(&self) -> ReportFormat {
        ReportFormat::resolve(self.format, self.output.as_deref())
    }
}

/// 校验命令行给出的PESQ参数组合
///
/// 采样率与模式不兼容属于用法错误，转换为 `InvalidInput`（退出码1）。
pub fn validate_pesq_options(config: &EvaluationConfig) -> EvalResult<()> {
    config.validate_pesq().map_err(|e| match e {
        MetricError::UnsupportedRate { rate, reason } => MetricError::InvalidInput(format!(
            "--target-rate {rate} 与 --mode {mode} 不兼容 / --target-rate {rate} is incompatible with --mode {mode} ({reason})",
            mode = config.pesq_mode
        )),
        other => other,
    })
}

/// 显示程序启动信息
pub fn show_startup_info(verbose: bool) {
    if verbose {
        println!("[INFO] speech-eval v{VERSION}");
    }
}
