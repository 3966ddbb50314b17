//! 工具模块集合
//!
//! 包含CLI、文件扫描与配对、批处理、报告输出等工具模块，支持main.rs的流程控制。

pub mod batch_state;
pub mod cli;
pub mod constants;
pub mod formatter;
pub mod pairing;
pub mod parallel_processor;
pub mod processor;
pub mod scanner;
pub mod utils;

// 重新导出主要的公共接口
pub use batch_state::{BatchStatsSnapshot, ParallelBatchStats, SerialBatchStats};
pub use cli::{BatchArgs, Cli, Commands, EngineArgs, show_startup_info, validate_pesq_options};
pub use formatter::{ReportFormat, ReportOutcome, emit_report, render};
pub use pairing::{PairingDiagnostic, PairingMode, PairingPlan, PairingRecord, pair_files};
pub use parallel_processor::run_batch_parallel;
pub use processor::{
    BatchOptions, BatchReport, PairReport, evaluate_pair, run_batch, run_batch_serial,
};
pub use scanner::{scan_audio_files, show_scan_results};
pub use utils::path;
