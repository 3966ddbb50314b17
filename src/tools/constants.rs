//! 常量和默认配置集中管理
//!
//! 将所有重要常量集中定义，避免"默认值漂移"和重复定义

/// 各指标的采样率约束
pub mod rates {
    /// STOI/ESTOI只在16kHz下有定义
    pub const STOI_RATE: u32 = 16000;

    /// PESQ引擎接受的采样率
    pub const PESQ_RATES: &[u32] = &[8000, 16000];
}

/// 默认配置值
pub mod defaults {
    use crate::metrics::MetricKind;

    /// PESQ默认目标采样率（宽带）
    pub const PESQ_TARGET_RATE: u32 = 16000;

    /// DNSMOS默认输入采样率
    pub const DNSMOS_RATE: u32 = 16000;

    /// 默认音频扩展名
    pub const AUDIO_EXTENSION: &str = "wav";

    /// 批处理默认指标集合
    pub const BATCH_METRICS: &[MetricKind] =
        &[MetricKind::Stoi, MetricKind::Pesq, MetricKind::SiSdr];

    /// 默认多文件并行并发度
    ///
    /// 外部引擎通常是单独的进程，4并发度在多数场景下提供良好的性能/资源平衡
    pub const PARALLEL_FILES_DEGREE: usize = 4;

    /// 外部引擎命令的环境变量
    pub const ENGINE_ENV_VAR: &str = "SPEECH_EVAL_ENGINE";
}

/// 并发度限制常量
pub mod parallel_limits {
    /// 最小并发度
    pub const MIN_PARALLEL_DEGREE: usize = 1;

    /// 最大并发度
    ///
    /// 每个工作线程可能同时拉起一个引擎子进程，限制为16避免压垮系统
    pub const MAX_PARALLEL_DEGREE: usize = 16;
}

/// 报告相关常量
pub mod report {
    /// 失败单元格标记
    pub const FAILED_MARKER: &str = "failed";

    /// 没有任何分数时的提示
    pub const NO_RESULTS_MESSAGE: &str = "No metrics computed. Check input directories.";

    /// 标识列
    pub const CLEAN_COLUMN: &str = "clean_file";
    pub const PROCESSED_COLUMN: &str = "processed_file";
}
