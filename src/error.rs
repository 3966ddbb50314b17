//! 统一错误处理框架
//!
//! 评估流程中所有可失败操作共享的错误类型。数值前置条件（采样率、退化信号、空信号）
//! 与外部评分引擎的失败都在这里建模，批处理据此按对隔离失败。

use std::fmt;
use std::io;

/// 评估相关的统一错误类型
#[derive(Debug)]
pub enum MetricError {
    /// 输入验证错误（参数、路径形态、信号形态）
    InvalidInput(String),

    /// 文件I/O错误（文件或目录不存在、不可读）
    IoError(io::Error),

    /// 音频格式错误
    FormatError(String),

    /// 解码错误
    DecodingError(String),

    /// 目标采样率不受支持
    UnsupportedRate { rate: u32, reason: String },

    /// 采样率不一致
    RateMismatch { expected: u32, actual: u32 },

    /// 退化信号（零均值后能量为0，比例无定义）
    DegenerateSignal(String),

    /// 对齐后信号为空
    EmptySignal(String),

    /// 未配置对应指标的评分引擎
    EngineUnavailable(&'static str),

    /// 外部评分引擎内部失败（不透明）
    EngineError(String),

    /// 资源访问错误（线程池等）
    ResourceError(String),
}

impl fmt::Display for MetricError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricError::InvalidInput(msg) => write!(f, "输入验证失败 / Invalid input: {msg}"),
            MetricError::IoError(err) => write!(f, "文件I/O错误 / I/O error: {err}"),
            MetricError::FormatError(msg) => write!(f, "音频格式错误 / Format error: {msg}"),
            MetricError::DecodingError(msg) => write!(f, "音频解码失败 / Decoding error: {msg}"),
            MetricError::UnsupportedRate { rate, reason } => {
                write!(f, "不支持的采样率 / Unsupported sample rate {rate} Hz: {reason}")
            }
            MetricError::RateMismatch { expected, actual } => write!(
                f,
                "采样率不一致 / Sample rate mismatch: expected {expected} Hz, got {actual} Hz"
            ),
            MetricError::DegenerateSignal(msg) => {
                write!(f, "退化信号 / Degenerate signal: {msg}")
            }
            MetricError::EmptySignal(msg) => write!(f, "空信号 / Empty signal: {msg}"),
            MetricError::EngineUnavailable(metric) => write!(
                f,
                "未配置评分引擎 / No scoring engine configured for {metric}"
            ),
            MetricError::EngineError(msg) => write!(f, "评分引擎失败 / Engine failure: {msg}"),
            MetricError::ResourceError(msg) => write!(f, "资源访问错误 / Resource error: {msg}"),
        }
    }
}

impl std::error::Error for MetricError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            MetricError::IoError(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for MetricError {
    fn from(err: io::Error) -> Self {
        MetricError::IoError(err)
    }
}

impl From<hound::Error> for MetricError {
    fn from(err: hound::Error) -> Self {
        match err {
            hound::Error::IoError(e) => MetricError::IoError(e),
            other => MetricError::DecodingError(format!("WAV解码错误: {other}")),
        }
    }
}

/// 评估操作的标准Result类型
pub type EvalResult<T> = Result<T, MetricError>;

// ==================== 错误转换Helper函数 ====================

/// 创建格式错误的helper函数
#[inline]
pub fn format_error<E: fmt::Display>(context: &str, err: E) -> MetricError {
    MetricError::FormatError(format!("{context}: {err}"))
}

/// 创建解码错误的helper函数
#[inline]
pub fn decoding_error<E: fmt::Display>(context: &str, err: E) -> MetricError {
    MetricError::DecodingError(format!("{context}: {err}"))
}

/// 创建引擎错误的helper函数
#[inline]
pub fn engine_error<E: fmt::Display>(context: &str, err: E) -> MetricError {
    MetricError::EngineError(format!("{context}: {err}"))
}

// ==================== 错误分类系统 ====================
// 用于批量处理中的失败统计

/// 错误类别枚举（用于批量处理统计）
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, PartialOrd, Ord)]
pub enum ErrorCategory {
    /// I/O相关错误（文件不存在、权限不足等）
    Io,
    /// 格式相关错误
    Format,
    /// 解码相关错误
    Decoding,
    /// 数值前置条件不满足（采样率、退化信号、空信号）
    Precondition,
    /// 外部评分引擎失败或缺失
    Engine,
    /// 其他未分类错误
    Other,
}

impl ErrorCategory {
    /// 从MetricError提取错误类别
    pub fn from_metric_error(e: &MetricError) -> Self {
        match e {
            MetricError::IoError(_) => Self::Io,
            MetricError::FormatError(_) => Self::Format,
            MetricError::DecodingError(_) => Self::Decoding,
            MetricError::UnsupportedRate { .. }
            | MetricError::RateMismatch { .. }
            | MetricError::DegenerateSignal(_)
            | MetricError::EmptySignal(_) => Self::Precondition,
            MetricError::EngineUnavailable(_) | MetricError::EngineError(_) => Self::Engine,
            MetricError::InvalidInput(_) | MetricError::ResourceError(_) => Self::Other,
        }
    }

    /// 获取错误类别的显示名称
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Io => "I/O错误 / I/O",
            Self::Format => "格式错误 / Format",
            Self::Decoding => "解码错误 / Decoding",
            Self::Precondition => "前置条件错误 / Precondition",
            Self::Engine => "引擎错误 / Engine",
            Self::Other => "其他错误 / Other",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_precondition_errors_share_category() {
        let errors = [
            MetricError::RateMismatch {
                expected: 16000,
                actual: 8000,
            },
            MetricError::DegenerateSignal("silent".to_string()),
            MetricError::EmptySignal("no samples".to_string()),
            MetricError::UnsupportedRate {
                rate: 0,
                reason: "zero".to_string(),
            },
        ];
        for e in &errors {
            assert_eq!(ErrorCategory::from_metric_error(e), ErrorCategory::Precondition);
        }
    }

    #[test]
    fn test_io_error_exposes_source() {
        let err = MetricError::from(io::Error::new(io::ErrorKind::NotFound, "gone"));
        assert_eq!(ErrorCategory::from_metric_error(&err), ErrorCategory::Io);
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_display_mentions_rates() {
        let msg = MetricError::RateMismatch {
            expected: 16000,
            actual: 44100,
        }
        .to_string();
        assert!(msg.contains("16000"));
        assert!(msg.contains("44100"));
    }
}
