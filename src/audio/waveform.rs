//! 波形数据模块
//!
//! `Waveform` 是评估流程中唯一的信号载体：交错排列的f32样本、采样率与声道数。
//! 构造后不可变，所有变换（重采样、下混、截断）都返回新的波形。

use crate::error::{EvalResult, MetricError};

/// 不可变音频波形
///
/// 样本按帧交错存储：`[L1, R1, L2, R2, ...]`（立体声示例）。
#[derive(Debug, Clone, PartialEq)]
pub struct Waveform {
    samples: Vec<f32>,
    sample_rate: u32,
    channels: u16,
}

impl Waveform {
    /// 从交错样本创建波形
    ///
    /// # 错误
    ///
    /// * `MetricError::InvalidInput` - 声道数为0，或样本数不是声道数的整数倍
    /// * `MetricError::UnsupportedRate` - 采样率为0
    pub fn new(samples: Vec<f32>, sample_rate: u32, channels: u16) -> EvalResult<Self> {
        if channels == 0 {
            return Err(MetricError::InvalidInput("声道数不能为0".to_string()));
        }
        if sample_rate == 0 {
            return Err(MetricError::UnsupportedRate {
                rate: sample_rate,
                reason: "采样率必须为正 / sample rate must be positive".to_string(),
            });
        }
        if samples.len() % channels as usize != 0 {
            return Err(MetricError::InvalidInput(format!(
                "样本数({})不是声道数({channels})的整数倍",
                samples.len()
            )));
        }

        Ok(Self {
            samples,
            sample_rate,
            channels,
        })
    }

    /// 创建单声道波形
    pub fn mono(samples: Vec<f32>, sample_rate: u32) -> EvalResult<Self> {
        Self::new(samples, sample_rate, 1)
    }

    /// 由已校验过的各部分直接构造（crate内部的变换使用）
    pub(crate) fn from_parts(samples: Vec<f32>, sample_rate: u32, channels: u16) -> Self {
        debug_assert!(channels > 0 && sample_rate > 0);
        debug_assert_eq!(samples.len() % channels as usize, 0);
        Self {
            samples,
            sample_rate,
            channels,
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// 是否为单声道
    #[inline]
    pub fn is_mono(&self) -> bool {
        self.channels == 1
    }

    /// 交错样本
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// 帧数（每声道样本数）
    #[inline]
    pub fn len(&self) -> usize {
        self.samples.len() / self.channels as usize
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// 时长（秒）
    pub fn duration_seconds(&self) -> f64 {
        self.len() as f64 / self.sample_rate as f64
    }

    /// 取出指定声道的样本
    pub fn channel(&self, index: usize) -> Vec<f32> {
        self.samples
            .iter()
            .skip(index)
            .step_by(self.channels as usize)
            .copied()
            .collect()
    }

    /// 消费波形并取回样本
    pub fn into_samples(self) -> Vec<f32> {
        self.samples
    }
}
