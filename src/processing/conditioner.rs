//! 信号调理器
//!
//! 把两段独立来源的波形（采样率、声道数、长度可能不同）规整为可比较的 [`ConditionedPair`]：
//! 重采样 -> 下混为单声道 -> 从起点截断到共同长度。
//!
//! 时间对齐只靠从索引0截断：假设两段录音起点同步，不做互相关对齐。

use super::resampler::PolyphaseResampler;
use crate::audio::Waveform;
use crate::error::{EvalResult, MetricError};

/// 调理完成的信号对
///
/// 不变量：两段波形均为单声道、采样率相同、帧数相同且不为0。
#[derive(Debug, Clone, PartialEq)]
pub struct ConditionedPair {
    clean: Waveform,
    processed: Waveform,
}

impl ConditionedPair {
    pub fn clean(&self) -> &Waveform {
        &self.clean
    }

    pub fn processed(&self) -> &Waveform {
        &self.processed
    }

    pub fn sample_rate(&self) -> u32 {
        self.clean.sample_rate()
    }

    /// 共同帧数
    pub fn len(&self) -> usize {
        self.clean.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clean.is_empty()
    }

    pub fn into_parts(self) -> (Waveform, Waveform) {
        (self.clean, self.processed)
    }
}

/// 重采样到目标采样率（保持声道数）
///
/// 采样率已一致时原样返回。
pub fn resample_to(waveform: Waveform, target_rate: u32) -> EvalResult<Waveform> {
    if target_rate == 0 {
        return Err(MetricError::UnsupportedRate {
            rate: target_rate,
            reason: "目标采样率必须为正 / target rate must be positive".to_string(),
        });
    }
    if waveform.sample_rate() == target_rate {
        return Ok(waveform);
    }

    let resampler = PolyphaseResampler::new(waveform.sample_rate(), target_rate)?;
    let channels = waveform.channels() as usize;

    let samples = if channels == 1 {
        resampler.process(waveform.samples())
    } else {
        let resampled: Vec<Vec<f32>> = (0..channels)
            .map(|ch| resampler.process(&waveform.channel(ch)))
            .collect();
        let frames = resampler.output_len(waveform.len());
        let mut interleaved = Vec::with_capacity(frames * channels);
        for frame in 0..frames {
            for channel in &resampled {
                interleaved.push(channel[frame]);
            }
        }
        interleaved
    };

    let (up, down) = resampler.ratio();
    tracing::trace!(
        from = resampler.from_rate(),
        to = resampler.to_rate(),
        up,
        down,
        frames = samples.len() / channels,
        "resampled waveform"
    );

    Ok(Waveform::from_parts(samples, target_rate, waveform.channels()))
}

/// 下混为单声道（逐帧算术平均）
pub fn to_mono(waveform: Waveform) -> Waveform {
    if waveform.is_mono() {
        return waveform;
    }

    let channels = waveform.channels() as usize;
    let sample_rate = waveform.sample_rate();
    let mono = waveform
        .samples()
        .chunks_exact(channels)
        .map(|frame| {
            let sum: f64 = frame.iter().map(|&s| s as f64).sum();
            (sum / channels as f64) as f32
        })
        .collect();

    Waveform::from_parts(mono, sample_rate, 1)
}

/// 从起点截断到两者的较短帧数
pub fn align_lengths(a: Waveform, b: Waveform) -> (Waveform, Waveform) {
    let frames = a.len().min(b.len());
    (truncate(a, frames), truncate(b, frames))
}

fn truncate(waveform: Waveform, frames: usize) -> Waveform {
    if waveform.len() == frames {
        return waveform;
    }
    let channels = waveform.channels();
    let sample_rate = waveform.sample_rate();
    let mut samples = waveform.into_samples();
    samples.truncate(frames * channels as usize);
    Waveform::from_parts(samples, sample_rate, channels)
}

/// 完整调理流程
///
/// * `target_rate` 为 `Some` 时两段信号都重采样到该采样率；
///   为 `None` 时要求两者采样率已一致，否则返回 `RateMismatch`。
///
/// # 错误
///
/// * `MetricError::RateMismatch` - 未指定目标采样率且两者采样率不同
/// * `MetricError::UnsupportedRate` - 目标采样率为0
/// * `MetricError::EmptySignal` - 对齐后没有任何样本
pub fn condition_pair(
    clean: Waveform,
    processed: Waveform,
    target_rate: Option<u32>,
) -> EvalResult<ConditionedPair> {
    let (clean, processed) = match target_rate {
        Some(rate) => (resample_to(clean, rate)?, resample_to(processed, rate)?),
        None => {
            if clean.sample_rate() != processed.sample_rate() {
                return Err(MetricError::RateMismatch {
                    expected: clean.sample_rate(),
                    actual: processed.sample_rate(),
                });
            }
            (clean, processed)
        }
    };

    let (clean, processed) = align_lengths(to_mono(clean), to_mono(processed));

    if clean.is_empty() {
        return Err(MetricError::EmptySignal(
            "对齐后没有可比较的样本 / no samples left after alignment".to_string(),
        ));
    }

    Ok(ConditionedPair { clean, processed })
}
