//! SI-SDR估计器
//!
//! 尺度不变信号失真比：
//!
//! ```text
//! clean_z = clean - mean(clean)        proc_z = processed - mean(processed)
//! alpha   = <proc_z, clean_z> / <clean_z, clean_z>
//! target  = alpha * clean_z            error  = proc_z - target
//! SI-SDR  = 10 * log10(|target|^2 / |error|^2)
//! ```
//!
//! 样本以f32存储，全部运算在f64中完成。

use crate::audio::Waveform;
use crate::error::{EvalResult, MetricError};

/// 完美重建（误差能量为0）时返回的哨兵值
///
/// 数学上SI-SDR为正无穷；这是合法结果而非错误。
pub const SI_SDR_INFINITE: f64 = f64::INFINITY;

/// SI-SDR计算结果
#[derive(Debug, Clone, PartialEq)]
pub struct SiSdrResult {
    /// 分数（dB），完美重建时为 [`SI_SDR_INFINITE`]
    pub score_db: f64,

    /// 最优缩放系数
    pub alpha: f64,

    /// 目标分量能量
    pub target_energy: f64,

    /// 误差分量能量
    pub error_energy: f64,

    /// 参与计算的样本数量
    pub sample_count: usize,
}

/// SI-SDR估计器（无状态）
#[derive(Debug, Default, Clone, Copy)]
pub struct SiSdrEstimator;

impl SiSdrEstimator {
    pub fn new() -> Self {
        Self
    }

    /// 计算SI-SDR
    ///
    /// 调用方负责预先调理信号（单声道、等长、同采样率），估计器只校验不修正。
    ///
    /// # 错误
    ///
    /// * `MetricError::RateMismatch` - 采样率不同（先于任何运算检查）
    /// * `MetricError::InvalidInput` - 非单声道或长度不同
    /// * `MetricError::EmptySignal` - 没有样本
    /// * `MetricError::DegenerateSignal` - 参考或估计信号零均值后能量为0
    pub fn estimate(&self, clean: &Waveform, processed: &Waveform) -> EvalResult<SiSdrResult> {
        if clean.sample_rate() != processed.sample_rate() {
            return Err(MetricError::RateMismatch {
                expected: clean.sample_rate(),
                actual: processed.sample_rate(),
            });
        }
        if !clean.is_mono() || !processed.is_mono() {
            return Err(MetricError::InvalidInput(format!(
                "SI-SDR需要单声道输入 / SI-SDR expects mono input ({} vs {} channels)",
                clean.channels(),
                processed.channels()
            )));
        }
        if clean.len() != processed.len() {
            return Err(MetricError::InvalidInput(format!(
                "SI-SDR需要等长输入 / SI-SDR expects equal lengths ({} vs {})",
                clean.len(),
                processed.len()
            )));
        }
        if clean.is_empty() {
            return Err(MetricError::EmptySignal(
                "SI-SDR输入为空 / SI-SDR input is empty".to_string(),
            ));
        }

        let clean_z = zero_mean(clean.samples());
        let proc_z = zero_mean(processed.samples());

        let reference_energy = dot(&clean_z, &clean_z);
        if reference_energy == 0.0 {
            return Err(MetricError::DegenerateSignal(
                "参考信号零均值后能量为0 / reference has zero energy after mean removal"
                    .to_string(),
            ));
        }
        if dot(&proc_z, &proc_z) == 0.0 {
            return Err(MetricError::DegenerateSignal(
                "估计信号零均值后能量为0 / estimate has zero energy after mean removal"
                    .to_string(),
            ));
        }

        let alpha = dot(&proc_z, &clean_z) / reference_energy;

        let mut target_energy = 0.0;
        let mut error_energy = 0.0;
        for (&c, &p) in clean_z.iter().zip(&proc_z) {
            let target = alpha * c;
            let error = p - target;
            target_energy += target * target;
            error_energy += error * error;
        }

        let score_db = if error_energy == 0.0 {
            SI_SDR_INFINITE
        } else {
            // 目标能量为0（估计与参考正交）时log10(0)自然得到负无穷
            10.0 * (target_energy / error_energy).log10()
        };

        Ok(SiSdrResult {
            score_db,
            alpha,
            target_energy,
            error_energy,
            sample_count: clean.len(),
        })
    }
}

/// 便捷函数：只返回分数（dB）
pub fn si_sdr(clean: &Waveform, processed: &Waveform) -> EvalResult<f64> {
    SiSdrEstimator::new()
        .estimate(clean, processed)
        .map(|r| r.score_db)
}

fn zero_mean(samples: &[f32]) -> Vec<f64> {
    let mean = samples.iter().map(|&s| s as f64).sum::<f64>() / samples.len() as f64;
    samples.iter().map(|&s| s as f64 - mean).collect()
}

#[inline]
fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mono(samples: Vec<f32>) -> Waveform {
        Waveform::mono(samples, 16000).unwrap()
    }

    fn speechlike(len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| {
                let t = i as f32 / 16000.0;
                0.6 * (2.0 * std::f32::consts::PI * 220.0 * t).sin()
                    + 0.3 * (2.0 * std::f32::consts::PI * 1330.0 * t).sin()
                    + 0.05
            })
            .collect()
    }

    fn noise(len: usize, seed: u64) -> Vec<f32> {
        // 线性同余发生器，结果确定
        let mut state = seed;
        (0..len)
            .map(|_| {
                state = state
                    .wrapping_mul(6364136223846793005)
                    .wrapping_add(1442695040888963407);
                ((state >> 33) as f32 / (1u64 << 31) as f32) - 0.5
            })
            .collect()
    }

    #[test]
    fn test_identical_signals_return_infinite_sentinel() {
        let x = mono(speechlike(4000));
        let result = SiSdrEstimator::new().estimate(&x, &x).unwrap();
        assert_eq!(result.score_db, SI_SDR_INFINITE);
        assert_eq!(result.error_energy, 0.0);
    }

    #[test]
    fn test_power_of_two_gain_is_still_perfect() {
        let clean = speechlike(2000);
        let processed: Vec<f32> = clean.iter().map(|s| s * 2.0).collect();
        assert_eq!(si_sdr(&mono(clean), &mono(processed)).unwrap(), SI_SDR_INFINITE);
    }

    #[test]
    fn test_scale_invariance_with_noise() {
        let clean = speechlike(8000);
        let noisy: Vec<f32> = clean
            .iter()
            .zip(noise(8000, 7))
            .map(|(c, n)| c + 0.1 * n)
            .collect();
        let base = si_sdr(&mono(clean.clone()), &mono(noisy.clone())).unwrap();

        for k in [0.5f32, 0.25, 3.0, -1.7] {
            let scaled: Vec<f32> = noisy.iter().map(|s| s * k).collect();
            let score = si_sdr(&mono(clean.clone()), &mono(scaled)).unwrap();
            assert!(
                (score - base).abs() < 1e-3,
                "gain {k}: {score} vs {base}"
            );
        }

        let halved: Vec<f32> = noisy.iter().map(|s| s * 0.5).collect();
        let score = si_sdr(&mono(clean), &mono(halved)).unwrap();
        assert!((score - base).abs() < 1e-6);
    }

    #[test]
    fn test_dc_offset_does_not_matter() {
        let clean = speechlike(4000);
        let noisy: Vec<f32> = clean
            .iter()
            .zip(noise(4000, 3))
            .map(|(c, n)| c + 0.2 * n)
            .collect();
        let shifted: Vec<f32> = noisy.iter().map(|s| s + 0.25).collect();
        let a = si_sdr(&mono(clean.clone()), &mono(noisy)).unwrap();
        let b = si_sdr(&mono(clean), &mono(shifted)).unwrap();
        assert!((a - b).abs() < 1e-3);
    }

    #[test]
    fn test_known_ratio() {
        // clean_z ⟂ noise_z 且能量相同 -> target = clean_z, error = noise_z -> 0 dB
        let clean = mono(vec![1.0, -1.0, 1.0, -1.0]);
        let processed = mono(vec![2.0, 0.0, 0.0, -2.0]);
        let result = SiSdrEstimator::new().estimate(&clean, &processed).unwrap();
        assert!((result.alpha - 1.0).abs() < 1e-12);
        assert!(result.score_db.abs() < 1e-9);
    }

    #[test]
    fn test_constant_reference_is_degenerate() {
        let clean = mono(vec![0.3; 100]);
        let processed = mono(speechlike(100));
        assert!(matches!(
            si_sdr(&clean, &processed),
            Err(MetricError::DegenerateSignal(_))
        ));
    }

    #[test]
    fn test_silent_estimate_is_degenerate() {
        let clean = mono(speechlike(100));
        let processed = mono(vec![0.0; 100]);
        assert!(matches!(
            si_sdr(&clean, &processed),
            Err(MetricError::DegenerateSignal(_))
        ));
    }

    #[test]
    fn test_orthogonal_estimate_is_negative_infinity() {
        let clean = mono(vec![1.0, -1.0, 1.0, -1.0]);
        let processed = mono(vec![1.0, 1.0, -1.0, -1.0]);
        let score = si_sdr(&clean, &processed).unwrap();
        assert_eq!(score, f64::NEG_INFINITY);
    }

    #[test]
    fn test_rate_mismatch_checked_first() {
        let clean = Waveform::new(vec![0.0; 6], 16000, 2).unwrap();
        let processed = Waveform::mono(vec![0.1; 3], 8000).unwrap();
        assert!(matches!(
            si_sdr(&clean, &processed),
            Err(MetricError::RateMismatch {
                expected: 16000,
                actual: 8000
            })
        ));
    }

    #[test]
    fn test_shape_preconditions() {
        let stereo = Waveform::new(vec![0.1, 0.2, 0.3, 0.4], 16000, 2).unwrap();
        let short = mono(vec![0.1, 0.2]);
        assert!(matches!(
            si_sdr(&stereo, &short),
            Err(MetricError::InvalidInput(_))
        ));
        assert!(matches!(
            si_sdr(&short, &mono(vec![0.1, 0.2, 0.3])),
            Err(MetricError::InvalidInput(_))
        ));
        assert!(matches!(
            si_sdr(&mono(vec![]), &mono(vec![])),
            Err(MetricError::EmptySignal(_))
        ));
    }
}
