//! 多相重采样器
//!
//! Kaiser窗加权的理想sinc低通滤波器 + 多相插值/抽取：
//! - 对称FIR滤波器，线性相位且以中心抽头对齐（零延迟）
//! - 采样率比经gcd约分为整数 `up / down`
//! - 截止频率取 `1 / (2 * max(up, down))`，同时抑制镜像与混叠
//!
//! 滤波器在构造时生成一次，同一实例可以重复处理多段信号（如多声道）。

use crate::error::{EvalResult, MetricError};
use num_integer::Integer;
use windowfunctions::{Symmetry, WindowFunction, window};

/// 阻带抑制（dB）
const REJECTION_DB: f64 = 60.0;

/// 过渡带宽相对截止频率的比例
const ROLL_OFF_RATIO: f64 = 0.1;

/// 理想sinc低通滤波器系数（归一化截止频率 `cutoff`）
fn ideal_sinc(cutoff: f64, half_length: usize) -> impl Iterator<Item = f64> {
    (-(half_length as i64)..=half_length as i64).map(move |n| {
        if n == 0 {
            2.0 * cutoff
        } else {
            let n = n as f64;
            (2.0 * std::f64::consts::PI * cutoff * n).sin() / (std::f64::consts::PI * n)
        }
    })
}

/// 对称Kaiser窗（长度 `2 * half_length + 1`）
fn kaiser(beta: f64, half_length: usize) -> impl Iterator<Item = f64> {
    window::<f32>(
        2 * half_length + 1,
        WindowFunction::Kaiser { beta: beta as f32 },
        Symmetry::Symmetric,
    )
    .map(f64::from)
}

/// 生成Kaiser窗加权的sinc低通滤波器（系数和归一化为1）
fn design_filter(cutoff: f64, beta: f64, half_length: usize) -> Vec<f64> {
    let mut filter: Vec<f64> = ideal_sinc(cutoff, half_length)
        .zip(kaiser(beta, half_length))
        .map(|(sinc, window)| sinc * window)
        .collect();

    let sum: f64 = filter.iter().sum();
    filter.iter_mut().for_each(|v| *v /= sum);
    filter
}

/// 多相FIR重采样器
#[derive(Debug, Clone)]
pub struct PolyphaseResampler {
    from_rate: u32,
    to_rate: u32,
    up: usize,
    down: usize,
    half_length: usize,
    filter: Vec<f64>,
}

impl PolyphaseResampler {
    /// 创建 `from_rate -> to_rate` 的重采样器
    ///
    /// # 错误
    ///
    /// * `MetricError::UnsupportedRate` - 任一采样率为0
    pub fn new(from_rate: u32, to_rate: u32) -> EvalResult<Self> {
        for rate in [from_rate, to_rate] {
            if rate == 0 {
                return Err(MetricError::UnsupportedRate {
                    rate,
                    reason: "采样率必须为正 / sample rate must be positive".to_string(),
                });
            }
        }

        let divisor = (from_rate as u64).gcd(&(to_rate as u64));
        let up = (to_rate as u64 / divisor) as usize;
        let down = (from_rate as u64 / divisor) as usize;

        let cutoff = 1.0 / (2.0 * up.max(down) as f64);
        let roll_off_width = cutoff * ROLL_OFF_RATIO;
        // Kaiser经验公式：长度由阻带抑制与过渡带宽决定
        let half_length = ((REJECTION_DB - 8.0) / (28.714 * roll_off_width)).ceil() as usize;
        let beta = 0.1102 * (REJECTION_DB - 8.7);

        Ok(Self {
            from_rate,
            to_rate,
            up,
            down,
            half_length,
            filter: design_filter(cutoff, beta, half_length),
        })
    }

    pub fn from_rate(&self) -> u32 {
        self.from_rate
    }

    pub fn to_rate(&self) -> u32 {
        self.to_rate
    }

    /// 约分后的插值/抽取因子
    pub fn ratio(&self) -> (usize, usize) {
        (self.up, self.down)
    }

    /// 输出长度：`input_len * to / from` 四舍五入到最近整数
    pub fn output_len(&self, input_len: usize) -> usize {
        let numerator = input_len as u128 * self.up as u128;
        let down = self.down as u128;
        ((2 * numerator + down) / (2 * down)) as usize
    }

    /// 重采样单声道序列
    pub fn process(&self, input: &[f32]) -> Vec<f32> {
        if self.up == self.down {
            return input.to_vec();
        }

        let out_len = self.output_len(input.len());
        let up = self.up;
        let gain = up as f64;
        // 插值网格上的有效范围：[0, n * up)
        let upsampled_len = input.len() * up;

        (0..out_len)
            .map(|m| {
                // 输出样本m对应插值网格位置 m*down，加上滤波器中心偏移
                let pos = m * self.down + self.half_length;
                let mut acc = 0.0f64;
                // 只有 (pos - j) 能被up整除的抽头会命中非零样本
                let mut j = pos % up;
                if pos >= upsampled_len {
                    // 跳过落在信号末尾之后的抽头
                    let skip = (pos - upsampled_len) / up + 1;
                    j += skip * up;
                }
                while j < self.filter.len() && j <= pos {
                    let k = (pos - j) / up;
                    acc += self.filter[j] * input[k] as f64;
                    j += up;
                }
                (acc * gain) as f32
            })
            .collect()
    }
}
