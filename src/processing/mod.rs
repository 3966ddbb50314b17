//! 信号预处理模块
//!
//! 重采样与信号对调理。纯函数、无共享状态，可在任意线程上并发调用。

pub mod conditioner;
pub mod resampler;

pub use conditioner::{ConditionedPair, align_lengths, condition_pair, resample_to, to_mono};
pub use resampler::PolyphaseResampler;
