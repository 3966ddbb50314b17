//! 音频输入模块
//!
//! 提供不可变波形类型和文件加载器。

pub mod loader;
pub mod waveform;

pub use loader::{FileWaveformLoader, SUPPORTED_EXTENSIONS, WaveformLoader};
pub use waveform::Waveform;
