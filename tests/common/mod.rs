//! 集成测试共用的固件与假引擎
//!
//! WAV固件在测试运行时用hound写入临时目录；假引擎返回确定的固定分数。

#![allow(dead_code)]

use hound::{SampleFormat, WavSpec, WavWriter};
use speech_eval_tool::engines::{
    DnsmosEngine, DnsmosScores, EngineSet, PesqEngine, PesqMode, StoiEngine,
};
use speech_eval_tool::error::{EvalResult, MetricError};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// 写入16位整数WAV（交错样本）
pub fn write_wav_i16(path: &Path, samples: &[f32], sample_rate: u32, channels: u16) -> PathBuf {
    let spec = WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };
    let mut writer = WavWriter::create(path, spec).expect("创建WAV失败");
    for &s in samples {
        writer
            .write_sample((s.clamp(-1.0, 1.0) * 32767.0) as i16)
            .expect("写入样本失败");
    }
    writer.finalize().expect("完成WAV失败");
    path.to_path_buf()
}

/// 写入32位浮点WAV（交错样本）
pub fn write_wav_f32(path: &Path, samples: &[f32], sample_rate: u32, channels: u16) -> PathBuf {
    let spec = WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 32,
        sample_format: SampleFormat::Float,
    };
    let mut writer = WavWriter::create(path, spec).expect("创建WAV失败");
    for &s in samples {
        writer.write_sample(s).expect("写入样本失败");
    }
    writer.finalize().expect("完成WAV失败");
    path.to_path_buf()
}

/// 类语音测试信号：两个正弦分量加确定性噪声
pub fn speechlike(frames: usize, sample_rate: u32, seed: u64) -> Vec<f32> {
    let mut state = seed;
    (0..frames)
        .map(|i| {
            let t = i as f32 / sample_rate as f32;
            state = state
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            let noise = ((state >> 33) as f32 / (1u64 << 31) as f32) - 0.5;
            0.4 * (2.0 * std::f32::consts::PI * 180.0 * t).sin()
                + 0.2 * (2.0 * std::f32::consts::PI * 1100.0 * t).sin()
                + 0.05 * noise
        })
        .collect()
}

/// 在 `base` 上叠加噪声得到的"处理后"信号
pub fn degrade(base: &[f32], amount: f32, seed: u64) -> Vec<f32> {
    let noise = speechlike(base.len(), 16000, seed);
    base.iter()
        .zip(noise)
        .map(|(b, n)| b + amount * n.sin() * 0.5)
        .collect()
}

/// 返回固定分数并统计调用次数的假引擎
#[derive(Default)]
pub struct FakeEngine {
    pub calls: AtomicUsize,
}

impl FakeEngine {
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl PesqEngine for FakeEngine {
    fn name(&self) -> &'static str {
        "fake"
    }

    fn pesq(&self, sample_rate: u32, r: &[f32], d: &[f32], mode: PesqMode) -> EvalResult<f64> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        assert!(mode.supports_rate(sample_rate));
        assert_eq!(r.len(), d.len());
        Ok(3.5)
    }
}

impl StoiEngine for FakeEngine {
    fn name(&self) -> &'static str {
        "fake"
    }

    fn stoi(&self, r: &[f32], d: &[f32], sample_rate: u32, extended: bool) -> EvalResult<f64> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        assert_eq!(sample_rate, 16000);
        assert_eq!(r.len(), d.len());
        Ok(if extended { 0.75 } else { 0.9 })
    }
}

impl DnsmosEngine for FakeEngine {
    fn name(&self) -> &'static str {
        "fake"
    }

    fn dnsmos(&self, _sample_rate: u32, processed: &[f32]) -> EvalResult<DnsmosScores> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        assert!(!processed.is_empty());
        Ok(DnsmosScores {
            p808_mos: 3.1,
            mos_sig: 3.4,
            mos_bak: 3.9,
            mos_ovr: 2.9,
        })
    }
}

/// 总是失败的PESQ引擎
pub struct FailingPesq;

impl PesqEngine for FailingPesq {
    fn name(&self) -> &'static str {
        "failing"
    }

    fn pesq(&self, _: u32, _: &[f32], _: &[f32], _: PesqMode) -> EvalResult<f64> {
        Err(MetricError::EngineError("No utterances detected".to_string()))
    }
}

/// 三种指标共用一个假引擎
pub fn fake_engines() -> (Arc<FakeEngine>, EngineSet) {
    let engine = Arc::new(FakeEngine::default());
    let set = EngineSet::empty()
        .with_pesq(engine.clone())
        .with_stoi(engine.clone())
        .with_dnsmos(engine.clone());
    (engine, set)
}
