//! 指标门面集成测试
//!
//! 通过真实的WAV文件走完 加载 → 调理 → 计算 的完整路径。

mod common;

use common::{FakeEngine, degrade, fake_engines, speechlike, write_wav_f32, write_wav_i16};
use speech_eval_tool::engines::EngineSet;
use speech_eval_tool::error::MetricError;
use speech_eval_tool::metrics::{EvaluationConfig, MetricEvaluator};
use speech_eval_tool::{SI_SDR_INFINITE, WaveformLoader};
use std::sync::Arc;

fn si_sdr_only() -> MetricEvaluator {
    MetricEvaluator::new(EngineSet::empty(), EvaluationConfig::default())
}

#[test]
fn test_half_amplitude_fixture_matches_unscaled_score() {
    let dir = tempfile::tempdir().unwrap();
    let clean = speechlike(16000, 16000, 1);
    let processed = degrade(&clean, 0.3, 9);
    let halved: Vec<f32> = processed.iter().map(|s| s * 0.5).collect();

    // 浮点WAV保证0.5缩放是精确的
    let clean_path = write_wav_f32(&dir.path().join("clean.wav"), &clean, 16000, 1);
    let proc_path = write_wav_f32(&dir.path().join("proc.wav"), &processed, 16000, 1);
    let half_path = write_wav_f32(&dir.path().join("half.wav"), &halved, 16000, 1);

    let evaluator = si_sdr_only();
    let base = evaluator.si_sdr_files(&clean_path, &proc_path).unwrap();
    let scaled = evaluator.si_sdr_files(&clean_path, &half_path).unwrap();

    assert!(base.is_finite());
    assert!(
        (base - scaled).abs() < 1e-6,
        "0.5倍缩放不应改变SI-SDR: {base} vs {scaled}"
    );
}

#[test]
fn test_identical_files_give_infinite_sentinel() {
    let dir = tempfile::tempdir().unwrap();
    let clean = speechlike(8000, 16000, 2);
    let a = write_wav_i16(&dir.path().join("a.wav"), &clean, 16000, 1);
    let b = write_wav_i16(&dir.path().join("b.wav"), &clean, 16000, 1);

    assert_eq!(si_sdr_only().si_sdr_files(&a, &b).unwrap(), SI_SDR_INFINITE);
}

#[test]
fn test_stereo_and_length_mismatch_are_conditioned() {
    let dir = tempfile::tempdir().unwrap();
    let mono = speechlike(4000, 16000, 3);
    let stereo: Vec<f32> = mono.iter().flat_map(|&s| [s, s]).collect();
    let longer: Vec<f32> = mono.iter().chain(mono.iter()).copied().collect();

    let clean = write_wav_f32(&dir.path().join("clean.wav"), &stereo, 16000, 2);
    let processed = write_wav_f32(&dir.path().join("proc.wav"), &longer, 16000, 1);

    // 下混后相同、截断到4000帧 -> 完美重建
    let score = si_sdr_only().si_sdr_files(&clean, &processed).unwrap();
    assert_eq!(score, SI_SDR_INFINITE);
}

#[test]
fn test_constant_reference_file_is_degenerate() {
    let dir = tempfile::tempdir().unwrap();
    let clean = write_wav_f32(&dir.path().join("dc.wav"), &[0.25; 1600], 16000, 1);
    let processed = write_wav_f32(
        &dir.path().join("proc.wav"),
        &speechlike(1600, 16000, 4),
        16000,
        1,
    );
    assert!(matches!(
        si_sdr_only().si_sdr_files(&clean, &processed),
        Err(MetricError::DegenerateSignal(_))
    ));
}

#[test]
fn test_si_sdr_rate_mismatch_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let signal = speechlike(1600, 16000, 5);
    let a = write_wav_f32(&dir.path().join("a.wav"), &signal, 16000, 1);
    let b = write_wav_f32(&dir.path().join("b.wav"), &signal, 8000, 1);
    assert!(matches!(
        si_sdr_only().si_sdr_files(&a, &b),
        Err(MetricError::RateMismatch {
            expected: 16000,
            actual: 8000
        })
    ));
}

#[test]
fn test_missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let a = write_wav_f32(&dir.path().join("a.wav"), &[0.1, 0.2], 16000, 1);
    let result = si_sdr_only().si_sdr_files(&a, &dir.path().join("nope.wav"));
    assert!(matches!(result, Err(MetricError::IoError(_))));
}

#[test]
fn test_pesq_resamples_44k_input() {
    let dir = tempfile::tempdir().unwrap();
    let clean = write_wav_i16(
        &dir.path().join("clean.wav"),
        &speechlike(44100, 44100, 6),
        44100,
        1,
    );
    let processed = write_wav_i16(
        &dir.path().join("proc.wav"),
        &speechlike(16000, 16000, 7),
        16000,
        1,
    );

    let (engine, engines) = fake_engines();
    let evaluator = MetricEvaluator::new(engines, EvaluationConfig::default());
    assert_eq!(evaluator.pesq_files(&clean, &processed).unwrap(), 3.5);
    assert_eq!(engine.call_count(), 1);
}

#[test]
fn test_stoi_rejects_non_16k_without_calling_engine() {
    let dir = tempfile::tempdir().unwrap();
    let signal = speechlike(4410, 44100, 8);
    let a = write_wav_f32(&dir.path().join("a.wav"), &signal, 44100, 1);
    let b = write_wav_f32(&dir.path().join("b.wav"), &signal, 44100, 1);

    let engine = Arc::new(FakeEngine::default());
    let evaluator = MetricEvaluator::new(
        EngineSet::empty().with_stoi(engine.clone()),
        EvaluationConfig::default(),
    );
    assert!(matches!(
        evaluator.stoi_files(&a, &b),
        Err(MetricError::RateMismatch { expected: 16000, .. })
    ));
    assert_eq!(engine.call_count(), 0);
}

#[test]
fn test_dnsmos_needs_only_processed_file() {
    let dir = tempfile::tempdir().unwrap();
    let stereo: Vec<f32> = speechlike(4800, 48000, 9)
        .into_iter()
        .flat_map(|s| [s, -s * 0.5])
        .collect();
    let processed = write_wav_f32(&dir.path().join("enh.wav"), &stereo, 48000, 2);

    let (engine, engines) = fake_engines();
    let evaluator = MetricEvaluator::new(engines, EvaluationConfig::default());
    let scores = evaluator.dnsmos_file(&processed).unwrap();
    assert_eq!(scores.mos_bak, 3.9);
    assert_eq!(engine.call_count(), 1);
}

#[test]
fn test_missing_engine_is_reported_before_decoding() {
    let evaluator = si_sdr_only();
    let result = evaluator.pesq_files("missing-a.wav".as_ref(), "missing-b.wav".as_ref());
    assert!(matches!(result, Err(MetricError::EngineUnavailable("PESQ"))));
}

#[test]
fn test_loader_reports_native_rate_and_channels() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_wav_i16(&dir.path().join("st.wav"), &[0.5, -0.5, 0.25, -0.25], 22050, 2);
    let waveform = speech_eval_tool::FileWaveformLoader::new()
        .load(&path)
        .unwrap();
    assert_eq!(waveform.sample_rate(), 22050);
    assert_eq!(waveform.channels(), 2);
    assert_eq!(waveform.len(), 2);
    assert!((waveform.samples()[0] - 0.5).abs() < 1e-3);
}
