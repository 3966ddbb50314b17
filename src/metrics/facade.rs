//! 指标门面
//!
//! 每个指标一个入口：接收两个文件路径或两段已加载的波形，
//! 先执行该指标自身的前置条件，再交给SI-SDR估计器或外部评分引擎。
//!
//! | 指标    | 采样率处理                      |
//! |---------|---------------------------------|
//! | SI-SDR  | 断言两者相同（任意采样率）      |
//! | PESQ    | 重采样到目标采样率（默认16kHz） |
//! | STOI    | 断言两者均为16kHz               |
//! | DNSMOS  | 无参考，重采样到配置的采样率    |

use super::{MetricColumn, MetricKind};
use crate::audio::{FileWaveformLoader, Waveform, WaveformLoader};
use crate::core::si_sdr;
use crate::engines::{
    DnsmosEngine, DnsmosScores, EngineSet, PesqEngine, PesqMode, StoiEngine, StoiScores,
};
use crate::error::{EvalResult, MetricError};
use crate::processing::{condition_pair, resample_to, to_mono};
use crate::tools::constants::{defaults, rates};
use std::path::Path;

/// 指标计算参数
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvaluationConfig {
    /// PESQ目标采样率（8000或16000）
    pub pesq_rate: u32,
    pub pesq_mode: PesqMode,
    /// DNSMOS输入采样率
    pub dnsmos_rate: u32,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            pesq_rate: defaults::PESQ_TARGET_RATE,
            pesq_mode: PesqMode::default(),
            dnsmos_rate: defaults::DNSMOS_RATE,
        }
    }
}

impl EvaluationConfig {
    /// 校验PESQ采样率与模式组合
    pub fn validate_pesq(&self) -> EvalResult<()> {
        if !rates::PESQ_RATES.contains(&self.pesq_rate) {
            return Err(MetricError::UnsupportedRate {
                rate: self.pesq_rate,
                reason: "PESQ仅支持8000或16000 Hz / PESQ accepts 8000 or 16000 Hz".to_string(),
            });
        }
        if !self.pesq_mode.supports_rate(self.pesq_rate) {
            return Err(MetricError::UnsupportedRate {
                rate: self.pesq_rate,
                reason: format!(
                    "PESQ {} 模式需要16000 Hz / PESQ mode {} requires 16000 Hz",
                    self.pesq_mode, self.pesq_mode
                ),
            });
        }
        Ok(())
    }
}

// ==================== 波形级函数 ====================

/// SI-SDR：断言采样率一致，下混并按起点截断后计算
pub fn compute_si_sdr(clean: &Waveform, processed: &Waveform) -> EvalResult<f64> {
    let pair = condition_pair(clean.clone(), processed.clone(), None)?;
    si_sdr(pair.clean(), pair.processed())
}

/// PESQ：重采样到目标采样率后交给引擎
pub fn compute_pesq(
    engine: &dyn PesqEngine,
    clean: &Waveform,
    processed: &Waveform,
    config: &EvaluationConfig,
) -> EvalResult<f64> {
    config.validate_pesq()?;
    let pair = condition_pair(clean.clone(), processed.clone(), Some(config.pesq_rate))?;
    engine.pesq(
        pair.sample_rate(),
        pair.clean().samples(),
        pair.processed().samples(),
        config.pesq_mode,
    )
}

/// STOI与ESTOI：两者都必须恰好是16kHz，不做重采样
pub fn compute_stoi(
    engine: &dyn StoiEngine,
    clean: &Waveform,
    processed: &Waveform,
) -> EvalResult<StoiScores> {
    for waveform in [clean, processed] {
        if waveform.sample_rate() != rates::STOI_RATE {
            return Err(MetricError::RateMismatch {
                expected: rates::STOI_RATE,
                actual: waveform.sample_rate(),
            });
        }
    }

    let pair = condition_pair(clean.clone(), processed.clone(), None)?;
    let (reference, degraded) = (pair.clean().samples(), pair.processed().samples());
    Ok(StoiScores {
        stoi: engine.stoi(reference, degraded, rates::STOI_RATE, false)?,
        estoi: engine.stoi(reference, degraded, rates::STOI_RATE, true)?,
    })
}

/// DNSMOS：只用处理后的信号
pub fn compute_dnsmos(
    engine: &dyn DnsmosEngine,
    processed: &Waveform,
    sample_rate: u32,
) -> EvalResult<DnsmosScores> {
    let mono = to_mono(resample_to(processed.clone(), sample_rate)?);
    if mono.is_empty() {
        return Err(MetricError::EmptySignal(
            "DNSMOS输入为空 / DNSMOS input is empty".to_string(),
        ));
    }
    engine.dnsmos(sample_rate, mono.samples())
}

// ==================== 评估器 ====================

/// 指标评估器
///
/// 持有加载器与引擎集合，生命周期覆盖一次运行。批处理中只读共享。
pub struct MetricEvaluator {
    loader: Box<dyn WaveformLoader>,
    engines: EngineSet,
    config: EvaluationConfig,
}

impl MetricEvaluator {
    pub fn new(engines: EngineSet, config: EvaluationConfig) -> Self {
        Self::with_loader(Box::new(FileWaveformLoader::new()), engines, config)
    }

    pub fn with_loader(
        loader: Box<dyn WaveformLoader>,
        engines: EngineSet,
        config: EvaluationConfig,
    ) -> Self {
        Self {
            loader,
            engines,
            config,
        }
    }

    pub fn config(&self) -> &EvaluationConfig {
        &self.config
    }

    pub fn engines(&self) -> &EngineSet {
        &self.engines
    }

    pub fn load(&self, path: &Path) -> EvalResult<Waveform> {
        let waveform = self.loader.load(path)?;
        tracing::debug!(
            loader = self.loader.name(),
            path = %path.display(),
            sample_rate = waveform.sample_rate(),
            channels = waveform.channels(),
            seconds = waveform.duration_seconds(),
            "loaded waveform"
        );
        Ok(waveform)
    }

    fn pesq_engine(&self) -> EvalResult<&dyn PesqEngine> {
        self.engines
            .pesq
            .as_deref()
            .ok_or(MetricError::EngineUnavailable("PESQ"))
    }

    fn stoi_engine(&self) -> EvalResult<&dyn StoiEngine> {
        self.engines
            .stoi
            .as_deref()
            .ok_or(MetricError::EngineUnavailable("STOI"))
    }

    fn dnsmos_engine(&self) -> EvalResult<&dyn DnsmosEngine> {
        self.engines
            .dnsmos
            .as_deref()
            .ok_or(MetricError::EngineUnavailable("DNSMOS"))
    }

    pub fn si_sdr(&self, clean: &Waveform, processed: &Waveform) -> EvalResult<f64> {
        compute_si_sdr(clean, processed)
    }

    pub fn pesq(&self, clean: &Waveform, processed: &Waveform) -> EvalResult<f64> {
        compute_pesq(self.pesq_engine()?, clean, processed, &self.config)
    }

    pub fn stoi(&self, clean: &Waveform, processed: &Waveform) -> EvalResult<StoiScores> {
        compute_stoi(self.stoi_engine()?, clean, processed)
    }

    pub fn dnsmos(&self, processed: &Waveform) -> EvalResult<DnsmosScores> {
        compute_dnsmos(self.dnsmos_engine()?, processed, self.config.dnsmos_rate)
    }

    pub fn si_sdr_files(&self, clean: &Path, processed: &Path) -> EvalResult<f64> {
        self.si_sdr(&self.load(clean)?, &self.load(processed)?)
    }

    pub fn pesq_files(&self, clean: &Path, processed: &Path) -> EvalResult<f64> {
        // 引擎缺失时不必解码
        self.pesq_engine()?;
        self.pesq(&self.load(clean)?, &self.load(processed)?)
    }

    pub fn stoi_files(&self, clean: &Path, processed: &Path) -> EvalResult<StoiScores> {
        self.stoi_engine()?;
        self.stoi(&self.load(clean)?, &self.load(processed)?)
    }

    pub fn dnsmos_file(&self, processed: &Path) -> EvalResult<DnsmosScores> {
        self.dnsmos_engine()?;
        self.dnsmos(&self.load(processed)?)
    }

    /// 对已加载的波形计算一个指标，返回该指标所有列的分数
    ///
    /// 无参考指标（DNSMOS）不使用 `clean`；其余指标缺少 `clean` 时返回 `InvalidInput`。
    pub fn evaluate(
        &self,
        kind: MetricKind,
        clean: Option<&Waveform>,
        processed: &Waveform,
    ) -> EvalResult<Vec<(MetricColumn, f64)>> {
        let reference = || {
            clean.ok_or_else(|| {
                MetricError::InvalidInput(format!(
                    "{kind} 需要参考信号 / {kind} needs a clean reference"
                ))
            })
        };
        match kind {
            MetricKind::SiSdr => Ok(vec![(
                MetricColumn::SiSdr,
                self.si_sdr(reference()?, processed)?,
            )]),
            MetricKind::Pesq => Ok(vec![(MetricColumn::Pesq, self.pesq(reference()?, processed)?)]),
            MetricKind::Stoi => {
                let scores = self.stoi(reference()?, processed)?;
                Ok(vec![
                    (MetricColumn::Stoi, scores.stoi),
                    (MetricColumn::Estoi, scores.estoi),
                ])
            }
            MetricKind::Dnsmos => {
                let scores = self.dnsmos(processed)?;
                Ok(vec![
                    (MetricColumn::DnsmosP808, scores.p808_mos),
                    (MetricColumn::DnsmosSig, scores.mos_sig),
                    (MetricColumn::DnsmosBak, scores.mos_bak),
                    (MetricColumn::DnsmosOvr, scores.mos_ovr),
                ])
            }
        }
    }
}

impl std::fmt::Debug for MetricEvaluator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetricEvaluator")
            .field("loader", &self.loader.name())
            .field("engines", &self.engines)
            .field("config", &self.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// 记录收到的输入并返回固定分数
    #[derive(Default)]
    struct RecordingEngine {
        calls: Mutex<Vec<(u32, usize, bool)>>,
    }

    impl PesqEngine for RecordingEngine {
        fn name(&self) -> &'static str {
            "recording"
        }
        fn pesq(&self, sr: u32, r: &[f32], d: &[f32], _: PesqMode) -> EvalResult<f64> {
            assert_eq!(r.len(), d.len());
            self.calls.lock().unwrap().push((sr, r.len(), false));
            Ok(3.5)
        }
    }

    impl StoiEngine for RecordingEngine {
        fn name(&self) -> &'static str {
            "recording"
        }
        fn stoi(&self, r: &[f32], d: &[f32], sr: u32, extended: bool) -> EvalResult<f64> {
            assert_eq!(r.len(), d.len());
            self.calls.lock().unwrap().push((sr, r.len(), extended));
            Ok(if extended { 0.8 } else { 0.9 })
        }
    }

    impl DnsmosEngine for RecordingEngine {
        fn name(&self) -> &'static str {
            "recording"
        }
        fn dnsmos(&self, sr: u32, p: &[f32]) -> EvalResult<DnsmosScores> {
            self.calls.lock().unwrap().push((sr, p.len(), false));
            Ok(DnsmosScores {
                p808_mos: 3.0,
                mos_sig: 3.1,
                mos_bak: 3.2,
                mos_ovr: 3.3,
            })
        }
    }

    fn tone(frames: usize, rate: u32, channels: u16) -> Waveform {
        let samples = (0..frames)
            .flat_map(|i| {
                let v = (2.0 * std::f32::consts::PI * 250.0 * i as f32 / rate as f32).sin();
                std::iter::repeat_n(v, channels as usize)
            })
            .collect();
        Waveform::new(samples, rate, channels).unwrap()
    }

    #[test]
    fn test_pesq_resamples_and_truncates() {
        let engine = RecordingEngine::default();
        let clean = tone(4800, 48000, 2);
        let processed = tone(1000, 16000, 1);
        let score = compute_pesq(&engine, &clean, &processed, &EvaluationConfig::default()).unwrap();
        assert_eq!(score, 3.5);
        assert_eq!(engine.calls.lock().unwrap()[0], (16000, 1000, false));
    }

    #[test]
    fn test_pesq_rejects_wideband_at_8k() {
        let engine = RecordingEngine::default();
        let config = EvaluationConfig {
            pesq_rate: 8000,
            ..EvaluationConfig::default()
        };
        let result = compute_pesq(&engine, &tone(100, 8000, 1), &tone(100, 8000, 1), &config);
        assert!(matches!(
            result,
            Err(MetricError::UnsupportedRate { rate: 8000, .. })
        ));

        let narrow = EvaluationConfig {
            pesq_mode: PesqMode::Narrowband,
            ..config
        };
        assert!(compute_pesq(&engine, &tone(100, 8000, 1), &tone(100, 8000, 1), &narrow).is_ok());
    }

    #[test]
    fn test_stoi_requires_exact_16k() {
        let engine = RecordingEngine::default();
        let result = compute_stoi(&engine, &tone(100, 16000, 1), &tone(100, 22050, 1));
        assert!(matches!(
            result,
            Err(MetricError::RateMismatch {
                expected: 16000,
                actual: 22050
            })
        ));
        assert!(engine.calls.lock().unwrap().is_empty());
    }

    #[test]
    fn test_stoi_returns_both_variants() {
        let engine = RecordingEngine::default();
        let scores = compute_stoi(&engine, &tone(1600, 16000, 2), &tone(1200, 16000, 1)).unwrap();
        assert_eq!(scores, StoiScores { stoi: 0.9, estoi: 0.8 });
        let calls = engine.calls.lock().unwrap();
        assert_eq!(*calls, vec![(16000, 1200, false), (16000, 1200, true)]);
    }

    #[test]
    fn test_dnsmos_is_reference_free() {
        let engine = RecordingEngine::default();
        let scores = compute_dnsmos(&engine, &tone(4410, 44100, 2), 16000).unwrap();
        assert_eq!(scores.mos_ovr, 3.3);
        assert_eq!(engine.calls.lock().unwrap()[0], (16000, 1600, false));
    }

    #[test]
    fn test_si_sdr_does_not_resample() {
        let result = compute_si_sdr(&tone(100, 16000, 1), &tone(100, 8000, 1));
        assert!(matches!(result, Err(MetricError::RateMismatch { .. })));
    }

    #[test]
    fn test_evaluator_without_engines() {
        let evaluator = MetricEvaluator::new(EngineSet::empty(), EvaluationConfig::default());
        let x = tone(800, 16000, 1);
        assert!(matches!(
            evaluator.evaluate(MetricKind::Pesq, Some(&x), &x),
            Err(MetricError::EngineUnavailable("PESQ"))
        ));
        let si = evaluator.evaluate(MetricKind::SiSdr, Some(&x), &x).unwrap();
        assert_eq!(si, vec![(MetricColumn::SiSdr, f64::INFINITY)]);
    }

    #[test]
    fn test_evaluator_expands_columns() {
        let engine = Arc::new(RecordingEngine::default());
        let engines = EngineSet::empty()
            .with_stoi(engine.clone())
            .with_dnsmos(engine);
        let evaluator = MetricEvaluator::new(engines, EvaluationConfig::default());
        let x = tone(800, 16000, 1);

        let stoi = evaluator.evaluate(MetricKind::Stoi, Some(&x), &x).unwrap();
        assert_eq!(
            stoi,
            vec![(MetricColumn::Stoi, 0.9), (MetricColumn::Estoi, 0.8)]
        );
        // DNSMOS不需要参考信号
        let dnsmos = evaluator.evaluate(MetricKind::Dnsmos, None, &x).unwrap();
        assert_eq!(dnsmos.len(), 4);
        assert_eq!(dnsmos[0].0, MetricColumn::DnsmosP808);
        assert!(matches!(
            evaluator.evaluate(MetricKind::Stoi, None, &x),
            Err(MetricError::InvalidInput(_))
        ));
    }
}
