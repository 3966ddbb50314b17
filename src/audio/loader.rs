//! 波形加载器
//!
//! 把音频文件解码为 [`Waveform`]。WAV优先走hound（更快），失败或其他格式回退到symphonia。
//! 评估核心只依赖 [`WaveformLoader`] trait，测试可替换为内存实现。

use super::waveform::Waveform;
use crate::error::{self, EvalResult, MetricError};
use std::path::Path;

/// 加载器支持的文件扩展名
pub const SUPPORTED_EXTENSIONS: &[&str] = &["wav", "flac", "mp3", "m4a", "aac", "ogg", "aiff"];

/// 波形加载器trait
pub trait WaveformLoader: Send + Sync {
    /// 加载器名称
    fn name(&self) -> &'static str;

    /// 把文件解码为交错f32波形（保持原生采样率与声道数）
    fn load(&self, path: &Path) -> EvalResult<Waveform>;
}

/// 基于文件系统的默认加载器
#[derive(Debug, Default, Clone, Copy)]
pub struct FileWaveformLoader;

impl FileWaveformLoader {
    pub fn new() -> Self {
        Self
    }

    /// 使用hound解码WAV文件
    fn decode_with_hound(&self, path: &Path) -> EvalResult<Waveform> {
        let mut reader = hound::WavReader::open(path)?;
        let spec = reader.spec();

        let samples: Vec<f32> = match spec.sample_format {
            hound::SampleFormat::Float => reader.samples::<f32>().collect::<Result<_, _>>()?,
            hound::SampleFormat::Int => {
                if spec.bits_per_sample == 0 || spec.bits_per_sample > 32 {
                    return Err(MetricError::FormatError(format!(
                        "不支持的位深度: {}位",
                        spec.bits_per_sample
                    )));
                }
                let scale = (1u64 << (spec.bits_per_sample - 1)) as f64;
                reader
                    .samples::<i32>()
                    .map(|s| s.map(|v| (v as f64 / scale) as f32))
                    .collect::<Result<_, _>>()?
            }
        };

        Waveform::new(samples, spec.sample_rate, spec.channels)
    }

    /// 使用symphonia通用解码
    fn decode_with_symphonia(&self, path: &Path) -> EvalResult<Waveform> {
        use symphonia::core::codecs::{CODEC_TYPE_NULL, DecoderOptions};
        use symphonia::core::errors::Error as SymphoniaError;
        use symphonia::core::formats::FormatOptions;
        use symphonia::core::io::MediaSourceStream;
        use symphonia::core::meta::MetadataOptions;
        use symphonia::core::probe::Hint;

        let file = std::fs::File::open(path)?;
        let mss = MediaSourceStream::new(Box::new(file), Default::default());

        let mut hint = Hint::new();
        if let Some(extension) = path.extension() {
            hint.with_extension(&extension.to_string_lossy());
        }

        let probed = symphonia::default::get_probe()
            .format(
                &hint,
                mss,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .map_err(|e| error::format_error("格式探测失败", e))?;

        let mut format_reader = probed.format;

        let track = format_reader
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(|| MetricError::FormatError("未找到音频轨道".to_string()))?;

        let track_id = track.id;
        let codec_params = track.codec_params.clone();

        let mut decoder = symphonia::default::get_codecs()
            .make(&codec_params, &DecoderOptions::default())
            .map_err(|e| error::format_error("创建解码器失败", e))?;

        let sample_rate = codec_params
            .sample_rate
            .ok_or_else(|| MetricError::FormatError("无法获取采样率信息".to_string()))?;
        let mut channels = codec_params.channels.map(|ch| ch.count() as u16);

        let mut all_samples = Vec::new();

        loop {
            let packet = match format_reader.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::ResetRequired) => {
                    decoder.reset();
                    continue;
                }
                Err(SymphoniaError::IoError(ref e))
                    if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    break;
                }
                Err(e) => return Err(error::decoding_error("读取包失败", e)),
            };

            if packet.track_id() != track_id {
                continue;
            }

            match decoder.decode(&packet) {
                Ok(audio_buf) => {
                    let buf_channels = convert_buffer_to_interleaved(&audio_buf, &mut all_samples);
                    channels.get_or_insert(buf_channels);
                }
                Err(SymphoniaError::IoError(ref e))
                    if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    break;
                }
                // 损坏的包直接跳过
                Err(SymphoniaError::DecodeError(_)) => continue,
                Err(e) => return Err(error::decoding_error("解码失败", e)),
            }
        }

        let channels =
            channels.ok_or_else(|| MetricError::FormatError("无法获取声道数信息".to_string()))?;

        Waveform::new(all_samples, sample_rate, channels)
    }
}

impl WaveformLoader for FileWaveformLoader {
    fn name(&self) -> &'static str {
        "File Loader (hound + symphonia)"
    }

    fn load(&self, path: &Path) -> EvalResult<Waveform> {
        if !path.is_file() {
            return Err(MetricError::IoError(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("文件不存在 / File not found: {}", path.display()),
            )));
        }

        let is_wav = path
            .extension()
            .and_then(|s| s.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("wav"));

        if is_wav {
            match self.decode_with_hound(path) {
                Ok(wave) => return Ok(wave),
                Err(e) => {
                    tracing::debug!(
                        path = %path.display(),
                        error = %e,
                        "hound解码失败，回退到symphonia / hound failed, falling back to symphonia"
                    );
                }
            }
        }

        self.decode_with_symphonia(path)
    }
}

/// 把symphonia缓冲区追加为交错f32样本，返回缓冲区声道数
fn convert_buffer_to_interleaved(
    audio_buf: &symphonia::core::audio::AudioBufferRef,
    samples: &mut Vec<f32>,
) -> u16 {
    use symphonia::core::audio::{AudioBufferRef, Signal};

    macro_rules! convert_samples {
        ($buf:expr, $converter:expr) => {{
            let channel_count = $buf.spec().channels.count();
            let frame_count = $buf.frames();
            samples.reserve(channel_count * frame_count);
            for frame in 0..frame_count {
                for ch in 0..channel_count {
                    samples.push($converter($buf.chan(ch)[frame]));
                }
            }
            channel_count as u16
        }};
    }

    match audio_buf {
        AudioBufferRef::F32(buf) => convert_samples!(buf, |s| s),
        AudioBufferRef::S16(buf) => convert_samples!(buf, |s| (s as f32) / 32768.0),
        AudioBufferRef::S24(buf) => {
            convert_samples!(buf, |s: symphonia::core::sample::i24| (s.inner() as f32)
                / 8388608.0)
        }
        AudioBufferRef::S32(buf) => convert_samples!(buf, |s| (s as f64 / 2147483648.0) as f32),
        AudioBufferRef::F64(buf) => convert_samples!(buf, |s| s as f32),
        AudioBufferRef::U8(buf) => convert_samples!(buf, |s| ((s as f32) - 128.0) / 128.0),
        AudioBufferRef::U16(buf) => convert_samples!(buf, |s| ((s as f32) - 32768.0) / 32768.0),
        AudioBufferRef::U24(buf) => {
            convert_samples!(buf, |s: symphonia::core::sample::u24| ((s.inner() as f32)
                - 8388608.0)
                / 8388608.0)
        }
        AudioBufferRef::U32(buf) => {
            convert_samples!(buf, |s| (((s as f64) - 2147483648.0) / 2147483648.0) as f32)
        }
        AudioBufferRef::S8(buf) => convert_samples!(buf, |s| (s as f32) / 128.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn write_wav(path: &Path, sample_rate: u32, channels: u16, frames: usize) {
        let spec = hound::WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for i in 0..frames {
            let value = ((i as f32 * 0.01).sin() * 16000.0) as i16;
            for _ in 0..channels {
                writer.write_sample(value).unwrap();
            }
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn test_load_reports_native_rate_and_channels() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("stereo.wav");
        write_wav(&path, 22050, 2, 500);

        let wave = FileWaveformLoader::new().load(&path).unwrap();
        assert_eq!(wave.sample_rate(), 22050);
        assert_eq!(wave.channels(), 2);
        assert_eq!(wave.len(), 500);
        assert!(wave.samples().iter().all(|s| s.abs() <= 1.0));
    }

    #[test]
    fn test_load_float_wav_is_lossless() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("float.wav");
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 16000,
            bits_per_sample: 32,
            sample_format: hound::SampleFormat::Float,
        };
        let mut writer = hound::WavWriter::create(&path, spec).unwrap();
        for s in [0.25f32, -0.5, 0.125] {
            writer.write_sample(s).unwrap();
        }
        writer.finalize().unwrap();

        let wave = FileWaveformLoader::new().load(&path).unwrap();
        assert_eq!(wave.samples(), &[0.25, -0.5, 0.125]);
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let result = FileWaveformLoader::new().load(Path::new("definitely/missing.wav"));
        assert!(matches!(result, Err(MetricError::IoError(_))));
    }

    #[test]
    fn test_load_garbage_fails_without_panic() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("broken.wav");
        std::fs::write(&path, b"not a wav file at all").unwrap();
        assert!(FileWaveformLoader::new().load(&path).is_err());
    }
}
