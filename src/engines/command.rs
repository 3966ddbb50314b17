//! 外部命令评分引擎
//!
//! 通过子进程调用真实的评分实现（PESQ/STOI/DNSMOS）。信号以32位浮点单声道WAV写入临时目录，
//! 命令约定如下（`<base_args>` 来自配置）：
//!
//! ```text
//! <program> <base_args..> pesq   --rate <sr> --mode <nb|wb> <reference.wav> <degraded.wav>
//! <program> <base_args..> stoi   --rate <sr> [--extended]   <reference.wav> <degraded.wav>
//! <program> <base_args..> dnsmos --rate <sr>                <processed.wav>
//! ```
//!
//! stdout最后一个非空行为分数：pesq/stoi一个值，dnsmos四个值（空白或逗号分隔）。

use super::{DnsmosEngine, DnsmosScores, PesqEngine, PesqMode, StoiEngine};
use crate::error::{self, EvalResult, MetricError};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// 外部命令引擎
#[derive(Debug, Clone)]
pub struct ExternalCommandEngine {
    program: PathBuf,
    base_args: Vec<String>,
}

impl ExternalCommandEngine {
    pub fn new(program: impl Into<PathBuf>, base_args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            base_args,
        }
    }

    /// 从命令行字符串构造（按空白切分，第一个词为程序）
    pub fn from_command_line(command_line: &str) -> EvalResult<Self> {
        let mut parts = command_line.split_whitespace();
        let program = parts.next().ok_or_else(|| {
            MetricError::InvalidInput("引擎命令为空 / engine command is empty".to_string())
        })?;
        Ok(Self::new(program, parts.map(str::to_string).collect()))
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    /// 把单声道信号写成32位浮点WAV
    fn write_signal(
        dir: &Path,
        name: &str,
        sample_rate: u32,
        samples: &[f32],
    ) -> EvalResult<PathBuf> {
        let path = dir.join(name);
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate,
            bits_per_sample: 32,
            sample_format: hound::SampleFormat::Float,
        };
        let mut writer = hound::WavWriter::create(&path, spec)?;
        for &sample in samples {
            writer.write_sample(sample)?;
        }
        writer.finalize()?;
        Ok(path)
    }

    /// 执行命令并解析分数
    fn run(&self, args: Vec<OsString>, expected: usize) -> EvalResult<Vec<f64>> {
        tracing::debug!(
            program = %self.program.display(),
            ?args,
            "invoking external scoring engine"
        );

        let output = Command::new(&self.program)
            .args(&self.base_args)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .map_err(|e| {
                error::engine_error(
                    &format!("无法启动评分引擎 / failed to spawn {}", self.program.display()),
                    e,
                )
            })?;

        if !output.status.success() {
            return Err(MetricError::EngineError(format!(
                "评分引擎退出状态非零 / engine exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        parse_scores(&String::from_utf8_lossy(&output.stdout), expected)
    }
}

/// 解析stdout最后一个非空行中的分数
pub(crate) fn parse_scores(stdout: &str, expected: usize) -> EvalResult<Vec<f64>> {
    let line = stdout
        .lines()
        .rev()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .ok_or_else(|| MetricError::EngineError("评分引擎没有输出 / engine printed nothing".to_string()))?;

    let values = line
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|t| !t.is_empty())
        .map(|t| t.parse::<f64>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| error::engine_error(&format!("无法解析引擎输出 / cannot parse '{line}'"), e))?;

    if values.len() != expected {
        return Err(MetricError::EngineError(format!(
            "引擎输出分数个数不符 / expected {expected} score(s), got {}: '{line}'",
            values.len()
        )));
    }

    Ok(values)
}

fn pair_args(
    dir: &Path,
    sample_rate: u32,
    reference: &[f32],
    degraded: &[f32],
) -> EvalResult<(OsString, OsString)> {
    let reference = ExternalCommandEngine::write_signal(dir, "reference.wav", sample_rate, reference)?;
    let degraded = ExternalCommandEngine::write_signal(dir, "degraded.wav", sample_rate, degraded)?;
    Ok((reference.into_os_string(), degraded.into_os_string()))
}

impl PesqEngine for ExternalCommandEngine {
    fn name(&self) -> &'static str {
        "external-command"
    }

    fn pesq(
        &self,
        sample_rate: u32,
        reference: &[f32],
        degraded: &[f32],
        mode: PesqMode,
    ) -> EvalResult<f64> {
        let dir = tempfile::tempdir()?;
        let (reference, degraded) = pair_args(dir.path(), sample_rate, reference, degraded)?;
        let args = vec![
            "pesq".into(),
            "--rate".into(),
            sample_rate.to_string().into(),
            "--mode".into(),
            mode.as_str().into(),
            reference,
            degraded,
        ];
        Ok(self.run(args, 1)?[0])
    }
}

impl StoiEngine for ExternalCommandEngine {
    fn name(&self) -> &'static str {
        "external-command"
    }

    fn stoi(
        &self,
        reference: &[f32],
        degraded: &[f32],
        sample_rate: u32,
        extended: bool,
    ) -> EvalResult<f64> {
        let dir = tempfile::tempdir()?;
        let (reference, degraded) = pair_args(dir.path(), sample_rate, reference, degraded)?;
        let mut args: Vec<OsString> = vec![
            "stoi".into(),
            "--rate".into(),
            sample_rate.to_string().into(),
        ];
        if extended {
            args.push("--extended".into());
        }
        args.push(reference);
        args.push(degraded);
        Ok(self.run(args, 1)?[0])
    }
}

impl DnsmosEngine for ExternalCommandEngine {
    fn name(&self) -> &'static str {
        "external-command"
    }

    fn dnsmos(&self, sample_rate: u32, processed: &[f32]) -> EvalResult<DnsmosScores> {
        let dir = tempfile::tempdir()?;
        let processed = Self::write_signal(dir.path(), "processed.wav", sample_rate, processed)?;
        let args = vec![
            "dnsmos".into(),
            "--rate".into(),
            sample_rate.to_string().into(),
            processed.into_os_string(),
        ];
        let values = self.run(args, 4)?;
        Ok(DnsmosScores {
            p808_mos: values[0],
            mos_sig: values[1],
            mos_bak: values[2],
            mos_ovr: values[3],
        })
    }
}
