//! Speech Eval Tool - 主程序入口
//!
//! 纯流程控制器，负责协调各个工具模块完成单对评估或批量评估任务。

use clap::Parser;
use speech_eval_tool::{
    audio::SUPPORTED_EXTENSIONS,
    engines::EngineSet,
    error::{ErrorCategory, EvalResult, MetricError},
    metrics::{EvaluationConfig, MetricColumn, MetricEvaluator, MetricKind},
    tools::{self, BatchArgs, BatchOptions, Cli, Commands, ReportOutcome, utils},
};
use std::path::Path;
use std::process;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// 错误退出码定义
mod exit_codes {
    /// 用法错误、路径错误及其他通用错误
    pub const GENERAL_ERROR: i32 = 1;
    /// 格式错误
    pub const FORMAT_ERROR: i32 = 2;
    /// 解码失败
    pub const DECODING_ERROR: i32 = 3;
    /// 数值前置条件不满足
    pub const PRECONDITION_ERROR: i32 = 4;
    /// 评分引擎/资源错误
    pub const ENGINE_ERROR: i32 = 5;
}

/// 获取错误建议文本
fn get_error_suggestion(error: &MetricError) -> &'static str {
    match error {
        MetricError::InvalidInput(_) => {
            "检查命令行参数与目录是否正确，使用 --help 查看完整用法 / Check arguments and directories, use --help to see full usage"
        }
        MetricError::EngineUnavailable(_) => {
            "使用 --engine 或环境变量 SPEECH_EVAL_ENGINE 指定外部评分引擎 / Configure an engine with --engine or SPEECH_EVAL_ENGINE"
        }
        MetricError::RateMismatch { .. } => {
            "先将两个文件重采样到相同采样率（STOI需要16kHz） / Resample both files to a common rate (STOI needs 16 kHz)"
        }
        MetricError::ResourceError(_) => {
            "资源不可用，请降低并发度（--parallel-files 1）后重试 / Resource unavailable, retry with --parallel-files 1"
        }
        _ => match ErrorCategory::from_metric_error(error) {
            ErrorCategory::Io => {
                "检查文件路径是否正确，文件是否存在且可读 / Check if file path is correct, file exists and is readable"
            }
            ErrorCategory::Format => {
                "确保输入文件为支持的格式 / Ensure input file is in a supported format"
            }
            ErrorCategory::Decoding => {
                "文件可能损坏或使用不支持的音频编码 / File may be corrupted or use unsupported audio encoding"
            }
            ErrorCategory::Precondition => {
                "检查音频是否包含有效（非静音）数据 / Check that the audio contains valid, non-silent data"
            }
            ErrorCategory::Engine => {
                "检查外部评分引擎的输出与错误信息 / Check the external engine output and stderr"
            }
            ErrorCategory::Other => {
                "请检查输入文件和参数设置 / Please check input file and parameter settings"
            }
        },
    }
}

/// 错误处理和建议
fn handle_error(error: MetricError) -> ! {
    eprintln!("[ERROR] 错误 / Error: {error}");

    let category = ErrorCategory::from_metric_error(&error);
    eprintln!("[INFO] 建议 / Suggestion: {}", get_error_suggestion(&error));

    if matches!(category, ErrorCategory::Format) {
        let formats: Vec<String> = SUPPORTED_EXTENSIONS
            .iter()
            .map(|s| s.to_uppercase())
            .collect();
        eprintln!(
            "   Supported formats / 支持的格式: {}",
            formats.join(", ")
        );
    }

    let exit_code = match &error {
        MetricError::ResourceError(_) => exit_codes::ENGINE_ERROR,
        _ => match category {
            ErrorCategory::Format => exit_codes::FORMAT_ERROR,
            ErrorCategory::Decoding => exit_codes::DECODING_ERROR,
            ErrorCategory::Precondition => exit_codes::PRECONDITION_ERROR,
            ErrorCategory::Engine => exit_codes::ENGINE_ERROR,
            ErrorCategory::Io | ErrorCategory::Other => exit_codes::GENERAL_ERROR,
        },
    };

    process::exit(exit_code);
}

/// 安装tracing订阅器（stderr）
fn init_tracing(verbose: bool) {
    let default_level = if verbose { "info" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn pair_label(clean: &Path, processed: &Path) -> String {
    format!(
        "{} vs {}",
        utils::extract_filename_lossy(clean),
        utils::extract_filename_lossy(processed)
    )
}

/// 单对SI-SDR
fn run_si_sdr(clean: &Path, processed: &Path) -> EvalResult<()> {
    let evaluator = MetricEvaluator::new(EngineSet::empty(), EvaluationConfig::default());
    let score = evaluator.si_sdr_files(clean, processed)?;
    println!(
        "SI-SDR ({}): {}",
        pair_label(clean, processed),
        MetricColumn::SiSdr.format_score(score)
    );
    Ok(())
}

/// 单对PESQ
fn run_pesq(
    clean: &Path,
    processed: &Path,
    config: EvaluationConfig,
    engines: EngineSet,
) -> EvalResult<()> {
    tools::validate_pesq_options(&config)?;
    let evaluator = MetricEvaluator::new(engines, config);
    let score = evaluator.pesq_files(clean, processed)?;
    println!(
        "PESQ ({}): {}",
        pair_label(clean, processed),
        MetricColumn::Pesq.format_score(score)
    );
    Ok(())
}

/// 单对STOI/ESTOI
fn run_stoi(clean: &Path, processed: &Path, engines: EngineSet) -> EvalResult<()> {
    let evaluator = MetricEvaluator::new(engines, EvaluationConfig::default());
    let scores = evaluator.stoi_files(clean, processed)?;
    let label = pair_label(clean, processed);
    println!(
        "STOI  ({label}): {}",
        MetricColumn::Stoi.format_score(scores.stoi)
    );
    println!(
        "ESTOI ({label}): {}",
        MetricColumn::Estoi.format_score(scores.estoi)
    );
    Ok(())
}

/// 单文件DNSMOS
fn run_dnsmos(processed: &Path, sample_rate: u32, engines: EngineSet) -> EvalResult<()> {
    let config = EvaluationConfig {
        dnsmos_rate: sample_rate,
        ..EvaluationConfig::default()
    };
    let evaluator = MetricEvaluator::new(engines, config);
    let scores = evaluator.dnsmos_file(processed)?;
    println!(
        "DNSMOS ({}): P808={}, SIG={}, BAK={}, OVR={}",
        utils::extract_filename_lossy(processed),
        MetricColumn::DnsmosP808.format_score(scores.p808_mos),
        MetricColumn::DnsmosSig.format_score(scores.mos_sig),
        MetricColumn::DnsmosBak.format_score(scores.mos_bak),
        MetricColumn::DnsmosOvr.format_score(scores.mos_ovr)
    );
    Ok(())
}

/// 批量评估两个目录
fn run_batch_mode(args: &BatchArgs, verbose: bool) -> EvalResult<()> {
    let metrics = args.metric_kinds();
    let config = args.evaluation_config();
    if metrics.contains(&MetricKind::Pesq) {
        tools::validate_pesq_options(&config)?;
    }

    let engines = args.engine.engine_set()?;
    let missing: Vec<&str> = metrics
        .iter()
        .filter(|kind| match kind {
            MetricKind::Pesq => engines.pesq.is_none(),
            MetricKind::Stoi => engines.stoi.is_none(),
            MetricKind::Dnsmos => engines.dnsmos.is_none(),
            MetricKind::SiSdr => false,
        })
        .map(|kind| kind.name())
        .collect();
    if !missing.is_empty() {
        println!(
            "[WARNING] 未配置评分引擎，以下指标将记为失败 / No engine configured, these metrics will fail: {}",
            missing.join(", ")
        );
    }

    let clean_files = tools::scan_audio_files(&args.clean_dir, &args.ext)?;
    let processed_files = tools::scan_audio_files(&args.processed_dir, &args.ext)?;
    tools::show_scan_results("Clean", &args.clean_dir, &clean_files, verbose);
    tools::show_scan_results("Processed", &args.processed_dir, &processed_files, verbose);

    if clean_files.is_empty() || processed_files.is_empty() {
        return Err(MetricError::InvalidInput(format!(
            "没有找到 .{} 音频文件 / no .{} audio files found",
            args.ext, args.ext
        )));
    }

    // 配对诊断通过tracing输出（warn级别）
    let plan = tools::pair_files(&clean_files, &processed_files, args.pairing);

    let evaluator = MetricEvaluator::new(engines, config);
    let options = BatchOptions { metrics, verbose };
    let report = tools::run_batch(&evaluator, &plan, &options, Some(args.parallel_files))?;

    let stats = &report.stats;
    println!();
    println!("[INFO] 批量处理完成 / Batch complete");
    println!(
        "   全部成功 / Succeeded: {} / {} 个文件对 / pairs",
        stats.processed,
        stats.total()
    );
    if stats.failed > 0 {
        println!("   存在失败 / With failures: {}", stats.failed);
    }
    println!();

    match tools::emit_report(&report, args.report_format(), args.output.as_deref())? {
        ReportOutcome::Written(path) => {
            tracing::info!(path = %path.display(), "report written");
        }
        ReportOutcome::Printed | ReportOutcome::NoResults => {}
    }

    Ok(())
}

/// 应用程序主逻辑
fn run(cli: Cli) -> EvalResult<()> {
    tools::show_startup_info(cli.verbose);

    match &cli.command {
        Commands::SiSdr { clean, processed } => run_si_sdr(clean, processed),
        Commands::Pesq {
            clean,
            processed,
            target_rate,
            mode,
            engine,
        } => {
            let config = EvaluationConfig {
                pesq_rate: *target_rate,
                pesq_mode: *mode,
                ..EvaluationConfig::default()
            };
            run_pesq(clean, processed, config, engine.engine_set()?)
        }
        Commands::Stoi {
            clean,
            processed,
            engine,
        } => run_stoi(clean, processed, engine.engine_set()?),
        Commands::Dnsmos {
            processed,
            sr,
            engine,
        } => run_dnsmos(processed, *sr, engine.engine_set()?),
        Commands::Batch(args) => run_batch_mode(args, cli.verbose),
    }
}

fn main() {
    // --help/--version 退出码0，其他用法错误退出码1
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            process::exit(if e.use_stderr() {
                exit_codes::GENERAL_ERROR
            } else {
                0
            });
        }
    };

    init_tracing(cli.verbose);

    if let Err(error) = run(cli) {
        handle_error(error);
    }
}
