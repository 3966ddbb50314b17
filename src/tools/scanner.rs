//! 文件扫描模块
//!
//! 列出目录中（不递归）扩展名匹配的音频文件，按文件名排序保证确定性。

use super::utils;
use crate::error::{EvalResult, MetricError};
use std::path::{Path, PathBuf};

/// 扫描目录中扩展名为 `extension` 的音频文件（大小写不敏感）
pub fn scan_audio_files(dir_path: &Path, extension: &str) -> EvalResult<Vec<PathBuf>> {
    if !dir_path.exists() {
        return Err(MetricError::IoError(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("目录不存在 / directory not found: {}", dir_path.display()),
        )));
    }

    if !dir_path.is_dir() {
        return Err(MetricError::InvalidInput(format!(
            "路径不是目录 / not a directory: {}",
            dir_path.display()
        )));
    }

    let wanted = extension.trim_start_matches('.').to_lowercase();
    let mut audio_files = Vec::new();

    // 遍历目录（不递归子目录）
    for entry in std::fs::read_dir(dir_path)? {
        let path = entry?.path();

        // 只处理文件，跳过目录
        if !path.is_file() {
            continue;
        }

        if utils::extract_extension_lowercase(&path).as_deref() == Some(wanted.as_str()) {
            audio_files.push(path);
        }
    }

    // 按文件名排序
    audio_files.sort();

    Ok(audio_files)
}

/// 显示文件扫描结果
pub fn show_scan_results(label: &str, dir: &Path, audio_files: &[PathBuf], verbose: bool) {
    println!(
        "[INFO] {label}: {} ({} 个文件 / files)",
        dir.display(),
        audio_files.len()
    );

    if verbose {
        for (i, file) in audio_files.iter().enumerate() {
            println!("   {}. {}", i + 1, utils::extract_filename_lossy(file));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_scan_is_sorted_case_insensitive_and_flat() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.wav", "A.WAV", "c.flac", "notes.txt"] {
            fs::write(dir.path().join(name), b"x").unwrap();
        }
        fs::create_dir(dir.path().join("nested.wav")).unwrap();
        fs::write(dir.path().join("nested.wav").join("d.wav"), b"x").unwrap();

        let files = scan_audio_files(dir.path(), "wav").unwrap();
        let names: Vec<_> = files.iter().map(|p| utils::extract_filename_lossy(p)).collect();
        assert_eq!(names, vec!["A.WAV", "b.wav"]);

        let flac = scan_audio_files(dir.path(), ".FLAC").unwrap();
        assert_eq!(flac.len(), 1);
    }

    #[test]
    fn test_scan_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing");
        assert!(matches!(
            scan_audio_files(&missing, "wav"),
            Err(MetricError::IoError(_))
        ));

        let file = dir.path().join("file.wav");
        fs::write(&file, b"x").unwrap();
        assert!(matches!(
            scan_audio_files(&file, "wav"),
            Err(MetricError::InvalidInput(_))
        ));
    }
}
