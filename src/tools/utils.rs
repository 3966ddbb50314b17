//! 工具函数模块
//!
//! 文件路径处理与并发度计算等通用工具函数。

/// 文件路径处理工具函数
pub mod path {
    use std::path::Path;

    /// 提取文件名（返回String，用于日志显示）
    #[inline]
    pub fn extract_filename_lossy(path: &Path) -> String {
        path.file_name()
            .unwrap_or_default()
            .to_string_lossy()
            .to_string()
    }

    /// 提取小写扩展名
    #[inline]
    pub fn extract_extension_lowercase(path: &Path) -> Option<String> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|s| s.to_lowercase())
    }
}

/// 计算实际并发度
///
/// 限制在 [MIN_PARALLEL_DEGREE, MAX_PARALLEL_DEGREE] 内，且不超过任务数量。
pub fn effective_parallel_degree(requested: usize, task_count: Option<usize>) -> usize {
    use super::constants::parallel_limits::{MAX_PARALLEL_DEGREE, MIN_PARALLEL_DEGREE};

    let clamped = requested.clamp(MIN_PARALLEL_DEGREE, MAX_PARALLEL_DEGREE);
    match task_count {
        Some(count) => clamped.min(count.max(MIN_PARALLEL_DEGREE)),
        None => clamped,
    }
}

// 重新导出为平级函数
pub use path::{extract_extension_lowercase, extract_filename_lossy};

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_effective_parallel_degree() {
        assert_eq!(effective_parallel_degree(0, None), 1);
        assert_eq!(effective_parallel_degree(64, None), 16);
        assert_eq!(effective_parallel_degree(8, Some(3)), 3);
        assert_eq!(effective_parallel_degree(8, Some(0)), 1);
    }

    #[test]
    fn test_path_helpers() {
        let p = Path::new("/tmp/clean/Speech_01.WAV");
        assert_eq!(extract_filename_lossy(p), "Speech_01.WAV");
        assert_eq!(extract_extension_lowercase(p).as_deref(), Some("wav"));
        assert_eq!(extract_filename_lossy(Path::new("/")), "");
    }
}
