//! 核心算法模块
//!
//! 仓库内唯一原创的数值算法：SI-SDR。PESQ/STOI/DNSMOS委托给外部评分引擎（见 `engines`）。

pub mod si_sdr;

// 重新导出公共接口
pub use si_sdr::{SI_SDR_INFINITE, SiSdrEstimator, SiSdrResult, si_sdr};
