//! `task` 模块包含了与单个下载任务相关的所有逻辑
//!
//! 主要包括：
//! - `types`: 任务 `DownloadTask` 与结果 `DownloadResult`
//! - `state`: 管理器运行状态 `RunState`
//! - `download`: 单次下载与带重试的下载
//! - `retry`: 重试策略

pub mod types;
pub mod state;
pub mod download;
pub mod retry;

pub use types::{DownloadTask, DownloadResult};
pub use state::{AtomicRunState, RunState};
pub use download::{download_file, download_with_retry};
pub use retry::RetryStrategy;
