//! TableDown: 按表格批量并发下载文件
//!
//! 核心是 [`DownloadManager`]：提交一组 [`DownloadTask`]，由固定数量的 worker
//! 并发下载，失败的文件按平方退避重试，进度、日志和完成信号通过 [`Reporter`] 上报。
//! [`source::TableSource`] 负责把 CSV/TSV 表格转换为任务列表。

pub mod cli;
pub mod config;
pub mod core;
pub mod source;
pub mod ui;
pub mod utils;

pub use crate::config::Config;
pub use crate::core::{
    ChannelReporter, DownloadError, DownloadManager, DownloadResult, DownloadTask, ErrorKind,
    FnReporter, ReportEvent, Reporter, RunState, RunSummary, Submitted, TaskReport,
};
pub use crate::source::{TableSource, TaskSpec};
