//! Core: 下载任务调度、worker、结果汇总和错误处理等核心逻辑模块

pub(crate) mod aggregator;
pub mod error;
pub mod manager;
pub mod report;
pub mod run;
pub mod task;
pub(crate) mod throttle;
pub(crate) mod worker;

// 只导出主流程和其它模块实际用到的类型
pub use error::{DownloadError, ErrorKind};
pub use manager::{DownloadManager, Submitted};
pub use report::{ChannelReporter, FnReporter, ReportEvent, Reporter, TaskReport};
pub use run::{RunStats, RunSummary};
pub use task::{DownloadResult, DownloadTask, RetryStrategy, RunState};
