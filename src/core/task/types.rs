use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::core::error::{DownloadError, ErrorKind};

/// 一个下载任务，构造后不可修改
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadTask {
    url: String,
    filename: String,
    save_path: PathBuf,
    file_type: String,
    row_index: usize,
}

impl DownloadTask {
    pub fn new(
        url: impl Into<String>,
        filename: impl Into<String>,
        save_path: impl Into<PathBuf>,
        file_type: impl Into<String>,
        row_index: usize,
    ) -> Self {
        Self {
            url: url.into(),
            filename: filename.into(),
            save_path: save_path.into(),
            file_type: file_type.into(),
            row_index,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// 用于显示的文件名
    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn save_path(&self) -> &Path {
        &self.save_path
    }

    pub fn file_type(&self) -> &str {
        &self.file_type
    }

    /// 在来源表格中的行号（从1开始）
    pub fn row_index(&self) -> usize {
        self.row_index
    }

    /// 下载过程中使用的临时文件：`save_path + ".tmp"`
    pub fn temp_path(&self) -> PathBuf {
        let mut path = self.save_path.clone().into_os_string();
        path.push(".tmp");
        PathBuf::from(path)
    }
}

/// 一个任务的最终结果，每个被分发的任务恰好产生一个
#[derive(Debug)]
pub struct DownloadResult {
    task: DownloadTask,
    outcome: Result<u64, DownloadError>,
    duration: Duration,
}

impl DownloadResult {
    pub fn succeeded(task: DownloadTask, file_size: u64, duration: Duration) -> Self {
        Self { task, outcome: Ok(file_size), duration }
    }

    pub fn failed(task: DownloadTask, error: DownloadError, duration: Duration) -> Self {
        Self { task, outcome: Err(error), duration }
    }

    pub fn task(&self) -> &DownloadTask {
        &self.task
    }

    pub fn filename(&self) -> &str {
        self.task.filename()
    }

    pub fn success(&self) -> bool {
        self.outcome.is_ok()
    }

    /// 写入的字节数，只有成功时有值
    pub fn file_size(&self) -> Option<u64> {
        self.outcome.as_ref().ok().copied()
    }

    pub fn error(&self) -> Option<&DownloadError> {
        self.outcome.as_ref().err()
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        self.error().map(DownloadError::kind)
    }

    /// 从第一次尝试开始到结束的总耗时，包含重试等待
    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn outcome(&self) -> &Result<u64, DownloadError> {
        &self.outcome
    }
}
