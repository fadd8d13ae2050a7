//! 进度、日志和完成信号的上报接口
//!
//! 所有回调都在结果汇总任务里同步调用，实现方不能阻塞。
//! 需要切换线程（比如交给界面线程）时由实现方自己处理，
//! 最简单的做法是使用 [`ChannelReporter`]，由调用方自己消费事件。

use std::time::Duration;
use tokio::sync::mpsc;

use super::error::ErrorKind;
use super::task::DownloadResult;

pub trait Reporter: Send + Sync {
    fn on_progress(&self, fraction: f64, completed: usize, total: usize);

    fn on_log(&self, line: &str);

    /// 每次运行恰好调用一次；取消或没有任务时为 false
    fn on_completion(&self, success: bool);

    /// 每个结果都会调用，不受日志节流影响
    fn on_result(&self, _result: &DownloadResult) {}
}

/// 一个任务结果的摘要，可以跨线程传递
#[derive(Debug, Clone, PartialEq)]
pub struct TaskReport {
    pub row_index: usize,
    pub filename: String,
    pub url: String,
    pub success: bool,
    pub file_size: Option<u64>,
    pub error: Option<String>,
    pub error_kind: Option<ErrorKind>,
    pub duration: Duration,
}

impl From<&DownloadResult> for TaskReport {
    fn from(result: &DownloadResult) -> Self {
        Self {
            row_index: result.task().row_index(),
            filename: result.filename().to_string(),
            url: result.task().url().to_string(),
            success: result.success(),
            file_size: result.file_size(),
            error: result.error().map(ToString::to_string),
            error_kind: result.error_kind(),
            duration: result.duration(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ReportEvent {
    Progress { fraction: f64, completed: usize, total: usize },
    Log(String),
    Task(TaskReport),
    Completed { success: bool },
}

/// 把回调转成事件，通过无界通道发给调用方
#[derive(Debug, Clone)]
pub struct ChannelReporter {
    tx: mpsc::UnboundedSender<ReportEvent>,
}

impl ChannelReporter {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ReportEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    fn send(&self, event: ReportEvent) {
        // 接收方已经退出时没有人关心事件
        let _ = self.tx.send(event);
    }
}

impl Reporter for ChannelReporter {
    fn on_progress(&self, fraction: f64, completed: usize, total: usize) {
        self.send(ReportEvent::Progress { fraction, completed, total });
    }

    fn on_log(&self, line: &str) {
        self.send(ReportEvent::Log(line.to_string()));
    }

    fn on_completion(&self, success: bool) {
        self.send(ReportEvent::Completed { success });
    }

    fn on_result(&self, result: &DownloadResult) {
        self.send(ReportEvent::Task(TaskReport::from(result)));
    }
}

/// 由三个闭包组成的回调
pub struct FnReporter<P, L, C> {
    progress: P,
    log: L,
    completion: C,
}

impl<P, L, C> FnReporter<P, L, C>
where
    P: Fn(f64, usize, usize) + Send + Sync,
    L: Fn(&str) + Send + Sync,
    C: Fn(bool) + Send + Sync,
{
    pub fn new(progress: P, log: L, completion: C) -> Self {
        Self { progress, log, completion }
    }
}

impl<P, L, C> Reporter for FnReporter<P, L, C>
where
    P: Fn(f64, usize, usize) + Send + Sync,
    L: Fn(&str) + Send + Sync,
    C: Fn(bool) + Send + Sync,
{
    fn on_progress(&self, fraction: f64, completed: usize, total: usize) {
        (self.progress)(fraction, completed, total);
    }

    fn on_log(&self, line: &str) {
        (self.log)(line);
    }

    fn on_completion(&self, success: bool) {
        (self.completion)(success);
    }
}
