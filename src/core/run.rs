use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::task::{DownloadResult, DownloadTask};

/// 一次运行的计数器，从零开始，只增不减
#[derive(Debug, Default)]
pub struct RunStats {
    success: AtomicUsize,
    failed: AtomicUsize,
    invalid_links: AtomicUsize,
    completed: AtomicUsize,
}

impl RunStats {
    /// 记录一个结果，返回记录后的完成数
    pub fn record(&self, result: &DownloadResult) -> usize {
        if result.success() {
            self.success.fetch_add(1, Ordering::SeqCst);
        } else {
            self.failed.fetch_add(1, Ordering::SeqCst);
            if result.error_kind().is_some_and(|kind| kind.is_invalid_link()) {
                self.invalid_links.fetch_add(1, Ordering::SeqCst);
            }
        }
        self.completed.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn success(&self) -> usize {
        self.success.load(Ordering::SeqCst)
    }

    pub fn failed(&self) -> usize {
        self.failed.load(Ordering::SeqCst)
    }

    pub fn invalid_links(&self) -> usize {
        self.invalid_links.load(Ordering::SeqCst)
    }

    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }
}

/// 一次运行结束时的统计
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub total: usize,
    pub completed: usize,
    pub success: usize,
    pub failed: usize,
    pub invalid_links: usize,
    pub elapsed: Duration,
    pub cancelled: bool,
}

impl RunSummary {
    /// 正常结束即为成功，与单个任务是否失败无关
    pub fn is_success(&self) -> bool {
        !self.cancelled
    }

    /// 每秒完成的文件数
    pub fn throughput(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.completed as f64 / secs
        } else {
            0.0
        }
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.cancelled {
            write!(
                f,
                "下载已取消! 已完成: {}, 成功: {}, 失败: {}, 空链接: {}",
                self.completed, self.success, self.failed, self.invalid_links
            )
        } else {
            write!(
                f,
                "下载完成! 成功: {}, 失败: {}, 空链接: {}, 总耗时: {:.1}秒",
                self.success,
                self.failed,
                self.invalid_links,
                self.elapsed.as_secs_f64()
            )
        }
    }
}

/// 一次运行独占的上下文：任务队列、停止信号、计数器
///
/// 每次 `submit` 新建一个，运行结束后丢弃，不在运行之间复用。
pub(crate) struct RunContext {
    pub id: Uuid,
    pub total: usize,
    pub started: Instant,
    pub stats: Arc<RunStats>,
    /// 整次运行的取消标志
    pub cancel: CancellationToken,
    /// 每个 worker 的停止信号，启动时写入，之后只读
    pub stops: Vec<CancellationToken>,
    pub queue: Arc<Mutex<mpsc::Receiver<DownloadTask>>>,
}

impl RunContext {
    pub fn new(
        total: usize,
        worker_count: usize,
        queue: Arc<Mutex<mpsc::Receiver<DownloadTask>>>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            total,
            started: Instant::now(),
            stats: Arc::new(RunStats::default()),
            cancel: CancellationToken::new(),
            stops: (0..worker_count).map(|_| CancellationToken::new()).collect(),
            queue,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn summary(&self) -> RunSummary {
        RunSummary {
            run_id: self.id,
            total: self.total,
            completed: self.stats.completed(),
            success: self.stats.success(),
            failed: self.stats.failed(),
            invalid_links: self.stats.invalid_links(),
            elapsed: self.started.elapsed(),
            cancelled: self.is_cancelled(),
        }
    }

    /// 丢弃队列中还没被领取的任务，不会分发它们
    pub fn drain_queue(&self) {
        let queue = Arc::clone(&self.queue);
        let run_id = self.id;
        let drain = async move {
            let mut rx = queue.lock().await;
            rx.close();
            let mut dropped = 0usize;
            while rx.try_recv().is_ok() {
                dropped += 1;
            }
            log::debug!("[run {}] 丢弃了 {} 个未分发的任务", run_id, dropped);
        };
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(drain);
            }
            Err(_) => log::debug!("[run {}] 没有运行时，跳过清空队列", run_id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::DownloadError;

    fn result(ok: bool, error: DownloadError) -> DownloadResult {
        let task = DownloadTask::new("u", "f", "/tmp/f", "bin", 2);
        if ok {
            DownloadResult::succeeded(task, 1, Duration::ZERO)
        } else {
            DownloadResult::failed(task, error, Duration::ZERO)
        }
    }

    #[test]
    fn test_stats_record() {
        let stats = RunStats::default();
        assert_eq!(stats.record(&result(true, DownloadError::Cancelled)), 1);
        assert_eq!(stats.record(&result(false, DownloadError::EmptyUrl)), 2);
        let exhausted = DownloadError::RetriesExhausted {
            attempts: 3,
            last: Box::new(DownloadError::InvalidUrl("x".into())),
        };
        assert_eq!(stats.record(&result(false, exhausted)), 3);
        assert_eq!(
            stats.record(&result(false, DownloadError::HttpStatus(reqwest::StatusCode::NOT_FOUND))),
            4
        );

        assert_eq!(stats.success(), 1);
        assert_eq!(stats.failed(), 3);
        assert_eq!(stats.invalid_links(), 2);
        assert_eq!(stats.completed(), 4);
    }

    #[test]
    fn test_summary_display() {
        let mut summary = RunSummary {
            run_id: Uuid::nil(),
            total: 5,
            completed: 5,
            success: 4,
            failed: 1,
            invalid_links: 0,
            elapsed: Duration::from_secs(2),
            cancelled: false,
        };
        assert!(summary.is_success());
        assert!(summary.to_string().starts_with("下载完成!"));
        assert!((summary.throughput() - 2.5).abs() < f64::EPSILON);

        summary.cancelled = true;
        assert!(!summary.is_success());
        assert!(summary.to_string().contains("已取消"));
    }

    #[tokio::test]
    async fn test_drain_queue_discards_pending() {
        let (tx, rx) = mpsc::channel(8);
        for i in 0..3 {
            tx.send(DownloadTask::new("u", "f", "/tmp/f", "bin", i + 2)).await.unwrap();
        }
        let queue = Arc::new(Mutex::new(rx));
        let run = RunContext::new(3, 1, Arc::clone(&queue));
        run.drain_queue();

        tokio::time::sleep(Duration::from_millis(50)).await;
        let mut rx = queue.lock().await;
        assert!(rx.recv().await.is_none());
        assert!(tx.send(DownloadTask::new("u", "f", "/tmp/f", "bin", 9)).await.is_err());
    }
}
