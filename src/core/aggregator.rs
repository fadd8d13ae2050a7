use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};

use super::report::Reporter;
use super::run::{RunContext, RunSummary};
use super::task::DownloadResult;
use super::throttle::LogThrottle;

/// 每完成多少个输出一次汇总
const STATS_EVERY: usize = 10;

/// 结果汇总：计数、上报进度、节流日志、判断运行结束
pub(crate) struct Aggregator {
    run: Arc<RunContext>,
    results: mpsc::Receiver<DownloadResult>,
    workers_joined: oneshot::Receiver<()>,
    reporter: Arc<dyn Reporter>,
    poll_interval: Duration,
    throttle: LogThrottle,
}

impl Aggregator {
    pub fn new(
        run: Arc<RunContext>,
        results: mpsc::Receiver<DownloadResult>,
        workers_joined: oneshot::Receiver<()>,
        reporter: Arc<dyn Reporter>,
        poll_interval: Duration,
        log_interval: Duration,
    ) -> Self {
        let throttle = LogThrottle::starting_at(run.started, log_interval);
        Self { run, results, workers_joined, reporter, poll_interval, throttle }
    }

    /// 一直运行到结果通道关闭，或轮询时发现已取消
    ///
    /// 退出前等所有 worker 返回，再输出最终统计，先调用 `finish`，
    /// 再恰好调用一次 `on_completion`。取消后正在进行的请求仍会跑完，
    /// 这段时间运行停留在 Cancelling。
    pub async fn run<F>(mut self, finish: F) -> RunSummary
    where
        F: FnOnce(&RunSummary),
    {
        loop {
            match tokio::time::timeout(self.poll_interval, self.results.recv()).await {
                Ok(Some(result)) => self.record(result),
                Ok(None) => break,
                Err(_) => {
                    if self.run.is_cancelled() {
                        break;
                    }
                }
            }
        }

        // 发送端被丢弃也说明 join 已经结束
        let _ = (&mut self.workers_joined).await;

        let summary = self.run.summary();
        log::info!("[run {}] {}", self.run.id, summary);
        self.reporter.on_log(&summary.to_string());
        finish(&summary);
        self.reporter.on_completion(summary.is_success());
        summary
    }

    fn record(&mut self, result: DownloadResult) {
        let completed = self.run.stats.record(&result);
        let total = self.run.total;
        self.reporter.on_result(&result);
        self.reporter
            .on_progress(completed as f64 / total as f64, completed, total);

        if !self.throttle.should_emit(completed == total) {
            return;
        }
        self.reporter.on_log(&detail_line(&result));
        if completed % STATS_EVERY == 0 {
            self.reporter.on_log(&self.stats_line(completed));
        }
    }

    fn stats_line(&self, completed: usize) -> String {
        let elapsed = self.run.started.elapsed().as_secs_f64();
        let rate = if elapsed > 0.0 { completed as f64 / elapsed } else { 0.0 };
        let stats = &self.run.stats;
        format!(
            "已完成: {}/{}, 成功: {}, 失败: {}, 空链接: {}, 速度: {:.1} 个/秒",
            completed,
            self.run.total,
            stats.success(),
            stats.failed(),
            stats.invalid_links(),
            rate
        )
    }
}

fn detail_line(result: &DownloadResult) -> String {
    match result.outcome() {
        Ok(size) => format!(
            "✓ 成功: {} ({:.2} MB)",
            result.filename(),
            *size as f64 / (1024.0 * 1024.0)
        ),
        Err(e) => format!("✗ 失败: {} - {}", result.filename(), e),
    }
}
