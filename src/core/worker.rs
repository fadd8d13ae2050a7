use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;

use super::task::{download_with_retry, DownloadResult, DownloadTask, RetryStrategy};

/// 从共享队列领取任务、下载、上报结果的循环
///
/// 队列关闭或自己的停止信号触发时退出。
pub(crate) struct Worker {
    id: usize,
    client: reqwest::Client,
    strategy: RetryStrategy,
    tasks: Arc<Mutex<mpsc::Receiver<DownloadTask>>>,
    results: mpsc::Sender<DownloadResult>,
    stop: CancellationToken,
}

impl Worker {
    pub fn new(
        id: usize,
        client: reqwest::Client,
        strategy: RetryStrategy,
        tasks: Arc<Mutex<mpsc::Receiver<DownloadTask>>>,
        results: mpsc::Sender<DownloadResult>,
        stop: CancellationToken,
    ) -> Self {
        Self { id, client, strategy, tasks, results, stop }
    }

    pub async fn run(self) {
        log::debug!("[worker {}] 启动", self.id);
        while let Some(task) = self.next_task().await {
            let result = download_with_retry(&self.client, &task, &self.strategy, &self.stop).await;
            if !self.deliver(result).await {
                break;
            }
        }
        log::debug!("[worker {}] 退出", self.id);
    }

    /// 空闲时先看停止信号，已停止就不再领取任务
    async fn next_task(&self) -> Option<DownloadTask> {
        tokio::select! {
            biased;
            _ = self.stop.cancelled() => None,
            task = async { self.tasks.lock().await.recv().await } => task,
        }
    }

    /// 停止信号先触发时丢弃结果，返回 false 表示应当退出
    async fn deliver(&self, result: DownloadResult) -> bool {
        let row = result.task().row_index();
        tokio::select! {
            biased;
            _ = self.stop.cancelled() => {
                log::debug!("[worker {}] 已停止，丢弃第 {} 行的结果", self.id, row);
                false
            }
            sent = self.results.send(result) => sent.is_ok(),
        }
    }
}
