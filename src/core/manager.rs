use futures::future::join_all;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::config::Config;
use super::aggregator::Aggregator;
use super::error::DownloadError;
use super::report::Reporter;
use super::run::{RunContext, RunSummary};
use super::task::{AtomicRunState, DownloadResult, DownloadTask, RetryStrategy, RunState};
use super::worker::Worker;

/// `submit` 的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Submitted {
    /// 启动了一次新的运行
    Started(Uuid),
    /// 已有运行在进行，本次调用被忽略
    AlreadyRunning,
}

/// 下载管理器
///
/// 同一时间只有一次运行。每次运行使用独立的任务队列、结果通道、
/// worker 和计数器，运行结束后管理器回到 Idle，可以再次 `submit`。
#[derive(Clone)]
pub struct DownloadManager {
    inner: Arc<Inner>,
}

struct Inner {
    config: Config,
    client: reqwest::Client,
    reporter: Arc<dyn Reporter>,
    state: AtomicRunState,
    current: Mutex<Option<Arc<RunContext>>>,
    last_summary: Mutex<Option<RunSummary>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl DownloadManager {
    pub fn new<R>(config: Config, reporter: R) -> Result<Self, DownloadError>
    where
        R: Reporter + 'static,
    {
        Self::with_reporter(config, Arc::new(reporter))
    }

    pub fn with_reporter(config: Config, reporter: Arc<dyn Reporter>) -> Result<Self, DownloadError> {
        config.validate()?;
        // 所有 worker 共享一个客户端和连接池
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .user_agent(config.user_agent.as_str())
            .pool_max_idle_per_host(config.max_concurrency)
            .build()
            .map_err(|e| DownloadError::Config(format!("无法创建HTTP客户端: {}", e)))?;

        Ok(Self {
            inner: Arc::new(Inner {
                config,
                client,
                reporter,
                state: AtomicRunState::new(),
                current: Mutex::new(None),
                last_summary: Mutex::new(None),
            }),
        })
    }

    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// 开始一次运行，立即返回
    ///
    /// 已经在运行时什么也不做。任务列表为空时上报日志和失败的完成信号，
    /// 不启动任何 worker。必须在 tokio 运行时中调用。
    pub fn submit(&self, tasks: Vec<DownloadTask>) -> Result<Submitted, DownloadError> {
        let inner = &self.inner;
        let pending = {
            let mut current = lock(&inner.current);
            if inner.state.load() != RunState::Idle {
                log::debug!("已有下载在进行，忽略本次提交");
                return Ok(Submitted::AlreadyRunning);
            }
            if tasks.is_empty() {
                drop(current);
                inner.reporter.on_log(&DownloadError::NoTasks.to_string());
                inner.reporter.on_completion(false);
                return Err(DownloadError::NoTasks);
            }
            if !inner.state.transition(RunState::Idle, RunState::Running) {
                return Ok(Submitted::AlreadyRunning);
            }
            let pending = PendingRun::new(&inner.config, tasks);
            *current = Some(Arc::clone(&pending.run));
            pending
        };

        let id = pending.run.id;
        Inner::launch(inner, pending);
        Ok(Submitted::Started(id))
    }

    /// 取消当前运行，立即返回
    ///
    /// 正在进行的请求不会被中断。所有 worker 返回之前状态保持 Cancelling，
    /// 之后才回到 Idle 并发出完成信号。
    pub fn cancel(&self) {
        let inner = &self.inner;
        let run = {
            let current = lock(&inner.current);
            if !inner.state.transition(RunState::Running, RunState::Cancelling) {
                return;
            }
            let Some(run) = current.as_ref() else {
                return;
            };
            Arc::clone(run)
        };

        // 先上报再设置取消标志，取消日志总在完成信号之前
        log::info!("[run {}] 正在取消下载", run.id);
        inner.reporter.on_log("正在取消下载...");
        run.cancel.cancel();
        for stop in &run.stops {
            stop.cancel();
        }
        run.drain_queue();
    }

    pub fn is_running(&self) -> bool {
        self.inner.state.load() != RunState::Idle
    }

    pub fn state(&self) -> RunState {
        self.inner.state.load()
    }

    /// 最近一次结束的运行的统计
    pub fn last_summary(&self) -> Option<RunSummary> {
        lock(&self.inner.last_summary).clone()
    }
}

/// 已登记但还没启动的运行：通道已经建好，任务还没放进队列
struct PendingRun {
    run: Arc<RunContext>,
    tasks: Vec<DownloadTask>,
    task_tx: mpsc::Sender<DownloadTask>,
    result_tx: mpsc::Sender<DownloadResult>,
    result_rx: mpsc::Receiver<DownloadResult>,
}

impl PendingRun {
    fn new(config: &Config, tasks: Vec<DownloadTask>) -> Self {
        let (task_tx, task_rx) = mpsc::channel(config.queue_capacity);
        let (result_tx, result_rx) = mpsc::channel(config.queue_capacity);
        let queue = Arc::new(tokio::sync::Mutex::new(task_rx));
        let run = Arc::new(RunContext::new(tasks.len(), config.max_concurrency, queue));
        Self { run, tasks, task_tx, result_tx, result_rx }
    }
}

impl Inner {
    /// 启动 worker、投递任务、等待 worker 退出和汇总结果的任务
    fn launch(this: &Arc<Self>, pending: PendingRun) {
        let PendingRun { run, tasks, task_tx, result_tx, result_rx } = pending;
        let config = &this.config;

        log::info!("[run {}] 开始下载 {} 个文件, 并发数 {}", run.id, run.total, run.stops.len());
        this.reporter.on_log(&format!(
            "开始下载 {} 个文件, 并发数: {}, 重试次数: {}",
            run.total,
            run.stops.len(),
            config.retry_count
        ));

        let strategy = RetryStrategy::from_config(config);
        let workers: Vec<JoinHandle<()>> = run
            .stops
            .iter()
            .enumerate()
            .map(|(i, stop)| {
                let worker = Worker::new(
                    i + 1,
                    this.client.clone(),
                    strategy.clone(),
                    Arc::clone(&run.queue),
                    result_tx.clone(),
                    stop.clone(),
                );
                tokio::spawn(worker.run())
            })
            .collect();

        tokio::spawn(feed(tasks, task_tx, Arc::clone(&run)));
        let (joined_tx, joined_rx) = oneshot::channel();
        tokio::spawn(join(workers, result_tx, joined_tx, Arc::clone(&run)));

        let aggregator = Aggregator::new(
            Arc::clone(&run),
            result_rx,
            joined_rx,
            Arc::clone(&this.reporter),
            config.poll_interval(),
            config.log_interval(),
        );
        let inner = Arc::clone(this);
        let run_id = run.id;
        tokio::spawn(async move {
            aggregator.run(|summary| inner.finish_run(run_id, summary)).await;
        });
    }

    fn finish_run(&self, run_id: Uuid, summary: &RunSummary) {
        let mut current = lock(&self.current);
        *lock(&self.last_summary) = Some(summary.clone());
        if current.as_ref().is_some_and(|run| run.id == run_id) {
            *current = None;
        }
        let previous = self.state.finish();
        log::debug!("[run {}] 结束, 状态 {:?} -> Idle", run_id, previous);
    }
}

/// 按顺序把任务放入队列，发现取消就停止；返回时队列发送端被丢弃
async fn feed(tasks: Vec<DownloadTask>, queue: mpsc::Sender<DownloadTask>, run: Arc<RunContext>) {
    for task in tasks {
        if run.is_cancelled() {
            break;
        }
        tokio::select! {
            biased;
            _ = run.cancel.cancelled() => break,
            sent = queue.send(task) => {
                if sent.is_err() {
                    break;
                }
            }
        }
    }
}

/// 等所有 worker 退出后，通知汇总任务，再丢弃最后一个结果发送端
///
/// worker 已经全部退出，结果通道的关闭不会和任何发送同时发生。
/// 取消时汇总任务靠取消标志停止接收，但要等这里的通知才结束运行。
async fn join(
    workers: Vec<JoinHandle<()>>,
    results: mpsc::Sender<DownloadResult>,
    joined: oneshot::Sender<()>,
    run: Arc<RunContext>,
) {
    for (i, outcome) in join_all(workers).await.into_iter().enumerate() {
        if let Err(e) = outcome {
            log::error!("[run {}] worker {} 异常退出: {}", run.id, i + 1, e);
        }
    }
    if run.is_cancelled() {
        log::debug!("[run {}] 已取消, worker 全部退出", run.id);
    } else {
        log::debug!("[run {}] 所有任务处理完毕, 关闭结果通道", run.id);
    }
    let _ = joined.send(());
    drop(results);
}
