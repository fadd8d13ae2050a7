use anyhow::Context as _;
use log::LevelFilter;
use std::time::Instant;
use tabledown::cli;
use tabledown::source::filename::index_to_column;
use tabledown::ui::{self, DownloadSummary, ProgressManager};
use tabledown::utils::logger::{Flush, LoggerActor, LoggerExt};
use tabledown::{ChannelReporter, DownloadManager, ReportEvent, Submitted, TableSource, TaskReport};
use actix::prelude::*;
use tokio::sync::mpsc::UnboundedReceiver;

const LOG_FILE: &str = "logs/tabledown.log";
const LOG_MAX_SIZE: u64 = 10 * 1024 * 1024;
const PREVIEW_ROWS: usize = 5;

#[actix::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let logger = match LoggerActor::new(LOG_FILE, LevelFilter::Info, LOG_MAX_SIZE) {
        Ok(actor) => actor.start(),
        Err(e) => {
            eprintln!("无法打开日志文件 {}: {}", LOG_FILE, e);
            std::process::exit(1);
        }
    };
    logger.info(&format!("程序启动 tabledown {}", cli::LONG_VERSION));

    let code = match run(&logger).await {
        Ok(true) => 0,
        Ok(false) => 1,
        Err(e) => {
            logger.error(&format!("{:#}", e));
            eprintln!("错误: {:#}", e);
            1
        }
    };

    if let Ok(Err(e)) = logger.send(Flush).await {
        eprintln!("日志写入失败: {}", e);
    }
    std::process::exit(code);
}

/// 返回运行是否正常结束
async fn run(logger: &Addr<LoggerActor>) -> anyhow::Result<bool> {
    // 解析参数和配置
    let (args, config) = cli::Args::parse_args().context("参数解析失败")?;
    let input = args.input.clone().context("缺少表格文件")?;

    let table = TableSource::open(&input)?;
    if args.headers {
        print_preview(&table);
        return Ok(true);
    }

    let tasks = table.tasks(&args.task_spec(config.output_path()))?;
    logger.info(&format!("表格: {}, 任务数: {}", input.display(), tasks.len()));
    logger.info(&format!("配置摘要:\n{}", config.get_summary()));
    println!("{}", config.get_summary());

    let total = tasks.len();
    let (reporter, mut events) = ChannelReporter::new();
    let manager = DownloadManager::new(config, reporter)?;
    if let Submitted::AlreadyRunning = manager.submit(tasks)? {
        anyhow::bail!("已有下载在进行");
    }

    println!("\n开始下载... (按 Ctrl-C 取消)");
    let progress = ProgressManager::for_stdout(total);
    let outcome = watch(&manager, &mut events, &progress, logger).await;

    let summary = manager
        .last_summary()
        .context("运行结束但没有统计信息")?;
    if outcome.success {
        progress.finish("完成");
    } else {
        progress.abandon("已取消");
    }

    println!("{}", DownloadSummary::from_run(&summary, outcome.total_size));
    if !outcome.failures.is_empty() {
        println!("失败的任务:");
        for report in &outcome.failures {
            ui::print_error(&ui::failure_line(report));
        }
    } else if outcome.success {
        ui::print_success("全部下载成功");
    }
    Ok(outcome.success)
}

struct Outcome {
    success: bool,
    total_size: u64,
    failures: Vec<TaskReport>,
}

/// 消费上报事件直到完成信号，期间按 Ctrl-C 取消
async fn watch(
    manager: &DownloadManager,
    events: &mut UnboundedReceiver<ReportEvent>,
    progress: &ProgressManager,
    logger: &Addr<LoggerActor>,
) -> Outcome {
    let started = Instant::now();
    let mut outcome = Outcome { success: false, total_size: 0, failures: Vec::new() };
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut interrupted = false;

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Some(ReportEvent::Progress { completed, .. }) => {
                    let secs = started.elapsed().as_secs_f64();
                    let rate = if secs > 0.0 { completed as f64 / secs } else { 0.0 };
                    progress.update(completed, rate);
                }
                Some(ReportEvent::Log(line)) => {
                    progress.println(&line);
                    logger.info(&line);
                }
                Some(ReportEvent::Task(report)) => {
                    if report.success {
                        outcome.total_size += report.file_size.unwrap_or(0);
                    } else {
                        logger.warn(&ui::failure_line(&report));
                        outcome.failures.push(report);
                    }
                }
                Some(ReportEvent::Completed { success }) => {
                    outcome.success = success;
                    break;
                }
                None => break,
            },
            _ = &mut ctrl_c, if !interrupted => {
                interrupted = true;
                logger.info("收到 Ctrl-C, 取消下载");
                manager.cancel();
            }
        }
    }
    outcome
}

/// 打印表头和前几行，方便选择列
fn print_preview(table: &TableSource) {
    println!("表头:");
    for (i, header) in table.headers().iter().enumerate() {
        println!("  {}: {}", index_to_column(i), header);
    }
    println!("\n前 {} 行数据:", PREVIEW_ROWS);
    for (i, row) in table.sample_rows(PREVIEW_ROWS).iter().enumerate() {
        println!("  第 {} 行: {}", i + 2, row.join(" | "));
    }
}
