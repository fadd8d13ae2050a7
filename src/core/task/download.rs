use futures::StreamExt;
use std::path::Path;
use std::time::Instant;
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;

use crate::core::error::DownloadError;
use crate::utils::validator;
use super::retry::RetryStrategy;
use super::types::{DownloadResult, DownloadTask};

/// 带重试的下载，每次尝试都是完整的重新下载
///
/// 尝试严格串行。开始新一次尝试前检查 `stop`，已停止则不再发起请求，
/// 返回 `Cancelled`。正在进行的请求不会被打断，只受客户端超时限制。
pub async fn download_with_retry(
    client: &reqwest::Client,
    task: &DownloadTask,
    strategy: &RetryStrategy,
    stop: &CancellationToken,
) -> DownloadResult {
    let start = Instant::now();
    let mut attempt = 0;

    let last_error = loop {
        if stop.is_cancelled() {
            return DownloadResult::failed(task.clone(), DownloadError::Cancelled, start.elapsed());
        }
        attempt += 1;
        log::debug!("[download] 第 {}/{} 次尝试: {}", attempt, strategy.max_attempts, task.url());

        let error = match download_file(client, task).await {
            Ok(size) => return DownloadResult::succeeded(task.clone(), size, start.elapsed()),
            Err(e) => e,
        };
        log::warn!(
            "[download] 第 {} 行 {} 第 {} 次尝试失败: {}",
            task.row_index(),
            task.filename(),
            attempt,
            error
        );

        if !strategy.should_retry(attempt) {
            break error;
        }
        tokio::select! {
            _ = tokio::time::sleep(strategy.get_delay(attempt)) => {}
            _ = stop.cancelled() => {}
        }
    };

    let error = DownloadError::RetriesExhausted {
        attempts: attempt,
        last: Box::new(last_error),
    };
    DownloadResult::failed(task.clone(), error, start.elapsed())
}

/// 单次下载：写入 `.tmp` 临时文件，成功后重命名到目标路径
///
/// 任何一步失败都会删除临时文件。目标文件已存在时直接覆盖。
pub async fn download_file(client: &reqwest::Client, task: &DownloadTask) -> Result<u64, DownloadError> {
    if let Some(dir) = task.save_path().parent() {
        fs::create_dir_all(dir)
            .await
            .map_err(|source| DownloadError::CreateDir { path: dir.to_path_buf(), source })?;
    }

    let temp = task.temp_path();
    let file = File::create(&temp)
        .await
        .map_err(|source| DownloadError::CreateFile { path: temp.clone(), source })?;

    let written = match fetch_into(client, task, file, &temp).await {
        Ok(size) => size,
        Err(e) => {
            let _ = fs::remove_file(&temp).await;
            return Err(e);
        }
    };

    if let Err(source) = fs::rename(&temp, task.save_path()).await {
        let _ = fs::remove_file(&temp).await;
        return Err(DownloadError::Rename { path: task.save_path().to_path_buf(), source });
    }
    Ok(written)
}

async fn fetch_into(
    client: &reqwest::Client,
    task: &DownloadTask,
    mut file: File,
    temp: &Path,
) -> Result<u64, DownloadError> {
    let url = validator::check_url(task.url())?;

    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| DownloadError::from_request(task.url(), e))?;

    if response.status() != reqwest::StatusCode::OK {
        return Err(DownloadError::HttpStatus(response.status()));
    }

    let write_error = |source| DownloadError::Write { path: temp.to_path_buf(), source };
    let mut written = 0u64;
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(DownloadError::Body)?;
        file.write_all(&chunk).await.map_err(write_error)?;
        written += chunk.len() as u64;
    }

    file.flush().await.map_err(write_error)?;
    file.sync_all().await.map_err(write_error)?;
    drop(file);
    Ok(written)
}
