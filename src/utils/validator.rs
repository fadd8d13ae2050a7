use url::Url;
use crate::core::error::DownloadError;

pub fn is_valid_url(url: &str) -> bool {
    check_url(url).is_ok()
}

/// 解析下载链接，只接受 http/https
pub fn check_url(url: &str) -> Result<Url, DownloadError> {
    let trimmed = url.trim();
    if trimmed.is_empty() {
        return Err(DownloadError::EmptyUrl);
    }
    let parsed = Url::parse(trimmed).map_err(|_| DownloadError::InvalidUrl(trimmed.to_string()))?;
    match parsed.scheme() {
        "http" | "https" if parsed.host_str().is_some() => Ok(parsed),
        _ => Err(DownloadError::InvalidUrl(trimmed.to_string())),
    }
}
