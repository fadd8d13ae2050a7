use std::fmt;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// 失败原因的结构化分类，在出错的位置就确定下来
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    EmptyUrl,
    InvalidUrl,
    Filesystem,
    Network,
    Http,
    Cancelled,
    Setup,
}

impl ErrorKind {
    /// 空链接/无效链接，只用于统计
    pub fn is_invalid_link(self) -> bool {
        matches!(self, ErrorKind::EmptyUrl | ErrorKind::InvalidUrl)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::EmptyUrl => "空链接",
            ErrorKind::InvalidUrl => "无效链接",
            ErrorKind::Filesystem => "文件系统错误",
            ErrorKind::Network => "网络错误",
            ErrorKind::Http => "HTTP错误",
            ErrorKind::Cancelled => "已取消",
            ErrorKind::Setup => "准备阶段错误",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug)]
pub enum DownloadError {
    #[error("空链接 (empty URL)")]
    EmptyUrl,

    #[error("无效的URL (invalid URL): {0}")]
    InvalidUrl(String),

    #[error("创建目录失败: {path}: {source}")]
    CreateDir { path: PathBuf, source: io::Error },

    #[error("创建文件失败: {path}: {source}")]
    CreateFile { path: PathBuf, source: io::Error },

    #[error("写入文件失败: {path}: {source}")]
    Write { path: PathBuf, source: io::Error },

    #[error("重命名失败: {path}: {source}")]
    Rename { path: PathBuf, source: io::Error },

    #[error("请求失败: {0}")]
    Request(#[source] reqwest::Error),

    #[error("下载失败: {0}")]
    Body(#[source] reqwest::Error),

    #[error("HTTP {0}")]
    HttpStatus(reqwest::StatusCode),

    #[error("重试 {attempts} 次后失败: {last}")]
    RetriesExhausted {
        attempts: u32,
        last: Box<DownloadError>,
    },

    #[error("下载被取消")]
    Cancelled,

    #[error("没有找到有效的下载任务")]
    NoTasks,

    #[error("读取任务表失败: {0}")]
    Source(String),

    #[error("配置无效: {0}")]
    Config(String),
}

impl DownloadError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DownloadError::EmptyUrl => ErrorKind::EmptyUrl,
            DownloadError::InvalidUrl(_) => ErrorKind::InvalidUrl,
            DownloadError::CreateDir { .. }
            | DownloadError::CreateFile { .. }
            | DownloadError::Write { .. }
            | DownloadError::Rename { .. } => ErrorKind::Filesystem,
            DownloadError::Request(_) | DownloadError::Body(_) => ErrorKind::Network,
            DownloadError::HttpStatus(_) => ErrorKind::Http,
            DownloadError::RetriesExhausted { last, .. } => last.kind(),
            DownloadError::Cancelled => ErrorKind::Cancelled,
            DownloadError::NoTasks | DownloadError::Source(_) | DownloadError::Config(_) => {
                ErrorKind::Setup
            }
        }
    }

    pub fn is_invalid_link(&self) -> bool {
        self.kind().is_invalid_link()
    }

    /// reqwest 在构造请求阶段失败说明链接本身有问题
    pub(crate) fn from_request(url: &str, error: reqwest::Error) -> Self {
        if error.is_builder() {
            DownloadError::InvalidUrl(url.to_string())
        } else {
            DownloadError::Request(error)
        }
    }
}

pub type Result<T, E = DownloadError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    fn io_error() -> io::Error {
        io::Error::new(io::ErrorKind::PermissionDenied, "denied")
    }

    #[test]
    fn test_filesystem_kinds() {
        let errors = [
            DownloadError::CreateDir { path: "a".into(), source: io_error() },
            DownloadError::CreateFile { path: "a".into(), source: io_error() },
            DownloadError::Write { path: "a".into(), source: io_error() },
            DownloadError::Rename { path: "a".into(), source: io_error() },
        ];
        for e in &errors {
            assert_eq!(e.kind(), ErrorKind::Filesystem);
            assert!(!e.is_invalid_link());
        }
    }

    #[test]
    fn test_link_kinds() {
        assert!(DownloadError::EmptyUrl.is_invalid_link());
        assert!(DownloadError::InvalidUrl("ftp:/x".to_string()).is_invalid_link());
        assert!(!DownloadError::HttpStatus(reqwest::StatusCode::NOT_FOUND).is_invalid_link());
    }

    #[test]
    fn test_retries_exhausted_keeps_last_kind_and_count() {
        let error = DownloadError::RetriesExhausted {
            attempts: 3,
            last: Box::new(DownloadError::HttpStatus(reqwest::StatusCode::INTERNAL_SERVER_ERROR)),
        };
        assert_eq!(error.kind(), ErrorKind::Http);
        let message = error.to_string();
        assert!(message.contains("重试 3 次"));
        assert!(message.contains("500"));

        let empty = DownloadError::RetriesExhausted {
            attempts: 2,
            last: Box::new(DownloadError::EmptyUrl),
        };
        assert!(empty.is_invalid_link());
    }

    #[test]
    fn test_setup_kinds() {
        assert_eq!(DownloadError::NoTasks.kind(), ErrorKind::Setup);
        assert_eq!(DownloadError::Config("x".into()).kind(), ErrorKind::Setup);
        assert_eq!(DownloadError::Source("x".into()).kind(), ErrorKind::Setup);
    }
}
