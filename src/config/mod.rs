use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use crate::core::error::DownloadError;

/// 并发数上限
pub const MAX_CONCURRENCY_LIMIT: usize = 50;

/// 配置结构体
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    /// 下载目录，所有文件都保存在这里
    pub output_dir: String,
    /// 同时工作的下载 worker 数
    pub max_concurrency: usize,
    /// 单个请求超时时间（秒）
    pub timeout: u64,
    /// 每个文件最多尝试次数
    pub retry_count: u32,
    /// 退避基本单位（毫秒），第 n 次失败后等待 n² 个单位
    pub retry_backoff_ms: u64,
    /// 任务队列和结果队列的容量
    pub queue_capacity: usize,
    /// 结果汇总循环的轮询间隔（毫秒）
    pub poll_interval_ms: u64,
    /// 逐条日志的最小间隔（毫秒）
    pub log_interval_ms: u64,
    /// User-Agent
    pub user_agent: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output_dir: "./downloads".to_string(),
            max_concurrency: 10,
            timeout: 30,
            retry_count: 3,
            retry_backoff_ms: 1000,
            queue_capacity: 1000,
            poll_interval_ms: 100,
            log_interval_ms: 500,
            user_agent: format!("TableDown/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl Config {
    /// 加载配置文件，不存在时写入默认配置
    pub fn load(path: &str) -> Result<Self, DownloadError> {
        if Path::new(path).exists() {
            let content = fs::read_to_string(path)
                .map_err(|e| DownloadError::Config(format!("无法读取配置文件 {}: {}", path, e)))?;
            match toml::from_str(&content) {
                Ok(config) => Ok(config),
                Err(e) => {
                    log::warn!("配置文件格式错误: {}，将使用默认配置", e);
                    Ok(Config::default())
                }
            }
        } else {
            let config = Config::default();
            config.save_with_tutorial(path)?;
            Ok(config)
        }
    }

    /// 保存带教程的配置文件
    pub fn save_with_tutorial(&self, path: &str) -> Result<(), DownloadError> {
        if let Some(parent) = Path::new(path).parent() {
            fs::create_dir_all(parent)
                .map_err(|e| DownloadError::Config(format!("无法创建配置目录: {}", e)))?;
        }
        let config_content = toml::to_string_pretty(self)
            .map_err(|e| DownloadError::Config(format!("无法序列化配置: {}", e)))?;
        let full_content = format!("{}\n{}", Config::generate_tutorial_content(), config_content);
        fs::write(path, full_content)
            .map_err(|e| DownloadError::Config(format!("无法保存配置文件 {}: {}", path, e)))?;
        Ok(())
    }

    fn generate_tutorial_content() -> String {
        r#"# TableDown 配置文件
# ====================
#
# TOML 格式。命令行参数会覆盖这里的设置，优先级：命令行 > 配置文件 > 默认值
#
# 使用示例：
#   tabledown links.csv                                   # A 列为链接，B 列为文件名
#   tabledown links.csv --url-column 链接 --name-columns 编号,名称
#   tabledown links.csv -t 20 -r 5 -d /path/to/downloads
#   tabledown links.csv --headers                         # 只查看表头和前几行
#
# 配置项：
#   output_dir        下载目录
#   max_concurrency   同时下载的文件数（1-50）
#   timeout           单个请求超时（秒），超时的请求会重试
#   retry_count       每个文件最多尝试次数
#   retry_backoff_ms  重试等待的基本单位，第 n 次失败后等待 n*n 个单位
#   queue_capacity    任务队列容量
#   poll_interval_ms  结果汇总的轮询间隔，决定取消被识别的延迟
#   log_interval_ms   逐条日志的最小间隔，避免刷屏
#   user_agent        请求使用的 User-Agent
#
# ==================== 故障排除 ====================
#
# 问题：经常下载失败
# 解决：增加 retry_count 或 timeout 值
#
# 问题：服务器限流
# 解决：减少 max_concurrency
"#
        .to_string()
    }

    /// 校验配置合法性
    pub fn validate(&self) -> Result<(), DownloadError> {
        if self.max_concurrency == 0 || self.max_concurrency > MAX_CONCURRENCY_LIMIT {
            return Err(DownloadError::Config(format!(
                "并发数必须在 1-{} 之间",
                MAX_CONCURRENCY_LIMIT
            )));
        }
        if self.timeout == 0 {
            return Err(DownloadError::Config("超时时间必须大于0".to_string()));
        }
        if self.retry_count == 0 {
            return Err(DownloadError::Config("重试次数必须大于0".to_string()));
        }
        if self.queue_capacity == 0 {
            return Err(DownloadError::Config("队列容量必须大于0".to_string()));
        }
        if self.poll_interval_ms == 0 {
            return Err(DownloadError::Config("轮询间隔必须大于0".to_string()));
        }
        if self.output_dir.trim().is_empty() {
            return Err(DownloadError::Config("下载目录不能为空".to_string()));
        }
        Ok(())
    }

    /// 合并命令行参数到配置
    pub fn merge_from_args(&mut self, args: &crate::cli::Args) {
        if let Some(dir) = &args.download_dir {
            self.output_dir = dir.clone();
        }
        if let Some(concurrency) = args.concurrency {
            self.max_concurrency = concurrency;
        }
        if let Some(retries) = args.retry_count {
            self.retry_count = retries;
        }
        if let Some(timeout) = args.timeout {
            self.timeout = timeout;
        }
    }

    /// 下载目录的绝对路径
    pub fn output_path(&self) -> PathBuf {
        let dir = PathBuf::from(&self.output_dir);
        if dir.is_absolute() {
            dir
        } else {
            std::env::current_dir()
                .map(|cwd| cwd.join(&dir))
                .unwrap_or(dir)
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }

    pub fn backoff_unit(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn log_interval(&self) -> Duration {
        Duration::from_millis(self.log_interval_ms)
    }

    /// 获取配置摘要信息
    pub fn get_summary(&self) -> String {
        format!(
            "配置摘要:\n\
            - 下载目录: {}\n\
            - 并发数: {}\n\
            - 超时时间: {} 秒\n\
            - 重试次数: {}\n\
            - 退避单位: {} 毫秒",
            self.output_dir,
            self.max_concurrency,
            self.timeout,
            self.retry_count,
            self.retry_backoff_ms,
        )
    }
}
