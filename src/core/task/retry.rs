use std::time::Duration;
use crate::config::Config;

/// 重试策略：最多 `max_attempts` 次，第 n 次失败后等待 n² 个单位
#[derive(Debug, Clone)]
pub struct RetryStrategy {
    pub max_attempts: u32,
    pub backoff_unit: Duration,
}

impl Default for RetryStrategy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_unit: Duration::from_secs(1),
        }
    }
}

impl RetryStrategy {
    pub fn new(max_attempts: u32, backoff_unit: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff_unit,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.retry_count, config.backoff_unit())
    }

    /// 第 `attempt` 次失败后是否还能再试
    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }

    /// 第 `attempt` 次失败后的等待时间，不加抖动
    pub fn get_delay(&self, attempt: u32) -> Duration {
        self.backoff_unit.saturating_mul(attempt.saturating_mul(attempt))
    }
}
