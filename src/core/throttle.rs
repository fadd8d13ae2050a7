//! Log throttling.
//!
//! 限制逐条日志的频率，避免界面被大量日志拖慢。

use std::time::{Duration, Instant};

pub struct LogThrottle {
    last_emit: Instant,
    min_interval: Duration,
}

impl LogThrottle {
    /// 从 `start` 开始计时，第一条日志也要等满一个间隔
    pub fn starting_at(start: Instant, min_interval: Duration) -> Self {
        Self { last_emit: start, min_interval }
    }

    /// 距上次输出已满间隔，或 `force` 为 true 时返回 true 并重新计时
    pub fn should_emit(&mut self, force: bool) -> bool {
        let now = Instant::now();
        if force || now.duration_since(self.last_emit) >= self.min_interval {
            self.last_emit = now;
            true
        } else {
            false
        }
    }
}
