//! 发送限流 - 全局最小发送间隔
//!
//! 调用方在间隔未到时等待，而不是丢弃消息。

use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::{sleep, Instant};

/// 基于上次发送时间戳的限流器
#[derive(Debug)]
pub struct RateLimiter {
    interval: Duration,
    /// 上次放行时间
    last_send: Mutex<Option<Instant>>,
}

impl RateLimiter {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_send: Mutex::new(None),
        }
    }

    /// 等待直到允许发送，返回放行时刻
    ///
    /// 等待期间持有锁，并发调用按获取锁的顺序依次放行。
    pub async fn acquire(&self) -> Instant {
        let mut last = self.last_send.lock().await;
        if let Some(prev) = *last {
            let elapsed = prev.elapsed();
            if elapsed < self.interval {
                sleep(self.interval - elapsed).await;
            }
        }
        let now = Instant::now();
        *last = Some(now);
        now
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(Duration::from_secs(1))
    }
}
