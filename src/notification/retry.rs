//! 重试策略 - 指数退避

use std::time::Duration;

/// Retry-After 提示的上限
pub const MAX_RETRY_AFTER: Duration = Duration::from_secs(60);

/// 重试策略
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// 首次尝试之后的最大重试次数
    pub max_retries: u32,
    /// 第一次重试前的等待
    pub base_delay: Duration,
    /// 单次等待上限
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    /// 总尝试次数（含首次）
    pub fn max_attempts(&self) -> u32 {
        self.max_retries + 1
    }

    /// 第 `retry` 次重试（从 1 开始）前的等待：base * 2^(retry-1)，不超过 max_delay
    pub fn delay_for(&self, retry: u32) -> Duration {
        let exponent = retry.saturating_sub(1).min(20);
        let delay = self.base_delay.saturating_mul(2_u32.saturating_pow(exponent));
        delay.min(self.max_delay)
    }

    /// 计算下一次等待；服务端给出的 Retry-After 覆盖本次计算值
    pub fn next_delay(&self, retry: u32, retry_after: Option<Duration>) -> Duration {
        match retry_after {
            Some(hint) => hint.min(MAX_RETRY_AFTER),
            None => self.delay_for(retry),
        }
    }
}
