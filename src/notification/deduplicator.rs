//! 错误日志去重 - 相同的错误信息在进程生命周期内只记录一次
//!
//! 例如 token 失效时每个生命周期事件都会以相同原因失败，只需提示一次。

use std::collections::HashSet;
use std::sync::Mutex;

use tracing::{error, warn};

/// 日志级别
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Error,
}

/// 去重的错误日志
#[derive(Debug, Default)]
pub struct ErrorLog {
    seen: Mutex<HashSet<String>>,
}

impl ErrorLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// 首次出现返回 `true` 并记录
    pub fn first_occurrence(&self, message: &str) -> bool {
        match self.seen.lock() {
            Ok(mut seen) => seen.insert(message.to_string()),
            // 锁中毒时仍然允许输出日志
            Err(poisoned) => poisoned.into_inner().insert(message.to_string()),
        }
    }

    /// 记录错误（重复信息静默），返回是否实际输出
    pub fn report(&self, severity: Severity, target: &str, message: &str) -> bool {
        if !self.first_occurrence(message) {
            return false;
        }
        match severity {
            Severity::Warning => warn!(target_kind = %target, "Notification delivery failed: {}", message),
            Severity::Error => error!(target_kind = %target, "Notification delivery failed: {}", message),
        }
        true
    }

    /// 已记录的不同错误数量
    pub fn len(&self) -> usize {
        self.seen.lock().map(|s| s.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
