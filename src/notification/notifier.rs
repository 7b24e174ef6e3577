//! Ad-hoc 通知接口 - 宿主进程在任意时刻发送消息
//!
//! ```ignore
//! notifier.notify("Checkpoint reached");
//! notifier.notify(NotifyOptions::new("Stage done").with_color("#2EB887").with_field("Samples", "42", true));
//! ```

use tracing::{debug, error};

use super::channel::Field;
use super::formatter::compose_custom;
use super::worker::DeliveryQueue;

/// 结构化 ad-hoc 消息
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NotifyOptions {
    /// 正文（必填）
    pub text: String,
    /// `#RRGGBB`
    pub color: Option<String>,
    pub fields: Vec<Field>,
}

impl NotifyOptions {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    pub fn with_field(mut self, title: impl Into<String>, value: impl Into<String>, compact: bool) -> Self {
        self.fields.push(Field::new(title, value, compact));
        self
    }
}

impl From<&str> for NotifyOptions {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}

impl From<String> for NotifyOptions {
    fn from(text: String) -> Self {
        Self::new(text)
    }
}

/// Ad-hoc 通知句柄，可克隆并在多个任务中并发使用
#[derive(Debug, Clone, Default)]
pub struct Notifier {
    queue: Option<DeliveryQueue>,
}

impl Notifier {
    pub fn new(queue: Option<DeliveryQueue>) -> Self {
        Self { queue }
    }

    /// 未配置目标时的空实现
    pub fn disabled() -> Self {
        Self { queue: None }
    }

    pub fn is_active(&self) -> bool {
        self.queue.is_some()
    }

    /// 发送 ad-hoc 消息，返回是否已入队
    ///
    /// 未配置目标或请求不合法时只记录日志，不返回错误。
    pub fn notify(&self, options: impl Into<NotifyOptions>) -> bool {
        let Some(queue) = &self.queue else {
            debug!("No notification target configured, skipping ad-hoc message");
            return false;
        };

        let options = options.into();
        match compose_custom(&options) {
            Ok(message) => queue.enqueue(message),
            Err(e) => {
                error!(error = %e, "Rejected ad-hoc notification");
                false
            }
        }
    }
}
