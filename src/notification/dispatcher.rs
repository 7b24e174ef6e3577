//! 通知分发器 - 生命周期事件入口
//!
//! 宿主在 start / complete / error 时调用；分发器按事件配置组装消息并入队，
//! 立即返回，不阻塞宿主的关键路径。

use tracing::debug;

use super::event::{EventContext, EventKind, FailureInfo};
use super::formatter::compose;
use super::worker::DeliveryQueue;
use crate::config::NotifyConfig;

/// 生命周期通知分发器
#[derive(Debug, Clone)]
pub struct NotificationDispatcher {
    queue: Option<DeliveryQueue>,
    config: NotifyConfig,
}

impl NotificationDispatcher {
    pub fn new(queue: Option<DeliveryQueue>, config: NotifyConfig) -> Self {
        Self { queue, config }
    }

    /// 未配置目标时的空分发器
    pub fn disabled() -> Self {
        Self {
            queue: None,
            config: NotifyConfig::default(),
        }
    }

    pub fn is_active(&self) -> bool {
        self.queue.is_some()
    }

    pub fn on_start(&self, ctx: &EventContext) -> bool {
        self.dispatch(EventKind::Started, ctx)
    }

    pub fn on_complete(&self, ctx: &EventContext) -> bool {
        self.dispatch(EventKind::Completed, ctx)
    }

    /// 失败事件；`failure` 覆盖上下文中的失败信息
    pub fn on_error(&self, ctx: &EventContext, failure: FailureInfo) -> bool {
        let mut ctx = ctx.clone();
        ctx.failure = Some(failure);
        if ctx.success.is_none() {
            ctx.success = Some(false);
        }
        self.dispatch(EventKind::Failed, &ctx)
    }

    /// 组装并入队，返回是否已入队
    fn dispatch(&self, kind: EventKind, ctx: &EventContext) -> bool {
        let Some(queue) = &self.queue else {
            debug!(kind = %kind, "No notification target configured, skipping");
            return false;
        };
        let Some(event) = self.config.event(kind) else {
            return false;
        };
        if !event.enabled {
            debug!(kind = %kind, "Notification disabled for event");
            return false;
        }

        let message = compose(kind, ctx, &event.template(kind));
        queue.enqueue(message)
    }
}
