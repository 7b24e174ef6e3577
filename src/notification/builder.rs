//! 通知系统构建器 - 启动时解析凭据并组装各组件
//!
//! 发送客户端只创建一次，队列句柄显式注入到分发器和 ad-hoc 接口。

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use super::delivery::{DeliveryClient, DeliveryConfig};
use super::dispatcher::NotificationDispatcher;
use super::notifier::Notifier;
use super::target::{resolve, DeliveryTarget};
use super::worker::{spawn_worker, WorkerGuard, DEFAULT_QUEUE_CAPACITY};
use crate::config::NotifyConfig;
use crate::error::ConfigurationError;

/// 通知系统构建器
pub struct NotificationBuilder {
    config: NotifyConfig,
    dry_run: bool,
    queue_capacity: usize,
    delivery: Option<DeliveryConfig>,
}

impl NotificationBuilder {
    pub fn new(config: NotifyConfig) -> Self {
        Self {
            config,
            dry_run: false,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            delivery: None,
        }
    }

    /// 设置 dry-run 模式
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    /// 覆盖配置文件中的发送参数
    pub fn delivery_config(mut self, delivery: DeliveryConfig) -> Self {
        self.delivery = Some(delivery);
        self
    }

    /// 构建通知系统（需要在 tokio runtime 内调用）
    ///
    /// 只有凭据格式错误会返回错误；未配置凭据时返回禁用状态的系统。
    pub fn build(self) -> Result<NotificationSystem, ConfigurationError> {
        let Some(target) = resolve(&self.config)? else {
            info!("Notifications not configured, running without them");
            return Ok(NotificationSystem {
                dispatcher: NotificationDispatcher::disabled(),
                notifier: Notifier::disabled(),
                guard: None,
                target: None,
            });
        };

        let mut delivery = self
            .delivery
            .unwrap_or_else(|| DeliveryConfig::from(&self.config.delivery));
        delivery.dry_run |= self.dry_run;

        info!(destination = %target.describe(), dry_run = delivery.dry_run, "Notifications enabled");

        let client = Arc::new(DeliveryClient::new(target.clone(), delivery)?);
        let (queue, guard) = spawn_worker(client, self.queue_capacity);

        Ok(NotificationSystem {
            dispatcher: NotificationDispatcher::new(Some(queue.clone()), self.config),
            notifier: Notifier::new(Some(queue)),
            guard: Some(guard),
            target: Some(target),
        })
    }
}

/// 组装好的通知系统
#[derive(Debug)]
pub struct NotificationSystem {
    pub dispatcher: NotificationDispatcher,
    pub notifier: Notifier,
    guard: Option<WorkerGuard>,
    target: Option<DeliveryTarget>,
}

impl NotificationSystem {
    pub fn target(&self) -> Option<&DeliveryTarget> {
        self.target.as_ref()
    }

    pub fn is_active(&self) -> bool {
        self.target.is_some()
    }

    /// 关闭并等待已入队消息发送，返回是否在宽限期内完成
    pub async fn shutdown(self, grace: Duration) -> bool {
        match self.guard {
            Some(guard) => guard.shutdown(grace).await,
            None => true,
        }
    }
}
