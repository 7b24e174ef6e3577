//! 通知引擎 - 凭据解析、消息组装、可靠发送
//!
//! # 数据流
//! 1. `target::resolve` 启动时解析出唯一的 `DeliveryTarget`（或禁用）
//! 2. `formatter::compose` 把事件上下文和模板组装成 `Message`
//! 3. `DeliveryClient::deliver` 限流、重试，永不向调用方传播错误
//!
//! # 使用示例
//! ```ignore
//! use run_notify::notification::{NotificationBuilder, EventContext};
//!
//! let system = NotificationBuilder::new(config).build()?;
//! system.dispatcher.on_start(&EventContext::builder().run_id("nightly").build());
//! system.notifier.notify("Checkpoint reached");
//! system.shutdown(Duration::from_secs(30)).await;
//! ```

pub mod builder;
pub mod channel;
pub mod deduplicator;
pub mod delivery;
pub mod dispatcher;
pub mod event;
pub mod formatter;
pub mod notifier;
pub mod payload;
pub mod retry;
pub mod target;
pub mod template;
pub mod throttle;
pub mod worker;

pub use builder::{NotificationBuilder, NotificationSystem};
pub use channel::{Field, Message};
pub use deduplicator::ErrorLog;
pub use delivery::{AttemptOutcome, DeliveryClient, DeliveryConfig};
pub use dispatcher::NotificationDispatcher;
pub use event::{EventContext, EventContextBuilder, EventKind, FailureInfo};
pub use formatter::{compose, compose_custom};
pub use notifier::{Notifier, NotifyOptions};
pub use retry::RetryPolicy;
pub use target::{resolve, BotTarget, DeliveryTarget, WebhookTarget};
pub use template::{FieldKey, MessageTemplate, StructuredTemplate};
pub use throttle::RateLimiter;
pub use worker::{DeliveryQueue, WorkerGuard};
