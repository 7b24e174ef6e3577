//! Run Notify - 为进程生命周期事件和 ad-hoc 请求发送 Slack 通知

pub mod cli;
pub mod config;
pub mod error;
pub mod notification;

pub use config::NotifyConfig;
pub use error::{ConfigurationError, ValidationError};
pub use notification::{
    compose, resolve, DeliveryClient, DeliveryConfig, DeliveryTarget, EventContext, EventKind,
    FailureInfo, Message, MessageTemplate, NotificationBuilder, NotificationDispatcher,
    NotificationSystem, Notifier, NotifyOptions, RetryPolicy,
};
