//! 错误类型定义
//!
//! 只有 `ConfigurationError` 允许传播到宿主进程（启动阶段失败）；
//! `ValidationError` 由 ad-hoc 接口捕获并记录日志。

use thiserror::Error;

/// 配置错误 - 启动阶段发现的凭据或配置文件问题
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigurationError {
    #[error("invalid bot token: must start with 'xoxb-' or 'xoxp-'")]
    InvalidToken,

    #[error("invalid destination '{0}': expected a channel ID such as 'C0123ABCD', not a channel name")]
    InvalidDestination(String),

    #[error("invalid webhook URL '{url}': {reason}")]
    InvalidWebhookUrl { url: String, reason: String },

    #[error("failed to read config file {path}: {message}")]
    Unreadable { path: String, message: String },

    #[error("failed to parse config: {0}")]
    Malformed(String),

    #[error("failed to create HTTP client: {0}")]
    HttpClient(String),
}

/// 校验错误 - ad-hoc 消息请求不合法
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("message text must not be empty")]
    EmptyText,

    #[error("invalid color '{0}': expected #RRGGBB")]
    InvalidColor(String),
}
