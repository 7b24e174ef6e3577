//! 配置模块 - 已解析的通知配置树
//!
//! 配置格式（JSON，键名同时接受 snake_case 和 camelCase）：
//! ```json
//! {
//!   "enabled": true,
//!   "bot": { "token": "xoxb-...", "destination": "C0123ABCD" },
//!   "webhook": { "url": "https://hooks.slack.com/services/..." },
//!   "onStart": { "enabled": true, "message": "Run started" },
//!   "onError": {
//!     "message": { "text": "Run failed", "includeFields": ["runName", "errorMessage"] }
//!   }
//! }
//! ```

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ConfigurationError;
use crate::notification::event::EventKind;
use crate::notification::retry::RetryPolicy;
use crate::notification::template::{FieldKey, MessageTemplate, StructuredTemplate};

/// Slack Web API 默认地址
pub const DEFAULT_API_BASE_URL: &str = "https://slack.com/api";

/// 通知配置根节点
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotifyConfig {
    /// 总开关，false 时整个子系统静默禁用
    pub enabled: bool,
    /// Bot token 方案
    pub bot: BotConfig,
    /// Incoming webhook 方案
    pub webhook: WebhookConfig,
    #[serde(alias = "onStart")]
    pub on_start: EventConfig,
    #[serde(alias = "onComplete")]
    pub on_complete: EventConfig,
    #[serde(alias = "onError")]
    pub on_error: EventConfig,
    /// 发送参数
    pub delivery: DeliverySettings,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            bot: BotConfig::default(),
            webhook: WebhookConfig::default(),
            on_start: EventConfig::default(),
            on_complete: EventConfig::default(),
            on_error: EventConfig::default(),
            delivery: DeliverySettings::default(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BotConfig {
    pub token: Option<String>,
    #[serde(alias = "channel")]
    pub destination: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WebhookConfig {
    pub url: Option<String>,
}

/// 单个生命周期事件的配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EventConfig {
    pub enabled: bool,
    /// 字符串或结构化对象
    pub message: Option<MessageTemplate>,
    #[serde(alias = "includeCommandLine")]
    pub include_command_line: bool,
    #[serde(alias = "includeResourceUsage")]
    pub include_resource_usage: bool,
    #[serde(alias = "includeErrorMessage")]
    pub include_error_message: bool,
}

impl Default for EventConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            message: None,
            include_command_line: true,
            include_resource_usage: true,
            include_error_message: true,
        }
    }
}

impl EventConfig {
    /// 返回该事件使用的模板
    ///
    /// 未配置 `message` 时，根据 include_* 开关生成默认结构化模板。
    pub fn template(&self, kind: EventKind) -> MessageTemplate {
        if let Some(template) = &self.message {
            return template.clone();
        }

        let mut fields = vec![FieldKey::RunName];
        match kind {
            EventKind::Started => {
                if self.include_command_line {
                    fields.push(FieldKey::CommandLine);
                }
                fields.push(FieldKey::WorkDir);
                fields.push(FieldKey::StartTime);
            }
            EventKind::Completed => {
                fields.push(FieldKey::Duration);
                fields.push(FieldKey::Status);
                if self.include_resource_usage {
                    fields.push(FieldKey::Tasks);
                }
                if self.include_command_line {
                    fields.push(FieldKey::CommandLine);
                }
            }
            EventKind::Failed => {
                fields.push(FieldKey::Duration);
                fields.push(FieldKey::FailedProcess);
                if self.include_error_message {
                    fields.push(FieldKey::ErrorMessage);
                }
                if self.include_command_line {
                    fields.push(FieldKey::CommandLine);
                }
                fields.push(FieldKey::WorkDir);
            }
            EventKind::Custom => {}
        }

        MessageTemplate::Structured(StructuredTemplate {
            include_fields: fields.iter().map(|f| f.as_str().to_string()).collect(),
            ..Default::default()
        })
    }
}

/// 发送参数（限流、重试、超时）
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeliverySettings {
    #[serde(alias = "rateLimitMs")]
    pub rate_limit_ms: u64,
    #[serde(alias = "maxRetries")]
    pub max_retries: u32,
    #[serde(alias = "connectTimeoutSecs")]
    pub connect_timeout_secs: u64,
    #[serde(alias = "requestTimeoutSecs")]
    pub request_timeout_secs: u64,
    #[serde(alias = "apiBaseUrl")]
    pub api_base_url: String,
}

impl Default for DeliverySettings {
    fn default() -> Self {
        Self {
            rate_limit_ms: 1000,
            max_retries: 3,
            connect_timeout_secs: 5,
            request_timeout_secs: 10,
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
        }
    }
}

impl DeliverySettings {
    pub fn rate_limit_interval(&self) -> Duration {
        Duration::from_millis(self.rate_limit_ms)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            ..RetryPolicy::default()
        }
    }
}

impl NotifyConfig {
    /// 从已解析的 JSON 值构建
    pub fn from_value(value: serde_json::Value) -> Result<Self, ConfigurationError> {
        serde_json::from_value(value).map_err(|e| ConfigurationError::Malformed(e.to_string()))
    }

    /// 从 JSON 文件加载
    pub fn load(path: &Path) -> Result<Self, ConfigurationError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigurationError::Unreadable {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        serde_json::from_str(&content).map_err(|e| ConfigurationError::Malformed(e.to_string()))
    }

    /// 加载默认位置 ~/.config/run-notify/config.json
    ///
    /// 文件不存在时返回默认配置（没有凭据，等同于未启用）。
    pub fn load_default() -> Result<Self, ConfigurationError> {
        let Some(home) = dirs::home_dir() else {
            return Ok(Self::default());
        };
        let path = home.join(".config/run-notify/config.json");
        if !path.exists() {
            debug!(path = %path.display(), "No config file found, using defaults");
            return Ok(Self::default());
        }
        Self::load(&path)
    }

    /// 用环境变量补全空缺的凭据
    pub fn with_env_fallback(mut self) -> Self {
        fn env(name: &str) -> Option<String> {
            std::env::var(name).ok().filter(|v| !v.trim().is_empty())
        }

        if is_blank(&self.bot.token) {
            self.bot.token = env("SLACK_BOT_TOKEN");
        }
        if is_blank(&self.bot.destination) {
            self.bot.destination = env("SLACK_CHANNEL_ID");
        }
        if is_blank(&self.webhook.url) {
            self.webhook.url = env("SLACK_WEBHOOK_URL");
        }
        self
    }

    /// 获取事件对应的配置；Custom 事件没有配置节点
    pub fn event(&self, kind: EventKind) -> Option<&EventConfig> {
        match kind {
            EventKind::Started => Some(&self.on_start),
            EventKind::Completed => Some(&self.on_complete),
            EventKind::Failed => Some(&self.on_error),
            EventKind::Custom => None,
        }
    }
}

pub(crate) fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map(str::trim).unwrap_or("").is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config_has_no_credentials() {
        let config = NotifyConfig::default();
        assert!(config.enabled);
        assert!(config.bot.token.is_none());
        assert!(config.webhook.url.is_none());
        assert_eq!(config.delivery.rate_limit_ms, 1000);
        assert_eq!(config.delivery.max_retries, 3);
    }

    #[test]
    fn test_from_value_accepts_camel_case() {
        let config = NotifyConfig::from_value(serde_json::json!({
            "bot": { "token": "xoxb-1", "channel": "C123" },
            "onStart": { "enabled": false, "message": "hello" },
            "onError": {
                "includeCommandLine": false,
                "message": { "text": "boom", "includeFields": ["errorMessage"] }
            }
        }))
        .unwrap();

        assert_eq!(config.bot.destination.as_deref(), Some("C123"));
        assert!(!config.on_start.enabled);
        assert_eq!(config.on_start.message, Some(MessageTemplate::Text("hello".to_string())));
        assert!(!config.on_error.include_command_line);
        match &config.on_error.message {
            Some(MessageTemplate::Structured(s)) => {
                assert_eq!(s.text.as_deref(), Some("boom"));
                assert_eq!(s.include_fields, vec!["errorMessage".to_string()]);
            }
            other => panic!("expected structured template, got {:?}", other),
        }
    }

    #[test]
    fn test_from_value_rejects_wrong_types() {
        let result = NotifyConfig::from_value(serde_json::json!({ "enabled": "yes" }));
        assert!(matches!(result, Err(ConfigurationError::Malformed(_))));
    }

    #[test]
    fn test_default_template_respects_flags() {
        let event = EventConfig {
            include_error_message: false,
            include_command_line: false,
            ..Default::default()
        };
        let MessageTemplate::Structured(template) = event.template(EventKind::Failed) else {
            panic!("expected structured default");
        };
        assert!(template.include_fields.contains(&"failedProcess".to_string()));
        assert!(!template.include_fields.contains(&"errorMessage".to_string()));
        assert!(!template.include_fields.contains(&"commandLine".to_string()));
    }

    #[test]
    fn test_configured_message_wins_over_default() {
        let event = EventConfig {
            message: Some(MessageTemplate::Text("custom".to_string())),
            ..Default::default()
        };
        assert_eq!(
            event.template(EventKind::Completed),
            MessageTemplate::Text("custom".to_string())
        );
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "webhook": {{ "url": "https://hooks.slack.com/services/T/B/X" }} }}"#).unwrap();

        let config = NotifyConfig::load(file.path()).unwrap();
        assert_eq!(
            config.webhook.url.as_deref(),
            Some("https://hooks.slack.com/services/T/B/X")
        );
    }

    #[test]
    fn test_load_missing_file_is_unreadable() {
        let result = NotifyConfig::load(Path::new("/nonexistent/run-notify.json"));
        assert!(matches!(result, Err(ConfigurationError::Unreadable { .. })));
    }

    #[test]
    fn test_custom_kind_has_no_event_config() {
        let config = NotifyConfig::default();
        assert!(config.event(EventKind::Custom).is_none());
        assert!(config.event(EventKind::Failed).is_some());
    }
}
