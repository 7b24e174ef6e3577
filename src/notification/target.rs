//! 凭据解析 - 从配置中确定唯一的发送目标
//!
//! 两种互斥的方案：Bot token + 频道 ID，或单个 incoming webhook URL。
//! 两者都存在时 Bot 优先；都不存在时返回 `None`（子系统静默禁用）。

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use tracing::{debug, info, warn};
use url::Url;

use crate::config::{is_blank, NotifyConfig};
use crate::error::ConfigurationError;

/// Incoming webhook 的域名
pub const WEBHOOK_HOST: &str = "hooks.slack.com";

fn token_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^xox[bp]-").unwrap())
}

fn destination_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Z0-9]+$").unwrap())
}

/// Bot 目标
#[derive(Clone, PartialEq, Eq)]
pub struct BotTarget {
    pub token: String,
    /// 频道 ID（如 C0123ABCD）
    pub destination: String,
}

// token 不进日志
impl fmt::Debug for BotTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BotTarget")
            .field("token", &"xox*-***")
            .field("destination", &self.destination)
            .finish()
    }
}

/// Webhook 目标
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookTarget {
    pub endpoint: Url,
}

/// 已解析的发送目标，进程生命周期内不可变
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryTarget {
    Bot(BotTarget),
    Webhook(WebhookTarget),
}

impl DeliveryTarget {
    pub fn name(&self) -> &'static str {
        match self {
            DeliveryTarget::Bot(_) => "bot",
            DeliveryTarget::Webhook(_) => "webhook",
        }
    }

    /// 用于日志的目标描述（不包含密钥）
    pub fn describe(&self) -> String {
        match self {
            DeliveryTarget::Bot(bot) => format!("bot -> {}", bot.destination),
            DeliveryTarget::Webhook(hook) => format!(
                "webhook -> {}",
                hook.endpoint.host_str().unwrap_or(WEBHOOK_HOST)
            ),
        }
    }
}

/// 解析配置，得到唯一的发送目标
///
/// 只有凭据格式错误才返回错误；未配置是正常路径，返回 `Ok(None)`。
pub fn resolve(config: &NotifyConfig) -> Result<Option<DeliveryTarget>, ConfigurationError> {
    if !config.enabled {
        debug!("Notifications disabled by configuration");
        return Ok(None);
    }

    let has_token = !is_blank(&config.bot.token);
    let has_destination = !is_blank(&config.bot.destination);

    if has_token && has_destination {
        let token = config.bot.token.as_deref().unwrap_or_default().trim();
        let destination = config.bot.destination.as_deref().unwrap_or_default().trim();
        let target = resolve_bot(token, destination)?;
        if !is_blank(&config.webhook.url) {
            info!("Both bot and webhook credentials configured, using bot");
        }
        return Ok(Some(target));
    }

    if has_token != has_destination {
        warn!(
            has_token,
            has_destination, "Incomplete bot configuration: both token and destination are required"
        );
    }

    if let Some(url) = config.webhook.url.as_deref().map(str::trim).filter(|u| !u.is_empty()) {
        return resolve_webhook(url).map(Some);
    }

    debug!("No notification credentials configured");
    Ok(None)
}

fn resolve_bot(token: &str, destination: &str) -> Result<DeliveryTarget, ConfigurationError> {
    if !token_pattern().is_match(token) {
        return Err(ConfigurationError::InvalidToken);
    }
    if !destination_pattern().is_match(destination) {
        return Err(ConfigurationError::InvalidDestination(destination.to_string()));
    }
    Ok(DeliveryTarget::Bot(BotTarget {
        token: token.to_string(),
        destination: destination.to_string(),
    }))
}

fn resolve_webhook(raw: &str) -> Result<DeliveryTarget, ConfigurationError> {
    let invalid = |reason: &str| ConfigurationError::InvalidWebhookUrl {
        url: raw.to_string(),
        reason: reason.to_string(),
    };

    let endpoint = Url::parse(raw).map_err(|e| invalid(&e.to_string()))?;
    if endpoint.scheme() != "https" {
        return Err(invalid("scheme must be https"));
    }
    if endpoint.host_str() != Some(WEBHOOK_HOST) {
        return Err(invalid(&format!("host must be {}", WEBHOOK_HOST)));
    }
    Ok(DeliveryTarget::Webhook(WebhookTarget { endpoint }))
}
