//! 发送客户端 - 限流、重试、失败分类
//!
//! `deliver` 永远不会返回错误或 panic；结果只通过返回值和日志体现。

use std::time::Duration;

use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use tokio::time::sleep;
use tracing::{debug, info};

use super::channel::Message;
use super::deduplicator::{ErrorLog, Severity};
use super::payload::build_payload;
use super::retry::RetryPolicy;
use super::target::DeliveryTarget;
use super::throttle::RateLimiter;
use crate::config::{DeliverySettings, DEFAULT_API_BASE_URL};
use crate::error::ConfigurationError;

/// Slack API 中可以重试的逻辑错误码
const RETRYABLE_API_ERRORS: &[&str] = &[
    "rate_limited",
    "ratelimited",
    "internal_error",
    "fatal_error",
    "service_unavailable",
    "request_timeout",
];

/// 客户端配置
#[derive(Debug, Clone)]
pub struct DeliveryConfig {
    /// 两次发送之间的最小间隔
    pub rate_limit_interval: Duration,
    pub retry: RetryPolicy,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    /// Bot API 基础地址
    pub api_base_url: String,
    /// 只打印不发送
    pub dry_run: bool,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            rate_limit_interval: Duration::from_secs(1),
            retry: RetryPolicy::default(),
            connect_timeout: Duration::from_secs(5),
            request_timeout: Duration::from_secs(10),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            dry_run: false,
        }
    }
}

impl From<&DeliverySettings> for DeliveryConfig {
    fn from(settings: &DeliverySettings) -> Self {
        Self {
            rate_limit_interval: settings.rate_limit_interval(),
            retry: settings.retry_policy(),
            connect_timeout: Duration::from_secs(settings.connect_timeout_secs),
            request_timeout: Duration::from_secs(settings.request_timeout_secs),
            api_base_url: settings.api_base_url.clone(),
            dry_run: false,
        }
    }
}

/// 单次尝试的结果分类
#[derive(Debug, Clone, PartialEq)]
pub enum AttemptOutcome {
    Success,
    /// 临时失败，可重试
    Retryable {
        reason: String,
        retry_after: Option<Duration>,
    },
    /// 永久失败（认证、目标不存在等），不重试
    Fatal { reason: String },
}

/// 一次 `deliver` 调用中的当前尝试
#[derive(Debug, Clone, Copy)]
struct DeliveryAttempt {
    attempt_number: u32,
    next_delay: Duration,
}

/// Bot API 响应
#[derive(Debug, Deserialize)]
struct ApiResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
}

/// 发送客户端
#[derive(Debug)]
pub struct DeliveryClient {
    http: Client,
    target: DeliveryTarget,
    config: DeliveryConfig,
    limiter: RateLimiter,
    errors: ErrorLog,
}

impl DeliveryClient {
    pub fn new(target: DeliveryTarget, config: DeliveryConfig) -> Result<Self, ConfigurationError> {
        let http = Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ConfigurationError::HttpClient(e.to_string()))?;

        Ok(Self {
            http,
            limiter: RateLimiter::new(config.rate_limit_interval),
            errors: ErrorLog::new(),
            target,
            config,
        })
    }

    pub fn target(&self) -> &DeliveryTarget {
        &self.target
    }

    pub fn error_log(&self) -> &ErrorLog {
        &self.errors
    }

    /// 请求地址
    fn endpoint(&self) -> String {
        match &self.target {
            DeliveryTarget::Bot(_) => format!(
                "{}/chat.postMessage",
                self.config.api_base_url.trim_end_matches('/')
            ),
            DeliveryTarget::Webhook(hook) => hook.endpoint.to_string(),
        }
    }

    /// 发送消息，返回是否成功
    pub async fn deliver(&self, message: &Message) -> bool {
        let payload = build_payload(message, &self.target);
        let target_kind = self.target.name();

        if self.config.dry_run {
            info!(target_kind, kind = %message.kind, payload = %payload, "[DRY-RUN] Would send notification");
            return true;
        }

        let max_attempts = self.config.retry.max_attempts();
        let mut attempt = DeliveryAttempt {
            attempt_number: 1,
            next_delay: Duration::ZERO,
        };

        loop {
            self.limiter.acquire().await;

            match self.send_once(&payload).await {
                AttemptOutcome::Success => {
                    info!(
                        target_kind,
                        kind = %message.kind,
                        attempts = attempt.attempt_number,
                        "Notification sent"
                    );
                    return true;
                }
                AttemptOutcome::Fatal { reason } => {
                    self.errors.report(Severity::Error, target_kind, &reason);
                    return false;
                }
                AttemptOutcome::Retryable { reason, retry_after } => {
                    if attempt.attempt_number >= max_attempts {
                        let summary = format!("{} (gave up after {} attempts)", reason, max_attempts);
                        self.errors.report(Severity::Warning, target_kind, &summary);
                        return false;
                    }

                    attempt.next_delay = self.config.retry.next_delay(attempt.attempt_number, retry_after);
                    debug!(
                        target_kind,
                        attempt = attempt.attempt_number,
                        delay_ms = attempt.next_delay.as_millis() as u64,
                        reason = %reason,
                        "Retrying notification"
                    );
                    sleep(attempt.next_delay).await;
                    attempt.attempt_number += 1;
                }
            }
        }
    }

    /// 执行一次 HTTP POST 并分类结果
    async fn send_once(&self, payload: &Value) -> AttemptOutcome {
        let mut request = self.http.post(self.endpoint()).json(payload);
        if let DeliveryTarget::Bot(bot) = &self.target {
            request = request.bearer_auth(&bot.token);
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => return classify_transport_error(&e),
        };

        let status = response.status().as_u16();
        let retry_after = parse_retry_after(response.headers());
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                debug!(error = %e, "Failed to read response body");
                String::new()
            }
        };

        classify_response(&self.target, status, retry_after, &body)
    }
}

fn classify_transport_error(e: &reqwest::Error) -> AttemptOutcome {
    if e.is_builder() {
        return AttemptOutcome::Fatal {
            reason: format!("invalid request: {}", e),
        };
    }
    let reason = if e.is_timeout() {
        "request timed out".to_string()
    } else if e.is_connect() {
        format!("connection failed: {}", e)
    } else {
        format!("network error: {}", e)
    };
    AttemptOutcome::Retryable {
        reason,
        retry_after: None,
    }
}

/// 解析 Retry-After（秒）
pub fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

/// 根据目标类型分类 HTTP 响应
pub fn classify_response(
    target: &DeliveryTarget,
    status: u16,
    retry_after: Option<Duration>,
    body: &str,
) -> AttemptOutcome {
    match status {
        429 => AttemptOutcome::Retryable {
            reason: "HTTP 429 rate limited".to_string(),
            retry_after,
        },
        500..=599 => AttemptOutcome::Retryable {
            reason: format!("HTTP {}", status),
            retry_after,
        },
        200..=299 => match target {
            DeliveryTarget::Webhook(_) => AttemptOutcome::Success,
            DeliveryTarget::Bot(_) => classify_api_body(body, retry_after),
        },
        _ => AttemptOutcome::Fatal {
            reason: format!("HTTP {}: {}", status, short_body(body)),
        },
    }
}

fn classify_api_body(body: &str, retry_after: Option<Duration>) -> AttemptOutcome {
    let response: ApiResponse = match serde_json::from_str(body) {
        Ok(response) => response,
        Err(_) => {
            return AttemptOutcome::Fatal {
                reason: format!("malformed API response: {}", short_body(body)),
            }
        }
    };

    if response.ok {
        return AttemptOutcome::Success;
    }

    let code = response.error.unwrap_or_else(|| "unknown_error".to_string());
    let reason = format!("Slack API error: {}", code);
    if RETRYABLE_API_ERRORS.contains(&code.as_str()) {
        AttemptOutcome::Retryable { reason, retry_after }
    } else {
        AttemptOutcome::Fatal { reason }
    }
}

fn short_body(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return "<empty body>".to_string();
    }
    trimmed.chars().take(200).collect()
}
