//! 消息组装 - 将 (事件类型, 上下文, 模板) 转换为标准化 `Message`
//!
//! 设计原则：
//! 1. 纯函数 - 相同输入得到相同输出（组装时间戳除外）
//! 2. 不失败 - 上下文缺失字段时使用占位符
//! 3. 有界 - 长文本截断，整体序列化大小不超过下游限制

use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::debug;

use super::channel::{
    is_hex_color, Field, Message, MAX_FIELD_TITLE_CHARS, MAX_FIELD_VALUE_CHARS, MAX_FOOTER_CHARS,
};
use super::event::{EventContext, EventKind};
use super::notifier::NotifyOptions;
use super::payload;
use super::template::{FieldKey, MessageTemplate, StructuredTemplate};
use crate::error::ValidationError;

/// 错误信息截断预算（字符，含省略号）
pub const ERROR_TEXT_BUDGET: usize = 500;
/// 发送 body 的大小上限（字节）
pub const MAX_MESSAGE_BYTES: usize = 4000;
/// 为 bot 目标追加的 `"channel"` 键预留的字节数
pub const CHANNEL_RESERVE_BYTES: usize = 64;
/// 截断标记
pub const ELLIPSIS: &str = "...";

/// 占位符
pub mod placeholder {
    pub const WORKFLOW: &str = "Unknown workflow";
    pub const RUN: &str = "Unknown run";
    pub const UNKNOWN: &str = "Unknown";
    pub const NO_TASKS: &str = "No tasks recorded";
}

/// 组装消息
pub fn compose(kind: EventKind, ctx: &EventContext, template: &MessageTemplate) -> Message {
    let mut message = match template {
        MessageTemplate::Text(text) => {
            let body = if text.trim().is_empty() {
                default_text(kind, ctx)
            } else {
                text.clone()
            };
            Message::new(kind, body)
        }
        MessageTemplate::Structured(structured) => compose_structured(kind, ctx, structured),
    };

    fit_to_size(&mut message);
    message
}

/// 组装 ad-hoc 消息（`Custom` 类型）
///
/// 正文为空或颜色格式错误时返回 `ValidationError`。
pub fn compose_custom(options: &NotifyOptions) -> Result<Message, ValidationError> {
    if options.text.trim().is_empty() {
        return Err(ValidationError::EmptyText);
    }

    let mut message = Message::new(EventKind::Custom, options.text.clone());
    if let Some(color) = &options.color {
        if !is_hex_color(color) {
            return Err(ValidationError::InvalidColor(color.clone()));
        }
        message = message.with_color(color.clone());
    }
    message.fields = options.fields.iter().map(clamp_field).collect();

    fit_to_size(&mut message);
    Ok(message)
}

fn compose_structured(kind: EventKind, ctx: &EventContext, template: &StructuredTemplate) -> Message {
    let text = template
        .text
        .as_deref()
        .filter(|t| !t.trim().is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| default_text(kind, ctx));

    let footer = ctx.workflow_name.as_deref().unwrap_or(placeholder::WORKFLOW);
    let mut message =
        Message::new(kind, text).with_footer(truncate_with_ellipsis(footer, MAX_FOOTER_CHARS));

    // 非法颜色保留默认值
    match template.color.as_deref() {
        Some(color) if is_hex_color(color) => message = message.with_color(color),
        Some(color) => debug!(color, "Ignoring invalid template color"),
        None => {}
    }

    for raw in &template.include_fields {
        let Ok(key) = raw.parse::<FieldKey>() else {
            debug!(field = %raw, "Ignoring unknown field key");
            continue;
        };
        if !key.allowed_for(kind) {
            debug!(field = %raw, kind = %kind, "Ignoring field not valid for event kind");
            continue;
        }
        message.fields.push(builtin_field(key, kind, ctx));
    }

    message
        .fields
        .extend(template.custom_fields.iter().map(clamp_field));

    message
}

/// 按事件默认正文
pub fn default_text(kind: EventKind, ctx: &EventContext) -> String {
    let workflow = ctx.workflow_name.as_deref().unwrap_or(placeholder::WORKFLOW);
    match kind {
        EventKind::Started => format!(":rocket: *{}* started", workflow),
        EventKind::Completed => format!(":white_check_mark: *{}* completed successfully", workflow),
        EventKind::Failed => format!(":x: *{}* failed", workflow),
        EventKind::Custom => format!("Message from *{}*", workflow),
    }
}

/// 从上下文提取内置字段
fn builtin_field(key: FieldKey, kind: EventKind, ctx: &EventContext) -> Field {
    let value = match key {
        FieldKey::RunName => ctx.run_id.clone().unwrap_or_else(|| placeholder::RUN.to_string()),
        FieldKey::Status => status_text(kind, ctx.success).to_string(),
        FieldKey::Duration => ctx
            .duration
            .map(format_duration)
            .unwrap_or_else(|| placeholder::UNKNOWN.to_string()),
        FieldKey::CommandLine => ctx
            .command_line
            .as_deref()
            .map(|c| format!("```{}```", truncate_with_ellipsis(c, MAX_FIELD_VALUE_CHARS - 6)))
            .unwrap_or_else(|| placeholder::UNKNOWN.to_string()),
        FieldKey::WorkDir => ctx
            .work_dir
            .as_deref()
            .map(|d| format!("`{}`", truncate_with_ellipsis(d, MAX_FIELD_VALUE_CHARS - 2)))
            .unwrap_or_else(|| placeholder::UNKNOWN.to_string()),
        FieldKey::ErrorMessage => ctx
            .error_message
            .as_deref()
            .filter(|e| !e.trim().is_empty())
            .map(|e| truncate_with_ellipsis(e.trim(), ERROR_TEXT_BUDGET))
            .unwrap_or_else(|| placeholder::UNKNOWN.to_string()),
        FieldKey::FailedProcess => failed_process_text(ctx),
        FieldKey::Tasks => counters_summary(&ctx.counters),
        FieldKey::StartTime => format_time(ctx.start_time),
        FieldKey::CompleteTime => format_time(ctx.complete_time),
    };

    Field::new(key.title(), value, key.is_compact())
}

fn status_text(kind: EventKind, success: Option<bool>) -> &'static str {
    match (success, kind) {
        (Some(true), _) => "Success",
        (Some(false), _) => "Failed",
        (None, EventKind::Started) => "Running",
        (None, EventKind::Completed) => "Success",
        (None, EventKind::Failed) => "Failed",
        (None, EventKind::Custom) => placeholder::UNKNOWN,
    }
}

fn failed_process_text(ctx: &EventContext) -> String {
    let Some(failure) = &ctx.failure else {
        return placeholder::UNKNOWN.to_string();
    };
    let step = failure.step.as_deref().unwrap_or(placeholder::UNKNOWN);
    match failure.exit_code {
        Some(code) => format!("{} (exit code {})", step, code),
        None => step.to_string(),
    }
}

/// 计数器摘要：`succeeded: 10, failed: 1`
pub fn counters_summary(counters: &[(String, u64)]) -> String {
    if counters.is_empty() {
        return placeholder::NO_TASKS.to_string();
    }
    counters
        .iter()
        .map(|(name, value)| format!("{}: {}", name, value))
        .collect::<Vec<_>>()
        .join(", ")
}

/// 格式化时长：`1h 2m 3s`
pub fn format_duration(duration: Duration) -> String {
    let total = duration.as_secs();
    let (hours, minutes, seconds) = (total / 3600, (total % 3600) / 60, total % 60);
    if hours > 0 {
        format!("{}h {}m {}s", hours, minutes, seconds)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, seconds)
    } else if total > 0 {
        format!("{}s", seconds)
    } else {
        format!("{}ms", duration.as_millis())
    }
}

fn format_time(time: Option<DateTime<Utc>>) -> String {
    time.map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| placeholder::UNKNOWN.to_string())
}

/// 按字符截断，超长时以省略号结尾，结果不超过 `max_chars` 个字符
pub fn truncate_with_ellipsis(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let keep = max_chars.saturating_sub(ELLIPSIS.len());
    let mut truncated: String = text.chars().take(keep).collect();
    truncated.push_str(ELLIPSIS);
    truncated
}

/// 自定义字段限制长度
pub(crate) fn clamp_field(field: &Field) -> Field {
    Field {
        title: truncate_with_ellipsis(&field.title, MAX_FIELD_TITLE_CHARS),
        value: truncate_with_ellipsis(&field.value, MAX_FIELD_VALUE_CHARS),
        compact: field.compact,
    }
}

/// 线上 body 大小（含 bot `channel` 预留）
fn wire_len(message: &Message) -> usize {
    serde_json::to_vec(&payload::render(message))
        .map(|v| v.len() + CHANNEL_RESERVE_BYTES)
        .unwrap_or(usize::MAX)
}

/// 保证发送 body 不超过 `MAX_MESSAGE_BYTES`：先从末尾丢弃字段，再截断页脚和正文
pub(crate) fn fit_to_size(message: &mut Message) {
    let original_fields = message.fields.len();
    while wire_len(message) > MAX_MESSAGE_BYTES && !message.fields.is_empty() {
        message.fields.pop();
    }
    if message.fields.len() != original_fields {
        debug!(
            dropped = original_fields - message.fields.len(),
            "Dropped trailing fields to fit message size limit"
        );
    }

    if wire_len(message) > MAX_MESSAGE_BYTES {
        if let Some(footer) = message.footer.as_mut() {
            *footer = truncate_with_ellipsis(footer.as_str(), MAX_FOOTER_CHARS);
        }
    }

    let mut budget = message.text.chars().count();
    while wire_len(message) > MAX_MESSAGE_BYTES && budget > ELLIPSIS.len() {
        let overflow = wire_len(message).saturating_sub(MAX_MESSAGE_BYTES);
        budget = budget.saturating_sub(overflow.max(16));
        message.text = truncate_with_ellipsis(&message.text, budget.max(ELLIPSIS.len()));
    }
}
