//! Payload 构建 - 将 `Message` 转换为 Slack 线上格式
//!
//! Webhook 格式：
//! ```json
//! {
//!   "text": "...",
//!   "attachments": [{
//!     "color": "#2EB887",
//!     "fallback": "...",
//!     "fields": [{ "title": "Run Name", "value": "happy_turing", "short": true }],
//!     "footer": "rnaseq",
//!     "ts": 1767225600
//!   }]
//! }
//! ```
//! Bot 格式在此基础上增加 `channel` 字段。

use serde_json::{json, Value};

use super::channel::Message;
use super::formatter::truncate_with_ellipsis;
use super::target::DeliveryTarget;

/// 附件 `fallback`（通知预览）长度上限（字符）
pub const MAX_FALLBACK_CHARS: usize = 150;

/// 构建发送给目标的 JSON body
pub fn build_payload(message: &Message, target: &DeliveryTarget) -> Value {
    let mut payload = render(message);
    if let DeliveryTarget::Bot(bot) = target {
        payload["channel"] = Value::String(bot.destination.clone());
    }
    payload
}

/// 与目标无关的 body（不含 `channel`），消息大小按它计算
pub(crate) fn render(message: &Message) -> Value {
    let mut payload = json!({ "text": message.text });

    if message.is_structured() {
        let fields: Vec<Value> = message
            .fields
            .iter()
            .map(|f| json!({ "title": f.title, "value": f.value, "short": f.compact }))
            .collect();

        let mut attachment = json!({
            "color": message.color,
            "fallback": truncate_with_ellipsis(&message.text, MAX_FALLBACK_CHARS),
            "fields": fields,
            "ts": message.timestamp.timestamp(),
        });
        if let Some(footer) = &message.footer {
            attachment["footer"] = Value::String(footer.clone());
        }
        payload["attachments"] = json!([attachment]);
    }

    payload
}
