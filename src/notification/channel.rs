//! 标准化消息结构
//!
//! `Message` 是消息组装的输出，与具体发送目标无关。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::event::EventKind;

/// 字段标题长度上限（字符）
pub const MAX_FIELD_TITLE_CHARS: usize = 50;
/// 字段值长度上限（字符）
pub const MAX_FIELD_VALUE_CHARS: usize = 2000;
/// 页脚长度上限（字符）
pub const MAX_FOOTER_CHARS: usize = 150;

/// 语义颜色
pub mod color {
    pub const INFO: &str = "#3AA3E3";
    pub const SUCCESS: &str = "#2EB887";
    pub const FAILURE: &str = "#A30200";
}

/// 消息字段
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    pub title: String,
    pub value: String,
    /// 渲染提示：紧凑字段两两并排显示
    #[serde(default, alias = "short")]
    pub compact: bool,
}

impl Field {
    pub fn new(title: impl Into<String>, value: impl Into<String>, compact: bool) -> Self {
        Self {
            title: title.into(),
            value: value.into(),
            compact,
        }
    }
}

/// 标准化消息
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub kind: EventKind,
    /// 正文
    pub text: String,
    /// `#RRGGBB`
    pub color: String,
    /// 颜色由调用方或模板指定，而不是事件默认色
    #[serde(default)]
    pub explicit_color: bool,
    pub fields: Vec<Field>,
    /// 页脚（工作流名称等上下文信息）
    pub footer: Option<String>,
    /// 组装时间
    pub timestamp: DateTime<Utc>,
}

impl Message {
    /// 创建简单文本消息
    pub fn new(kind: EventKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
            color: default_color(kind).to_string(),
            explicit_color: false,
            fields: Vec::new(),
            footer: None,
            timestamp: Utc::now(),
        }
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = color.into();
        self.explicit_color = true;
        self
    }

    pub fn with_footer(mut self, footer: impl Into<String>) -> Self {
        self.footer = Some(footer.into());
        self
    }

    /// 是否需要渲染为附件（字段、页脚或指定颜色只能通过附件表达）
    pub fn is_structured(&self) -> bool {
        !self.fields.is_empty() || self.footer.is_some() || self.explicit_color
    }
}

/// 事件类型对应的默认颜色
pub fn default_color(kind: EventKind) -> &'static str {
    match kind {
        EventKind::Started | EventKind::Custom => color::INFO,
        EventKind::Completed => color::SUCCESS,
        EventKind::Failed => color::FAILURE,
    }
}

/// 校验 `#RRGGBB` 颜色格式
pub fn is_hex_color(value: &str) -> bool {
    value.len() == 7
        && value.starts_with('#')
        && value[1..].chars().all(|c| c.is_ascii_hexdigit())
}
