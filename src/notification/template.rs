//! 消息模板
//!
//! 模板有两种形态：纯文本（原样作为消息正文）和结构化对象
//! （正文 + 颜色 + 内置字段选择 + 自定义字段）。

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::channel::Field;
use super::event::EventKind;

/// 消息模板
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageTemplate {
    /// 纯文本模板
    Text(String),
    /// 结构化模板
    Structured(StructuredTemplate),
}

/// 结构化模板
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StructuredTemplate {
    pub text: Option<String>,
    /// `#RRGGBB`
    pub color: Option<String>,
    /// 内置字段键，按给定顺序输出；对当前事件无效或未知的键会被忽略
    #[serde(alias = "include_fields")]
    pub include_fields: Vec<String>,
    #[serde(alias = "custom_fields")]
    pub custom_fields: Vec<Field>,
}

/// 内置字段词表
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKey {
    RunName,
    Status,
    Duration,
    CommandLine,
    WorkDir,
    ErrorMessage,
    FailedProcess,
    Tasks,
    StartTime,
    CompleteTime,
}

impl FieldKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldKey::RunName => "runName",
            FieldKey::Status => "status",
            FieldKey::Duration => "duration",
            FieldKey::CommandLine => "commandLine",
            FieldKey::WorkDir => "workDir",
            FieldKey::ErrorMessage => "errorMessage",
            FieldKey::FailedProcess => "failedProcess",
            FieldKey::Tasks => "tasks",
            FieldKey::StartTime => "startTime",
            FieldKey::CompleteTime => "completeTime",
        }
    }

    /// 字段标题
    pub fn title(&self) -> &'static str {
        match self {
            FieldKey::RunName => "Run Name",
            FieldKey::Status => "Status",
            FieldKey::Duration => "Duration",
            FieldKey::CommandLine => "Command Line",
            FieldKey::WorkDir => "Work Directory",
            FieldKey::ErrorMessage => "Error Message",
            FieldKey::FailedProcess => "Failed Process",
            FieldKey::Tasks => "Tasks",
            FieldKey::StartTime => "Started",
            FieldKey::CompleteTime => "Completed",
        }
    }

    /// 长文本字段不适合并排显示
    pub fn is_compact(&self) -> bool {
        !matches!(
            self,
            FieldKey::CommandLine | FieldKey::WorkDir | FieldKey::ErrorMessage
        )
    }

    /// 该字段对给定事件类型是否合法
    pub fn allowed_for(&self, kind: EventKind) -> bool {
        match kind {
            EventKind::Started => matches!(
                self,
                FieldKey::RunName
                    | FieldKey::Status
                    | FieldKey::CommandLine
                    | FieldKey::WorkDir
                    | FieldKey::StartTime
            ),
            EventKind::Completed => !matches!(self, FieldKey::ErrorMessage | FieldKey::FailedProcess),
            EventKind::Failed => true,
            EventKind::Custom => false,
        }
    }
}

impl FromStr for FieldKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "runName" | "run_name" => Ok(FieldKey::RunName),
            "status" => Ok(FieldKey::Status),
            "duration" => Ok(FieldKey::Duration),
            "commandLine" | "command_line" => Ok(FieldKey::CommandLine),
            "workDir" | "work_dir" => Ok(FieldKey::WorkDir),
            "errorMessage" | "error_message" => Ok(FieldKey::ErrorMessage),
            "failedProcess" | "failed_process" => Ok(FieldKey::FailedProcess),
            "tasks" => Ok(FieldKey::Tasks),
            "startTime" | "start_time" => Ok(FieldKey::StartTime),
            "completeTime" | "complete_time" => Ok(FieldKey::CompleteTime),
            other => Err(format!("unknown field key: {}", other)),
        }
    }
}
