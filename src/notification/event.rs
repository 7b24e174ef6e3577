//! 事件上下文
//!
//! 宿主进程在每个生命周期事件提供一个只读快照，通知引擎只读取它。

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 事件类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// 运行开始
    Started,
    /// 运行成功结束
    Completed,
    /// 运行失败
    Failed,
    /// ad-hoc 消息
    Custom,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Started => "started",
            EventKind::Completed => "completed",
            EventKind::Failed => "failed",
            EventKind::Custom => "custom",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 失败步骤信息
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FailureInfo {
    /// 失败的步骤/进程名
    pub step: Option<String>,
    /// 退出码
    pub exit_code: Option<i32>,
}

/// 事件上下文快照
///
/// 所有字段都是可选的；缺失时消息组装使用占位符。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventContext {
    /// 运行标识（如 run name / session id）
    pub run_id: Option<String>,
    /// 脚本/工作流名称
    pub workflow_name: Option<String>,
    /// 完整命令行
    pub command_line: Option<String>,
    /// 工作目录
    pub work_dir: Option<String>,
    pub start_time: Option<DateTime<Utc>>,
    pub complete_time: Option<DateTime<Utc>>,
    pub duration: Option<Duration>,
    /// 聚合计数器，按插入顺序展示（如 succeeded / failed / cached）
    pub counters: Vec<(String, u64)>,
    /// 错误信息文本
    pub error_message: Option<String>,
    pub failure: Option<FailureInfo>,
    /// 整体是否成功
    pub success: Option<bool>,
}

impl EventContext {
    pub fn builder() -> EventContextBuilder {
        EventContextBuilder::default()
    }

    /// ad-hoc 消息使用的最小上下文
    pub fn minimal() -> Self {
        Self::default()
    }
}

/// 上下文构建器
#[derive(Debug, Default)]
pub struct EventContextBuilder {
    ctx: EventContext,
}

impl EventContextBuilder {
    pub fn run_id(mut self, run_id: impl Into<String>) -> Self {
        self.ctx.run_id = Some(run_id.into());
        self
    }

    pub fn workflow_name(mut self, name: impl Into<String>) -> Self {
        self.ctx.workflow_name = Some(name.into());
        self
    }

    pub fn command_line(mut self, command_line: impl Into<String>) -> Self {
        self.ctx.command_line = Some(command_line.into());
        self
    }

    pub fn work_dir(mut self, work_dir: impl Into<String>) -> Self {
        self.ctx.work_dir = Some(work_dir.into());
        self
    }

    pub fn start_time(mut self, time: DateTime<Utc>) -> Self {
        self.ctx.start_time = Some(time);
        self
    }

    pub fn complete_time(mut self, time: DateTime<Utc>) -> Self {
        self.ctx.complete_time = Some(time);
        self
    }

    pub fn duration(mut self, duration: Duration) -> Self {
        self.ctx.duration = Some(duration);
        self
    }

    /// 追加一个计数器
    pub fn counter(mut self, name: impl Into<String>, value: u64) -> Self {
        self.ctx.counters.push((name.into(), value));
        self
    }

    pub fn error_message(mut self, message: impl Into<String>) -> Self {
        self.ctx.error_message = Some(message.into());
        self
    }

    pub fn failure(mut self, failure: FailureInfo) -> Self {
        self.ctx.failure = Some(failure);
        self
    }

    pub fn success(mut self, success: bool) -> Self {
        self.ctx.success = Some(success);
        self
    }

    pub fn build(self) -> EventContext {
        self.ctx
    }
}
