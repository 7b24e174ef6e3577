//! Check 命令 - 校验凭据配置

use anyhow::Result;
use clap::Args;
use serde::Serialize;

use super::output::format_output;
use crate::config::NotifyConfig;
use crate::notification::target::{resolve, DeliveryTarget};

/// Check 命令参数
#[derive(Args)]
pub struct CheckArgs {
    /// 输出 JSON 格式
    #[arg(long)]
    pub json: bool,
}

/// Check 命令输出
#[derive(Debug, Serialize)]
pub struct CheckOutput {
    pub enabled: bool,
    pub target: Option<String>,
    pub destination: Option<String>,
}

impl CheckOutput {
    fn from_target(target: Option<&DeliveryTarget>) -> Self {
        Self {
            enabled: target.is_some(),
            target: target.map(|t| t.name().to_string()),
            destination: target.map(DeliveryTarget::describe),
        }
    }
}

/// 处理 check 命令；凭据格式错误时返回错误
pub fn handle_check(config: &NotifyConfig, args: CheckArgs) -> Result<()> {
    let target = resolve(config)?;
    println!("{}", format_output(&CheckOutput::from_target(target.as_ref()), args.json));
    Ok(())
}
