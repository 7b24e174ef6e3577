//! Send 命令 - 发送 ad-hoc 通知

use anyhow::{anyhow, Result};
use clap::Args;

use crate::config::NotifyConfig;
use crate::notification::formatter::compose_custom;
use crate::notification::worker::DEFAULT_SHUTDOWN_GRACE;
use crate::notification::{NotificationBuilder, NotifyOptions};

/// Send 命令参数
#[derive(Args)]
pub struct SendArgs {
    /// 消息正文（支持 Slack mrkdwn）
    pub text: String,

    /// 颜色 #RRGGBB
    #[arg(long)]
    pub color: Option<String>,

    /// 字段 TITLE=VALUE，可重复
    #[arg(long = "field", short = 'f')]
    pub fields: Vec<String>,

    /// 字段并排显示
    #[arg(long)]
    pub compact: bool,
}

impl SendArgs {
    fn to_options(&self) -> Result<NotifyOptions> {
        let mut options = NotifyOptions::new(self.text.clone());
        if let Some(color) = &self.color {
            options = options.with_color(color.clone());
        }
        for raw in &self.fields {
            let (title, value) = raw
                .split_once('=')
                .ok_or_else(|| anyhow!("无效的字段 '{}'，格式应为 TITLE=VALUE", raw))?;
            options = options.with_field(title.trim(), value.trim(), self.compact);
        }
        Ok(options)
    }
}

/// 处理 send 命令
pub async fn handle_send(config: NotifyConfig, args: SendArgs, dry_run: bool) -> Result<()> {
    let options = args.to_options()?;
    // CLI 下直接报告非法输入
    compose_custom(&options)?;

    let system = NotificationBuilder::new(config).dry_run(dry_run).build()?;
    if !system.is_active() {
        eprintln!("通知未配置，跳过发送");
        return Ok(());
    }

    system.notifier.notify(options);
    system.shutdown(DEFAULT_SHUTDOWN_GRACE).await;
    Ok(())
}
