//! Run 命令 - 运行子进程并在开始/结束/失败时发送通知
//!
//! 通知失败不会影响子进程的退出码。

use std::collections::VecDeque;
use std::process::Stdio;
use std::time::Instant;

use anyhow::{anyhow, Result};
use chrono::Utc;
use clap::Args;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, info};

use crate::config::NotifyConfig;
use crate::notification::worker::DEFAULT_SHUTDOWN_GRACE;
use crate::notification::{EventContext, FailureInfo, NotificationBuilder};

/// 失败时保留的 stderr 行数
const STDERR_TAIL_LINES: usize = 20;

/// Run 命令参数
#[derive(Args)]
pub struct RunArgs {
    /// 运行名称（默认按时间生成）
    #[arg(long, short)]
    pub name: Option<String>,

    /// 要执行的命令及参数
    #[arg(trailing_var_arg = true, required = true, allow_hyphen_values = true)]
    pub command: Vec<String>,
}

impl RunArgs {
    fn base_context(&self) -> EventContext {
        let program = self.command.first().map(String::as_str).unwrap_or_default();
        let workflow = std::path::Path::new(program)
            .file_name()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| program.to_string());
        let run_id = self
            .name
            .clone()
            .unwrap_or_else(|| format!("run-{}", Utc::now().format("%Y%m%d-%H%M%S")));

        let mut builder = EventContext::builder()
            .run_id(run_id)
            .workflow_name(workflow)
            .command_line(self.command.join(" "))
            .start_time(Utc::now());
        if let Ok(cwd) = std::env::current_dir() {
            builder = builder.work_dir(cwd.display().to_string());
        }
        builder.build()
    }
}

/// 处理 run 命令，返回子进程退出码
pub async fn handle_run(config: NotifyConfig, args: RunArgs, dry_run: bool) -> Result<i32> {
    let system = NotificationBuilder::new(config).dry_run(dry_run).build()?;
    let (program, rest) = args
        .command
        .split_first()
        .ok_or_else(|| anyhow!("缺少要执行的命令"))?;

    let mut ctx = args.base_context();
    system.dispatcher.on_start(&ctx);

    let started = Instant::now();
    let spawned = Command::new(program)
        .args(rest)
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::piped())
        .spawn();

    let mut child = match spawned {
        Ok(child) => child,
        Err(e) => {
            ctx.duration = Some(started.elapsed());
            ctx.complete_time = Some(Utc::now());
            ctx.error_message = Some(format!("failed to start '{}': {}", program, e));
            system.dispatcher.on_error(
                &ctx,
                FailureInfo {
                    step: Some(program.clone()),
                    exit_code: None,
                },
            );
            system.shutdown(DEFAULT_SHUTDOWN_GRACE).await;
            return Err(anyhow!("无法启动命令 '{}': {}", program, e));
        }
    };

    // 转发 stderr，同时保留末尾若干行作为错误信息
    let mut tail = VecDeque::with_capacity(STDERR_TAIL_LINES);
    if let Some(stderr) = child.stderr.take() {
        let mut lines = BufReader::new(stderr).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            eprintln!("{}", line);
            if tail.len() == STDERR_TAIL_LINES {
                tail.pop_front();
            }
            tail.push_back(line);
        }
    }

    let status = child.wait().await?;
    ctx.duration = Some(started.elapsed());
    ctx.complete_time = Some(Utc::now());
    let code = status.code().unwrap_or(1);
    debug!(code, "Child process exited");

    if status.success() {
        ctx.success = Some(true);
        system.dispatcher.on_complete(&ctx);
    } else {
        let stderr_tail = tail.into_iter().collect::<Vec<_>>().join("\n");
        ctx.error_message = Some(if stderr_tail.trim().is_empty() {
            format!("command exited with status {}", code)
        } else {
            stderr_tail
        });
        system.dispatcher.on_error(
            &ctx,
            FailureInfo {
                step: Some(program.clone()),
                exit_code: Some(code),
            },
        );
    }

    if !system.shutdown(DEFAULT_SHUTDOWN_GRACE).await {
        info!("Some notifications were not delivered before exit");
    }
    Ok(code)
}
