//! Run Notify CLI
//!
//! 运行命令并在开始、完成、失败时发送 Slack 通知

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use run_notify::cli::{
    handle_check, handle_run, handle_send, load_config, CheckArgs, RunArgs, SendArgs,
};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "run-notify")]
#[command(about = "Run Notify - 进程生命周期 Slack 通知")]
#[command(version)]
struct Cli {
    /// 配置文件路径（默认 ~/.config/run-notify/config.json）
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// 只打印不发送
    #[arg(long, global = true)]
    dry_run: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 校验通知配置
    Check(CheckArgs),
    /// 发送 ad-hoc 通知
    Send(SendArgs),
    /// 运行命令并发送生命周期通知
    Run(RunArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    // 通过 RUST_LOG 环境变量控制日志级别，默认为 info
    // 例如: RUST_LOG=debug run-notify run -- make test
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("run_notify=info"));

    fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Check(args) => handle_check(&config, args),
        Commands::Send(args) => handle_send(config, args, cli.dry_run).await,
        Commands::Run(args) => {
            let code = handle_run(config, args, cli.dry_run).await?;
            std::process::exit(code);
        }
    }
}
