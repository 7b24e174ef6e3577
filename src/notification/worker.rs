//! 发送队列 - 单个后台任务串行发送
//!
//! 生命周期回调和 ad-hoc 调用只入队，不在调用方上下文做网络 I/O。

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::channel::Message;
use super::delivery::DeliveryClient;

/// 队列容量
pub const DEFAULT_QUEUE_CAPACITY: usize = 64;
/// 关闭时等待未发送消息的时长
pub const DEFAULT_SHUTDOWN_GRACE: Duration = Duration::from_secs(30);

/// 发送队列句柄，可克隆后分发给多个调用方
#[derive(Debug, Clone)]
pub struct DeliveryQueue {
    tx: mpsc::Sender<Message>,
}

impl DeliveryQueue {
    pub(crate) fn channel(capacity: usize) -> (Self, mpsc::Receiver<Message>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }

    /// 非阻塞入队；队列满或已关闭时丢弃并返回 false
    pub fn enqueue(&self, message: Message) -> bool {
        match self.tx.try_send(message) {
            Ok(()) => true,
            Err(TrySendError::Full(message)) => {
                warn!(kind = %message.kind, "Notification queue full, dropping message");
                false
            }
            Err(TrySendError::Closed(message)) => {
                debug!(kind = %message.kind, "Notification queue closed, dropping message");
                false
            }
        }
    }
}

/// 后台任务的关闭句柄
#[derive(Debug)]
pub struct WorkerGuard {
    shutdown: Option<oneshot::Sender<()>>,
    handle: JoinHandle<()>,
}

impl WorkerGuard {
    /// 停止接收新消息，在 `grace` 内发送完已入队的消息
    ///
    /// 返回是否在宽限期内全部完成。
    pub async fn shutdown(mut self, grace: Duration) -> bool {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }

        match tokio::time::timeout(grace, &mut self.handle).await {
            Ok(_) => {
                debug!("Notification worker flushed");
                true
            }
            Err(_) => {
                warn!(
                    grace_secs = grace.as_secs(),
                    "Pending notifications abandoned after shutdown grace period"
                );
                self.handle.abort();
                false
            }
        }
    }
}

/// 启动发送任务（必须在 tokio runtime 内调用）
pub fn spawn_worker(client: Arc<DeliveryClient>, capacity: usize) -> (DeliveryQueue, WorkerGuard) {
    let (queue, rx) = DeliveryQueue::channel(capacity);
    let (shutdown_tx, shutdown_rx) = oneshot::channel();

    info!(target_kind = client.target().name(), capacity, "Starting notification worker");
    let handle = tokio::spawn(run(client, rx, shutdown_rx));

    (
        queue,
        WorkerGuard {
            shutdown: Some(shutdown_tx),
            handle,
        },
    )
}

async fn run(
    client: Arc<DeliveryClient>,
    mut rx: mpsc::Receiver<Message>,
    mut shutdown: oneshot::Receiver<()>,
) {
    loop {
        tokio::select! {
            biased;
            message = rx.recv() => match message {
                Some(message) => {
                    client.deliver(&message).await;
                }
                None => break,
            },
            _ = &mut shutdown => {
                rx.close();
                while let Some(message) = rx.recv().await {
                    client.deliver(&message).await;
                }
                break;
            }
        }
    }
}
