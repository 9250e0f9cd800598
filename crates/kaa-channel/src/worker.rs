//! 单并发派发 worker
//!
//! 每个通道独占一个 worker：任务按提交顺序（FIFO）逐个执行，绝不并行。
//! 暂停 / 关闭时强制取消：排队中的任务被丢弃，正在执行的任务在下一个
//! await 点被打断。部分完成是允许的，下一次成功的全量同步会覆盖它。

use futures::future::BoxFuture;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::error::{ChannelError, Result};

/// 通道类型构造出的一个执行单元
pub type ChannelJob = BoxFuture<'static, ()>;

struct WorkItem {
    task_id: u64,
    job: ChannelJob,
}

/// 派发 worker
pub struct DispatchWorker {
    channel_id: String,
    sender: mpsc::UnboundedSender<WorkItem>,
    cancel_token: CancellationToken,
    handle: JoinHandle<()>,
}

impl DispatchWorker {
    /// 在给定运行时上启动 worker
    pub fn spawn(channel_id: &str, runtime: &Handle) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        let cancel_token = CancellationToken::new();

        info!("Creating a new dispatch worker for channel {}", channel_id);
        let handle = runtime.spawn(run_worker(
            channel_id.to_string(),
            receiver,
            cancel_token.clone(),
        ));

        Self {
            channel_id: channel_id.to_string(),
            sender,
            cancel_token,
            handle,
        }
    }

    /// 提交任务（不等待执行）
    pub fn submit(&self, task_id: u64, job: ChannelJob) -> Result<()> {
        if self.cancel_token.is_cancelled() {
            return Err(ChannelError::WorkerStopped(format!(
                "worker of channel {} is cancelled",
                self.channel_id
            )));
        }
        self.sender
            .send(WorkItem { task_id, job })
            .map_err(|_| {
                ChannelError::WorkerStopped(format!(
                    "worker of channel {} is gone",
                    self.channel_id
                ))
            })
    }

    /// 强制取消：丢弃排队任务并打断正在执行的任务
    pub fn cancel(&self) {
        if !self.cancel_token.is_cancelled() {
            info!("Cancelling dispatch worker of channel {}", self.channel_id);
        }
        self.cancel_token.cancel();
        self.handle.abort();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel_token.is_cancelled()
    }
}

impl Drop for DispatchWorker {
    fn drop(&mut self) {
        self.cancel();
    }
}

async fn run_worker(
    channel_id: String,
    mut receiver: mpsc::UnboundedReceiver<WorkItem>,
    cancel_token: CancellationToken,
) {
    debug!("Dispatch worker of channel {} started", channel_id);

    loop {
        let item = tokio::select! {
            biased;
            _ = cancel_token.cancelled() => break,
            item = receiver.recv() => match item {
                Some(item) => item,
                None => break,
            },
        };

        let task_id = item.task_id;
        debug!("Channel {} executing task #{}", channel_id, task_id);

        tokio::select! {
            biased;
            _ = cancel_token.cancelled() => {
                warn!("Channel {} task #{} interrupted by cancellation", channel_id, task_id);
                break;
            }
            outcome = AssertUnwindSafe(item.job).catch_unwind() => {
                if outcome.is_err() {
                    // 任务 panic 不影响 worker 继续处理后续任务
                    error!("❌ Channel {} task #{} panicked", channel_id, task_id);
                }
            }
        }
    }

    debug!("Dispatch worker of channel {} stopped", channel_id);
}
