//! 内置的通道类型
//!
//! 两种 HTTP 通道共用同一个请求/响应交换流程：
//! 取当前绑定 → 复用器生成请求 → 传输客户端执行 → 解复用器处理响应 → 回报连接结果。

mod bootstrap;
mod operations;

pub use bootstrap::BootstrapHttpKind;
pub use operations::OperationsHttpKind;

use tracing::{debug, info, warn};

use crate::collaborators::TransportClient;
use crate::error::Result;
use crate::failover::TaskBinding;
use crate::task::ChannelTaskContext;
use crate::worker::ChannelJob;

/// 构造一次 HTTP 请求/响应交换
pub(crate) fn http_exchange_job(ctx: ChannelTaskContext) -> ChannelJob {
    Box::pin(async move {
        let task_id = ctx.task.id();
        let (transport, reporter) = match ctx.link.bind_current() {
            TaskBinding::Bound {
                transport,
                reporter,
            } => (transport, reporter),
            TaskBinding::Unavailable(reporter) => {
                reporter.report_transport_unavailable();
                return;
            }
            TaskBinding::Detached => {
                debug!("Channel {} task #{} dropped", ctx.channel_id, task_id);
                return;
            }
        };

        match run_exchange(&ctx, transport.as_ref()).await {
            Ok(()) => reporter.report_connection_outcome(false),
            Err(e) => {
                warn!(
                    "⚠️ Channel {} task #{} failed: {}",
                    ctx.channel_id, task_id, e
                );
                reporter.report_connection_outcome(true);
            }
        }
    })
}

async fn run_exchange(ctx: &ChannelTaskContext, transport: &dyn TransportClient) -> Result<()> {
    let request = ctx.multiplexer.compile_request(ctx.task.types()).await?;
    if request.is_empty() {
        debug!(
            "Channel {} task #{}: nothing to send",
            ctx.channel_id,
            ctx.task.id()
        );
        return Ok(());
    }

    debug!(
        "Channel {} task #{}: sending {} bytes",
        ctx.channel_id,
        ctx.task.id(),
        request.len()
    );
    let response = transport.execute(request).await?;
    info!(
        "Channel {} task #{}: received {} bytes",
        ctx.channel_id,
        ctx.task.id(),
        response.len()
    );

    ctx.demultiplexer.process_response(response).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::test_helpers::{
        EchoMultiplexer, RecordingDemultiplexer, RecordingFactory, RecordingFailureListener,
    };
    use crate::server::{ClientKeyPair, ServerInfo, ServerType};
    use crate::DataChannel;
    use bytes::Bytes;
    use std::sync::Arc;
    use std::time::Duration;

    fn operations_channel(
        factory: Arc<RecordingFactory>,
        multiplexer: EchoMultiplexer,
        demultiplexer: Arc<RecordingDemultiplexer>,
    ) -> DataChannel {
        let channel = DataChannel::builder(OperationsHttpKind)
            .keys(Arc::new(ClientKeyPair::new(Bytes::new(), Bytes::new())))
            .transport_factory(factory)
            .failure_listener(Arc::new(RecordingFailureListener::default()))
            .build()
            .unwrap();
        channel.set_multiplexer(Arc::new(multiplexer));
        channel.set_demultiplexer(demultiplexer);
        channel
            .set_server(
                ServerInfo::new(
                    ServerType::Operations,
                    1,
                    "http://ops.example.com",
                    Bytes::from_static(b"key"),
                )
                .unwrap(),
            )
            .unwrap();
        channel
    }

    async fn wait_finished(channel: &DataChannel) {
        tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                let stats = channel.stats();
                if stats.completed_tasks + stats.failed_tasks > 0 {
                    break;
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("task did not finish");
    }

    #[tokio::test]
    async fn test_empty_request_counts_as_success() {
        let factory = Arc::new(RecordingFactory::default());
        let demultiplexer = Arc::new(RecordingDemultiplexer::default());
        let multiplexer = EchoMultiplexer {
            empty: true,
            ..Default::default()
        };
        let channel = operations_channel(factory.clone(), multiplexer, demultiplexer.clone());

        channel.sync_all();
        wait_finished(&channel).await;

        assert_eq!(channel.stats().completed_tasks, 1);
        assert!(factory.transport.requests.lock().is_empty());
        assert!(demultiplexer.responses.lock().is_empty());
        assert!(!channel.is_connection_failed());
    }

    #[tokio::test]
    async fn test_multiplexer_error_reports_failure() {
        let factory = Arc::new(RecordingFactory::default());
        let multiplexer = EchoMultiplexer {
            fail: true,
            ..Default::default()
        };
        let channel = operations_channel(
            factory.clone(),
            multiplexer,
            Arc::new(RecordingDemultiplexer::default()),
        );

        channel.sync(crate::transport::TransportType::Event);
        wait_finished(&channel).await;

        assert_eq!(channel.stats().failed_tasks, 1);
        assert!(channel.is_connection_failed());
        assert!(factory.transport.requests.lock().is_empty());
    }
}
