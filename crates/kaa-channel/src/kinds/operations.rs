use crate::registry::TypeDirectionRegistry;
use crate::server::ServerType;
use crate::task::{ChannelKind, ChannelTaskContext};
use crate::transport::{ChannelDirection, TransportProtocolId, TransportType, HTTP_TRANSPORT_ID};
use crate::worker::ChannelJob;

/// 业务服务器 HTTP 通道：只负责上行的事件与日志
#[derive(Debug, Clone, Default)]
pub struct OperationsHttpKind;

impl OperationsHttpKind {
    pub const CHANNEL_ID: &'static str = "default_operations_http_channel";
}

impl ChannelKind for OperationsHttpKind {
    fn id(&self) -> &str {
        Self::CHANNEL_ID
    }

    fn server_type(&self) -> ServerType {
        ServerType::Operations
    }

    fn transport_protocol_id(&self) -> TransportProtocolId {
        HTTP_TRANSPORT_ID
    }

    fn supported_types(&self) -> TypeDirectionRegistry {
        TypeDirectionRegistry::new()
            .with(TransportType::Event, ChannelDirection::Up)
            .with(TransportType::Logging, ChannelDirection::Up)
    }

    fn create_channel_task(&self, ctx: ChannelTaskContext) -> ChannelJob {
        super::http_exchange_job(ctx)
    }
}
