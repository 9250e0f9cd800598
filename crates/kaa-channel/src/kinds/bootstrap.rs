use crate::registry::TypeDirectionRegistry;
use crate::server::ServerType;
use crate::task::{ChannelKind, ChannelTaskContext};
use crate::transport::{ChannelDirection, TransportProtocolId, TransportType, HTTP_TRANSPORT_ID};
use crate::worker::ChannelJob;

/// 引导服务器 HTTP 通道：双向同步引导数据
#[derive(Debug, Clone, Default)]
pub struct BootstrapHttpKind;

impl BootstrapHttpKind {
    pub const CHANNEL_ID: &'static str = "default_bootstrap_channel";
}

impl ChannelKind for BootstrapHttpKind {
    fn id(&self) -> &str {
        Self::CHANNEL_ID
    }

    fn server_type(&self) -> ServerType {
        ServerType::Bootstrap
    }

    fn transport_protocol_id(&self) -> TransportProtocolId {
        HTTP_TRANSPORT_ID
    }

    fn supported_types(&self) -> TypeDirectionRegistry {
        TypeDirectionRegistry::new().with(TransportType::Bootstrap, ChannelDirection::Bidirectional)
    }

    fn create_channel_task(&self, ctx: ChannelTaskContext) -> ChannelJob {
        super::http_exchange_job(ctx)
    }
}
