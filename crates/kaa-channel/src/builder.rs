//! 通道构建器

use std::sync::Arc;
use tokio::runtime::Handle;

use crate::channel::DataChannel;
use crate::collaborators::{ServerFailureListener, TransportClientFactory};
use crate::config::ChannelConfig;
use crate::error::{ChannelError, Result};
use crate::server::ClientKeyProvider;
use crate::task::ChannelKind;

/// [`DataChannel`] 构建器
///
/// 密钥、传输工厂与失败监听者是必需的；运行时默认取当前 tokio 上下文。
pub struct DataChannelBuilder {
    kind: Arc<dyn ChannelKind>,
    config: ChannelConfig,
    runtime: Option<Handle>,
    keys: Option<Arc<dyn ClientKeyProvider>>,
    transport_factory: Option<Arc<dyn TransportClientFactory>>,
    failure_listener: Option<Arc<dyn ServerFailureListener>>,
}

impl DataChannelBuilder {
    pub fn new(kind: impl ChannelKind) -> Self {
        Self::with_kind(Arc::new(kind))
    }

    pub fn with_kind(kind: Arc<dyn ChannelKind>) -> Self {
        Self {
            kind,
            config: ChannelConfig::default(),
            runtime: None,
            keys: None,
            transport_factory: None,
            failure_listener: None,
        }
    }

    pub fn config(mut self, config: ChannelConfig) -> Self {
        self.config = config;
        self
    }

    /// 指定 worker 所在的运行时
    pub fn runtime(mut self, runtime: Handle) -> Self {
        self.runtime = Some(runtime);
        self
    }

    pub fn keys(mut self, keys: Arc<dyn ClientKeyProvider>) -> Self {
        self.keys = Some(keys);
        self
    }

    pub fn transport_factory(mut self, factory: Arc<dyn TransportClientFactory>) -> Self {
        self.transport_factory = Some(factory);
        self
    }

    pub fn failure_listener(mut self, listener: Arc<dyn ServerFailureListener>) -> Self {
        self.failure_listener = Some(listener);
        self
    }

    pub fn build(self) -> Result<DataChannel> {
        let keys = self
            .keys
            .ok_or_else(|| ChannelError::InvalidArgument("client keys are required".to_string()))?;
        let transport_factory = self.transport_factory.ok_or_else(|| {
            ChannelError::InvalidArgument("transport client factory is required".to_string())
        })?;
        let failure_listener = self.failure_listener.ok_or_else(|| {
            ChannelError::InvalidArgument("server failure listener is required".to_string())
        })?;
        let runtime = match self.runtime {
            Some(runtime) => runtime,
            None => Handle::try_current().map_err(|e| ChannelError::NoRuntime(e.to_string()))?,
        };

        Ok(DataChannel::from_parts(
            self.kind,
            self.config,
            runtime,
            keys,
            transport_factory,
            failure_listener,
        ))
    }
}

impl DataChannel {
    pub fn builder(kind: impl ChannelKind) -> DataChannelBuilder {
        DataChannelBuilder::new(kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::test_helpers::{RecordingFactory, RecordingFailureListener};
    use crate::kinds::OperationsHttpKind;
    use crate::server::ClientKeyPair;
    use bytes::Bytes;

    fn keys() -> Arc<dyn ClientKeyProvider> {
        Arc::new(ClientKeyPair::new(
            Bytes::from_static(b"private"),
            Bytes::from_static(b"public"),
        ))
    }

    #[test]
    fn test_build_without_runtime_fails() {
        let result = DataChannel::builder(OperationsHttpKind)
            .keys(keys())
            .transport_factory(Arc::new(RecordingFactory::default()))
            .failure_listener(Arc::new(RecordingFailureListener::default()))
            .build();
        assert!(matches!(result, Err(ChannelError::NoRuntime(_))));
    }

    #[test]
    fn test_build_requires_collaborators() {
        let result = DataChannel::builder(OperationsHttpKind).keys(keys()).build();
        assert!(matches!(result, Err(ChannelError::InvalidArgument(_))));
    }

    #[tokio::test]
    async fn test_build_with_current_runtime() {
        let channel = tokio_test::assert_ok!(DataChannel::builder(OperationsHttpKind)
            .keys(keys())
            .transport_factory(Arc::new(RecordingFactory::default()))
            .failure_listener(Arc::new(RecordingFailureListener::default()))
            .config(ChannelConfig {
                event_buffer_size: 4,
                ..Default::default()
            })
            .build());

        assert_eq!(channel.id(), OperationsHttpKind::CHANNEL_ID);
        assert!(channel.server().is_none());
        assert!(!channel.has_worker());
    }
}
