//! 外部协作方接口
//!
//! 通道只调用这些能力，不实现它们：
//! - 复用器 / 解复用器：负责请求的序列化与响应的应用
//! - 传输客户端工厂：每次绑定服务器时重建客户端
//! - 服务器失败监听者：由通道管理器实现，决定下一台服务器
//! - 连通性检查器：目前只接收不使用

use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Arc;

use crate::error::Result;
use crate::registry::SyncTypes;
use crate::server::ServerInfo;

/// 复用器：按 {类型: 方向} 生成待发送的请求字节
#[async_trait]
pub trait DataMultiplexer: Send + Sync {
    async fn compile_request(&self, types: &SyncTypes) -> Result<Bytes>;
}

/// 解复用器：处理服务器返回的响应字节
#[async_trait]
pub trait DataDemultiplexer: Send + Sync {
    async fn process_response(&self, response: Bytes) -> Result<()>;
}

/// 传输客户端：一次请求/响应交换
#[async_trait]
pub trait TransportClient: Send + Sync {
    async fn execute(&self, request: Bytes) -> Result<Bytes>;
}

/// 传输客户端工厂（在通道锁外调用）
pub trait TransportClientFactory: Send + Sync {
    fn create_client(
        &self,
        url: &str,
        private_key: &Bytes,
        public_key: &Bytes,
        remote_public_key: &Bytes,
    ) -> Result<Arc<dyn TransportClient>>;
}

/// 服务器失败通知（单向）
pub trait ServerFailureListener: Send + Sync {
    fn on_server_failed(&self, server: &ServerInfo);
}

/// 连通性检查器（预留挂载点）
pub trait ConnectivityChecker: Send + Sync {
    fn check_connectivity(&self) -> bool;
}

#[cfg(test)]
pub mod test_helpers {
    //! 测试用协作方

    use super::*;
    use crate::error::ChannelError;
    use parking_lot::Mutex;
    use std::collections::{HashMap, VecDeque};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::{oneshot, Notify};

    /// 把类型列表编码成 "EVENT,LOGGING" 形式的请求
    #[derive(Default)]
    pub struct EchoMultiplexer {
        pub fail: bool,
        pub empty: bool,
    }

    #[async_trait]
    impl DataMultiplexer for EchoMultiplexer {
        async fn compile_request(&self, types: &SyncTypes) -> Result<Bytes> {
            if self.fail {
                return Err(ChannelError::Multiplexer("compile failed".to_string()));
            }
            if self.empty {
                return Ok(Bytes::new());
            }
            let names: Vec<String> = types.keys().map(|t| t.to_string()).collect();
            Ok(Bytes::from(names.join(",")))
        }
    }

    /// 记录收到的所有响应
    #[derive(Default)]
    pub struct RecordingDemultiplexer {
        pub responses: Mutex<Vec<Bytes>>,
    }

    #[async_trait]
    impl DataDemultiplexer for RecordingDemultiplexer {
        async fn process_response(&self, response: Bytes) -> Result<()> {
            self.responses.lock().push(response);
            Ok(())
        }
    }

    /// 按预设结果依次返回的传输客户端；结果用完后回显请求
    #[derive(Default)]
    pub struct ScriptedTransport {
        pub script: Mutex<VecDeque<Result<Bytes>>>,
        pub requests: Mutex<Vec<Bytes>>,
        gate: Mutex<Option<(oneshot::Sender<()>, Arc<Notify>)>>,
    }

    impl ScriptedTransport {
        /// 让下一次调用收到请求后停住，返回"已开始"信号与放行开关
        pub fn hold_next(&self) -> (oneshot::Receiver<()>, Arc<Notify>) {
            let (started_tx, started_rx) = oneshot::channel();
            let release = Arc::new(Notify::new());
            *self.gate.lock() = Some((started_tx, release.clone()));
            (started_rx, release)
        }

        pub fn push_failure(&self, message: &str) {
            self.script
                .lock()
                .push_back(Err(ChannelError::Transport(message.to_string())));
        }
    }

    #[async_trait]
    impl TransportClient for ScriptedTransport {
        async fn execute(&self, request: Bytes) -> Result<Bytes> {
            self.requests.lock().push(request.clone());
            let gate = self.gate.lock().take();
            if let Some((started, release)) = gate {
                let _ = started.send(());
                release.notified().await;
            }
            let next = self.script.lock().pop_front();
            match next {
                Some(result) => result,
                None => Ok(request),
            }
        }
    }

    /// 记录每次创建参数的传输工厂
    ///
    /// 未单独指定的地址共用默认的 `transport`。
    #[derive(Default)]
    pub struct RecordingFactory {
        pub transport: Arc<ScriptedTransport>,
        pub created_for: Mutex<Vec<(String, Bytes)>>,
        pub fail: std::sync::atomic::AtomicBool,
        routes: Mutex<HashMap<String, Arc<ScriptedTransport>>>,
    }

    impl RecordingFactory {
        /// 为某个地址指定独立的传输客户端
        pub fn route(&self, url: &str, transport: Arc<ScriptedTransport>) {
            self.routes.lock().insert(url.to_string(), transport);
        }
    }

    impl TransportClientFactory for RecordingFactory {
        fn create_client(
            &self,
            url: &str,
            _private_key: &Bytes,
            _public_key: &Bytes,
            remote_public_key: &Bytes,
        ) -> Result<Arc<dyn TransportClient>> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(ChannelError::TransportInit(format!("cannot reach {}", url)));
            }
            self.created_for
                .lock()
                .push((url.to_string(), remote_public_key.clone()));
            let routed = self.routes.lock().get(url).cloned();
            Ok(routed.unwrap_or_else(|| self.transport.clone()))
        }
    }

    /// 记录失败通知的通道管理器替身
    #[derive(Default)]
    pub struct RecordingFailureListener {
        pub failed: Mutex<Vec<ServerInfo>>,
        pub calls: AtomicUsize,
    }

    impl ServerFailureListener for RecordingFailureListener {
        fn on_server_failed(&self, server: &ServerInfo) {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.failed.lock().push(server.clone());
        }
    }

    pub struct AlwaysOnline;

    impl ConnectivityChecker for AlwaysOnline {
        fn check_connectivity(&self) -> bool {
            true
        }
    }
}
