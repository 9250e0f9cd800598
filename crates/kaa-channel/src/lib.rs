//! Kaa 客户端数据通道
//!
//! 管理客户端与某一台后端服务器之间一条逻辑通道的生命周期、并发与故障转移：
//! - 🔁 生命周期：活跃 / 暂停 / 关闭（终态）
//! - 🧵 单 worker 派发：同一通道的同步任务 FIFO 串行执行，调用方不阻塞
//! - 🛟 故障转移：记录连接失败、通知通道管理器，恢复或换服务器时重放全量同步
//!
//! 网络 I/O、载荷编解码、密钥管理与服务器选择都由外部协作方提供。
//!
//! # 快速开始
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use kaa_channel::{DataChannel, OperationsHttpKind, ServerInfo, ServerType, TransportType};
//! # use kaa_channel::{ClientKeyPair, TransportClientFactory, ServerFailureListener,
//! #     DataMultiplexer, DataDemultiplexer};
//! # fn collaborators() -> (Arc<dyn TransportClientFactory>, Arc<dyn ServerFailureListener>,
//! #     Arc<dyn DataMultiplexer>, Arc<dyn DataDemultiplexer>) { unimplemented!() }
//!
//! # #[tokio::main]
//! # async fn main() -> kaa_channel::Result<()> {
//! let (factory, manager, multiplexer, demultiplexer) = collaborators();
//! let channel = DataChannel::builder(OperationsHttpKind)
//!     .keys(Arc::new(ClientKeyPair::new(vec![1u8; 32], vec![2u8; 32])))
//!     .transport_factory(factory)
//!     .failure_listener(manager)
//!     .build()?;
//!
//! channel.set_multiplexer(multiplexer);
//! channel.set_demultiplexer(demultiplexer);
//! channel.set_server(ServerInfo::new(
//!     ServerType::Operations,
//!     1,
//!     "http://ops.example.com:9999/EP",
//!     vec![3u8; 32],
//! )?)?;
//!
//! channel.sync(TransportType::Event);
//! # Ok(())
//! # }
//! ```

pub mod builder;
pub mod channel;
pub mod collaborators;
pub mod config;
pub mod error;
pub mod events;
pub mod failover;
pub mod kinds;
pub mod registry;
pub mod server;
pub mod state;
pub mod task;
pub mod transport;
pub mod version;
pub mod worker;

pub use builder::DataChannelBuilder;
pub use channel::DataChannel;
pub use collaborators::{
    ConnectivityChecker, DataDemultiplexer, DataMultiplexer, ServerFailureListener,
    TransportClient, TransportClientFactory,
};
pub use config::ChannelConfig;
pub use error::{ChannelError, Result};
pub use events::{ChannelEvent, ChannelStats, SkipReason};
pub use failover::{ChannelLink, ConnectionReporter, TaskBinding};
pub use kinds::{BootstrapHttpKind, OperationsHttpKind};
pub use registry::{SyncTypes, TypeDirectionRegistry};
pub use server::{ClientKeyPair, ClientKeyProvider, ServerInfo, ServerType};
pub use state::ChannelState;
pub use task::{ChannelKind, ChannelTaskContext, SyncTask};
pub use transport::{ChannelDirection, TransportProtocolId, TransportType, HTTP_TRANSPORT_ID};
pub use worker::{ChannelJob, DispatchWorker};
