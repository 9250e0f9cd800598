//! 同步任务与通道类型
//!
//! 通道本身不知道怎么发请求：每种具体的通道类型（[`ChannelKind`]）
//! 提供自己的类型注册表，并负责把一个 [`SyncTask`] 变成可执行的单元。

use std::sync::Arc;

use crate::collaborators::{DataDemultiplexer, DataMultiplexer};
use crate::failover::ChannelLink;
use crate::registry::{SyncTypes, TypeDirectionRegistry};
use crate::server::ServerType;
use crate::transport::{TransportProtocolId, TransportType};
use crate::worker::ChannelJob;

/// 一次同步任务：提交后不可变，由 worker 消费一次
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncTask {
    id: u64,
    types: SyncTypes,
}

impl SyncTask {
    pub(crate) fn new(id: u64, types: SyncTypes) -> Self {
        Self { id, types }
    }

    /// 通道内单调递增的任务编号
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn types(&self) -> &SyncTypes {
        &self.types
    }

    pub fn transport_types(&self) -> Vec<TransportType> {
        self.types.keys().copied().collect()
    }
}

/// 构造执行单元所需的上下文（编解码器为提交时的快照，传输客户端执行时再取）
pub struct ChannelTaskContext {
    pub channel_id: String,
    pub task: SyncTask,
    pub multiplexer: Arc<dyn DataMultiplexer>,
    pub demultiplexer: Arc<dyn DataDemultiplexer>,
    /// 执行开始时通过它取当前传输客户端，并拿到回报句柄
    pub link: ChannelLink,
}

/// 具体通道类型
pub trait ChannelKind: Send + Sync + 'static {
    /// 稳定的通道 ID
    fn id(&self) -> &str;

    fn server_type(&self) -> ServerType;

    fn transport_protocol_id(&self) -> TransportProtocolId;

    /// 固定的 {类型: 方向} 注册表
    fn supported_types(&self) -> TypeDirectionRegistry;

    /// 把一次同步任务变成可执行单元
    ///
    /// 单元开始时调用 `ctx.link.bind_current()`，结束时通过取到的
    /// [`ConnectionReporter`](crate::failover::ConnectionReporter) 回报结果。
    fn create_channel_task(&self, ctx: ChannelTaskContext) -> ChannelJob;
}
