//! 通道事件与统计
//!
//! 所有"不报错但需要被观察到"的情况（跳过同步、连接失败等）
//! 都会以 [`ChannelEvent`] 的形式广播出去，供上层或测试订阅。

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::debug;

use crate::server::ServerInfo;
use crate::state::ChannelState;
use crate::transport::TransportType;

/// 同步被跳过的原因
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SkipReason {
    /// 通道已关闭
    ShutDown,
    /// 通道已暂停
    Paused,
    /// 复用器或解复用器未设置
    CodecsMissing,
    /// 未绑定服务器（会置位连接失败标记）
    NoServer,
    /// 类型不在注册表中
    UnsupportedType(TransportType),
}

/// 通道事件
#[derive(Debug, Clone)]
pub enum ChannelEvent {
    /// 同步任务已提交到 worker
    TaskSubmitted {
        channel_id: String,
        task_id: u64,
        types: Vec<TransportType>,
        timestamp: i64,
    },
    /// 同步请求被跳过
    SyncSkipped {
        channel_id: String,
        reason: SkipReason,
        timestamp: i64,
    },
    /// 绑定了新服务器
    ServerBound {
        channel_id: String,
        server: ServerInfo,
        timestamp: i64,
    },
    /// 连接失败（已通知通道管理器）
    ConnectionFailed {
        channel_id: String,
        server: Option<ServerInfo>,
        timestamp: i64,
    },
    /// 连接恢复（一次成功的交换）
    ConnectionRestored {
        channel_id: String,
        timestamp: i64,
    },
    /// 生命周期状态变化
    StateChanged {
        channel_id: String,
        old_state: ChannelState,
        new_state: ChannelState,
        timestamp: i64,
    },
}

impl ChannelEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            ChannelEvent::TaskSubmitted { .. } => "task_submitted",
            ChannelEvent::SyncSkipped { .. } => "sync_skipped",
            ChannelEvent::ServerBound { .. } => "server_bound",
            ChannelEvent::ConnectionFailed { .. } => "connection_failed",
            ChannelEvent::ConnectionRestored { .. } => "connection_restored",
            ChannelEvent::StateChanged { .. } => "state_changed",
        }
    }

    pub fn channel_id(&self) -> &str {
        match self {
            ChannelEvent::TaskSubmitted { channel_id, .. }
            | ChannelEvent::SyncSkipped { channel_id, .. }
            | ChannelEvent::ServerBound { channel_id, .. }
            | ChannelEvent::ConnectionFailed { channel_id, .. }
            | ChannelEvent::ConnectionRestored { channel_id, .. }
            | ChannelEvent::StateChanged { channel_id, .. } => channel_id,
        }
    }
}

/// 当前 UTC 毫秒时间戳
pub(crate) fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// 通道统计信息
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelStats {
    /// 已提交到 worker 的任务数
    pub submitted_tasks: u64,
    /// 成功完成的任务数
    pub completed_tasks: u64,
    /// 以失败告终的任务数
    pub failed_tasks: u64,
    /// 因未就绪被跳过的同步请求数
    pub skipped_syncs: u64,
    /// 不支持的类型请求数
    pub unsupported_type_requests: u64,
    /// 创建过的 worker 数
    pub workers_created: u64,
}

/// 事件广播器
#[derive(Debug, Clone)]
pub(crate) struct EventBus {
    sender: broadcast::Sender<ChannelEvent>,
}

impl EventBus {
    pub(crate) fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub(crate) fn emit(&self, event: ChannelEvent) {
        // 没有订阅者时 send 失败属正常情况
        if let Err(e) = self.sender.send(event) {
            debug!("Channel event dropped (no active receivers): {}", e.0.event_type());
        }
    }

    pub(crate) fn subscribe(&self) -> broadcast::Receiver<ChannelEvent> {
        self.sender.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_event_bus_broadcast() {
        let bus = EventBus::new(8);
        let mut receiver = bus.subscribe();

        bus.emit(ChannelEvent::SyncSkipped {
            channel_id: "ch".to_string(),
            reason: SkipReason::Paused,
            timestamp: now_millis(),
        });

        let event = receiver.recv().await.unwrap();
        assert_eq!(event.event_type(), "sync_skipped");
        assert_eq!(event.channel_id(), "ch");
    }

    #[test]
    fn test_emit_without_subscribers() {
        let bus = EventBus::new(0);
        bus.emit(ChannelEvent::ConnectionRestored {
            channel_id: "ch".to_string(),
            timestamp: now_millis(),
        });
    }

    #[test]
    fn test_stats_json() {
        let stats = ChannelStats {
            submitted_tasks: 2,
            ..Default::default()
        };
        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["submitted_tasks"], 2);
        assert_eq!(json["failed_tasks"], 0);
    }
}
