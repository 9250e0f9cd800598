//! 故障转移协调
//!
//! 记录连接结果、通知通道管理器服务器不可用，并在通道恢复时
//! （resume / 重新绑定服务器）消费失败标记以触发一次全量同步。
//!
//! 执行单元拿到的是一个 [`ChannelLink`]：开始执行时才在锁内读取
//! 当前的传输客户端与服务器绑定代数（epoch），排队期间换过服务器的任务
//! 因此会发往新服务器。回报句柄 [`ConnectionReporter`] 绑定的是开始执行
//! 时的 epoch；执行期间通道被重新绑定的话，结果已经过期：成功只记日志，
//! 失败则把同一组类型重新提交给当前服务器。

use std::sync::{Arc, Weak};
use tracing::{debug, info, warn};

use crate::channel::{ChannelCore, ChannelInner, SyncScope};
use crate::collaborators::TransportClient;
use crate::events::{now_millis, ChannelEvent};
use crate::registry::SyncTypes;
use crate::server::ServerInfo;
use crate::state::ChannelState;

/// 置位失败标记，返回需要通知管理器的服务器（未绑定服务器时为 None）
pub(crate) fn mark_connection_failed(core: &mut ChannelCore) -> Option<ServerInfo> {
    core.last_connection_failed = true;
    core.server.clone()
}

/// 消费失败标记：标记为真时清除并返回 true
pub(crate) fn take_pending_recovery(core: &mut ChannelCore) -> bool {
    std::mem::take(&mut core.last_connection_failed)
}

/// 执行单元开始时取到的绑定
pub enum TaskBinding {
    /// 通道已释放、已关闭或已暂停，放弃执行
    Detached,
    /// 当前服务器没有可用的传输客户端
    Unavailable(ConnectionReporter),
    Bound {
        transport: Arc<dyn TransportClient>,
        reporter: ConnectionReporter,
    },
}

/// 执行单元到通道的弱连接
#[derive(Clone)]
pub struct ChannelLink {
    channel: Weak<ChannelInner>,
    task_id: u64,
    types: SyncTypes,
}

impl ChannelLink {
    pub(crate) fn new(channel: Weak<ChannelInner>, task_id: u64, types: SyncTypes) -> Self {
        Self {
            channel,
            task_id,
            types,
        }
    }

    /// 读取当前绑定（执行开始时调用一次）
    pub fn bind_current(&self) -> TaskBinding {
        let Some(channel) = self.channel.upgrade() else {
            return TaskBinding::Detached;
        };
        let core = channel.core.lock();
        if !core.state.is_active() {
            debug!(
                "Channel {} task #{} not started: channel is {}",
                channel.id, self.task_id, core.state
            );
            return TaskBinding::Detached;
        }

        let reporter = ConnectionReporter {
            channel: self.channel.clone(),
            epoch: core.binding_epoch,
            task: Some((self.task_id, self.types.clone())),
        };
        match core.transport.clone() {
            Some(transport) => TaskBinding::Bound {
                transport,
                reporter,
            },
            None => TaskBinding::Unavailable(reporter),
        }
    }
}

/// 连接结果回报句柄
#[derive(Clone)]
pub struct ConnectionReporter {
    channel: Weak<ChannelInner>,
    epoch: u64,
    /// 由任务发起时带上任务编号与类型，过期失败时据此重新提交
    task: Option<(u64, SyncTypes)>,
}

impl ConnectionReporter {
    pub(crate) fn new(channel: Weak<ChannelInner>, epoch: u64) -> Self {
        Self {
            channel,
            epoch,
            task: None,
        }
    }

    fn count_outcome(&self, channel: &ChannelInner, core: &mut ChannelCore, failed: bool) {
        if let Some((task_id, _)) = &self.task {
            if failed {
                core.stats.failed_tasks += 1;
            } else {
                core.stats.completed_tasks += 1;
            }
            debug!(
                "Channel {} task #{} finished, failed={}",
                channel.id, task_id, failed
            );
        }
    }

    /// 回报一次连接结果
    ///
    /// - `failed = true`：置位失败标记，并通知管理器当前服务器不可用
    /// - `failed = false`：清除失败标记
    pub fn report_connection_outcome(&self, failed: bool) {
        let Some(channel) = self.channel.upgrade() else {
            debug!("Connection outcome dropped: channel already released");
            return;
        };

        let failure = {
            let mut core = channel.core.lock();
            self.count_outcome(&channel, &mut core, failed);

            if core.state.is_terminal() {
                debug!("Channel {} is down, ignoring connection outcome", channel.id);
                return;
            }

            if core.binding_epoch != self.epoch {
                info!(
                    "Channel {} got stale connection outcome (epoch {} != {})",
                    channel.id, self.epoch, core.binding_epoch
                );
                self.retry_on_current_binding(&channel, &mut core, failed)
            } else if failed {
                let server = mark_connection_failed(&mut core);
                warn!(
                    "⚠️ Channel {} connection failed (server: {})",
                    channel.id,
                    server
                        .as_ref()
                        .map(|s| s.to_string())
                        .unwrap_or_else(|| "none".to_string())
                );
                Some(server)
            } else {
                if core.last_connection_failed {
                    info!("✅ Channel {} connection restored", channel.id);
                }
                core.last_connection_failed = false;
                channel.events.emit(ChannelEvent::ConnectionRestored {
                    channel_id: channel.id.clone(),
                    timestamp: now_millis(),
                });
                None
            }
        };

        if let Some(server) = failure {
            channel.notify_server_failed(server);
        }
    }

    /// 旧服务器上失败的任务不通知管理器，改投当前服务器
    fn retry_on_current_binding(
        &self,
        channel: &Arc<ChannelInner>,
        core: &mut ChannelCore,
        failed: bool,
    ) -> Option<Option<ServerInfo>> {
        if !failed {
            return None;
        }
        let Some((task_id, types)) = &self.task else {
            return None;
        };
        if core.state == ChannelState::Paused {
            // 留给 resume 重放
            core.last_connection_failed = true;
            return None;
        }
        info!(
            "Channel {} resubmitting task #{} to the current server",
            channel.id, task_id
        );
        channel.dispatch(core, SyncScope::Types(types.clone()))
    }

    /// 执行时没有传输客户端：置位失败标记留待恢复时重放
    ///
    /// 不通知管理器，绑定失败时已经通知过。
    pub fn report_transport_unavailable(&self) {
        let Some(channel) = self.channel.upgrade() else {
            return;
        };
        let mut core = channel.core.lock();
        self.count_outcome(&channel, &mut core, true);
        if core.state.is_terminal() || core.binding_epoch != self.epoch {
            return;
        }
        warn!(
            "⚠️ Channel {} has no transport client, deferring sync until recovery",
            channel.id
        );
        core.last_connection_failed = true;
    }
}
