//! 数据通道：生命周期状态机 + 派发入口
//!
//! 所有公开操作同步返回、互斥执行（一把锁保护状态与 worker 引用），
//! 但从不等待 worker 执行任务，提交即返回。
//!
//! ```text
//!            pause()             shutdown()
//!   Active ──────────▶ Paused ───────────────▶ ShutDown
//!     ▲                  │                        ▲
//!     └──── resume() ────┘      shutdown() ───────┘ (任意状态)
//! ```

use parking_lot::Mutex;
use std::sync::Arc;
use tokio::runtime::Handle;
use tracing::{debug, error, info, warn};

use crate::collaborators::{
    ConnectivityChecker, DataDemultiplexer, DataMultiplexer, ServerFailureListener,
    TransportClient, TransportClientFactory,
};
use crate::config::ChannelConfig;
use crate::error::{ChannelError, Result};
use crate::events::{now_millis, ChannelEvent, ChannelStats, EventBus, SkipReason};
use crate::failover::{
    mark_connection_failed, take_pending_recovery, ChannelLink, ConnectionReporter,
};
use crate::registry::{SyncTypes, TypeDirectionRegistry};
use crate::server::{ClientKeyProvider, ServerInfo, ServerType};
use crate::state::ChannelState;
use crate::task::{ChannelKind, ChannelTaskContext, SyncTask};
use crate::transport::{TransportProtocolId, TransportType};
use crate::worker::DispatchWorker;

/// 一次派发要同步的类型
pub(crate) enum SyncScope {
    Single(TransportType),
    All,
    /// 重新提交的任务沿用原来的类型
    Types(SyncTypes),
}

/// 锁内的可变状态
pub(crate) struct ChannelCore {
    pub(crate) state: ChannelState,
    pub(crate) last_connection_failed: bool,
    pub(crate) server: Option<ServerInfo>,
    /// 每次绑定服务器加一，用来识别过期的连接结果
    pub(crate) binding_epoch: u64,
    pub(crate) transport: Option<Arc<dyn TransportClient>>,
    pub(crate) multiplexer: Option<Arc<dyn DataMultiplexer>>,
    pub(crate) demultiplexer: Option<Arc<dyn DataDemultiplexer>>,
    pub(crate) worker: Option<DispatchWorker>,
    pub(crate) next_task_id: u64,
    pub(crate) stats: ChannelStats,
}

impl ChannelCore {
    fn new() -> Self {
        Self {
            state: ChannelState::Active,
            last_connection_failed: false,
            server: None,
            binding_epoch: 0,
            transport: None,
            multiplexer: None,
            demultiplexer: None,
            worker: None,
            next_task_id: 1,
            stats: ChannelStats::default(),
        }
    }
}

/// 通道共享部分（执行单元通过 Weak 引用它回报结果）
pub(crate) struct ChannelInner {
    pub(crate) id: String,
    pub(crate) kind: Arc<dyn ChannelKind>,
    pub(crate) registry: TypeDirectionRegistry,
    pub(crate) config: ChannelConfig,
    pub(crate) runtime: Handle,
    pub(crate) keys: Arc<dyn ClientKeyProvider>,
    pub(crate) transport_factory: Arc<dyn TransportClientFactory>,
    pub(crate) failure_listener: Arc<dyn ServerFailureListener>,
    pub(crate) events: EventBus,
    pub(crate) core: Mutex<ChannelCore>,
}

impl ChannelInner {
    /// 广播连接失败并通知管理器；调用方必须已经释放锁
    pub(crate) fn notify_server_failed(&self, server: Option<ServerInfo>) {
        self.events.emit(ChannelEvent::ConnectionFailed {
            channel_id: self.id.clone(),
            server: server.clone(),
            timestamp: now_millis(),
        });
        if let Some(server) = server {
            info!("Channel {} reporting failed server {}", self.id, server);
            self.failure_listener.on_server_failed(&server);
        }
    }

    fn skip(&self, core: &mut ChannelCore, reason: SkipReason) {
        core.stats.skipped_syncs += 1;
        if let SkipReason::UnsupportedType(_) = reason {
            core.stats.unsupported_type_requests += 1;
        }
        self.events.emit(ChannelEvent::SyncSkipped {
            channel_id: self.id.clone(),
            reason,
            timestamp: now_millis(),
        });
    }

    fn set_state(&self, core: &mut ChannelCore, new_state: ChannelState) {
        let old_state = core.state;
        core.state = new_state;
        info!("Channel {} state: {} → {}", self.id, old_state, new_state);
        self.events.emit(ChannelEvent::StateChanged {
            channel_id: self.id.clone(),
            old_state,
            new_state,
            timestamp: now_millis(),
        });
    }

    /// 惰性创建 worker（幂等）
    fn ensure_worker<'a>(&self, core: &'a mut ChannelCore) -> &'a DispatchWorker {
        match core.worker.take() {
            Some(worker) if !worker.is_cancelled() => core.worker.insert(worker),
            _ => {
                core.stats.workers_created += 1;
                core.worker
                    .insert(DispatchWorker::spawn(&self.id, &self.runtime))
            }
        }
    }

    /// 锁内派发
    ///
    /// 返回需要在释放锁后通知管理器的失败（外层 Option 表示是否有失败）。
    pub(crate) fn dispatch(
        self: &Arc<Self>,
        core: &mut ChannelCore,
        scope: SyncScope,
    ) -> Option<Option<ServerInfo>> {
        match core.state {
            ChannelState::ShutDown => {
                info!("Can't sync. Channel {} is down", self.id);
                self.skip(core, SkipReason::ShutDown);
                return None;
            }
            ChannelState::Paused => {
                info!("Can't sync. Channel {} is paused", self.id);
                self.skip(core, SkipReason::Paused);
                return None;
            }
            ChannelState::Active => {}
        }

        let (Some(multiplexer), Some(demultiplexer)) =
            (core.multiplexer.clone(), core.demultiplexer.clone())
        else {
            debug!("Can't sync. Channel {} has no multiplexer/demultiplexer", self.id);
            self.skip(core, SkipReason::CodecsMissing);
            return None;
        };

        let types: SyncTypes = match scope {
            SyncScope::Single(transport_type) => match self.registry.single(transport_type) {
                Some(types) => types,
                None => {
                    error!("Unsupported type {} for channel {}", transport_type, self.id);
                    self.skip(core, SkipReason::UnsupportedType(transport_type));
                    return None;
                }
            },
            SyncScope::All => self.registry.all(),
            SyncScope::Types(types) => types,
        };

        let ready = if core.server.is_none() {
            warn!("Can't sync. Server is not set for channel {}", self.id);
            false
        } else if core.transport.is_none() {
            warn!("Can't sync. Transport client is unavailable for channel {}", self.id);
            false
        } else {
            true
        };
        if !ready {
            // 只置位标记，留待 resume / set_server 时重放
            core.last_connection_failed = true;
            self.skip(core, SkipReason::NoServer);
            return None;
        }

        let task_id = core.next_task_id;
        core.next_task_id += 1;
        let task = SyncTask::new(task_id, types);
        let transport_types = task.transport_types();

        // 传输客户端在执行开始时才取，排队期间换服务器的任务发往新服务器
        let link = ChannelLink::new(Arc::downgrade(self), task_id, task.types().clone());
        let ctx = ChannelTaskContext {
            channel_id: self.id.clone(),
            task,
            multiplexer,
            demultiplexer,
            link,
        };
        let job = self.kind.create_channel_task(ctx);

        let submitted = self.ensure_worker(core).submit(task_id, job);
        match submitted {
            Ok(()) => {
                core.stats.submitted_tasks += 1;
                info!(
                    "Channel {} submitted task #{} for {:?}",
                    self.id, task_id, transport_types
                );
                self.events.emit(ChannelEvent::TaskSubmitted {
                    channel_id: self.id.clone(),
                    task_id,
                    types: transport_types,
                    timestamp: now_millis(),
                });
                None
            }
            Err(e) => {
                error!("❌ Channel {} failed to submit task #{}: {}", self.id, task_id, e);
                core.worker = None;
                Some(mark_connection_failed(core))
            }
        }
    }

    /// 消费失败标记并按配置重放全量同步
    fn recover(self: &Arc<Self>, core: &mut ChannelCore) -> Option<Option<ServerInfo>> {
        if !take_pending_recovery(core) {
            return None;
        }
        if !self.config.resync_on_recovery {
            info!("Channel {} recovered, automatic resync disabled", self.id);
            return None;
        }
        info!("Channel {} recovering from failed connection, syncing all", self.id);
        self.dispatch(core, SyncScope::All)
    }
}

/// 客户端数据通道
///
/// 由 [`DataChannelBuilder`](crate::builder::DataChannelBuilder) 构建。
/// 克隆得到的是同一个通道的另一个句柄。
#[derive(Clone)]
pub struct DataChannel {
    pub(crate) inner: Arc<ChannelInner>,
}

impl DataChannel {
    pub(crate) fn from_parts(
        kind: Arc<dyn ChannelKind>,
        config: ChannelConfig,
        runtime: Handle,
        keys: Arc<dyn ClientKeyProvider>,
        transport_factory: Arc<dyn TransportClientFactory>,
        failure_listener: Arc<dyn ServerFailureListener>,
    ) -> Self {
        let registry = kind.supported_types();
        let id = kind.id().to_string();
        info!(
            "Creating channel {} ({}, {} supported types, sdk {})",
            id,
            kind.server_type(),
            registry.len(),
            crate::version::CHANNEL_SDK_VERSION
        );
        Self {
            inner: Arc::new(ChannelInner {
                id,
                registry,
                events: EventBus::new(config.event_buffer_size),
                config,
                runtime,
                keys,
                transport_factory,
                failure_listener,
                kind,
                core: Mutex::new(ChannelCore::new()),
            }),
        }
    }

    fn finish(&self, failure: Option<Option<ServerInfo>>) {
        if let Some(server) = failure {
            self.inner.notify_server_failed(server);
        }
    }

    /// 同步单个类型
    pub fn sync(&self, transport_type: TransportType) {
        info!("Processing sync {} for channel {}", transport_type, self.inner.id);
        let failure = {
            let mut core = self.inner.core.lock();
            self.inner.dispatch(&mut core, SyncScope::Single(transport_type))
        };
        self.finish(failure);
    }

    /// 同步全部注册类型
    pub fn sync_all(&self) {
        info!("Processing sync all for channel {}", self.inner.id);
        let failure = {
            let mut core = self.inner.core.lock();
            self.inner.dispatch(&mut core, SyncScope::All)
        };
        self.finish(failure);
    }

    /// 该通道类型不需要同步确认
    pub fn sync_ack(&self, transport_type: TransportType) {
        info!(
            "Sync ack message is ignored for channel {} (type {})",
            self.inner.id, transport_type
        );
    }

    pub fn set_multiplexer(&self, multiplexer: Arc<dyn DataMultiplexer>) {
        self.inner.core.lock().multiplexer = Some(multiplexer);
        debug!("Channel {} multiplexer set", self.inner.id);
    }

    pub fn set_demultiplexer(&self, demultiplexer: Arc<dyn DataDemultiplexer>) {
        self.inner.core.lock().demultiplexer = Some(demultiplexer);
        debug!("Channel {} demultiplexer set", self.inner.id);
    }

    /// 绑定服务器
    ///
    /// 重建传输客户端；通道活跃时惰性创建 worker，并在存在未处理的
    /// 连接失败时补发一次全量同步。暂停期间只记录绑定。
    ///
    /// 传输工厂与密钥提供方在锁外调用，可以回调通道的访问器。
    pub fn set_server(&self, server: ServerInfo) -> Result<()> {
        let inner = &self.inner;
        if inner.core.lock().state.is_terminal() {
            info!("Can't set server. Channel {} is down", inner.id);
            return Ok(());
        }

        let expected = inner.kind.server_type();
        if server.server_type != expected {
            warn!(
                "Channel {} rejected server {}: expected {} server",
                inner.id, server, expected
            );
            return Err(ChannelError::ServerTypeMismatch {
                expected,
                actual: server.server_type,
            });
        }

        info!("Channel {} binding server {}", inner.id, server);
        let client = inner.transport_factory.create_client(
            &server.url,
            &inner.keys.private_key(),
            &inner.keys.public_key(),
            &server.public_key,
        );

        let failure = {
            let mut core = inner.core.lock();
            if core.state.is_terminal() {
                info!(
                    "Channel {} went down while binding server {}, discarding",
                    inner.id, server
                );
                return Ok(());
            }

            core.binding_epoch += 1;
            core.server = Some(server.clone());
            inner.events.emit(ChannelEvent::ServerBound {
                channel_id: inner.id.clone(),
                server,
                timestamp: now_millis(),
            });

            match client {
                Ok(client) => {
                    core.transport = Some(client);
                    if core.state.is_active() {
                        inner.ensure_worker(&mut core);
                        inner.recover(&mut core)
                    } else {
                        None
                    }
                }
                Err(e) => {
                    error!("❌ Channel {} failed to create transport client: {}", inner.id, e);
                    core.transport = None;
                    Some(mark_connection_failed(&mut core))
                }
            }
        };
        self.finish(failure);
        Ok(())
    }

    /// 接收但不使用
    pub fn set_connectivity_checker(&self, _checker: Arc<dyn ConnectivityChecker>) {
        debug!("Channel {} ignores connectivity checker", self.inner.id);
    }

    /// 关闭通道（终态，幂等）
    pub fn shutdown(&self) {
        let mut core = self.inner.core.lock();
        if core.state.is_terminal() {
            debug!("Channel {} is already down", self.inner.id);
            return;
        }
        self.inner.set_state(&mut core, ChannelState::ShutDown);
        if let Some(worker) = core.worker.take() {
            worker.cancel();
        }
    }

    /// 暂停：取消并释放 worker
    pub fn pause(&self) {
        let mut core = self.inner.core.lock();
        match core.state {
            ChannelState::ShutDown => {
                info!("Can't pause. Channel {} is down", self.inner.id);
                return;
            }
            ChannelState::Paused => {
                debug!("Channel {} is already paused", self.inner.id);
                return;
            }
            ChannelState::Active => {}
        }
        self.inner.set_state(&mut core, ChannelState::Paused);
        if let Some(worker) = core.worker.take() {
            worker.cancel();
        }
    }

    /// 恢复：有未处理的连接失败时补发一次全量同步
    ///
    /// 不主动创建 worker，派发时惰性获取。
    pub fn resume(&self) {
        let inner = &self.inner;
        let failure = {
            let mut core = inner.core.lock();
            match core.state {
                ChannelState::ShutDown => {
                    info!("Can't resume. Channel {} is down", inner.id);
                    return;
                }
                ChannelState::Paused => inner.set_state(&mut core, ChannelState::Active),
                ChannelState::Active => debug!("Channel {} is not paused", inner.id),
            }
            inner.recover(&mut core)
        };
        self.finish(failure);
    }

    pub fn id(&self) -> &str {
        &self.inner.id
    }

    pub fn server_type(&self) -> ServerType {
        self.inner.kind.server_type()
    }

    pub fn transport_protocol_id(&self) -> TransportProtocolId {
        self.inner.kind.transport_protocol_id()
    }

    pub fn supported_types(&self) -> &TypeDirectionRegistry {
        &self.inner.registry
    }

    pub fn state(&self) -> ChannelState {
        self.inner.core.lock().state
    }

    pub fn server(&self) -> Option<ServerInfo> {
        self.inner.core.lock().server.clone()
    }

    pub fn is_connection_failed(&self) -> bool {
        self.inner.core.lock().last_connection_failed
    }

    /// 当前是否持有可用的 worker
    pub fn has_worker(&self) -> bool {
        self.inner
            .core
            .lock()
            .worker
            .as_ref()
            .map_or(false, |w| !w.is_cancelled())
    }

    pub fn stats(&self) -> ChannelStats {
        self.inner.core.lock().stats.clone()
    }

    /// 订阅通道事件
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<ChannelEvent> {
        self.inner.events.subscribe()
    }

    /// 当前服务器绑定的结果回报句柄（供自定义通道类型在执行单元之外回报）
    pub fn reporter(&self) -> ConnectionReporter {
        let epoch = self.inner.core.lock().binding_epoch;
        ConnectionReporter::new(Arc::downgrade(&self.inner), epoch)
    }
}

impl std::fmt::Debug for DataChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let core = self.inner.core.lock();
        f.debug_struct("DataChannel")
            .field("id", &self.inner.id)
            .field("state", &core.state)
            .field("server", &core.server)
            .field("last_connection_failed", &core.last_connection_failed)
            .finish()
    }
}
