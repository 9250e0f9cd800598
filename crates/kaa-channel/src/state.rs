//! 通道生命周期状态

use serde::{Deserialize, Serialize};

/// 通道生命周期状态
///
/// `ShutDown` 是终态，进入后不再接受任何迁移。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChannelState {
    /// 可派发
    Active,
    /// 已暂停（worker 已释放）
    Paused,
    /// 已关闭
    ShutDown,
}

impl ChannelState {
    pub fn is_active(&self) -> bool {
        matches!(self, ChannelState::Active)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ChannelState::ShutDown)
    }
}

impl std::fmt::Display for ChannelState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChannelState::Active => write!(f, "活跃"),
            ChannelState::Paused => write!(f, "已暂停"),
            ChannelState::ShutDown => write!(f, "已关闭"),
        }
    }
}
