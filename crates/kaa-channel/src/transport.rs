//! 数据类型与传输方向

use serde::{Deserialize, Serialize};

/// 通道上承载的数据类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TransportType {
    /// 引导（获取可用的 operations 服务器列表）
    Bootstrap,
    /// 端点 profile
    Profile,
    /// 配置
    Configuration,
    /// 通知
    Notification,
    /// 用户绑定
    User,
    /// 事件
    Event,
    /// 日志上传
    Logging,
}

impl std::fmt::Display for TransportType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            TransportType::Bootstrap => "BOOTSTRAP",
            TransportType::Profile => "PROFILE",
            TransportType::Configuration => "CONFIGURATION",
            TransportType::Notification => "NOTIFICATION",
            TransportType::User => "USER",
            TransportType::Event => "EVENT",
            TransportType::Logging => "LOGGING",
        };
        write!(f, "{}", name)
    }
}

/// 数据在通道上的传输方向
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChannelDirection {
    /// 仅上行
    Up,
    /// 仅下行
    Down,
    /// 双向
    Bidirectional,
}

impl ChannelDirection {
    pub fn allows_upload(&self) -> bool {
        matches!(self, ChannelDirection::Up | ChannelDirection::Bidirectional)
    }

    pub fn allows_download(&self) -> bool {
        matches!(self, ChannelDirection::Down | ChannelDirection::Bidirectional)
    }
}

impl std::fmt::Display for ChannelDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChannelDirection::Up => write!(f, "UP"),
            ChannelDirection::Down => write!(f, "DOWN"),
            ChannelDirection::Bidirectional => write!(f, "BIDIRECTIONAL"),
        }
    }
}

/// 传输协议标识（id + 版本）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransportProtocolId {
    pub id: i32,
    pub version: i32,
}

impl TransportProtocolId {
    pub const fn new(id: i32, version: i32) -> Self {
        Self { id, version }
    }
}

/// HTTP 传输协议
pub const HTTP_TRANSPORT_ID: TransportProtocolId = TransportProtocolId::new(0xfb9a3cf0_u32 as i32, 1);

impl std::fmt::Display for TransportProtocolId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "0x{:08x}:v{}", self.id as u32, self.version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_flags() {
        assert!(ChannelDirection::Up.allows_upload());
        assert!(!ChannelDirection::Up.allows_download());
        assert!(ChannelDirection::Down.allows_download());
        assert!(ChannelDirection::Bidirectional.allows_upload());
        assert!(ChannelDirection::Bidirectional.allows_download());
    }

    #[test]
    fn test_http_transport_id_display() {
        assert_eq!(HTTP_TRANSPORT_ID.to_string(), "0xfb9a3cf0:v1");
    }
}
