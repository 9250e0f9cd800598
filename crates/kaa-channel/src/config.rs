//! 通道配置

use serde::{Deserialize, Serialize};

/// 通道配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelConfig {
    /// 事件广播缓冲区大小
    pub event_buffer_size: usize,
    /// 恢复（resume / 重新绑定服务器）时是否重放一次全量同步
    ///
    /// 为 false 时连接失败标记仍会被消费，但不会自动补发同步。
    pub resync_on_recovery: bool,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            event_buffer_size: 64,
            resync_on_recovery: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_json() {
        let config: ChannelConfig =
            serde_json::from_str(r#"{"event_buffer_size": 8, "resync_on_recovery": false}"#).unwrap();
        assert_eq!(config.event_buffer_size, 8);
        assert!(!config.resync_on_recovery);

        let round = serde_json::to_string(&ChannelConfig::default()).unwrap();
        assert!(round.contains("\"resync_on_recovery\":true"));
    }
}
