//! 通道错误类型
//!
//! `sync` / `sync_all` 从不向调用方返回错误（失败通过状态位与回调异步传递），
//! 这里的错误只出现在构建、绑定服务器以及协作方（编解码器、传输客户端）接口上。

use crate::server::ServerType;

#[derive(Debug, Clone, thiserror::Error)]
pub enum ChannelError {
    /// 构建通道时没有可用的 tokio 运行时
    #[error("No tokio runtime available: {0}")]
    NoRuntime(String),

    /// 服务器类型与通道类型不一致
    #[error("Server type mismatch: channel expects {expected}, got {actual}")]
    ServerTypeMismatch {
        expected: ServerType,
        actual: ServerType,
    },

    /// 传输客户端创建失败
    #[error("Transport init error: {0}")]
    TransportInit(String),

    /// 请求/响应交换失败
    #[error("Transport error: {0}")]
    Transport(String),

    /// 复用器生成请求失败
    #[error("Multiplexer error: {0}")]
    Multiplexer(String),

    /// 解复用器处理响应失败
    #[error("Demultiplexer error: {0}")]
    Demultiplexer(String),

    /// 派发 worker 已停止，任务无法入队
    #[error("Dispatch worker stopped: {0}")]
    WorkerStopped(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

pub type Result<T> = std::result::Result<T, ChannelError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ChannelError::ServerTypeMismatch {
            expected: ServerType::Operations,
            actual: ServerType::Bootstrap,
        };
        assert_eq!(
            err.to_string(),
            "Server type mismatch: channel expects OPERATIONS, got BOOTSTRAP"
        );
        assert_eq!(
            ChannelError::Transport("connection reset".to_string()).to_string(),
            "Transport error: connection reset"
        );
    }
}
