//! 服务器绑定信息与本地密钥
//!
//! 通道只保存当前绑定的服务器；选哪台服务器由外部的通道管理器决定。

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{ChannelError, Result};

/// 服务器类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ServerType {
    /// 引导服务器
    Bootstrap,
    /// 业务（operations）服务器
    Operations,
}

impl std::fmt::Display for ServerType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ServerType::Bootstrap => write!(f, "BOOTSTRAP"),
            ServerType::Operations => write!(f, "OPERATIONS"),
        }
    }
}

/// 服务器信息（端点 + 公钥）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerInfo {
    /// 服务器类型
    pub server_type: ServerType,
    /// 接入点 ID
    pub access_point_id: i32,
    /// 端点 URL
    pub url: String,
    /// 服务器公钥（用于构建传输客户端）
    pub public_key: Bytes,
}

impl ServerInfo {
    pub fn new(
        server_type: ServerType,
        access_point_id: i32,
        url: impl Into<String>,
        public_key: impl Into<Bytes>,
    ) -> Result<Self> {
        let url = url.into();
        if url.trim().is_empty() {
            return Err(ChannelError::InvalidArgument("server url is empty".to_string()));
        }
        Ok(Self {
            server_type,
            access_point_id,
            url,
            public_key: public_key.into(),
        })
    }

    /// 公钥指纹：SHA-256 前 8 字节的十六进制，日志中代替原始公钥
    pub fn public_key_fingerprint(&self) -> String {
        let digest = Sha256::digest(&self.public_key);
        hex::encode(&digest[..8])
    }
}

impl std::fmt::Display for ServerInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}#{} {} (key {})",
            self.server_type,
            self.access_point_id,
            self.url,
            self.public_key_fingerprint()
        )
    }
}

/// 本地密钥提供者（密钥管理本身在通道之外）
pub trait ClientKeyProvider: Send + Sync {
    fn private_key(&self) -> Bytes;

    fn public_key(&self) -> Bytes;
}

/// 内存中的密钥对
#[derive(Clone)]
pub struct ClientKeyPair {
    private_key: Bytes,
    public_key: Bytes,
}

impl ClientKeyPair {
    pub fn new(private_key: impl Into<Bytes>, public_key: impl Into<Bytes>) -> Self {
        Self {
            private_key: private_key.into(),
            public_key: public_key.into(),
        }
    }
}

// 不打印私钥
impl std::fmt::Debug for ClientKeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientKeyPair")
            .field("private_key", &format_args!("<{} bytes>", self.private_key.len()))
            .field("public_key", &format_args!("<{} bytes>", self.public_key.len()))
            .finish()
    }
}

impl ClientKeyProvider for ClientKeyPair {
    fn private_key(&self) -> Bytes {
        self.private_key.clone()
    }

    fn public_key(&self) -> Bytes {
        self.public_key.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_info_validation() {
        let err = ServerInfo::new(ServerType::Operations, 1, "  ", Bytes::new()).unwrap_err();
        assert!(matches!(err, ChannelError::InvalidArgument(_)));

        let server = ServerInfo::new(
            ServerType::Operations,
            42,
            "http://ops.example.com:9999",
            Bytes::from_static(b"server-public-key"),
        )
        .unwrap();
        assert_eq!(server.access_point_id, 42);
    }

    #[test]
    fn test_public_key_fingerprint() {
        let server = ServerInfo::new(
            ServerType::Bootstrap,
            7,
            "http://bootstrap.example.com",
            Bytes::from_static(b"abc"),
        )
        .unwrap();

        // sha256("abc") = ba7816bf8f01cfea...
        assert_eq!(server.public_key_fingerprint(), "ba7816bf8f01cfea");
        assert!(server.to_string().contains("BOOTSTRAP#7"));
        assert!(!server.to_string().contains("abc"));
    }

    #[test]
    fn test_key_pair_debug_hides_private_key() {
        let keys = ClientKeyPair::new(Bytes::from_static(b"secret"), Bytes::from_static(b"pub"));
        let debug = format!("{:?}", keys);
        assert!(!debug.contains("secret"));
        assert_eq!(keys.private_key(), Bytes::from_static(b"secret"));
    }
}
