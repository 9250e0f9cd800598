//! 版本信息

/// crate semver，来自 Cargo.toml
pub const CHANNEL_SDK_VERSION: &str = env!("CARGO_PKG_VERSION");
