//! 数据类型 → 传输方向 注册表
//!
//! 每种通道类型都有一份固定的映射：`sync(type)` 只取其中一项，
//! `sync_all()` 使用整份映射。

use std::collections::BTreeMap;

use crate::transport::{ChannelDirection, TransportType};

/// 一次同步涉及的 {类型: 方向}（有序）
pub type SyncTypes = BTreeMap<TransportType, ChannelDirection>;

/// 通道支持的数据类型注册表（构建后不可变）
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypeDirectionRegistry {
    entries: SyncTypes,
}

impl TypeDirectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加一项映射（构建期使用）
    pub fn with(mut self, transport_type: TransportType, direction: ChannelDirection) -> Self {
        self.entries.insert(transport_type, direction);
        self
    }

    /// 查询某个类型允许的方向
    pub fn direction_of(&self, transport_type: TransportType) -> Option<ChannelDirection> {
        self.entries.get(&transport_type).copied()
    }

    pub fn supports(&self, transport_type: TransportType) -> bool {
        self.entries.contains_key(&transport_type)
    }

    /// 单个类型的同步映射；未注册的类型返回 None
    pub fn single(&self, transport_type: TransportType) -> Option<SyncTypes> {
        self.direction_of(transport_type).map(|direction| {
            let mut types = SyncTypes::new();
            types.insert(transport_type, direction);
            types
        })
    }

    /// 全量同步映射
    pub fn all(&self) -> SyncTypes {
        self.entries.clone()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(TransportType, ChannelDirection)> for TypeDirectionRegistry {
    fn from_iter<I: IntoIterator<Item = (TransportType, ChannelDirection)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}
