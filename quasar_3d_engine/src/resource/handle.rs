/// Pool ids and resource handles

use slotmap::Key;

slotmap::new_key_type! {
    /// Generational pool slot id
    pub struct PoolId;
}

/// Resource type carried by a handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Texture,
    Model,
    Font,
}

/// Reference to a resource inside a pool
///
/// Ids are unique per (pool, kind) and never reused by the pool, so handles
/// from an unloaded generation simply stop resolving.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResourceHandle {
    pub pool: PoolId,
    pub kind: ResourceKind,
    pub id: u32,
}

impl ResourceHandle {
    /// Id carried by null handles
    pub const NULL_ID: u32 = u32::MAX;

    pub fn new(pool: PoolId, kind: ResourceKind, id: u32) -> Self {
        Self { pool, kind, id }
    }

    /// Sentinel handle for `kind` (e.g. a mesh without texture)
    pub fn null(kind: ResourceKind) -> Self {
        Self {
            pool: PoolId::null(),
            kind,
            id: Self::NULL_ID,
        }
    }

    /// True only for handles built by `null`
    pub fn is_null(&self) -> bool {
        self.pool.is_null() && self.id == Self::NULL_ID
    }
}
