/// Pool arena.
///
/// Pools live in a generational slot map: destroying a pool invalidates its
/// id for good, and a later pool reusing the slot gets a different id.

use slotmap::SlotMap;

use crate::error::{Error, Result};
use crate::resource::{PoolId, ResourcePool, StreamingConfig};
use crate::{engine_debug, engine_error};

pub struct ResourceManager {
    pools: SlotMap<PoolId, ResourcePool>,
}

impl ResourceManager {
    /// Create a new empty resource manager
    pub fn new() -> Self {
        Self {
            pools: SlotMap::with_key(),
        }
    }

    /// Create an empty pool
    pub fn create_pool(&mut self, config: StreamingConfig) -> PoolId {
        let id = self.pools.insert_with_key(|id| ResourcePool::new(id, config));
        engine_debug!("quasar3d::ResourceManager", "Created pool {:?}", id);
        id
    }

    /// Destroy a pool and release its device resources
    pub fn destroy_pool(&mut self, id: PoolId) -> Result<()> {
        match self.pools.remove(id) {
            Some(_) => Ok(()),
            None => {
                let message = format!("pool {:?} does not exist", id);
                engine_error!("quasar3d::ResourceManager", "{}", message);
                Err(Error::StaleHandle(message))
            }
        }
    }

    pub fn pool(&self, id: PoolId) -> Option<&ResourcePool> {
        self.pools.get(id)
    }

    pub fn pool_mut(&mut self, id: PoolId) -> Option<&mut ResourcePool> {
        self.pools.get_mut(id)
    }

    pub fn contains(&self, id: PoolId) -> bool {
        self.pools.contains_key(id)
    }

    pub fn pool_count(&self) -> usize {
        self.pools.len()
    }

    pub fn pool_ids(&self) -> impl Iterator<Item = PoolId> + '_ {
        self.pools.keys()
    }
}

impl Default for ResourceManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "resource_manager_tests.rs"]
mod tests;
