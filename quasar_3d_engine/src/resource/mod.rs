//! Resource module
//!
//! Pools of textures, models and fonts with a staged to committed lifecycle.

pub mod config;
pub mod handle;
pub mod texture_stager;
pub mod model_batch;
pub mod font;
pub mod pool;
mod resource_manager;

pub use config::StreamingConfig;
pub use handle::{PoolId, ResourceHandle, ResourceKind};
pub use texture_stager::{TextureStager, mip_levels, record_mip_chain};
pub use model_batch::{
    AnimationSet, BatchGroup, GroupSizes, MeshDrawInfo, MeshRecord, ModelBatch, ModelDrawInfo,
    ModelRecord,
};
pub use font::{FontAtlas, FontResource, GlyphMetrics, ATLAS_CHARS, MAX_ATLAS_SIZE, pack_atlas, rasterize_ascii};
pub use pool::{PoolState, ResourcePool};
pub use resource_manager::ResourceManager;
