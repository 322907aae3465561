//! Resource pools.
//!
//! A pool owns one texture stager, one model batch per vertex layout and a
//! font table. Loads land in CPU memory; `commit` uploads everything staged
//! in a single transfer batch and moves the pool to `Ready`.
//!
//! # Lifecycle
//!
//! ```text
//! Empty --load--> Staging --commit--> Ready
//!   ^                |                  |
//!   +-----unload-----+------unload------+
//! ```
//!
//! Each unload starts a new generation. Resource ids keep increasing across
//! generations, so handles from an earlier generation never resolve again.

use std::path::Path;
use std::sync::Arc;
use rustc_hash::FxHashMap;

use crate::animation::Animator;
use crate::engine::Engine;
use crate::error::{Error, Result};
use crate::graphics_device::{Buffer, BufferDesc, BufferUsage, GraphicsDevice, Texture, TransferBatch};
use crate::import::{load_model, Model};
use crate::resource::{
    AnimationSet, BatchGroup, FontResource, ModelBatch, ModelDrawInfo, PoolId, ResourceHandle,
    ResourceKind, StreamingConfig, TextureStager,
};
use crate::vertex::{SkinnedVertex3D, Vertex2D, Vertex3D, VertexLayoutTag};
use crate::{engine_debug, engine_error, engine_info, engine_warn};

/// Pool lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolState {
    /// Nothing loaded
    Empty,
    /// Loads waiting for commit
    Staging,
    /// Committed, device resources valid
    Ready,
}

/// Staging buffer windows of one commit
struct StagingLayout {
    vertex_bases: [u64; 3],
    index_bases: [u64; 3],
    total: u64,
}

/// Independently loadable collection of textures, models and fonts
pub struct ResourcePool {
    id: PoolId,
    config: StreamingConfig,
    state: PoolState,
    generation: u32,
    textures: TextureStager,
    /// Indexed by `VertexLayoutTag::index`
    groups: [Box<dyn BatchGroup>; 3],
    model_layouts: FxHashMap<u32, VertexLayoutTag>,
    fonts: FxHashMap<u32, FontResource>,
    font_keys: FxHashMap<String, u32>,
    next_model_id: u32,
    next_font_id: u32,
    /// Returned for unknown models
    fallback: Animator,
}

impl ResourcePool {
    pub fn new(id: PoolId, config: StreamingConfig) -> Self {
        Self {
            id,
            textures: TextureStager::new(&config),
            config,
            state: PoolState::Empty,
            generation: 0,
            groups: [
                Box::new(ModelBatch::<Vertex2D>::new()),
                Box::new(ModelBatch::<Vertex3D>::new()),
                Box::new(ModelBatch::<SkinnedVertex3D>::new()),
            ],
            model_layouts: FxHashMap::default(),
            fonts: FxHashMap::default(),
            font_keys: FxHashMap::default(),
            next_model_id: 0,
            next_font_id: 0,
            fallback: Animator::empty(0),
        }
    }

    pub fn id(&self) -> PoolId {
        self.id
    }

    pub fn config(&self) -> &StreamingConfig {
        &self.config
    }

    pub fn state(&self) -> PoolState {
        self.state
    }

    /// Number of unloads so far
    pub fn generation(&self) -> u32 {
        self.generation
    }

    // ===== LOADING =====

    fn begin_staging(&mut self, what: &str) -> Result<()> {
        if self.state == PoolState::Ready {
            let message = format!("cannot load {} into committed pool {:?}; unload it first", what, self.id);
            engine_error!("quasar3d::ResourcePool", "{}", message);
            return Err(Error::InvalidState(message));
        }
        Ok(())
    }

    fn handle(&self, kind: ResourceKind, id: u32) -> ResourceHandle {
        ResourceHandle::new(self.id, kind, id)
    }

    /// Stage an image file (deduplicated by path)
    pub fn load_texture(&mut self, path: impl AsRef<Path>) -> Result<ResourceHandle> {
        self.begin_staging("a texture")?;
        let id = self.textures.load_texture_file(path.as_ref())?;
        self.state = PoolState::Staging;
        Ok(self.handle(ResourceKind::Texture, id))
    }

    /// Stage an encoded image held in memory (deduplicated by `key`)
    pub fn load_texture_bytes(&mut self, key: &str, bytes: &[u8]) -> Result<ResourceHandle> {
        self.begin_staging("a texture")?;
        let id = self.textures.load_texture_bytes(key, bytes)?;
        self.state = PoolState::Staging;
        Ok(self.handle(ResourceKind::Texture, id))
    }

    /// Import a model file and pack it with vertex layout `layout`
    pub fn load_model(&mut self, path: impl AsRef<Path>, layout: VertexLayoutTag) -> Result<ResourceHandle> {
        self.begin_staging("a model")?;
        let model = load_model(path.as_ref())?;
        self.load_model_data(&model, layout)
    }

    /// Pack an already imported model
    pub fn load_model_data(&mut self, model: &Model, layout: VertexLayoutTag) -> Result<ResourceHandle> {
        self.begin_staging("a model")?;
        let id = self.next_model_id;
        let mark = self.textures.mark();
        if let Err(e) = self.groups[layout.index()].load_model(model, id, &mut self.textures, &self.config) {
            self.textures.rollback(mark);
            return Err(e);
        }
        self.next_model_id += 1;
        self.model_layouts.insert(id, layout);
        self.state = PoolState::Staging;
        Ok(self.handle(ResourceKind::Model, id))
    }

    /// Rasterize a font at `pixel_size` into an atlas texture
    pub fn load_font(&mut self, path: impl AsRef<Path>, pixel_size: f32) -> Result<ResourceHandle> {
        self.begin_staging("a font")?;
        let path = path.as_ref();
        if pixel_size.is_nan() || pixel_size <= 0.0 {
            let message = format!("font '{}' requested at invalid size {}", path.display(), pixel_size);
            engine_error!("quasar3d::ResourcePool", "{}", message);
            return Err(Error::InvalidResource(message));
        }
        let key = format!("{}@{}", path.display(), pixel_size);
        if let Some(&id) = self.font_keys.get(&key) {
            return Ok(self.handle(ResourceKind::Font, id));
        }

        let face = Engine::with_font_library(|library| library.load_face(path))?;
        let mark = self.textures.mark();
        let font = match FontResource::build(path, &face, pixel_size, &mut self.textures) {
            Ok(font) => font,
            Err(e) => {
                self.textures.rollback(mark);
                return Err(e);
            }
        };

        let id = self.next_font_id;
        self.next_font_id += 1;
        self.fonts.insert(id, font);
        self.font_keys.insert(key, id);
        self.state = PoolState::Staging;
        Ok(self.handle(ResourceKind::Font, id))
    }

    // ===== COMMIT =====

    /// Upload everything staged to device memory
    ///
    /// Allocation failures leave the pool in `Staging` with nothing consumed.
    /// A failure once payloads are being written discards the pool's content
    /// (the pool is unloaded) before the error is returned.
    pub fn commit(&mut self, device: &mut dyn GraphicsDevice) -> Result<()> {
        match self.state {
            PoolState::Empty => {
                engine_warn!("quasar3d::ResourcePool", "Commit on pool {:?} with nothing staged", self.id);
                return Ok(());
            }
            PoolState::Ready => {
                engine_warn!("quasar3d::ResourcePool", "Pool {:?} is already committed", self.id);
                return Ok(());
            }
            PoolState::Staging => {}
        }

        let layout = self.layout_staging();
        if layout.total == 0 {
            self.finish_commit();
            return Ok(());
        }

        let staging = device.create_buffer(BufferDesc { size: layout.total, usage: BufferUsage::Staging })?;
        for group in self.groups.iter_mut() {
            group.allocate_buffers(device)?;
        }
        self.textures.create_textures(device)?;

        if let Err(e) = self.upload(device, &staging, &layout) {
            engine_error!("quasar3d::ResourcePool", "Commit of pool {:?} failed, discarding its content: {}", self.id, e);
            self.unload();
            return Err(e);
        }

        engine_info!("quasar3d::ResourcePool", "Committed pool {:?}: {} bytes staged, {} models, {} textures",
            self.id, layout.total, self.model_layouts.len(), self.textures.pending_count());
        self.finish_commit();
        Ok(())
    }

    /// Assign offsets in every group and place all payloads in one staging buffer
    fn layout_staging(&mut self) -> StagingLayout {
        let mut sizes = [Default::default(); 3];
        for (i, group) in self.groups.iter_mut().enumerate() {
            sizes[i] = group.process_group();
        }

        let mut cursor = 0u64;
        let mut vertex_bases = [0u64; 3];
        let mut index_bases = [0u64; 3];
        for (i, size) in sizes.iter().enumerate() {
            vertex_bases[i] = cursor;
            cursor += size.vertex_bytes;
        }
        for (i, size) in sizes.iter().enumerate() {
            index_bases[i] = cursor;
            cursor += size.index_bytes;
        }
        cursor += self.textures.assign_staging_offsets(cursor);

        StagingLayout { vertex_bases, index_bases, total: cursor }
    }

    fn upload(&mut self, device: &mut dyn GraphicsDevice, staging: &Arc<dyn Buffer>, layout: &StagingLayout) -> Result<()> {
        for (i, group) in self.groups.iter_mut().enumerate() {
            group.stage_to_memory(&**staging, layout.vertex_bases[i], layout.index_bases[i])?;
        }
        self.textures.stage_to_memory(&**staging)?;

        let mut transfer = TransferBatch::new();
        let mut mips = TransferBatch::new();
        for (i, group) in self.groups.iter().enumerate() {
            group.record_uploads(staging, layout.vertex_bases[i], layout.index_bases[i], &mut transfer);
        }
        self.textures.record_uploads(staging, &mut transfer, &mut mips)?;

        engine_debug!("quasar3d::ResourcePool", "Submitting {} transfer and {} mip commands",
            transfer.len(), mips.len());
        device.submit_transfer(&transfer)?;
        if !mips.is_empty() {
            device.submit_transfer(&mips)?;
        }
        Ok(())
    }

    fn finish_commit(&mut self) {
        self.textures.finish_commit();
        self.state = PoolState::Ready;
    }

    /// Drop every staged and committed resource and start a new generation
    ///
    /// An `Empty` pool keeps its generation.
    pub fn unload(&mut self) {
        self.textures.clear();
        for group in self.groups.iter_mut() {
            group.clear();
        }
        self.model_layouts.clear();
        self.fonts.clear();
        self.font_keys.clear();
        if self.state == PoolState::Empty {
            return;
        }
        self.generation += 1;
        self.state = PoolState::Empty;
        engine_debug!("quasar3d::ResourcePool", "Unloaded pool {:?} (generation {})", self.id, self.generation);
    }

    // ===== QUERIES =====

    fn owns(&self, handle: &ResourceHandle, kind: ResourceKind) -> bool {
        handle.pool == self.id && handle.kind == kind && !handle.is_null()
    }

    fn model_layout(&self, handle: &ResourceHandle) -> Option<VertexLayoutTag> {
        if !self.owns(handle, ResourceKind::Model) {
            return None;
        }
        self.model_layouts.get(&handle.id).copied()
    }

    /// Draw description of a committed model
    pub fn model_draw_info(&self, handle: &ResourceHandle) -> Option<ModelDrawInfo> {
        if self.state != PoolState::Ready {
            return None;
        }
        let layout = self.model_layout(handle)?;
        self.groups[layout.index()].draw_info(handle.id, self.id)
    }

    /// Vertex layout a model was packed with
    pub fn model_layout_of(&self, handle: &ResourceHandle) -> Option<VertexLayoutTag> {
        self.model_layout(handle)
    }

    /// Committed device texture
    pub fn texture(&self, handle: &ResourceHandle) -> Option<&Arc<dyn Texture>> {
        if !self.owns(handle, ResourceKind::Texture) {
            return None;
        }
        self.textures.texture(handle.id)
    }

    pub fn font(&self, handle: &ResourceHandle) -> Option<&FontResource> {
        if !self.owns(handle, ResourceKind::Font) {
            return None;
        }
        self.fonts.get(&handle.id)
    }

    /// Atlas texture handle of a font
    pub fn font_texture(&self, handle: &ResourceHandle) -> Option<ResourceHandle> {
        self.font(handle).map(|f| self.handle(ResourceKind::Texture, f.texture_id()))
    }

    /// Shared vertex buffer of a layout group (committed pools only)
    pub fn vertex_buffer(&self, layout: VertexLayoutTag) -> Option<&Arc<dyn Buffer>> {
        self.groups[layout.index()].vertex_buffer()
    }

    pub fn index_buffer(&self, layout: VertexLayoutTag) -> Option<&Arc<dyn Buffer>> {
        self.groups[layout.index()].index_buffer()
    }

    /// Every animator of a skinned model
    pub fn animations(&self, handle: &ResourceHandle) -> Option<&AnimationSet> {
        let layout = self.model_layout(handle)?;
        self.groups[layout.index()].animations(handle.id)
    }

    /// Animator for clip `name`, or an identity pose when unknown
    pub fn animator(&self, handle: &ResourceHandle, name: &str) -> &Animator {
        let Some(set) = self.animations(handle) else {
            engine_error!("quasar3d::ResourcePool", "No animations for {:?}", handle);
            return &self.fallback;
        };
        match set.index_of(name) {
            Some(index) => &set.animators()[index],
            None => {
                engine_error!("quasar3d::ResourcePool", "Unknown animation '{}' for model {}", name, handle.id);
                set.rest_pose()
            }
        }
    }

    /// Animator for clip index `index`, or an identity pose when out of range
    pub fn animator_at(&self, handle: &ResourceHandle, index: usize) -> &Animator {
        let Some(set) = self.animations(handle) else {
            engine_error!("quasar3d::ResourcePool", "No animations for {:?}", handle);
            return &self.fallback;
        };
        match set.at(index) {
            Some(animator) => animator,
            None => {
                engine_error!("quasar3d::ResourcePool", "Animation index {} out of range for model {} ({} clips)",
                    index, handle.id, set.len());
                set.rest_pose()
            }
        }
    }

    /// Mutable animator for clip `name`, or an identity pose when unknown
    pub fn animator_mut(&mut self, handle: &ResourceHandle, name: &str) -> &mut Animator {
        let Some(layout) = self.model_layout(handle) else {
            engine_error!("quasar3d::ResourcePool", "No animations for {:?}", handle);
            return &mut self.fallback;
        };
        let Some(set) = self.groups[layout.index()].animations_mut(handle.id) else {
            return &mut self.fallback;
        };
        match set.index_of(name) {
            Some(index) => &mut set.animators_mut()[index],
            None => {
                engine_error!("quasar3d::ResourcePool", "Unknown animation '{}' for model {}", name, handle.id);
                set.rest_pose_mut()
            }
        }
    }

    /// Smallest mip count among committed textures
    pub fn min_mip_levels(&self) -> Option<u32> {
        self.textures.min_mip_levels()
    }

    pub fn model_count(&self) -> usize {
        self.model_layouts.len()
    }

    pub fn font_count(&self) -> usize {
        self.fonts.len()
    }

    pub fn texture_count(&self) -> usize {
        self.textures.texture_count()
    }
}

impl Drop for ResourcePool {
    fn drop(&mut self) {
        engine_debug!("quasar3d::ResourcePool", "Releasing pool {:?}", self.id);
    }
}

#[cfg(test)]
#[path = "pool_tests.rs"]
mod tests;
