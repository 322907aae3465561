//! Vertex/index batch packing.
//!
//! A `ModelBatch<V>` collects every model a pool loads with vertex layout `V`.
//! At commit, `process_group` hands out contiguous vertex and index windows
//! in load order, `stage_to_memory` writes the packed data into the pool's
//! staging buffer, and `record_uploads` copies it into one device vertex
//! buffer and one device index buffer for the whole group.
//!
//! # Layout
//!
//! ```text
//! vertex buffer: | model 0: mesh 0 | mesh 1 | model 1: mesh 0 | ...
//! index buffer:  | model 0: mesh 0 | mesh 1 | model 1: mesh 0 | ...
//! ```
//!
//! Mesh indices stay local to their mesh; draws pass the mesh's
//! `vertex_offset` as the base vertex.

use std::path::PathBuf;
use std::sync::Arc;
use rustc_hash::FxHashMap;

use crate::animation::Animator;
use crate::error::{Error, Result};
use crate::graphics_device::{Buffer, BufferDesc, BufferUsage, GraphicsDevice, TransferBatch};
use crate::import::{Model, MAX_BONE_INFLUENCES};
use crate::resource::{PoolId, ResourceHandle, ResourceKind, StreamingConfig, TextureStager};
use crate::vertex::{truncates_influences, VertexFormat, VertexLayoutTag};
use crate::{engine_debug, engine_error, engine_warn};

// ============================================================================
// DRAW INFO
// ============================================================================

/// What the draw path needs to issue one indexed draw
#[derive(Debug, Clone, PartialEq)]
pub struct MeshDrawInfo {
    pub index_count: u32,
    /// First index in the group's index buffer
    pub index_offset: u32,
    /// Base vertex in the group's vertex buffer
    pub vertex_offset: u32,
    /// Diffuse texture, null when the mesh has none
    pub texture: ResourceHandle,
    pub diffuse_colour: [f32; 4],
}

/// Draw description of a committed model
#[derive(Debug, Clone, PartialEq)]
pub struct ModelDrawInfo {
    pub layout: VertexLayoutTag,
    pub meshes: Vec<MeshDrawInfo>,
}

/// Byte sizes of one group's vertex and index data
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GroupSizes {
    pub vertex_bytes: u64,
    pub index_bytes: u64,
}

// ============================================================================
// ANIMATION SET
// ============================================================================

/// Animators of one skinned model, plus its static fallback
#[derive(Debug, Clone)]
pub struct AnimationSet {
    animators: Vec<Animator>,
    rest_pose: Animator,
}

impl AnimationSet {
    fn new(animators: Vec<Animator>, bone_count: usize) -> Self {
        Self {
            animators,
            rest_pose: Animator::empty(bone_count),
        }
    }

    pub fn len(&self) -> usize {
        self.animators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.animators.is_empty()
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.animators.iter().position(|a| a.name() == name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.animators.iter().map(|a| a.name()).collect()
    }

    pub fn at(&self, index: usize) -> Option<&Animator> {
        self.animators.get(index)
    }

    pub fn at_mut(&mut self, index: usize) -> Option<&mut Animator> {
        self.animators.get_mut(index)
    }

    pub fn animators(&self) -> &[Animator] {
        &self.animators
    }

    pub fn animators_mut(&mut self) -> &mut [Animator] {
        &mut self.animators
    }

    /// Identity pose sized for this model's bones
    pub fn rest_pose(&self) -> &Animator {
        &self.rest_pose
    }

    pub fn rest_pose_mut(&mut self) -> &mut Animator {
        &mut self.rest_pose
    }
}

// ============================================================================
// RECORDS
// ============================================================================

/// Packed mesh inside a model's arena
#[derive(Debug, Clone)]
pub struct MeshRecord<V: VertexFormat> {
    pub name: String,
    /// Packed vertices, emptied once staged
    vertices: Vec<V>,
    /// Mesh-local indices, emptied once staged
    indices: Vec<u32>,
    pub vertex_count: u32,
    pub index_count: u32,
    pub vertex_offset: u32,
    pub index_offset: u32,
    /// Texture id in the pool's stager
    pub texture: Option<u32>,
    pub diffuse_colour: [f32; 4],
}

impl<V: VertexFormat> MeshRecord<V> {
    /// CPU vertices (empty after staging)
    pub fn vertices(&self) -> &[V] {
        &self.vertices
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    pub fn is_staged(&self) -> bool {
        self.vertices.is_empty() && self.indices.is_empty()
    }
}

/// One model of the group with its mesh arena
#[derive(Debug, Clone)]
pub struct ModelRecord<V: VertexFormat> {
    pub id: u32,
    pub path: PathBuf,
    pub meshes: Vec<MeshRecord<V>>,
    pub vertex_offset: u32,
    pub index_offset: u32,
    pub vertex_count: u32,
    pub index_count: u32,
    pub bone_count: usize,
    pub animations: AnimationSet,
}

// ============================================================================
// BATCH GROUP TRAIT
// ============================================================================

/// Layout-erased view of a `ModelBatch`, used by the pool
pub trait BatchGroup: Send + Sync {
    fn tag(&self) -> VertexLayoutTag;

    /// Convert and stage `model` under `id`
    fn load_model(&mut self, model: &Model, id: u32, textures: &mut TextureStager, config: &StreamingConfig) -> Result<()>;

    fn contains(&self, id: u32) -> bool;

    fn model_count(&self) -> usize;

    /// Assign offsets to every model in load order
    fn process_group(&mut self) -> GroupSizes;

    /// Create the device vertex/index buffers sized by the last `process_group`
    fn allocate_buffers(&mut self, device: &mut dyn GraphicsDevice) -> Result<()>;

    /// Write packed data into `staging`, releasing the CPU copies
    fn stage_to_memory(&mut self, staging: &dyn Buffer, vertex_base: u64, index_base: u64) -> Result<()>;

    /// Record staging to device copies
    fn record_uploads(&self, staging: &Arc<dyn Buffer>, vertex_base: u64, index_base: u64, batch: &mut TransferBatch);

    fn vertex_buffer(&self) -> Option<&Arc<dyn Buffer>>;

    fn index_buffer(&self) -> Option<&Arc<dyn Buffer>>;

    fn draw_info(&self, id: u32, pool: PoolId) -> Option<ModelDrawInfo>;

    fn animations(&self, id: u32) -> Option<&AnimationSet>;

    fn animations_mut(&mut self, id: u32) -> Option<&mut AnimationSet>;

    /// Drop every model and device buffer
    fn clear(&mut self);
}

// ============================================================================
// MODEL BATCH
// ============================================================================

/// All models of one vertex layout inside a pool
pub struct ModelBatch<V: VertexFormat> {
    models: Vec<ModelRecord<V>>,
    by_id: FxHashMap<u32, usize>,
    sizes: GroupSizes,
    vertex_buffer: Option<Arc<dyn Buffer>>,
    index_buffer: Option<Arc<dyn Buffer>>,
}

impl<V: VertexFormat> ModelBatch<V> {
    pub fn new() -> Self {
        Self {
            models: Vec::new(),
            by_id: FxHashMap::default(),
            sizes: GroupSizes::default(),
            vertex_buffer: None,
            index_buffer: None,
        }
    }

    pub fn model(&self, id: u32) -> Option<&ModelRecord<V>> {
        self.by_id.get(&id).map(|&i| &self.models[i])
    }

    /// Models in load order
    pub fn models(&self) -> &[ModelRecord<V>] {
        &self.models
    }

    pub fn sizes(&self) -> GroupSizes {
        self.sizes
    }

    fn build_animations(model: &Model, config: &StreamingConfig) -> AnimationSet {
        let bone_count = model.bone_count();
        if !V::TAG.is_skinned() {
            return AnimationSet::new(Vec::new(), bone_count);
        }
        if bone_count > config.max_bones {
            engine_warn!("quasar3d::ModelBatch",
                "Model '{}' has {} bones, shaders address {}; extra bones are not indexable",
                model.path.display(), bone_count, config.max_bones);
        }
        let animators = model
            .animations
            .iter()
            .map(|animation| Animator::new(model, animation))
            .collect();
        AnimationSet::new(animators, bone_count)
    }
}

impl<V: VertexFormat> Default for ModelBatch<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: VertexFormat> BatchGroup for ModelBatch<V> {
    fn tag(&self) -> VertexLayoutTag {
        V::TAG
    }

    fn load_model(&mut self, model: &Model, id: u32, textures: &mut TextureStager, config: &StreamingConfig) -> Result<()> {
        if self.by_id.contains_key(&id) {
            let message = format!("model id {} is already staged", id);
            engine_error!("quasar3d::ModelBatch", "{}", message);
            return Err(Error::InvalidResource(message));
        }

        let mut meshes = Vec::with_capacity(model.meshes.len());
        for mesh in &model.meshes {
            let truncated = mesh.vertices.iter().filter(|v| truncates_influences::<V>(v)).count();
            if truncated > 0 {
                engine_warn!("quasar3d::ModelBatch",
                    "Mesh '{}' in '{}': {} vertices have more than {} bone influences, extra influences dropped",
                    mesh.name, model.path.display(), truncated, MAX_BONE_INFLUENCES);
            }

            let vertices: Vec<V> = mesh
                .vertices
                .iter()
                .map(|v| V::convert(v, &mesh.bind_transform))
                .collect();

            let texture = match mesh.textures.first() {
                Some(source) => Some(textures.resolve(source)?),
                None => None,
            };

            meshes.push(MeshRecord {
                name: mesh.name.clone(),
                vertex_count: vertices.len() as u32,
                index_count: mesh.indices.len() as u32,
                vertices,
                indices: mesh.indices.clone(),
                vertex_offset: 0,
                index_offset: 0,
                texture,
                diffuse_colour: mesh.diffuse_colour,
            });
        }

        let record = ModelRecord {
            id,
            path: model.path.clone(),
            vertex_count: meshes.iter().map(|m| m.vertex_count).sum(),
            index_count: meshes.iter().map(|m| m.index_count).sum(),
            meshes,
            vertex_offset: 0,
            index_offset: 0,
            bone_count: model.bone_count(),
            animations: Self::build_animations(model, config),
        };

        engine_debug!("quasar3d::ModelBatch", "Staged model {} '{}' ({:?}, {} meshes, {} vertices)",
            id, model.path.display(), V::TAG, record.meshes.len(), record.vertex_count);

        self.by_id.insert(id, self.models.len());
        self.models.push(record);
        Ok(())
    }

    fn contains(&self, id: u32) -> bool {
        self.by_id.contains_key(&id)
    }

    fn model_count(&self) -> usize {
        self.models.len()
    }

    fn process_group(&mut self) -> GroupSizes {
        let mut vertex_total = 0u32;
        let mut index_total = 0u32;

        for model in &mut self.models {
            model.vertex_offset = vertex_total;
            model.index_offset = index_total;
            for mesh in &mut model.meshes {
                mesh.vertex_offset = vertex_total;
                mesh.index_offset = index_total;
                vertex_total += mesh.vertex_count;
                index_total += mesh.index_count;
            }
        }

        self.sizes = GroupSizes {
            vertex_bytes: vertex_total as u64 * V::byte_size() as u64,
            index_bytes: index_total as u64 * std::mem::size_of::<u32>() as u64,
        };
        self.sizes
    }

    fn allocate_buffers(&mut self, device: &mut dyn GraphicsDevice) -> Result<()> {
        self.vertex_buffer = None;
        self.index_buffer = None;
        if self.sizes.vertex_bytes > 0 {
            self.vertex_buffer = Some(device.create_buffer(BufferDesc {
                size: self.sizes.vertex_bytes,
                usage: BufferUsage::Vertex,
            })?);
        }
        if self.sizes.index_bytes > 0 {
            self.index_buffer = Some(device.create_buffer(BufferDesc {
                size: self.sizes.index_bytes,
                usage: BufferUsage::Index,
            })?);
        }
        Ok(())
    }

    fn stage_to_memory(&mut self, staging: &dyn Buffer, vertex_base: u64, index_base: u64) -> Result<()> {
        let vertex_size = V::byte_size() as u64;
        let index_size = std::mem::size_of::<u32>() as u64;

        for mesh in self.models.iter_mut().flat_map(|m| m.meshes.iter_mut()) {
            if !mesh.vertices.is_empty() {
                let offset = vertex_base + mesh.vertex_offset as u64 * vertex_size;
                staging.update(offset, bytemuck::cast_slice(&mesh.vertices))?;
            }
            if !mesh.indices.is_empty() {
                let offset = index_base + mesh.index_offset as u64 * index_size;
                staging.update(offset, bytemuck::cast_slice(&mesh.indices))?;
            }
            mesh.vertices = Vec::new();
            mesh.indices = Vec::new();
        }
        Ok(())
    }

    fn record_uploads(&self, staging: &Arc<dyn Buffer>, vertex_base: u64, index_base: u64, batch: &mut TransferBatch) {
        if let Some(vertex_buffer) = &self.vertex_buffer {
            batch.copy_buffer(staging, vertex_base, vertex_buffer, 0, self.sizes.vertex_bytes);
        }
        if let Some(index_buffer) = &self.index_buffer {
            batch.copy_buffer(staging, index_base, index_buffer, 0, self.sizes.index_bytes);
        }
    }

    fn vertex_buffer(&self) -> Option<&Arc<dyn Buffer>> {
        self.vertex_buffer.as_ref()
    }

    fn index_buffer(&self) -> Option<&Arc<dyn Buffer>> {
        self.index_buffer.as_ref()
    }

    fn draw_info(&self, id: u32, pool: PoolId) -> Option<ModelDrawInfo> {
        let model = self.model(id)?;
        let meshes = model
            .meshes
            .iter()
            .map(|mesh| MeshDrawInfo {
                index_count: mesh.index_count,
                index_offset: mesh.index_offset,
                vertex_offset: mesh.vertex_offset,
                texture: match mesh.texture {
                    Some(texture) => ResourceHandle::new(pool, ResourceKind::Texture, texture),
                    None => ResourceHandle::null(ResourceKind::Texture),
                },
                diffuse_colour: mesh.diffuse_colour,
            })
            .collect();
        Some(ModelDrawInfo { layout: V::TAG, meshes })
    }

    fn animations(&self, id: u32) -> Option<&AnimationSet> {
        self.model(id).map(|m| &m.animations)
    }

    fn animations_mut(&mut self, id: u32) -> Option<&mut AnimationSet> {
        let index = *self.by_id.get(&id)?;
        Some(&mut self.models[index].animations)
    }

    fn clear(&mut self) {
        self.models.clear();
        self.by_id.clear();
        self.sizes = GroupSizes::default();
        self.vertex_buffer = None;
        self.index_buffer = None;
    }
}

#[cfg(test)]
#[path = "model_batch_tests.rs"]
mod tests;
