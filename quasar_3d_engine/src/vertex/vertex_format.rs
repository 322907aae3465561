//! Vertex layouts packed into device vertex buffers.
//!
//! The set of layouts is closed: `Vertex2D`, `Vertex3D` and `SkinnedVertex3D`.
//! Each one is `#[repr(C)]` + `Pod` so meshes can be written into staging
//! memory with `bytemuck::cast_slice`.

use bytemuck::{Pod, Zeroable};
use glam::{Mat3, Mat4, Vec3};
use crate::graphics_device::{VertexLayout, VertexAttribute, BufferFormat};
use crate::import::{ImportedVertex, MAX_BONE_INFLUENCES};

// ============================================================================
// LAYOUT TAG
// ============================================================================

/// Identifies a vertex layout group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VertexLayoutTag {
    Vertex2D,
    Vertex3D,
    SkinnedVertex3D,
}

impl VertexLayoutTag {
    pub const ALL: [VertexLayoutTag; 3] = [
        VertexLayoutTag::Vertex2D,
        VertexLayoutTag::Vertex3D,
        VertexLayoutTag::SkinnedVertex3D,
    ];

    /// Dense index, used to address per-layout tables
    pub fn index(&self) -> usize {
        match self {
            VertexLayoutTag::Vertex2D => 0,
            VertexLayoutTag::Vertex3D => 1,
            VertexLayoutTag::SkinnedVertex3D => 2,
        }
    }

    pub fn is_skinned(&self) -> bool {
        matches!(self, VertexLayoutTag::SkinnedVertex3D)
    }

    /// Vertex layout of this group
    pub fn layout(&self) -> VertexLayout {
        match self {
            VertexLayoutTag::Vertex2D => Vertex2D::layout(),
            VertexLayoutTag::Vertex3D => Vertex3D::layout(),
            VertexLayoutTag::SkinnedVertex3D => SkinnedVertex3D::layout(),
        }
    }
}

// ============================================================================
// VERTEX FORMAT TRAIT
// ============================================================================

/// Packed vertex type
pub trait VertexFormat: Pod + Send + Sync {
    /// Layout group this vertex belongs to
    const TAG: VertexLayoutTag;

    /// Size of one vertex in bytes
    fn byte_size() -> usize {
        std::mem::size_of::<Self>()
    }

    /// Attribute description for pipeline creation
    fn layout() -> VertexLayout;

    /// Build a packed vertex from an imported one
    ///
    /// `bind` is the mesh bind transform. Static layouts bake it into the
    /// vertex; the skinned layout ignores it.
    fn convert(vertex: &ImportedVertex, bind: &Mat4) -> Self;
}

fn attribute(location: u32, format: BufferFormat, offset: u32) -> VertexAttribute {
    VertexAttribute { location, format, offset }
}

/// Transform a normal by the linear part of `bind` and renormalize
fn transform_normal(bind: &Mat4, normal: Vec3) -> Vec3 {
    let transformed = Mat3::from_mat4(*bind) * normal;
    transformed.try_normalize().unwrap_or(normal)
}

// ============================================================================
// VERTEX 2D
// ============================================================================

/// Screen-space or sprite vertex
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct Vertex2D {
    pub position: [f32; 2],
    pub uv: [f32; 2],
}

impl VertexFormat for Vertex2D {
    const TAG: VertexLayoutTag = VertexLayoutTag::Vertex2D;

    fn layout() -> VertexLayout {
        VertexLayout {
            stride: Self::byte_size() as u32,
            attributes: vec![
                attribute(0, BufferFormat::R32G32_SFLOAT, 0),
                attribute(1, BufferFormat::R32G32_SFLOAT, 8),
            ],
        }
    }

    fn convert(vertex: &ImportedVertex, bind: &Mat4) -> Self {
        let position = bind.transform_point3(vertex.position);
        Self {
            position: [position.x, position.y],
            uv: vertex.uv.to_array(),
        }
    }
}

// ============================================================================
// VERTEX 3D
// ============================================================================

/// Static mesh vertex
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct Vertex3D {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

impl VertexFormat for Vertex3D {
    const TAG: VertexLayoutTag = VertexLayoutTag::Vertex3D;

    fn layout() -> VertexLayout {
        VertexLayout {
            stride: Self::byte_size() as u32,
            attributes: vec![
                attribute(0, BufferFormat::R32G32B32_SFLOAT, 0),
                attribute(1, BufferFormat::R32G32B32_SFLOAT, 12),
                attribute(2, BufferFormat::R32G32_SFLOAT, 24),
            ],
        }
    }

    fn convert(vertex: &ImportedVertex, bind: &Mat4) -> Self {
        Self {
            position: bind.transform_point3(vertex.position).to_array(),
            normal: transform_normal(bind, vertex.normal).to_array(),
            uv: vertex.uv.to_array(),
        }
    }
}

// ============================================================================
// SKINNED VERTEX 3D
// ============================================================================

/// Skinned mesh vertex with up to four bone influences
///
/// Unused influence slots have bone id 0 and weight 0.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct SkinnedVertex3D {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
    pub bone_ids: [u32; MAX_BONE_INFLUENCES],
    pub weights: [f32; MAX_BONE_INFLUENCES],
}

impl VertexFormat for SkinnedVertex3D {
    const TAG: VertexLayoutTag = VertexLayoutTag::SkinnedVertex3D;

    fn layout() -> VertexLayout {
        VertexLayout {
            stride: Self::byte_size() as u32,
            attributes: vec![
                attribute(0, BufferFormat::R32G32B32_SFLOAT, 0),
                attribute(1, BufferFormat::R32G32B32_SFLOAT, 12),
                attribute(2, BufferFormat::R32G32_SFLOAT, 24),
                attribute(3, BufferFormat::R32G32B32A32_UINT, 32),
                attribute(4, BufferFormat::R32G32B32A32_SFLOAT, 48),
            ],
        }
    }

    fn convert(vertex: &ImportedVertex, _bind: &Mat4) -> Self {
        let mut bone_ids = [0u32; MAX_BONE_INFLUENCES];
        let mut weights = [0f32; MAX_BONE_INFLUENCES];
        for (slot, influence) in vertex.influences.iter().take(MAX_BONE_INFLUENCES).enumerate() {
            bone_ids[slot] = influence.bone;
            weights[slot] = influence.weight;
        }
        Self {
            position: vertex.position.to_array(),
            normal: vertex.normal.to_array(),
            uv: vertex.uv.to_array(),
            bone_ids,
            weights,
        }
    }
}

/// Whether packing this vertex into `V` drops influences
pub fn truncates_influences<V: VertexFormat>(vertex: &ImportedVertex) -> bool {
    V::TAG.is_skinned() && vertex.influences.len() > MAX_BONE_INFLUENCES
}

#[cfg(test)]
#[path = "vertex_format_tests.rs"]
mod tests;
