/// Buffer trait, buffer descriptor, and vertex attribute formats

use crate::error::Result;

/// Buffer usage flags
///
/// The usage also selects the memory location: staging and uniform buffers
/// are CPU-visible, vertex and index buffers are device-resident and only
/// reachable through transfer copies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferUsage {
    /// CPU-visible transfer source, released after commit
    Staging,
    /// Device-resident vertex buffer (transfer destination)
    Vertex,
    /// Device-resident index buffer (transfer destination)
    Index,
    /// CPU-visible uniform buffer (per-frame bone matrices)
    Uniform,
}

impl BufferUsage {
    /// Whether buffers of this usage can be written through `Buffer::update`
    pub fn is_host_visible(&self) -> bool {
        matches!(self, BufferUsage::Staging | BufferUsage::Uniform)
    }
}

/// Descriptor for creating a buffer
#[derive(Debug, Clone)]
pub struct BufferDesc {
    /// Size in bytes
    pub size: u64,
    /// Buffer usage
    pub usage: BufferUsage,
}

/// Buffer data format for vertex attributes
///
/// Defines the data type and component count of one vertex attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(non_camel_case_types)]
pub enum BufferFormat {
    R32_SFLOAT,
    R32G32_SFLOAT,
    R32G32B32_SFLOAT,
    R32G32B32A32_SFLOAT,
    R32G32B32A32_UINT,
}

impl BufferFormat {
    /// Returns size in bytes for this format
    pub fn size_bytes(&self) -> u32 {
        match self {
            BufferFormat::R32_SFLOAT => 4,
            BufferFormat::R32G32_SFLOAT => 8,
            BufferFormat::R32G32B32_SFLOAT => 12,
            BufferFormat::R32G32B32A32_SFLOAT | BufferFormat::R32G32B32A32_UINT => 16,
        }
    }
}

/// One attribute inside an interleaved vertex
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexAttribute {
    /// Shader input location
    pub location: u32,
    /// Attribute data format
    pub format: BufferFormat,
    /// Byte offset inside the vertex
    pub offset: u32,
}

/// Interleaved vertex layout (single binding)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VertexLayout {
    /// Size of one vertex in bytes
    pub stride: u32,
    /// Attributes in location order
    pub attributes: Vec<VertexAttribute>,
}

/// Buffer resource trait
///
/// Implemented by backend-specific buffer types (e.g., VulkanBuffer).
/// The buffer is automatically destroyed when dropped.
pub trait Buffer: Send + Sync {
    /// Size of the buffer in bytes
    fn size(&self) -> u64;

    /// Usage the buffer was created with
    fn usage(&self) -> BufferUsage;

    /// Update buffer data
    ///
    /// Only valid for host-visible buffers (staging, uniform).
    ///
    /// # Arguments
    ///
    /// * `offset` - Offset into the buffer in bytes
    /// * `data` - Data to write
    fn update(&self, offset: u64, data: &[u8]) -> Result<()>;

    /// Backend object handle, used to reference the buffer inside transfer batches
    fn native_handle(&self) -> u64;
}

#[cfg(test)]
#[path = "buffer_tests.rs"]
mod tests;
