/*!
# Quasar 3D Engine - Vulkan Device Backend

Vulkan implementation of the `GraphicsDevice` boundary of the Quasar 3D engine.

This crate wraps a logical device created by the application, using the Ash
library for Vulkan bindings and gpu-allocator for memory management. It
creates staging, vertex, index and uniform buffers, creates sampled
textures, and executes transfer batches (buffer copies, layout barriers,
linear mip blits) on a graphics-capable queue.
*/

// Vulkan implementation modules
mod vulkan_context;
mod vulkan_device;
mod vulkan_buffer;
mod vulkan_texture;
mod vulkan_format;
mod vulkan_transfer;

pub use vulkan_device::{VulkanGraphicsDevice, VulkanDeviceConfig};
pub use vulkan_buffer::Buffer as VulkanBuffer;
pub use vulkan_texture::Texture as VulkanTexture;

/// Namespace mirroring `quasar_3d_engine::quasar3d`
pub mod quasar3d {
    pub use crate::vulkan_device::{VulkanGraphicsDevice, VulkanDeviceConfig};
    pub use crate::vulkan_buffer::Buffer as VulkanBuffer;
    pub use crate::vulkan_texture::Texture as VulkanTexture;
}
