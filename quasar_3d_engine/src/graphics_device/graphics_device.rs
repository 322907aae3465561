/// GraphicsDevice trait - device boundary used by resource pools
///
/// Backends (Vulkan, mock) create buffers and textures and execute recorded
/// transfer batches. Window, swapchain and pipeline management live outside
/// this boundary.

use std::sync::Arc;
use crate::error::Result;
use crate::graphics_device::{
    Buffer, BufferDesc, Texture, TextureDesc, TextureFormat, FormatFeatures, TransferBatch,
};

/// Device boundary trait
///
/// All creation methods take `&mut self`: a pool commits through exclusive
/// access to the device.
pub trait GraphicsDevice: Send + Sync {
    /// Create a buffer
    ///
    /// Staging and uniform buffers are host-visible; vertex and index
    /// buffers are device-local transfer destinations.
    ///
    /// # Returns
    ///
    /// A shared pointer to the created buffer, or `Error::OutOfMemory`
    fn create_buffer(&mut self, desc: BufferDesc) -> Result<Arc<dyn Buffer>>;

    /// Create a sampled 2D texture with `desc.mip_levels` levels
    ///
    /// The texture starts in `ImageLayout::Undefined`; its content is
    /// provided by a later transfer batch.
    fn create_texture(&mut self, desc: TextureDesc) -> Result<Arc<dyn Texture>>;

    /// Query the optimal-tiling features of a texture format
    fn format_features(&self, format: TextureFormat) -> FormatFeatures;

    /// Record, submit and wait for a transfer batch
    ///
    /// Returns once every command of the batch has completed on the device.
    fn submit_transfer(&mut self, batch: &TransferBatch) -> Result<()>;

    /// Wait for the device to be idle
    fn wait_idle(&self) -> Result<()>;
}
