/// Buffer - Vulkan implementation of the Buffer trait

use quasar_3d_engine::quasar3d::{
    Result,
    Error,
    device::{Buffer as DeviceBuffer, BufferUsage},
};
use quasar_3d_engine::engine_error;
use ash::vk::{self, Handle};
use gpu_allocator::vulkan::Allocation;
use std::sync::Arc;

use crate::vulkan_context::GpuContext;

/// Vulkan buffer implementation
pub struct Buffer {
    /// Shared GPU context (device, allocator, queue, command pool)
    ctx: Arc<GpuContext>,
    /// Vulkan buffer
    pub(crate) buffer: vk::Buffer,
    /// GPU memory allocation
    pub(crate) allocation: Option<Allocation>,
    /// Buffer size
    pub(crate) size: u64,
    /// Usage the buffer was created with
    pub(crate) usage: BufferUsage,
}

impl Buffer {
    /// Create a new Vulkan buffer
    pub fn new(
        ctx: Arc<GpuContext>,
        buffer: vk::Buffer,
        allocation: Allocation,
        size: u64,
        usage: BufferUsage,
    ) -> Self {
        Self {
            ctx,
            buffer,
            allocation: Some(allocation),
            size,
            usage,
        }
    }
}

impl DeviceBuffer for Buffer {
    fn size(&self) -> u64 {
        self.size
    }

    fn usage(&self) -> BufferUsage {
        self.usage
    }

    fn update(&self, offset: u64, data: &[u8]) -> Result<()> {
        let end = offset.checked_add(data.len() as u64);
        if end.map_or(true, |end| end > self.size) {
            let message = format!(
                "Buffer update out of range (offset {}, {} bytes, buffer size {})",
                offset, data.len(), self.size
            );
            engine_error!("quasar3d::vulkan", "{}", message);
            return Err(Error::InvalidResource(message));
        }

        let Some(allocation) = &self.allocation else {
            engine_error!("quasar3d::vulkan", "Buffer update failed: no GPU allocation");
            return Err(Error::BackendError("Buffer has no allocation".to_string()));
        };

        // Device-local vertex/index buffers have no mapping
        let mapped_ptr = allocation
            .mapped_ptr()
            .ok_or_else(|| {
                engine_error!("quasar3d::vulkan", "Buffer update failed: {:?} buffer is not CPU-accessible", self.usage);
                Error::BackendError("Buffer is not CPU-accessible".to_string())
            })?
            .as_ptr() as *mut u8;

        unsafe {
            std::ptr::copy_nonoverlapping(
                data.as_ptr(),
                mapped_ptr.add(offset as usize),
                data.len(),
            );
        }
        Ok(())
    }

    fn native_handle(&self) -> u64 {
        self.buffer.as_raw()
    }
}

impl Drop for Buffer {
    fn drop(&mut self) {
        unsafe {
            // Free GPU memory
            if let Some(allocation) = self.allocation.take() {
                // Don't panic if lock fails - we still need to destroy the buffer
                if let Ok(mut allocator) = self.ctx.allocator.lock() {
                    allocator.free(allocation).ok();
                }
            }

            // Destroy buffer
            self.ctx.device.destroy_buffer(self.buffer, None);
        }
    }
}
