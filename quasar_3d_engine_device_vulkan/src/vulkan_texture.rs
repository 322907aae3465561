/// Texture - Vulkan implementation of the Texture trait

use quasar_3d_engine::quasar3d::device::{Texture as DeviceTexture, TextureInfo};
use ash::vk::{self, Handle};
use gpu_allocator::vulkan::Allocation;
use std::sync::Arc;

use crate::vulkan_context::GpuContext;

/// Vulkan texture implementation
pub struct Texture {
    /// Shared GPU context (device, allocator)
    ctx: Arc<GpuContext>,
    /// Vulkan image
    pub(crate) image: vk::Image,
    /// Vulkan image view covering every mip level
    pub(crate) view: vk::ImageView,
    /// GPU memory allocation
    pub(crate) allocation: Option<Allocation>,
    /// Read-only texture properties
    pub(crate) info: TextureInfo,
}

impl Texture {
    pub fn new(
        ctx: Arc<GpuContext>,
        image: vk::Image,
        view: vk::ImageView,
        allocation: Allocation,
        info: TextureInfo,
    ) -> Self {
        Self {
            ctx,
            image,
            view,
            allocation: Some(allocation),
            info,
        }
    }

    /// Image view for descriptor writes
    pub fn view(&self) -> vk::ImageView {
        self.view
    }
}

impl DeviceTexture for Texture {
    fn info(&self) -> &TextureInfo {
        &self.info
    }

    fn native_handle(&self) -> u64 {
        self.image.as_raw()
    }
}

impl Drop for Texture {
    fn drop(&mut self) {
        unsafe {
            // Destroy image view
            self.ctx.device.destroy_image_view(self.view, None);

            // Free GPU memory
            if let Some(allocation) = self.allocation.take() {
                if let Ok(mut allocator) = self.ctx.allocator.lock() {
                    allocator.free(allocation).ok();
                }
            }

            // Destroy image
            self.ctx.device.destroy_image(self.image, None);
        }
    }
}
