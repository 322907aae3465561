/// GpuContext - Shared GPU resources for all Vulkan objects
///
/// Contains everything the device boundary needs:
/// - Device for Vulkan API calls
/// - Allocator for memory management
/// - Queue for transfer submission
/// - Command pool for one-shot transfer batches

use ash::vk;
use gpu_allocator::vulkan::Allocator;
use std::mem::ManuallyDrop;
use std::sync::Mutex;

/// Shared GPU context for all Vulkan resources.
///
/// Shared (via `Arc`) by every buffer and texture so each of them can free
/// its allocation on drop. The logical device and instance belong to the
/// application and are never destroyed here.
pub struct GpuContext {
    /// Vulkan logical device
    pub device: ash::Device,

    /// GPU memory allocator
    /// Wrapped in ManuallyDrop so its memory pages are released before the
    /// command pool, while the device is still alive
    pub allocator: ManuallyDrop<Mutex<Allocator>>,

    /// Queue used for transfer batches (graphics-capable, so blits are allowed)
    pub queue: vk::Queue,

    /// Queue family index of `queue`
    pub queue_family: u32,

    /// Reusable command pool for one-shot transfer batches
    /// (created with TRANSIENT + RESET_COMMAND_BUFFER flags)
    pub upload_command_pool: Mutex<vk::CommandPool>,
}

impl GpuContext {
    /// Create a new GPU context
    ///
    /// # Arguments
    ///
    /// * `device` - Vulkan logical device
    /// * `allocator` - GPU memory allocator
    /// * `queue` - Queue for transfer submission
    /// * `queue_family` - Queue family index
    /// * `upload_command_pool` - Command pool for transfer batches
    pub fn new(
        device: ash::Device,
        allocator: Allocator,
        queue: vk::Queue,
        queue_family: u32,
        upload_command_pool: vk::CommandPool,
    ) -> Self {
        Self {
            device,
            allocator: ManuallyDrop::new(Mutex::new(allocator)),
            queue,
            queue_family,
            upload_command_pool: Mutex::new(upload_command_pool),
        }
    }
}

impl Drop for GpuContext {
    fn drop(&mut self) {
        unsafe {
            // Runs after the last buffer/texture released its Arc
            self.device.device_wait_idle().ok();

            ManuallyDrop::drop(&mut self.allocator);

            if let Ok(pool) = self.upload_command_pool.get_mut() {
                if *pool != vk::CommandPool::null() {
                    self.device.destroy_command_pool(*pool, None);
                    *pool = vk::CommandPool::null();
                }
            }
        }
    }
}
