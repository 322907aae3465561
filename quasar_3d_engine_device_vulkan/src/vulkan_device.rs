/// VulkanGraphicsDevice - Vulkan implementation of the GraphicsDevice trait

use quasar_3d_engine::quasar3d::{Result, Error};
use quasar_3d_engine::quasar3d::device::{
    GraphicsDevice, Buffer as DeviceBuffer, BufferDesc, Texture as DeviceTexture, TextureDesc,
    TextureFormat, TextureInfo, FormatFeatures, TransferBatch,
};
use quasar_3d_engine::{engine_debug, engine_error, engine_err, engine_info};
use ash::vk;
use gpu_allocator::vulkan::{
    Allocation, AllocationCreateDesc, AllocationScheme, Allocator, AllocatorCreateDesc,
};
use gpu_allocator::{AllocationSizes, AllocatorDebugSettings};
use rustc_hash::FxHashMap;
use std::sync::Arc;

use crate::vulkan_buffer::Buffer;
use crate::vulkan_context::GpuContext;
use crate::vulkan_format::{
    buffer_usage_to_vk, color_range, format_features_from_vk, texture_format_to_vk,
};
use crate::vulkan_texture::Texture;
use crate::vulkan_transfer;

/// Every texture format the engine can request
const TEXTURE_FORMATS: [TextureFormat; 2] = [TextureFormat::R8G8B8A8_SRGB, TextureFormat::R8G8B8A8_UNORM];

/// Vulkan device configuration
#[derive(Debug, Clone)]
pub struct VulkanDeviceConfig {
    /// Report allocations still alive when the allocator is dropped
    pub log_leaks_on_shutdown: bool,
    /// Log every allocation and free
    pub log_allocations: bool,
}

impl Default for VulkanDeviceConfig {
    fn default() -> Self {
        Self {
            log_leaks_on_shutdown: true,
            log_allocations: false,
        }
    }
}

/// Vulkan device boundary
///
/// Wraps a logical device created by the application. The device owns its
/// allocator and upload command pool; the `ash::Device` and `ash::Instance`
/// stay owned by the caller and must outlive every resource created here.
pub struct VulkanGraphicsDevice {
    /// Shared context, also held by every buffer and texture
    ctx: Arc<GpuContext>,
    /// Optimal-tiling features per texture format, queried once
    format_features: FxHashMap<TextureFormat, FormatFeatures>,
}

impl VulkanGraphicsDevice {
    /// Wrap an existing logical device
    ///
    /// # Arguments
    ///
    /// * `instance` - Instance the device was created from
    /// * `physical_device` - Physical device backing `device`
    /// * `device` - Logical device
    /// * `queue_family` - Family of a graphics-capable queue (blits need one)
    /// * `config` - Allocator settings
    ///
    /// # Errors
    ///
    /// Returns `Error::InitializationFailed` if the allocator or the command
    /// pool cannot be created.
    pub fn new(
        instance: &ash::Instance,
        physical_device: vk::PhysicalDevice,
        device: ash::Device,
        queue_family: u32,
        config: VulkanDeviceConfig,
    ) -> Result<Self> {
        unsafe {
            let queue = device.get_device_queue(queue_family, 0);

            let allocator = Allocator::new(&AllocatorCreateDesc {
                instance: instance.clone(),
                device: device.clone(),
                physical_device,
                debug_settings: AllocatorDebugSettings {
                    log_leaks_on_shutdown: config.log_leaks_on_shutdown,
                    log_allocations: config.log_allocations,
                    log_frees: config.log_allocations,
                    ..Default::default()
                },
                buffer_device_address: false,
                allocation_sizes: AllocationSizes::default(),
            })
            .map_err(|e| {
                engine_error!("quasar3d::vulkan", "Failed to create GPU allocator: {:?}", e);
                Error::InitializationFailed(format!("Failed to create GPU allocator: {:?}", e))
            })?;

            let pool_create_info = vk::CommandPoolCreateInfo::default()
                .queue_family_index(queue_family)
                .flags(vk::CommandPoolCreateFlags::TRANSIENT | vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER);

            let upload_command_pool = device.create_command_pool(&pool_create_info, None)
                .map_err(|e| {
                    engine_error!("quasar3d::vulkan", "Failed to create upload command pool: {:?}", e);
                    Error::InitializationFailed(format!("Failed to create upload command pool: {:?}", e))
                })?;

            let mut format_features = FxHashMap::default();
            for format in TEXTURE_FORMATS {
                let properties = instance.get_physical_device_format_properties(
                    physical_device,
                    texture_format_to_vk(format),
                );
                let features = format_features_from_vk(properties.optimal_tiling_features);
                engine_debug!("quasar3d::vulkan", "Format {:?}: {:?}", format, features);
                format_features.insert(format, features);
            }

            let ctx = Arc::new(GpuContext::new(device, allocator, queue, queue_family, upload_command_pool));

            engine_info!("quasar3d::vulkan", "Vulkan graphics device ready (queue family {})", queue_family);

            Ok(Self { ctx, format_features })
        }
    }

    /// Logical device this boundary records into
    pub fn device(&self) -> &ash::Device {
        &self.ctx.device
    }

    fn allocate(&self, name: &str, requirements: vk::MemoryRequirements, location: gpu_allocator::MemoryLocation, linear: bool) -> Result<Allocation> {
        let mut allocator = self.ctx.allocator.lock()
            .map_err(|_| engine_err!("quasar3d::vulkan", "Allocator lock poisoned"))?;
        allocator.allocate(&AllocationCreateDesc {
            name,
            requirements,
            location,
            linear,
            allocation_scheme: AllocationScheme::GpuAllocatorManaged,
        })
        .map_err(|e| {
            let size_mb = requirements.size as f64 / (1024.0 * 1024.0);
            engine_error!("quasar3d::vulkan", "Out of GPU memory for {} ({:.2} MB): {:?}", name, size_mb, e);
            Error::OutOfMemory
        })
    }

    fn free(&self, allocation: Allocation) {
        if let Ok(mut allocator) = self.ctx.allocator.lock() {
            allocator.free(allocation).ok();
        }
    }
}

impl GraphicsDevice for VulkanGraphicsDevice {
    fn create_buffer(&mut self, desc: BufferDesc) -> Result<Arc<dyn DeviceBuffer>> {
        let (usage, location) = buffer_usage_to_vk(desc.usage);
        let device = &self.ctx.device;

        unsafe {
            let buffer_create_info = vk::BufferCreateInfo::default()
                .size(desc.size.max(1))
                .usage(usage)
                .sharing_mode(vk::SharingMode::EXCLUSIVE);

            let buffer = device.create_buffer(&buffer_create_info, None)
                .map_err(|e| engine_err!("quasar3d::vulkan", "Failed to create buffer of size {} bytes: {:?}", desc.size, e))?;

            let requirements = device.get_buffer_memory_requirements(buffer);

            let allocation = match self.allocate("buffer", requirements, location, true) {
                Ok(allocation) => allocation,
                Err(e) => {
                    device.destroy_buffer(buffer, None);
                    return Err(e);
                }
            };

            if let Err(e) = device.bind_buffer_memory(buffer, allocation.memory(), allocation.offset()) {
                self.free(allocation);
                device.destroy_buffer(buffer, None);
                return Err(engine_err!("quasar3d::vulkan", "Failed to bind buffer memory: {:?}", e));
            }

            Ok(Arc::new(Buffer::new(
                Arc::clone(&self.ctx),
                buffer,
                allocation,
                desc.size,
                desc.usage,
            )))
        }
    }

    fn create_texture(&mut self, desc: TextureDesc) -> Result<Arc<dyn DeviceTexture>> {
        let format = texture_format_to_vk(desc.format);
        let mip_levels = desc.mip_levels.max(1);
        let device = &self.ctx.device;

        // Mip chains read their own levels back through blits
        let mut usage = vk::ImageUsageFlags::SAMPLED | vk::ImageUsageFlags::TRANSFER_DST;
        if mip_levels > 1 {
            usage |= vk::ImageUsageFlags::TRANSFER_SRC;
        }

        unsafe {
            let image_create_info = vk::ImageCreateInfo::default()
                .image_type(vk::ImageType::TYPE_2D)
                .format(format)
                .extent(vk::Extent3D {
                    width: desc.width,
                    height: desc.height,
                    depth: 1,
                })
                .mip_levels(mip_levels)
                .array_layers(1)
                .samples(vk::SampleCountFlags::TYPE_1)
                .tiling(vk::ImageTiling::OPTIMAL)
                .usage(usage)
                .sharing_mode(vk::SharingMode::EXCLUSIVE)
                .initial_layout(vk::ImageLayout::UNDEFINED);

            let image = device.create_image(&image_create_info, None)
                .map_err(|e| engine_err!("quasar3d::vulkan", "Failed to create texture image: {:?}", e))?;

            let requirements = device.get_image_memory_requirements(image);

            let allocation = match self.allocate("texture", requirements, gpu_allocator::MemoryLocation::GpuOnly, false) {
                Ok(allocation) => allocation,
                Err(e) => {
                    device.destroy_image(image, None);
                    return Err(e);
                }
            };

            if let Err(e) = device.bind_image_memory(image, allocation.memory(), allocation.offset()) {
                self.free(allocation);
                device.destroy_image(image, None);
                return Err(engine_err!("quasar3d::vulkan", "Failed to bind texture image memory: {:?}", e));
            }

            let view_create_info = vk::ImageViewCreateInfo::default()
                .image(image)
                .view_type(vk::ImageViewType::TYPE_2D)
                .format(format)
                .components(vk::ComponentMapping {
                    r: vk::ComponentSwizzle::IDENTITY,
                    g: vk::ComponentSwizzle::IDENTITY,
                    b: vk::ComponentSwizzle::IDENTITY,
                    a: vk::ComponentSwizzle::IDENTITY,
                })
                .subresource_range(color_range(0, mip_levels));

            let view = match device.create_image_view(&view_create_info, None) {
                Ok(view) => view,
                Err(e) => {
                    self.free(allocation);
                    device.destroy_image(image, None);
                    return Err(engine_err!("quasar3d::vulkan", "Failed to create texture image view: {:?}", e));
                }
            };

            Ok(Arc::new(Texture::new(
                Arc::clone(&self.ctx),
                image,
                view,
                allocation,
                TextureInfo {
                    width: desc.width,
                    height: desc.height,
                    format: desc.format,
                    mip_levels,
                },
            )))
        }
    }

    fn format_features(&self, format: TextureFormat) -> FormatFeatures {
        self.format_features.get(&format).copied().unwrap_or(FormatFeatures::empty())
    }

    fn submit_transfer(&mut self, batch: &TransferBatch) -> Result<()> {
        if batch.is_empty() {
            return Ok(());
        }
        vulkan_transfer::submit_and_wait(&self.ctx, batch)
    }

    fn wait_idle(&self) -> Result<()> {
        unsafe {
            self.ctx.device
                .device_wait_idle()
                .map_err(|e| engine_err!("quasar3d::vulkan", "Failed to wait idle: {:?}", e))
        }
    }
}

impl Drop for VulkanGraphicsDevice {
    fn drop(&mut self) {
        // GpuContext tears down the allocator and the command pool once the
        // last resource holding it is gone
        engine_debug!("quasar3d::vulkan", "Vulkan graphics device dropped ({} live references to the context)",
            Arc::strong_count(&self.ctx) - 1);
    }
}
