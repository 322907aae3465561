/// Conversions between engine device types and Vulkan types

use ash::vk;
use gpu_allocator::MemoryLocation;
use quasar_3d_engine::quasar3d::device::{BufferUsage, FormatFeatures, ImageLayout, TextureFormat};

/// Convert TextureFormat to Vulkan format
pub(crate) fn texture_format_to_vk(format: TextureFormat) -> vk::Format {
    match format {
        TextureFormat::R8G8B8A8_SRGB => vk::Format::R8G8B8A8_SRGB,
        TextureFormat::R8G8B8A8_UNORM => vk::Format::R8G8B8A8_UNORM,
    }
}

/// Convert ImageLayout to Vulkan layout
pub(crate) fn image_layout_to_vk(layout: ImageLayout) -> vk::ImageLayout {
    match layout {
        ImageLayout::Undefined => vk::ImageLayout::UNDEFINED,
        ImageLayout::TransferDst => vk::ImageLayout::TRANSFER_DST_OPTIMAL,
        ImageLayout::TransferSrc => vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
        ImageLayout::ShaderReadOnly => vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
    }
}

/// Access mask and pipeline stage on one side of a layout transition
pub(crate) fn layout_access_and_stage(layout: ImageLayout) -> (vk::AccessFlags, vk::PipelineStageFlags) {
    match layout {
        ImageLayout::Undefined => (vk::AccessFlags::empty(), vk::PipelineStageFlags::TOP_OF_PIPE),
        ImageLayout::TransferDst => (vk::AccessFlags::TRANSFER_WRITE, vk::PipelineStageFlags::TRANSFER),
        ImageLayout::TransferSrc => (vk::AccessFlags::TRANSFER_READ, vk::PipelineStageFlags::TRANSFER),
        ImageLayout::ShaderReadOnly => (vk::AccessFlags::SHADER_READ, vk::PipelineStageFlags::FRAGMENT_SHADER),
    }
}

/// Vulkan usage flags and memory location for a buffer usage
///
/// Host-visible usages map to `CpuToGpu`, the rest stay `GpuOnly` and are
/// filled through transfer copies.
pub(crate) fn buffer_usage_to_vk(usage: BufferUsage) -> (vk::BufferUsageFlags, MemoryLocation) {
    match usage {
        BufferUsage::Staging => (vk::BufferUsageFlags::TRANSFER_SRC, MemoryLocation::CpuToGpu),
        BufferUsage::Uniform => (vk::BufferUsageFlags::UNIFORM_BUFFER, MemoryLocation::CpuToGpu),
        BufferUsage::Vertex => (
            vk::BufferUsageFlags::VERTEX_BUFFER | vk::BufferUsageFlags::TRANSFER_DST,
            MemoryLocation::GpuOnly,
        ),
        BufferUsage::Index => (
            vk::BufferUsageFlags::INDEX_BUFFER | vk::BufferUsageFlags::TRANSFER_DST,
            MemoryLocation::GpuOnly,
        ),
    }
}

/// Keep the format features the engine cares about
pub(crate) fn format_features_from_vk(flags: vk::FormatFeatureFlags) -> FormatFeatures {
    let mut features = FormatFeatures::empty();
    if flags.contains(vk::FormatFeatureFlags::SAMPLED_IMAGE_FILTER_LINEAR) {
        features |= FormatFeatures::SAMPLED_IMAGE_FILTER_LINEAR;
    }
    if flags.contains(vk::FormatFeatureFlags::BLIT_SRC) {
        features |= FormatFeatures::BLIT_SRC;
    }
    if flags.contains(vk::FormatFeatureFlags::BLIT_DST) {
        features |= FormatFeatures::BLIT_DST;
    }
    features
}

/// Color subresource range covering `mip_count` levels from `base_mip`
pub(crate) fn color_range(base_mip: u32, mip_count: u32) -> vk::ImageSubresourceRange {
    vk::ImageSubresourceRange {
        aspect_mask: vk::ImageAspectFlags::COLOR,
        base_mip_level: base_mip,
        level_count: mip_count,
        base_array_layer: 0,
        layer_count: 1,
    }
}

#[cfg(test)]
#[path = "vulkan_format_tests.rs"]
mod tests;
