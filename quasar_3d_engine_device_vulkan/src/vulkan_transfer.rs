/// Transfer batch recording and one-shot submission

use ash::vk::{self, Handle};
use quasar_3d_engine::quasar3d::Result;
use quasar_3d_engine::quasar3d::device::{TransferBatch, TransferCommand};
use quasar_3d_engine::{engine_err, engine_trace};

use crate::vulkan_context::GpuContext;
use crate::vulkan_format::{color_range, image_layout_to_vk, layout_access_and_stage};

/// Record every command of `batch` into `command_buffer`
///
/// Buffers and images are resolved from their native handles, which the
/// Vulkan resources report as raw `VkBuffer` / `VkImage` values.
pub(crate) unsafe fn record_batch(
    device: &ash::Device,
    command_buffer: vk::CommandBuffer,
    batch: &TransferBatch,
) {
    for command in batch.commands() {
        match command {
            TransferCommand::CopyBuffer { src, src_offset, dst, dst_offset, size } => {
                let region = vk::BufferCopy {
                    src_offset: *src_offset,
                    dst_offset: *dst_offset,
                    size: *size,
                };
                device.cmd_copy_buffer(
                    command_buffer,
                    vk::Buffer::from_raw(src.native_handle()),
                    vk::Buffer::from_raw(dst.native_handle()),
                    &[region],
                );
            }
            TransferCommand::CopyBufferToImage { src, src_offset, dst } => {
                let info = dst.info();
                // Tightly packed rows: row length and image height left at 0
                let region = vk::BufferImageCopy::default()
                    .buffer_offset(*src_offset)
                    .buffer_row_length(0)
                    .buffer_image_height(0)
                    .image_subresource(vk::ImageSubresourceLayers {
                        aspect_mask: vk::ImageAspectFlags::COLOR,
                        mip_level: 0,
                        base_array_layer: 0,
                        layer_count: 1,
                    })
                    .image_offset(vk::Offset3D { x: 0, y: 0, z: 0 })
                    .image_extent(vk::Extent3D {
                        width: info.width,
                        height: info.height,
                        depth: 1,
                    });
                device.cmd_copy_buffer_to_image(
                    command_buffer,
                    vk::Buffer::from_raw(src.native_handle()),
                    vk::Image::from_raw(dst.native_handle()),
                    vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                    &[region],
                );
            }
            TransferCommand::ImageBarrier { texture, base_mip, mip_count, old_layout, new_layout } => {
                let (src_access, src_stage) = layout_access_and_stage(*old_layout);
                let (dst_access, dst_stage) = layout_access_and_stage(*new_layout);
                let barrier = vk::ImageMemoryBarrier::default()
                    .old_layout(image_layout_to_vk(*old_layout))
                    .new_layout(image_layout_to_vk(*new_layout))
                    .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
                    .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
                    .image(vk::Image::from_raw(texture.native_handle()))
                    .subresource_range(color_range(*base_mip, *mip_count))
                    .src_access_mask(src_access)
                    .dst_access_mask(dst_access);
                device.cmd_pipeline_barrier(
                    command_buffer,
                    src_stage,
                    dst_stage,
                    vk::DependencyFlags::empty(),
                    &[],
                    &[],
                    &[barrier],
                );
            }
            TransferCommand::BlitMip { texture, src_mip, dst_mip, src_extent, dst_extent } => {
                let image = vk::Image::from_raw(texture.native_handle());
                let blit = vk::ImageBlit::default()
                    .src_subresource(vk::ImageSubresourceLayers {
                        aspect_mask: vk::ImageAspectFlags::COLOR,
                        mip_level: *src_mip,
                        base_array_layer: 0,
                        layer_count: 1,
                    })
                    .src_offsets([
                        vk::Offset3D { x: 0, y: 0, z: 0 },
                        vk::Offset3D { x: src_extent.0 as i32, y: src_extent.1 as i32, z: 1 },
                    ])
                    .dst_subresource(vk::ImageSubresourceLayers {
                        aspect_mask: vk::ImageAspectFlags::COLOR,
                        mip_level: *dst_mip,
                        base_array_layer: 0,
                        layer_count: 1,
                    })
                    .dst_offsets([
                        vk::Offset3D { x: 0, y: 0, z: 0 },
                        vk::Offset3D { x: dst_extent.0 as i32, y: dst_extent.1 as i32, z: 1 },
                    ]);
                device.cmd_blit_image(
                    command_buffer,
                    image,
                    vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
                    image,
                    vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                    &[blit],
                    vk::Filter::LINEAR,
                );
            }
        }
    }
}

/// Record `batch` into a one-shot command buffer, submit it and wait
///
/// The command buffer comes from the context's upload pool and is freed
/// before returning, on success and on failure alike.
pub(crate) fn submit_and_wait(ctx: &GpuContext, batch: &TransferBatch) -> Result<()> {
    let pool = ctx.upload_command_pool.lock()
        .map_err(|_| engine_err!("quasar3d::vulkan", "Upload command pool lock poisoned"))?;

    unsafe {
        let allocate_info = vk::CommandBufferAllocateInfo::default()
            .command_pool(*pool)
            .level(vk::CommandBufferLevel::PRIMARY)
            .command_buffer_count(1);

        let command_buffers = ctx.device.allocate_command_buffers(&allocate_info)
            .map_err(|e| engine_err!("quasar3d::vulkan", "Failed to allocate transfer command buffer: {:?}", e))?;
        let command_buffer = command_buffers[0];

        let result = record_and_submit(ctx, command_buffer, batch);

        ctx.device.free_command_buffers(*pool, &command_buffers);
        result
    }
}

unsafe fn record_and_submit(ctx: &GpuContext, command_buffer: vk::CommandBuffer, batch: &TransferBatch) -> Result<()> {
    let begin_info = vk::CommandBufferBeginInfo::default()
        .flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);

    ctx.device.begin_command_buffer(command_buffer, &begin_info)
        .map_err(|e| engine_err!("quasar3d::vulkan", "Failed to begin transfer command buffer: {:?}", e))?;

    record_batch(&ctx.device, command_buffer, batch);

    ctx.device.end_command_buffer(command_buffer)
        .map_err(|e| engine_err!("quasar3d::vulkan", "Failed to end transfer command buffer: {:?}", e))?;

    let command_buffers_submit = [command_buffer];
    let submit_info = vk::SubmitInfo::default()
        .command_buffers(&command_buffers_submit);

    ctx.device.queue_submit(ctx.queue, &[submit_info], vk::Fence::null())
        .map_err(|e| engine_err!("quasar3d::vulkan", "Failed to submit transfer batch to GPU: {:?}", e))?;

    ctx.device.queue_wait_idle(ctx.queue)
        .map_err(|e| engine_err!("quasar3d::vulkan", "Failed to wait for transfer completion: {:?}", e))?;

    engine_trace!("quasar3d::vulkan", "Transfer batch of {} commands completed", batch.len());
    Ok(())
}
