/// Unit tests for MockGraphicsDevice and associated mock types.
///
/// The mock executes transfer batches on the CPU, so these tests pin down the
/// semantics other modules rely on when they inspect device state.

use crate::graphics_device::mock_graphics_device::*;
use crate::graphics_device::{
    GraphicsDevice, Buffer, Texture, BufferDesc, BufferUsage, TextureDesc, TextureFormat,
    FormatFeatures, TransferBatch, ImageLayout,
};
use crate::error::Error;

fn texture_desc(mip_levels: u32) -> TextureDesc {
    TextureDesc {
        width: 4,
        height: 4,
        format: TextureFormat::R8G8B8A8_SRGB,
        mip_levels,
    }
}

// ============================================================================
// MockBuffer Tests
// ============================================================================

#[test]
fn test_mock_buffer_update_writes_contents() {
    let buffer = MockBuffer::new(1, 8, BufferUsage::Staging);
    buffer.update(2, &[7, 8, 9]).unwrap();
    assert_eq!(buffer.contents(), vec![0, 0, 7, 8, 9, 0, 0, 0]);
    assert_eq!(buffer.size(), 8);
}

#[test]
fn test_mock_buffer_update_out_of_bounds() {
    let buffer = MockBuffer::new(1, 4, BufferUsage::Staging);
    let result = buffer.update(2, &[1, 2, 3]);
    assert!(matches!(result, Err(Error::BackendError(_))));
}

#[test]
fn test_mock_buffer_update_device_local_rejected() {
    let buffer = MockBuffer::new(1, 4, BufferUsage::Vertex);
    assert!(buffer.update(0, &[1]).is_err());
}

// ============================================================================
// MockGraphicsDevice Tests
// ============================================================================

#[test]
fn test_mock_device_handles_are_unique() {
    let mut device = MockGraphicsDevice::new();
    let a = device.create_buffer(BufferDesc { size: 4, usage: BufferUsage::Staging }).unwrap();
    let b = device.create_buffer(BufferDesc { size: 4, usage: BufferUsage::Vertex }).unwrap();
    let t = device.create_texture(texture_desc(1)).unwrap();

    assert_ne!(a.native_handle(), b.native_handle());
    assert_ne!(b.native_handle(), t.native_handle());
    assert_eq!(device.buffers.len(), 2);
    assert_eq!(device.textures.len(), 1);
}

#[test]
fn test_mock_device_copy_buffer_moves_bytes() {
    let mut device = MockGraphicsDevice::new();
    let staging = device.create_buffer(BufferDesc { size: 8, usage: BufferUsage::Staging }).unwrap();
    let vertex = device.create_buffer(BufferDesc { size: 4, usage: BufferUsage::Vertex }).unwrap();
    staging.update(0, &[1, 2, 3, 4, 5, 6, 7, 8]).unwrap();

    let mut batch = TransferBatch::new();
    batch.copy_buffer(&staging, 4, &vertex, 0, 4);
    device.submit_transfer(&batch).unwrap();

    let vertex = device.buffer(vertex.native_handle()).unwrap();
    assert_eq!(vertex.contents(), vec![5, 6, 7, 8]);
    assert_eq!(device.submitted.len(), 1);
}

#[test]
fn test_mock_device_tracks_layouts() {
    let mut device = MockGraphicsDevice::new();
    let texture = device.create_texture(texture_desc(3)).unwrap();

    let mut batch = TransferBatch::new();
    batch.image_barrier(&texture, 0, 3, ImageLayout::Undefined, ImageLayout::TransferDst);
    batch.image_barrier(&texture, 0, 1, ImageLayout::TransferDst, ImageLayout::TransferSrc);
    batch.blit_mip(&texture, 0, 1, (4, 4), (2, 2));
    device.submit_transfer(&batch).unwrap();

    let mock = device.texture(texture.native_handle()).unwrap();
    assert_eq!(
        mock.layouts(),
        vec![ImageLayout::TransferSrc, ImageLayout::TransferDst, ImageLayout::TransferDst]
    );
}

#[test]
fn test_mock_device_rejects_mismatched_barrier() {
    let mut device = MockGraphicsDevice::new();
    let texture = device.create_texture(texture_desc(1)).unwrap();

    let mut batch = TransferBatch::new();
    batch.image_barrier(&texture, 0, 1, ImageLayout::TransferSrc, ImageLayout::ShaderReadOnly);
    assert!(device.submit_transfer(&batch).is_err());
    assert!(device.submitted.is_empty());
}

#[test]
fn test_mock_device_copy_to_image_requires_transfer_dst() {
    let mut device = MockGraphicsDevice::new();
    let staging = device.create_buffer(BufferDesc { size: 64, usage: BufferUsage::Staging }).unwrap();
    let texture = device.create_texture(texture_desc(1)).unwrap();

    let mut batch = TransferBatch::new();
    batch.copy_buffer_to_image(&staging, 0, &texture);
    assert!(device.submit_transfer(&batch).is_err());

    let mut batch = TransferBatch::new();
    batch.image_barrier(&texture, 0, 1, ImageLayout::Undefined, ImageLayout::TransferDst);
    batch.copy_buffer_to_image(&staging, 0, &texture);
    device.submit_transfer(&batch).unwrap();
    assert_eq!(device.texture(texture.native_handle()).unwrap().pixels.lock().unwrap().len(), 64);
}

#[test]
fn test_mock_device_failure_injection() {
    let mut device = MockGraphicsDevice::new();
    device.fail_next_buffer = true;
    let result = device.create_buffer(BufferDesc { size: 4, usage: BufferUsage::Staging });
    assert!(matches!(result, Err(Error::OutOfMemory)));
    assert!(device.create_buffer(BufferDesc { size: 4, usage: BufferUsage::Staging }).is_ok());

    device.fail_next_submit = true;
    assert!(device.submit_transfer(&TransferBatch::new()).is_err());
    assert!(device.submit_transfer(&TransferBatch::new()).is_ok());
}

#[test]
fn test_mock_device_format_feature_override() {
    let mut device = MockGraphicsDevice::new();
    assert!(device.format_features(TextureFormat::R8G8B8A8_SRGB).supports_mip_generation());

    device.format_features.insert(TextureFormat::R8G8B8A8_SRGB, FormatFeatures::BLIT_SRC);
    assert!(!device.format_features(TextureFormat::R8G8B8A8_SRGB).supports_mip_generation());
    assert!(device.format_features(TextureFormat::R8G8B8A8_UNORM).supports_mip_generation());
}

#[test]
fn test_mock_device_live_buffers() {
    let mut device = MockGraphicsDevice::new();
    let kept = device.create_buffer(BufferDesc { size: 4, usage: BufferUsage::Staging }).unwrap();
    let dropped = device.create_buffer(BufferDesc { size: 4, usage: BufferUsage::Staging }).unwrap();
    drop(dropped);

    let live = device.live_buffers(BufferUsage::Staging);
    assert_eq!(live.len(), 1);
    assert_eq!(live[0].handle, kept.native_handle());
}
