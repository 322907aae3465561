/// Mock graphics device for unit tests (no GPU required)
///
/// Buffers keep their contents in memory and submitted transfer batches are
/// executed on the CPU: buffer copies move bytes, barriers track per-mip
/// layouts and reject transitions whose old layout does not match.

use std::sync::{Arc, Mutex};
use rustc_hash::FxHashMap;

use crate::error::{Error, Result};
use crate::graphics_device::{
    GraphicsDevice, Buffer, BufferDesc, BufferUsage, Texture, TextureDesc, TextureInfo,
    TextureFormat, FormatFeatures, TransferBatch, TransferCommand, ImageLayout,
};
use crate::engine_bail;

// ============================================================================
// Mock Buffer
// ============================================================================

#[derive(Debug)]
pub struct MockBuffer {
    pub handle: u64,
    pub usage: BufferUsage,
    pub data: Mutex<Vec<u8>>,
}

impl MockBuffer {
    pub fn new(handle: u64, size: u64, usage: BufferUsage) -> Self {
        Self {
            handle,
            usage,
            data: Mutex::new(vec![0u8; size as usize]),
        }
    }

    /// Copy of the current contents
    pub fn contents(&self) -> Vec<u8> {
        self.data.lock().unwrap().clone()
    }

    fn write(&self, offset: u64, bytes: &[u8]) -> Result<()> {
        let mut data = self.data.lock().unwrap();
        let start = offset as usize;
        let end = start + bytes.len();
        if end > data.len() {
            engine_bail!("quasar3d::mock", "Write of {} bytes at {} overflows buffer of {} bytes",
                bytes.len(), offset, data.len());
        }
        data[start..end].copy_from_slice(bytes);
        Ok(())
    }
}

impl Buffer for MockBuffer {
    fn size(&self) -> u64 {
        self.data.lock().unwrap().len() as u64
    }

    fn usage(&self) -> BufferUsage {
        self.usage
    }

    fn update(&self, offset: u64, data: &[u8]) -> Result<()> {
        if !self.usage.is_host_visible() {
            engine_bail!("quasar3d::mock", "Buffer {} ({:?}) is not host-visible", self.handle, self.usage);
        }
        self.write(offset, data)
    }

    fn native_handle(&self) -> u64 {
        self.handle
    }
}

// ============================================================================
// Mock Texture
// ============================================================================

#[derive(Debug)]
pub struct MockTexture {
    pub handle: u64,
    pub info: TextureInfo,
    /// Current layout of every mip level
    pub layouts: Mutex<Vec<ImageLayout>>,
    /// Pixels copied into mip 0
    pub pixels: Mutex<Vec<u8>>,
}

impl MockTexture {
    pub fn new(handle: u64, width: u32, height: u32, format: TextureFormat, mip_levels: u32) -> Self {
        Self {
            handle,
            info: TextureInfo { width, height, format, mip_levels },
            layouts: Mutex::new(vec![ImageLayout::Undefined; mip_levels as usize]),
            pixels: Mutex::new(Vec::new()),
        }
    }

    pub fn layouts(&self) -> Vec<ImageLayout> {
        self.layouts.lock().unwrap().clone()
    }

    fn expect_layout(&self, mip: u32, expected: ImageLayout) -> Result<()> {
        let layouts = self.layouts.lock().unwrap();
        match layouts.get(mip as usize) {
            Some(current) if *current == expected => Ok(()),
            Some(current) => {
                engine_bail!("quasar3d::mock", "Texture {} mip {} is {:?}, expected {:?}",
                    self.handle, mip, current, expected);
            }
            None => {
                engine_bail!("quasar3d::mock", "Texture {} has no mip {}", self.handle, mip);
            }
        }
    }
}

impl Texture for MockTexture {
    fn info(&self) -> &TextureInfo {
        &self.info
    }

    fn native_handle(&self) -> u64 {
        self.handle
    }
}

// ============================================================================
// Mock GraphicsDevice
// ============================================================================

/// Recording graphics device
pub struct MockGraphicsDevice {
    next_handle: u64,
    pub buffers: Vec<Arc<MockBuffer>>,
    pub textures: Vec<Arc<MockTexture>>,
    /// Every batch passed to `submit_transfer`, in submission order
    pub submitted: Vec<TransferBatch>,
    /// Per-format feature overrides (all features when absent)
    pub format_features: FxHashMap<TextureFormat, FormatFeatures>,
    /// Fail the next `create_buffer` call with `Error::OutOfMemory`
    pub fail_next_buffer: bool,
    /// Fail the next `submit_transfer` call with `Error::BackendError`
    pub fail_next_submit: bool,
}

impl MockGraphicsDevice {
    pub fn new() -> Self {
        Self {
            next_handle: 1,
            buffers: Vec::new(),
            textures: Vec::new(),
            submitted: Vec::new(),
            format_features: FxHashMap::default(),
            fail_next_buffer: false,
            fail_next_submit: false,
        }
    }

    /// Live buffers of a given usage (still referenced outside the device)
    pub fn live_buffers(&self, usage: BufferUsage) -> Vec<Arc<MockBuffer>> {
        self.buffers
            .iter()
            .filter(|b| b.usage == usage && Arc::strong_count(b) > 1)
            .cloned()
            .collect()
    }

    pub fn buffer(&self, handle: u64) -> Option<Arc<MockBuffer>> {
        self.buffers.iter().find(|b| b.handle == handle).cloned()
    }

    pub fn texture(&self, handle: u64) -> Option<Arc<MockTexture>> {
        self.textures.iter().find(|t| t.handle == handle).cloned()
    }

    fn allocate_handle(&mut self) -> u64 {
        let handle = self.next_handle;
        self.next_handle += 1;
        handle
    }

    fn lookup_buffer(&self, buffer: &Arc<dyn Buffer>) -> Result<Arc<MockBuffer>> {
        match self.buffer(buffer.native_handle()) {
            Some(b) => Ok(b),
            None => engine_bail!("quasar3d::mock", "Unknown buffer handle {}", buffer.native_handle()),
        }
    }

    fn lookup_texture(&self, texture: &Arc<dyn Texture>) -> Result<Arc<MockTexture>> {
        match self.texture(texture.native_handle()) {
            Some(t) => Ok(t),
            None => engine_bail!("quasar3d::mock", "Unknown texture handle {}", texture.native_handle()),
        }
    }

    fn execute(&self, command: &TransferCommand) -> Result<()> {
        match command {
            TransferCommand::CopyBuffer { src, src_offset, dst, dst_offset, size } => {
                let src = self.lookup_buffer(src)?;
                let dst = self.lookup_buffer(dst)?;
                let bytes = {
                    let data = src.data.lock().unwrap();
                    let start = *src_offset as usize;
                    let end = start + *size as usize;
                    if end > data.len() {
                        engine_bail!("quasar3d::mock", "Copy source range {}..{} out of bounds", start, end);
                    }
                    data[start..end].to_vec()
                };
                dst.write(*dst_offset, &bytes)
            }
            TransferCommand::CopyBufferToImage { src, src_offset, dst } => {
                let src = self.lookup_buffer(src)?;
                let dst = self.lookup_texture(dst)?;
                dst.expect_layout(0, ImageLayout::TransferDst)?;
                let info = &dst.info;
                let len = (info.width * info.height * info.format.bytes_per_pixel()) as usize;
                let data = src.data.lock().unwrap();
                let start = *src_offset as usize;
                if start + len > data.len() {
                    engine_bail!("quasar3d::mock", "Image copy source out of bounds");
                }
                *dst.pixels.lock().unwrap() = data[start..start + len].to_vec();
                Ok(())
            }
            TransferCommand::ImageBarrier { texture, base_mip, mip_count, old_layout, new_layout } => {
                let texture = self.lookup_texture(texture)?;
                for mip in *base_mip..*base_mip + *mip_count {
                    if *old_layout != ImageLayout::Undefined {
                        texture.expect_layout(mip, *old_layout)?;
                    }
                }
                let mut layouts = texture.layouts.lock().unwrap();
                for mip in *base_mip..*base_mip + *mip_count {
                    layouts[mip as usize] = *new_layout;
                }
                Ok(())
            }
            TransferCommand::BlitMip { texture, src_mip, dst_mip, .. } => {
                let texture = self.lookup_texture(texture)?;
                texture.expect_layout(*src_mip, ImageLayout::TransferSrc)?;
                texture.expect_layout(*dst_mip, ImageLayout::TransferDst)
            }
        }
    }
}

impl Default for MockGraphicsDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl GraphicsDevice for MockGraphicsDevice {
    fn create_buffer(&mut self, desc: BufferDesc) -> Result<Arc<dyn Buffer>> {
        if self.fail_next_buffer {
            self.fail_next_buffer = false;
            return Err(Error::OutOfMemory);
        }
        let handle = self.allocate_handle();
        let buffer = Arc::new(MockBuffer::new(handle, desc.size, desc.usage));
        self.buffers.push(Arc::clone(&buffer));
        Ok(buffer)
    }

    fn create_texture(&mut self, desc: TextureDesc) -> Result<Arc<dyn Texture>> {
        let handle = self.allocate_handle();
        let texture = Arc::new(MockTexture::new(handle, desc.width, desc.height, desc.format, desc.mip_levels.max(1)));
        self.textures.push(Arc::clone(&texture));
        Ok(texture)
    }

    fn format_features(&self, format: TextureFormat) -> FormatFeatures {
        self.format_features
            .get(&format)
            .copied()
            .unwrap_or(FormatFeatures::all())
    }

    fn submit_transfer(&mut self, batch: &TransferBatch) -> Result<()> {
        if self.fail_next_submit {
            self.fail_next_submit = false;
            engine_bail!("quasar3d::mock", "Simulated queue submit failure");
        }
        for command in batch.commands() {
            self.execute(command)?;
        }
        self.submitted.push(batch.clone());
        Ok(())
    }

    fn wait_idle(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
#[path = "mock_graphics_device_tests.rs"]
mod tests;
