/// Transfer batches: recorded copies, layout transitions and mip blits
///
/// A batch is built on the CPU side and handed to `GraphicsDevice::submit_transfer`,
/// which records it into one command buffer, submits it and waits for completion.

use std::sync::Arc;
use crate::graphics_device::{Buffer, Texture};

/// Image layouts a transfer batch can move a texture between
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageLayout {
    Undefined,
    TransferDst,
    TransferSrc,
    ShaderReadOnly,
}

/// One recorded transfer operation
#[derive(Clone)]
pub enum TransferCommand {
    /// Copy a byte range between two buffers
    CopyBuffer {
        src: Arc<dyn Buffer>,
        src_offset: u64,
        dst: Arc<dyn Buffer>,
        dst_offset: u64,
        size: u64,
    },
    /// Copy tightly packed pixels from a buffer into mip 0 of a texture
    CopyBufferToImage {
        src: Arc<dyn Buffer>,
        src_offset: u64,
        dst: Arc<dyn Texture>,
    },
    /// Layout transition for a mip range
    ImageBarrier {
        texture: Arc<dyn Texture>,
        base_mip: u32,
        mip_count: u32,
        old_layout: ImageLayout,
        new_layout: ImageLayout,
    },
    /// Linear-filtered blit from one mip level into another
    BlitMip {
        texture: Arc<dyn Texture>,
        src_mip: u32,
        dst_mip: u32,
        src_extent: (u32, u32),
        dst_extent: (u32, u32),
    },
}

impl TransferCommand {
    /// Short label used by logs and tests
    pub fn kind(&self) -> &'static str {
        match self {
            TransferCommand::CopyBuffer { .. } => "copy_buffer",
            TransferCommand::CopyBufferToImage { .. } => "copy_buffer_to_image",
            TransferCommand::ImageBarrier { .. } => "image_barrier",
            TransferCommand::BlitMip { .. } => "blit_mip",
        }
    }
}

impl std::fmt::Debug for TransferCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransferCommand::CopyBuffer { src_offset, dst_offset, size, .. } => f
                .debug_struct("CopyBuffer")
                .field("src_offset", src_offset)
                .field("dst_offset", dst_offset)
                .field("size", size)
                .finish(),
            TransferCommand::CopyBufferToImage { src_offset, dst, .. } => f
                .debug_struct("CopyBufferToImage")
                .field("src_offset", src_offset)
                .field("dst", &dst.info())
                .finish(),
            TransferCommand::ImageBarrier { base_mip, mip_count, old_layout, new_layout, .. } => f
                .debug_struct("ImageBarrier")
                .field("base_mip", base_mip)
                .field("mip_count", mip_count)
                .field("old_layout", old_layout)
                .field("new_layout", new_layout)
                .finish(),
            TransferCommand::BlitMip { src_mip, dst_mip, src_extent, dst_extent, .. } => f
                .debug_struct("BlitMip")
                .field("src_mip", src_mip)
                .field("dst_mip", dst_mip)
                .field("src_extent", src_extent)
                .field("dst_extent", dst_extent)
                .finish(),
        }
    }
}

/// Ordered list of transfer commands submitted as one unit
#[derive(Debug, Clone, Default)]
pub struct TransferBatch {
    commands: Vec<TransferCommand>,
}

impl TransferBatch {
    pub fn new() -> Self {
        Self { commands: Vec::new() }
    }

    pub fn push(&mut self, command: TransferCommand) {
        self.commands.push(command);
    }

    pub fn commands(&self) -> &[TransferCommand] {
        &self.commands
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn copy_buffer(
        &mut self,
        src: &Arc<dyn Buffer>,
        src_offset: u64,
        dst: &Arc<dyn Buffer>,
        dst_offset: u64,
        size: u64,
    ) {
        self.push(TransferCommand::CopyBuffer {
            src: Arc::clone(src),
            src_offset,
            dst: Arc::clone(dst),
            dst_offset,
            size,
        });
    }

    pub fn copy_buffer_to_image(&mut self, src: &Arc<dyn Buffer>, src_offset: u64, dst: &Arc<dyn Texture>) {
        self.push(TransferCommand::CopyBufferToImage {
            src: Arc::clone(src),
            src_offset,
            dst: Arc::clone(dst),
        });
    }

    pub fn image_barrier(
        &mut self,
        texture: &Arc<dyn Texture>,
        base_mip: u32,
        mip_count: u32,
        old_layout: ImageLayout,
        new_layout: ImageLayout,
    ) {
        self.push(TransferCommand::ImageBarrier {
            texture: Arc::clone(texture),
            base_mip,
            mip_count,
            old_layout,
            new_layout,
        });
    }

    pub fn blit_mip(
        &mut self,
        texture: &Arc<dyn Texture>,
        src_mip: u32,
        dst_mip: u32,
        src_extent: (u32, u32),
        dst_extent: (u32, u32),
    ) {
        self.push(TransferCommand::BlitMip {
            texture: Arc::clone(texture),
            src_mip,
            dst_mip,
            src_extent,
            dst_extent,
        });
    }
}
