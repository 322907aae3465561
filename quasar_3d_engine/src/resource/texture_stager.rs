//! Texture staging and mip chain generation.
//!
//! Loads decode straight into RGBA8 and wait in CPU memory until the pool
//! commits. At commit the stager reserves a window of the pool's staging
//! buffer for every pending payload, creates one device image per texture
//! and records two batches: the bulk copy into mip 0, then the blit chain
//! that fills the remaining levels.

use std::path::Path;
use std::sync::Arc;
use rustc_hash::FxHashMap;

use crate::error::{Error, Result};
use crate::graphics_device::{
    Buffer, GraphicsDevice, ImageLayout, Texture, TextureDesc, TextureFormat, TransferBatch,
    full_mip_chain, mip_extent,
};
use crate::import::{decode_image, decode_image_file, TextureSource};
use crate::resource::StreamingConfig;
use crate::{engine_bail, engine_debug, engine_error, engine_warn};

/// Mip level count for a texture
///
/// `floor(log2(max(width, height))) + 1` when enabled, otherwise 1.
pub fn mip_levels(width: u32, height: u32, enabled: bool) -> u32 {
    if enabled {
        full_mip_chain(width, height)
    } else {
        1
    }
}

/// Record the mip generation commands for `texture`
///
/// Expects every level in `TransferDst` with level 0 holding the base image.
/// Leaves every level in `ShaderReadOnly`.
pub fn record_mip_chain(texture: &Arc<dyn Texture>, batch: &mut TransferBatch) {
    let info = texture.info();
    let levels = info.mip_levels.max(1);

    for level in 1..levels {
        let src_extent = mip_extent(info.width, info.height, level - 1);
        let dst_extent = mip_extent(info.width, info.height, level);
        batch.image_barrier(texture, level - 1, 1, ImageLayout::TransferDst, ImageLayout::TransferSrc);
        batch.blit_mip(texture, level - 1, level, src_extent, dst_extent);
        batch.image_barrier(texture, level - 1, 1, ImageLayout::TransferSrc, ImageLayout::ShaderReadOnly);
    }

    // Last level was only ever a blit destination
    batch.image_barrier(texture, levels - 1, 1, ImageLayout::TransferDst, ImageLayout::ShaderReadOnly);
}

// ===== PENDING TEXTURE =====

/// Decoded texture waiting for commit
struct PendingTexture {
    id: u32,
    width: u32,
    height: u32,
    mipmapped: bool,
    /// RGBA8, released once written to staging memory
    pixels: Vec<u8>,
    staging_offset: u64,
    /// Device image, created during commit
    texture: Option<Arc<dyn Texture>>,
}

impl PendingTexture {
    fn byte_size(&self) -> u64 {
        self.width as u64 * self.height as u64 * 4
    }
}

// ===== TEXTURE STAGER =====

/// Texture half of a resource pool
pub struct TextureStager {
    format: TextureFormat,
    generate_mipmaps: bool,
    next_id: u32,
    pending: Vec<PendingTexture>,
    /// Dedup key (path or embedded key) to texture id
    by_key: FxHashMap<String, u32>,
    /// Committed device images
    textures: FxHashMap<u32, Arc<dyn Texture>>,
    min_mip_levels: Option<u32>,
}

impl TextureStager {
    pub fn new(config: &StreamingConfig) -> Self {
        Self {
            format: config.texture_format(),
            generate_mipmaps: config.generate_mipmaps,
            next_id: 0,
            pending: Vec::new(),
            by_key: FxHashMap::default(),
            textures: FxHashMap::default(),
            min_mip_levels: None,
        }
    }

    // ===== LOADING =====

    /// Stage an image file; a path already staged returns its existing id
    pub fn load_texture_file(&mut self, path: &Path) -> Result<u32> {
        let key = path.to_string_lossy().into_owned();
        if let Some(&id) = self.by_key.get(&key) {
            return Ok(id);
        }
        let image = decode_image_file(path)?;
        let id = self.push_pending(image.width, image.height, image.pixels, true);
        self.by_key.insert(key, id);
        engine_debug!("quasar3d::TextureStager", "Staged '{}' ({}x{}) as texture {}",
            path.display(), image.width, image.height, id);
        Ok(id)
    }

    /// Stage an encoded image held in memory, deduplicated by `key`
    pub fn load_texture_bytes(&mut self, key: &str, bytes: &[u8]) -> Result<u32> {
        if let Some(&id) = self.by_key.get(key) {
            return Ok(id);
        }
        let image = decode_image(bytes)?;
        let id = self.push_pending(image.width, image.height, image.pixels, true);
        self.by_key.insert(key.to_string(), id);
        engine_debug!("quasar3d::TextureStager", "Staged '{}' ({}x{}) as texture {}",
            key, image.width, image.height, id);
        Ok(id)
    }

    /// Stage raw RGBA8 pixels (never deduplicated)
    pub fn load_texture_rgba(&mut self, width: u32, height: u32, pixels: Vec<u8>, mipmapped: bool) -> Result<u32> {
        let expected = width as usize * height as usize * 4;
        if width == 0 || height == 0 || pixels.len() != expected {
            let message = format!("texture {}x{} needs {} bytes, got {}", width, height, expected, pixels.len());
            engine_error!("quasar3d::TextureStager", "{}", message);
            return Err(Error::InvalidResource(message));
        }
        Ok(self.push_pending(width, height, pixels, mipmapped))
    }

    /// Stage a model's texture reference
    pub fn resolve(&mut self, source: &TextureSource) -> Result<u32> {
        match source {
            TextureSource::File(path) => self.load_texture_file(path),
            TextureSource::Embedded { key, bytes } => self.load_texture_bytes(key, bytes),
        }
    }

    fn push_pending(&mut self, width: u32, height: u32, pixels: Vec<u8>, mipmapped: bool) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        self.pending.push(PendingTexture {
            id,
            width,
            height,
            mipmapped,
            pixels,
            staging_offset: 0,
            texture: None,
        });
        id
    }

    /// First id a subsequent load would receive
    ///
    /// Pass it to `rollback` to discard everything staged after this point.
    pub fn mark(&self) -> u32 {
        self.next_id
    }

    /// Discard textures staged since `mark`; ids are not handed out again
    pub fn rollback(&mut self, mark: u32) {
        let before = self.pending.len();
        self.pending.retain(|p| p.id < mark);
        self.by_key.retain(|_, id| *id < mark);
        let dropped = before - self.pending.len();
        if dropped > 0 {
            engine_debug!("quasar3d::TextureStager", "Discarded {} textures staged by a failed load", dropped);
        }
    }

    // ===== COMMIT =====

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Lay pending payloads out back to back from `base`; returns their total size
    pub fn assign_staging_offsets(&mut self, base: u64) -> u64 {
        let mut cursor = base;
        for pending in &mut self.pending {
            pending.staging_offset = cursor;
            cursor += pending.byte_size();
        }
        cursor - base
    }

    /// Create one device image per pending texture
    ///
    /// Nothing is consumed here, so a failed allocation can be retried.
    pub fn create_textures(&mut self, device: &mut dyn GraphicsDevice) -> Result<()> {
        let can_generate = self.generate_mipmaps && device.format_features(self.format).supports_mip_generation();
        if self.generate_mipmaps && !can_generate && self.pending.iter().any(|p| p.mipmapped) {
            engine_warn!("quasar3d::TextureStager",
                "Format {:?} lacks linear filtering or blit support, textures get a single mip level", self.format);
        }

        for pending in &mut self.pending {
            let levels = mip_levels(pending.width, pending.height, can_generate && pending.mipmapped);
            pending.texture = Some(device.create_texture(TextureDesc {
                width: pending.width,
                height: pending.height,
                format: self.format,
                mip_levels: levels,
            })?);
        }
        Ok(())
    }

    /// Write every payload at its staging offset, releasing the CPU copy
    pub fn stage_to_memory(&mut self, staging: &dyn Buffer) -> Result<()> {
        for pending in &mut self.pending {
            staging.update(pending.staging_offset, &pending.pixels)?;
            pending.pixels = Vec::new();
        }
        Ok(())
    }

    /// Record the upload into `transfer` and the mip chain into `mips`
    pub fn record_uploads(&self, staging: &Arc<dyn Buffer>, transfer: &mut TransferBatch, mips: &mut TransferBatch) -> Result<()> {
        for pending in &self.pending {
            let Some(texture) = &pending.texture else {
                engine_bail!("quasar3d::TextureStager", "Texture {} has no device image", pending.id);
            };
            let levels = texture.info().mip_levels.max(1);
            transfer.image_barrier(texture, 0, levels, ImageLayout::Undefined, ImageLayout::TransferDst);
            transfer.copy_buffer_to_image(staging, pending.staging_offset, texture);
            record_mip_chain(texture, mips);
        }
        Ok(())
    }

    /// Move committed images out of the pending list
    pub fn finish_commit(&mut self) {
        for pending in self.pending.drain(..) {
            if let Some(texture) = pending.texture {
                let levels = texture.info().mip_levels;
                self.min_mip_levels = Some(self.min_mip_levels.map_or(levels, |m| m.min(levels)));
                self.textures.insert(pending.id, texture);
            }
        }
    }

    // ===== QUERIES =====

    /// Committed device image
    pub fn texture(&self, id: u32) -> Option<&Arc<dyn Texture>> {
        self.textures.get(&id)
    }

    /// Whether `id` was issued in the current generation
    pub fn contains(&self, id: u32) -> bool {
        self.textures.contains_key(&id) || self.pending.iter().any(|p| p.id == id)
    }

    pub fn texture_count(&self) -> usize {
        self.textures.len()
    }

    /// Smallest mip count among committed textures
    pub fn min_mip_levels(&self) -> Option<u32> {
        self.min_mip_levels
    }

    pub fn format(&self) -> TextureFormat {
        self.format
    }

    /// Drop staged and committed textures; ids keep increasing
    pub fn clear(&mut self) {
        self.pending.clear();
        self.by_key.clear();
        self.textures.clear();
        self.min_mip_levels = None;
    }
}

#[cfg(test)]
#[path = "texture_stager_tests.rs"]
mod tests;
