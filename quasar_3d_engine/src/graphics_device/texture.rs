/// Texture trait, texture descriptor, texture info, and format capabilities

use bitflags::bitflags;

/// Texture pixel format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(non_camel_case_types)]
pub enum TextureFormat {
    R8G8B8A8_SRGB,
    R8G8B8A8_UNORM,
}

impl TextureFormat {
    /// Bytes per pixel
    pub fn bytes_per_pixel(&self) -> u32 {
        match self {
            TextureFormat::R8G8B8A8_SRGB | TextureFormat::R8G8B8A8_UNORM => 4,
        }
    }
}

bitflags! {
    /// Capabilities a device reports for a texture format (optimal tiling)
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct FormatFeatures: u32 {
        /// Format can be sampled with a linear filter
        const SAMPLED_IMAGE_FILTER_LINEAR = 0b0001;
        /// Format can be the source of a blit
        const BLIT_SRC = 0b0010;
        /// Format can be the destination of a blit
        const BLIT_DST = 0b0100;
    }
}

impl FormatFeatures {
    /// Features required to generate mip levels by successive linear blits
    pub const MIP_GENERATION: FormatFeatures = FormatFeatures::SAMPLED_IMAGE_FILTER_LINEAR
        .union(FormatFeatures::BLIT_SRC)
        .union(FormatFeatures::BLIT_DST);

    /// Whether mip levels can be generated on the device for this format
    pub fn supports_mip_generation(&self) -> bool {
        self.contains(FormatFeatures::MIP_GENERATION)
    }
}

// ===== MIP CHAIN =====

/// Length of a complete mip chain down to 1x1
pub fn full_mip_chain(width: u32, height: u32) -> u32 {
    let largest = width.max(height).max(1);
    32 - largest.leading_zeros()
}

/// Size of a mip level, never below one pixel
pub fn mip_extent(width: u32, height: u32, level: u32) -> (u32, u32) {
    ((width >> level).max(1), (height >> level).max(1))
}

// ===== TEXTURE DESC =====

/// Descriptor for creating a device texture
///
/// Textures are always sampled 2D images that receive their content through
/// transfer commands.
#[derive(Debug, Clone)]
pub struct TextureDesc {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Pixel format
    pub format: TextureFormat,
    /// Number of mip levels to allocate
    pub mip_levels: u32,
}

// ===== TEXTURE INFO =====

/// Read-only properties of a created texture.
///
/// Returned by `Texture::info()` to query texture properties
/// without exposing backend-specific details.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureInfo {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Pixel format
    pub format: TextureFormat,
    /// Number of allocated mip levels
    pub mip_levels: u32,
}

impl TextureInfo {
    /// Returns true if the texture carries more than one mip level
    pub fn is_mipmapped(&self) -> bool {
        self.mip_levels > 1
    }
}

// ===== TEXTURE TRAIT =====

/// Texture resource trait
///
/// Implemented by backend-specific texture types (e.g., VulkanTexture).
/// The texture is automatically destroyed when dropped.
pub trait Texture: Send + Sync {
    /// Get the read-only properties of this texture
    fn info(&self) -> &TextureInfo;

    /// Backend object handle, used to reference the texture inside transfer batches
    fn native_handle(&self) -> u64;
}

#[cfg(test)]
#[path = "texture_tests.rs"]
mod tests;
