/// Per-pool streaming configuration

use crate::graphics_device::TextureFormat;

/// Options applied to every resource staged into a pool
#[derive(Debug, Clone, PartialEq)]
pub struct StreamingConfig {
    /// Build a full mip chain for textures that allow it
    pub generate_mipmaps: bool,
    /// Store colour textures as sRGB instead of linear
    pub srgb_textures: bool,
    /// Bone count the skinning shaders can address
    pub max_bones: usize,
}

impl StreamingConfig {
    /// Device pixel format for decoded colour textures
    pub fn texture_format(&self) -> TextureFormat {
        if self.srgb_textures {
            TextureFormat::R8G8B8A8_SRGB
        } else {
            TextureFormat::R8G8B8A8_UNORM
        }
    }
}

impl Default for StreamingConfig {
    fn default() -> Self {
        Self {
            generate_mipmaps: true,
            srgb_textures: true,
            max_bones: 100,
        }
    }
}
