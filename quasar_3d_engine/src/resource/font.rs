//! Font atlases.
//!
//! Printable ASCII is rasterized through the engine's `FontLibrary`, packed
//! onto shelves in a single atlas and staged as an RGBA texture (white,
//! alpha = coverage) without mipmaps.

use std::path::{Path, PathBuf};
use rustc_hash::FxHashMap;

use crate::error::{Error, Result};
use crate::import::{FontArc, FontLibrary, GlyphBitmap, LineMetrics};
use crate::resource::TextureStager;
use crate::{engine_debug, engine_error};

/// Codepoints rasterized into every atlas
pub const ATLAS_CHARS: std::ops::RangeInclusive<char> = ' '..='~';

/// Empty pixels kept around every glyph
const PADDING: u32 = 1;

/// Narrowest atlas produced
const MIN_ATLAS_WIDTH: u32 = 64;

/// Largest atlas side accepted
pub const MAX_ATLAS_SIZE: u32 = 8192;

/// Placement and metrics of one glyph inside an atlas
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GlyphMetrics {
    pub uv_min: [f32; 2],
    pub uv_max: [f32; 2],
    /// Bitmap size in pixels
    pub size: [f32; 2],
    /// x: pen to left edge, y: baseline to top edge
    pub bearing: [f32; 2],
    pub advance: f32,
}

/// Packed RGBA atlas
#[derive(Debug, Clone)]
pub struct FontAtlas {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
    pub glyphs: FxHashMap<char, GlyphMetrics>,
}

/// Shelf-pack `glyphs` into a power-of-two RGBA atlas
///
/// # Errors
///
/// Returns `Error::InvalidResource` if the atlas would exceed
/// `MAX_ATLAS_SIZE` on either side.
pub fn pack_atlas(glyphs: &[GlyphBitmap]) -> Result<FontAtlas> {
    let widest = glyphs.iter().map(|g| g.width).max().unwrap_or(0);
    let tallest = glyphs.iter().map(|g| g.height).max().unwrap_or(0);
    if widest > MAX_ATLAS_SIZE - 2 * PADDING || tallest > MAX_ATLAS_SIZE - 2 * PADDING {
        return Err(oversized_atlas(widest as u64, tallest as u64));
    }

    let padded_area: u64 = glyphs
        .iter()
        .filter(|g| !g.is_blank())
        .map(|g| (g.width + PADDING) as u64 * (g.height + PADDING) as u64)
        .sum();
    let width = ((padded_area as f64).sqrt().ceil() as u32)
        .min(MAX_ATLAS_SIZE)
        .max(widest + 2 * PADDING)
        .max(MIN_ATLAS_WIDTH)
        .next_power_of_two();

    // Tallest first keeps shelves tight
    let mut order: Vec<usize> = (0..glyphs.len()).filter(|&i| !glyphs[i].is_blank()).collect();
    order.sort_by(|&a, &b| glyphs[b].height.cmp(&glyphs[a].height));

    let mut positions = vec![(0u32, 0u32); glyphs.len()];
    let (mut x, mut y, mut shelf_height) = (PADDING, PADDING as u64, 0u32);
    for &i in &order {
        let glyph = &glyphs[i];
        if x + glyph.width + PADDING > width {
            x = PADDING;
            y += (shelf_height + PADDING) as u64;
            shelf_height = 0;
        }
        if y + (glyph.height + PADDING) as u64 > MAX_ATLAS_SIZE as u64 {
            return Err(oversized_atlas(width as u64, y + (glyph.height + PADDING) as u64));
        }
        positions[i] = (x, y as u32);
        x += glyph.width + PADDING;
        shelf_height = shelf_height.max(glyph.height);
    }
    // Bounded by MAX_ATLAS_SIZE above
    let height = (y as u32 + shelf_height + PADDING).next_power_of_two();

    let row_stride = width as usize * 4;
    let mut pixels = vec![0u8; row_stride * height as usize];
    for chunk in pixels.chunks_exact_mut(4) {
        chunk[..3].copy_from_slice(&[255, 255, 255]);
    }

    let mut metrics = FxHashMap::default();
    for (i, glyph) in glyphs.iter().enumerate() {
        let (gx, gy) = positions[i];
        for row in 0..glyph.height {
            for col in 0..glyph.width {
                let alpha = glyph.coverage[row as usize * glyph.width as usize + col as usize];
                pixels[(gy + row) as usize * row_stride + (gx + col) as usize * 4 + 3] = alpha;
            }
        }
        let (uv_min, uv_max) = if glyph.is_blank() {
            ([0.0, 0.0], [0.0, 0.0])
        } else {
            (
                [gx as f32 / width as f32, gy as f32 / height as f32],
                [(gx + glyph.width) as f32 / width as f32, (gy + glyph.height) as f32 / height as f32],
            )
        };
        metrics.insert(glyph.codepoint, GlyphMetrics {
            uv_min,
            uv_max,
            size: [glyph.width as f32, glyph.height as f32],
            bearing: [glyph.bearing_x, glyph.bearing_y],
            advance: glyph.advance,
        });
    }

    Ok(FontAtlas { width, height, pixels, glyphs: metrics })
}

fn oversized_atlas(width: u64, height: u64) -> Error {
    let message = format!("font atlas needs at least {}x{} pixels, the limit is {}x{}",
        width, height, MAX_ATLAS_SIZE, MAX_ATLAS_SIZE);
    engine_error!("quasar3d::FontResource", "{}", message);
    Error::InvalidResource(message)
}

/// Rasterize every atlas codepoint of `face`
pub fn rasterize_ascii(face: &FontArc, pixel_size: f32) -> Vec<GlyphBitmap> {
    ATLAS_CHARS
        .map(|c| FontLibrary::render_glyph(face, c, pixel_size))
        .collect()
}

// ===== FONT RESOURCE =====

/// Font loaded into a pool
#[derive(Debug, Clone)]
pub struct FontResource {
    path: PathBuf,
    pixel_size: f32,
    /// Atlas texture id in the pool's stager
    texture: u32,
    atlas_size: (u32, u32),
    line_metrics: LineMetrics,
    glyphs: FxHashMap<char, GlyphMetrics>,
}

impl FontResource {
    /// Rasterize `face` and stage its atlas in `textures`
    pub fn build(path: &Path, face: &FontArc, pixel_size: f32, textures: &mut TextureStager) -> Result<Self> {
        let atlas = pack_atlas(&rasterize_ascii(face, pixel_size))?;
        let texture = textures.load_texture_rgba(atlas.width, atlas.height, atlas.pixels, false)?;
        engine_debug!("quasar3d::FontResource", "Packed '{}' at {}px into a {}x{} atlas",
            path.display(), pixel_size, atlas.width, atlas.height);
        Ok(Self {
            path: path.to_path_buf(),
            pixel_size,
            texture,
            atlas_size: (atlas.width, atlas.height),
            line_metrics: FontLibrary::line_metrics(face, pixel_size),
            glyphs: atlas.glyphs,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn pixel_size(&self) -> f32 {
        self.pixel_size
    }

    /// Stager id of the atlas texture
    pub fn texture_id(&self) -> u32 {
        self.texture
    }

    pub fn atlas_size(&self) -> (u32, u32) {
        self.atlas_size
    }

    pub fn line_metrics(&self) -> &LineMetrics {
        &self.line_metrics
    }

    pub fn glyph(&self, codepoint: char) -> Option<&GlyphMetrics> {
        self.glyphs.get(&codepoint)
    }

    /// Pen advance of `text` on one line (unknown codepoints are skipped)
    pub fn measure(&self, text: &str) -> f32 {
        text.chars().filter_map(|c| self.glyphs.get(&c)).map(|g| g.advance).sum()
    }
}

#[cfg(test)]
#[path = "font_tests.rs"]
mod tests;
