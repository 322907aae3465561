//! Glyph rasterization boundary.
//!
//! `FontLibrary` loads font faces with `ab_glyph` and caches them by path.
//! The process-wide instance lives in the engine singleton; see
//! `Engine::with_font_library`.

use std::path::{Path, PathBuf};
use ab_glyph::{Font, FontArc, Glyph, PxScale, ScaleFont};
use rustc_hash::FxHashMap;
use crate::error::{Error, Result};
use crate::{engine_debug, engine_error};

/// Rasterized glyph coverage
#[derive(Debug, Clone, PartialEq)]
pub struct GlyphBitmap {
    pub codepoint: char,
    pub width: u32,
    pub height: u32,
    /// One coverage byte per pixel, row-major
    pub coverage: Vec<u8>,
    /// Offset from the pen position to the bitmap's left edge
    pub bearing_x: f32,
    /// Distance from the baseline up to the bitmap's top edge
    pub bearing_y: f32,
    /// Horizontal pen advance
    pub advance: f32,
}

impl GlyphBitmap {
    /// Glyph without outline (e.g. space): no pixels, advance only
    pub fn blank(codepoint: char, advance: f32) -> Self {
        Self {
            codepoint,
            width: 0,
            height: 0,
            coverage: Vec::new(),
            bearing_x: 0.0,
            bearing_y: 0.0,
            advance,
        }
    }

    pub fn is_blank(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Vertical metrics of a face at a pixel size
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineMetrics {
    pub ascent: f32,
    pub descent: f32,
    pub line_gap: f32,
}

impl LineMetrics {
    pub fn line_height(&self) -> f32 {
        self.ascent - self.descent + self.line_gap
    }
}

/// Cache of loaded font faces
pub struct FontLibrary {
    faces: FxHashMap<PathBuf, FontArc>,
}

impl FontLibrary {
    pub fn new() -> Self {
        engine_debug!("quasar3d::FontLibrary", "Font library initialized");
        Self {
            faces: FxHashMap::default(),
        }
    }

    /// Load a face from disk, or return the cached one
    pub fn load_face(&mut self, path: &Path) -> Result<FontArc> {
        if let Some(face) = self.faces.get(path) {
            return Ok(face.clone());
        }
        let bytes = std::fs::read(path).map_err(|e| {
            engine_error!("quasar3d::FontLibrary", "Failed to read font '{}': {}", path.display(), e);
            Error::ImportFailed(format!("{}: {}", path.display(), e))
        })?;
        let face = Self::parse_face(path, bytes)?;
        self.faces.insert(path.to_path_buf(), face.clone());
        Ok(face)
    }

    /// Parse a face held in memory and cache it under `key`
    pub fn load_face_bytes(&mut self, key: &Path, bytes: Vec<u8>) -> Result<FontArc> {
        if let Some(face) = self.faces.get(key) {
            return Ok(face.clone());
        }
        let face = Self::parse_face(key, bytes)?;
        self.faces.insert(key.to_path_buf(), face.clone());
        Ok(face)
    }

    fn parse_face(path: &Path, bytes: Vec<u8>) -> Result<FontArc> {
        FontArc::try_from_vec(bytes).map_err(|e| {
            engine_error!("quasar3d::FontLibrary", "Invalid font '{}': {}", path.display(), e);
            Error::ImportFailed(format!("{}: {}", path.display(), e))
        })
    }

    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    /// Rasterize one codepoint at `pixel_size`
    ///
    /// A codepoint without an outline yields a blank bitmap carrying only
    /// its advance.
    pub fn render_glyph(face: &FontArc, codepoint: char, pixel_size: f32) -> GlyphBitmap {
        let scale = PxScale::from(pixel_size);
        let scaled = face.as_scaled(scale);
        let id = face.glyph_id(codepoint);
        let advance = scaled.h_advance(id);
        let glyph = Glyph { id, scale, position: ab_glyph::point(0.0, 0.0) };

        let Some(outline) = face.outline_glyph(glyph) else {
            return GlyphBitmap::blank(codepoint, advance);
        };
        let bounds = outline.px_bounds();
        let width = bounds.width().ceil() as u32;
        let height = bounds.height().ceil() as u32;
        if width == 0 || height == 0 {
            return GlyphBitmap::blank(codepoint, advance);
        }

        let mut coverage = vec![0u8; (width * height) as usize];
        outline.draw(|x, y, v| {
            if x < width && y < height {
                let idx = (y * width + x) as usize;
                coverage[idx] = coverage[idx].max((v.clamp(0.0, 1.0) * 255.0) as u8);
            }
        });

        GlyphBitmap {
            codepoint,
            width,
            height,
            coverage,
            bearing_x: bounds.min.x,
            bearing_y: -bounds.min.y,
            advance,
        }
    }

    /// Ascent/descent/line gap at `pixel_size`
    pub fn line_metrics(face: &FontArc, pixel_size: f32) -> LineMetrics {
        let scaled = face.as_scaled(PxScale::from(pixel_size));
        LineMetrics {
            ascent: scaled.ascent(),
            descent: scaled.descent(),
            line_gap: scaled.line_gap(),
        }
    }
}

impl Default for FontLibrary {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for FontLibrary {
    fn drop(&mut self) {
        engine_debug!("quasar3d::FontLibrary", "Font library released ({} faces)", self.faces.len());
    }
}

#[cfg(test)]
#[path = "font_library_tests.rs"]
mod tests;
