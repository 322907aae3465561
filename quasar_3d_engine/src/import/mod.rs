/// Import module - model, image and font boundaries

pub mod model;
pub mod gltf_importer;
pub mod image_decode;
pub mod font_library;

pub use model::*;
pub use gltf_importer::load_model;
pub use image_decode::{DecodedImage, decode_image, decode_image_file};
pub use font_library::{FontLibrary, GlyphBitmap, LineMetrics};

// Font face handle type used by FontLibrary
pub use ab_glyph::FontArc;
