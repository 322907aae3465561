/// Vertex module - packed vertex layouts

pub mod vertex_format;

pub use vertex_format::*;
