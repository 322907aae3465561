/// Graphics device module - device boundary types and traits

// Module declarations
pub mod graphics_device;
pub mod texture;
pub mod buffer;
pub mod transfer;

// Re-export everything from graphics_device.rs
pub use graphics_device::*;

// Re-export from other modules
pub use texture::*;
pub use buffer::*;
pub use transfer::*;

// Mock graphics device for tests (no GPU required)
#[cfg(test)]
pub mod mock_graphics_device;
