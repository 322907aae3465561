/*!
# Quasar 3D Engine

Resource streaming and animation core for the Quasar 3D engine.

This crate turns asset files (glTF models, images, TrueType fonts) into
GPU-resident vertex, index and texture data, and evaluates skeletal
animation on the CPU. The GPU itself sits behind the `GraphicsDevice`
trait; backends (Vulkan, ...) live in their own crates.

## Architecture

- **ResourceManager**: Owns every resource pool
- **ResourcePool**: Textures, models and fonts loaded together and committed in one upload
- **ModelBatch**: Packs the meshes of one vertex layout into shared vertex/index buffers
- **TextureStager**: Stages decoded images and records the mip blit chain
- **Animator**: Samples keyframes and produces final bone matrices
- **GraphicsDevice**: Buffer/texture creation and transfer submission

Loads only touch CPU memory. `ResourcePool::commit` is the single point
where data reaches the device.
*/

// Internal modules
mod error;
mod engine;
pub mod log;
pub mod graphics_device;
pub mod vertex;
pub mod import;
pub mod animation;
pub mod resource;

// Main quasar3d namespace module
pub mod quasar3d {
    // Error types
    pub use crate::error::{Error, Result};

    // Process-scoped engine state
    pub use crate::engine::Engine;

    // Logging sub-module (types only, NOT macros)
    pub mod log {
        pub use crate::log::{Logger, LogEntry, LogSeverity, DefaultLogger};
    }

    // Device boundary: buffers, textures, transfer batches
    pub mod device {
        pub use crate::graphics_device::*;
    }

    // Vertex layouts
    pub mod vertex {
        pub use crate::vertex::*;
    }

    // Asset import boundaries
    pub mod import {
        pub use crate::import::*;
    }

    // Skeletal animation
    pub mod animation {
        pub use crate::animation::*;
    }

    // Resource pools
    pub mod resource {
        pub use crate::resource::*;
    }
}

// Re-export math library at crate root
pub use glam;
