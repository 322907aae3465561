//! CPU-side model data produced by the importer.
//!
//! These types are independent of any device. A `Model` owns its meshes,
//! the node tree, the bone tables and every animation clip.
//!
//! # Hierarchy
//!
//! ```text
//! Model "hero.gltf"
//! ├── meshes[]            (vertices, indices, texture refs, bind transform)
//! ├── nodes[]             (flat, depth-first; root = nodes[root])
//! ├── bone_offsets[]      (indexed by bone id)
//! └── animations[]
//!     └── channels[]      (one per node, same index as nodes[])
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;
use glam::{Mat4, Quat, Vec2, Vec3};
use rustc_hash::FxHashMap;

/// Maximum number of bone influences a packed vertex carries
pub const MAX_BONE_INFLUENCES: usize = 4;

// ============================================================================
// MESH
// ============================================================================

/// One bone influence on a vertex
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoneInfluence {
    /// Bone id (index into `Model::bone_offsets`)
    pub bone: u32,
    /// Non-zero weight
    pub weight: f32,
}

/// Layout-independent vertex as read from the source file
#[derive(Debug, Clone, PartialEq)]
pub struct ImportedVertex {
    pub position: Vec3,
    pub normal: Vec3,
    pub uv: Vec2,
    /// All non-zero influences, in source order (may exceed four)
    pub influences: Vec<BoneInfluence>,
}

impl ImportedVertex {
    pub fn new(position: Vec3, normal: Vec3, uv: Vec2) -> Self {
        Self { position, normal, uv, influences: Vec::new() }
    }
}

/// Where a diffuse texture comes from
#[derive(Debug, Clone, PartialEq)]
pub enum TextureSource {
    /// Image file on disk
    File(PathBuf),
    /// Encoded image bytes embedded in the model, with a stable dedup key
    Embedded {
        key: String,
        bytes: Arc<Vec<u8>>,
    },
}

impl TextureSource {
    /// Key used to deduplicate textures inside a pool
    pub fn key(&self) -> String {
        match self {
            TextureSource::File(path) => path.to_string_lossy().into_owned(),
            TextureSource::Embedded { key, .. } => key.clone(),
        }
    }
}

/// Imported triangle mesh
#[derive(Debug, Clone)]
pub struct Mesh {
    pub name: String,
    pub vertices: Vec<ImportedVertex>,
    /// Triangle list indices
    pub indices: Vec<u32>,
    /// Diffuse textures, first one is used
    pub textures: Vec<TextureSource>,
    /// Diffuse colour (RGBA)
    pub diffuse_colour: [f32; 4],
    /// World transform of the owning node (identity for skinned meshes)
    pub bind_transform: Mat4,
}

impl Mesh {
    pub fn is_skinned(&self) -> bool {
        self.vertices.iter().any(|v| !v.influences.is_empty())
    }
}

// ============================================================================
// NODE TREE
// ============================================================================

/// Transform-tree entry
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub name: String,
    pub parent: Option<usize>,
    pub children: Vec<usize>,
    /// Local bind transform
    pub bind_transform: Mat4,
    /// Bone id when this node drives skinned vertices
    pub bone_id: Option<usize>,
    /// Mesh space to bone space (identity for non-bones)
    pub bone_offset: Mat4,
}

impl Node {
    pub fn new(name: impl Into<String>, parent: Option<usize>, bind_transform: Mat4) -> Self {
        Self {
            name: name.into(),
            parent,
            children: Vec::new(),
            bind_transform,
            bone_id: None,
            bone_offset: Mat4::IDENTITY,
        }
    }
}

// ============================================================================
// ANIMATION
// ============================================================================

/// One keyframe; time in ticks
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Keyframe<T> {
    pub time: f32,
    pub value: T,
}

/// Keyframe tracks for one node
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeChannels {
    pub positions: Vec<Keyframe<Vec3>>,
    pub rotations: Vec<Keyframe<Quat>>,
    pub scales: Vec<Keyframe<Vec3>>,
}

impl NodeChannels {
    pub fn has_keys(&self) -> bool {
        !self.positions.is_empty() || !self.rotations.is_empty() || !self.scales.is_empty()
    }
}

/// Animation clip
#[derive(Debug, Clone)]
pub struct Animation {
    pub name: String,
    /// Duration in ticks
    pub duration: f32,
    /// Ticks per millisecond (always > 0 after import)
    pub ticks_per_ms: f32,
    /// One entry per model node
    pub channels: Vec<NodeChannels>,
}

// ============================================================================
// MODEL
// ============================================================================

/// Imported model
#[derive(Debug, Clone)]
pub struct Model {
    /// Source path (or a caller-chosen name for in-memory models)
    pub path: PathBuf,
    pub meshes: Vec<Mesh>,
    pub nodes: Vec<Node>,
    pub root: usize,
    pub node_by_name: FxHashMap<String, usize>,
    /// Bone offset matrices, indexed by bone id
    pub bone_offsets: Vec<Mat4>,
    pub bone_by_name: FxHashMap<String, usize>,
    pub animations: Vec<Animation>,
}

impl Model {
    /// Empty model with a single identity root node
    pub fn new(path: impl AsRef<Path>) -> Self {
        let mut node_by_name = FxHashMap::default();
        node_by_name.insert("root".to_string(), 0);
        Self {
            path: path.as_ref().to_path_buf(),
            meshes: Vec::new(),
            nodes: vec![Node::new("root", None, Mat4::IDENTITY)],
            root: 0,
            node_by_name,
            bone_offsets: Vec::new(),
            bone_by_name: FxHashMap::default(),
            animations: Vec::new(),
        }
    }

    /// Append a node under `parent` and return its index
    pub fn add_node(&mut self, name: impl Into<String>, parent: usize, bind_transform: Mat4) -> usize {
        let index = self.nodes.len();
        let node = Node::new(name, Some(parent), bind_transform);
        self.node_by_name.entry(node.name.clone()).or_insert(index);
        self.nodes.push(node);
        self.nodes[parent].children.push(index);
        index
    }

    /// Register a bone by name, returning its id (existing id when already known)
    pub fn add_bone(&mut self, name: &str, offset: Mat4) -> usize {
        if let Some(&id) = self.bone_by_name.get(name) {
            return id;
        }
        let id = self.bone_offsets.len();
        self.bone_offsets.push(offset);
        self.bone_by_name.insert(name.to_string(), id);
        id
    }

    /// Copy bone ids and offsets onto the nodes whose names match a bone
    pub fn assign_bones_to_nodes(&mut self) {
        for node in &mut self.nodes {
            if let Some(&id) = self.bone_by_name.get(&node.name) {
                node.bone_id = Some(id);
                node.bone_offset = self.bone_offsets[id];
            }
        }
    }

    pub fn bone_count(&self) -> usize {
        self.bone_offsets.len()
    }

    pub fn is_skinned(&self) -> bool {
        !self.bone_offsets.is_empty()
    }

    /// Find an animation by name
    pub fn animation_index(&self, name: &str) -> Option<usize> {
        self.animations.iter().position(|a| a.name == name)
    }
}

#[cfg(test)]
#[path = "model_tests.rs"]
mod tests;
