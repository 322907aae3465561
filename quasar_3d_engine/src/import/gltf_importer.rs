//! glTF model import.
//!
//! Wraps the `gltf` crate and produces a `Model`: node tree, meshes with
//! texture references, bone tables and animation clips.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use glam::{Mat4, Quat, Vec2, Vec3};
use gltf::animation::util::ReadOutputs;
use gltf::animation::{Interpolation, Property};

use crate::error::{Error, Result};
use crate::import::{
    Animation, BoneInfluence, ImportedVertex, Keyframe, Mesh, Model, Node, NodeChannels, TextureSource,
};
use crate::{engine_debug, engine_error, engine_warn};

/// Seconds (glTF sampler input) to milliseconds (ticks at 1 tick/ms)
const MS_PER_SECOND: f32 = 1000.0;

fn import_error(path: &Path, message: impl std::fmt::Display) -> Error {
    engine_error!("quasar3d::import", "Failed to import '{}': {}", path.display(), message);
    Error::ImportFailed(format!("{}: {}", path.display(), message))
}

/// Import a glTF (`.gltf` or `.glb`) model
///
/// # Errors
///
/// `Error::ImportFailed` when the file cannot be read or parsed, or when the
/// scene has no root node.
pub fn load_model(path: impl AsRef<Path>) -> Result<Model> {
    let path = path.as_ref();
    let gltf = gltf::Gltf::open(path).map_err(|e| import_error(path, e))?;
    let gltf::Gltf { document, blob } = gltf;
    let base = path.parent().unwrap_or_else(|| Path::new(""));
    let buffers = gltf::import_buffers(&document, Some(base), blob)
        .map_err(|e| import_error(path, e))?;

    let importer = GltfImporter {
        path,
        base,
        buffers: &buffers,
        model: Model::new(path),
    };
    let model = importer.run(&document)?;

    engine_debug!("quasar3d::import", "Imported '{}': {} meshes, {} nodes, {} bones, {} animations",
        path.display(), model.meshes.len(), model.nodes.len(), model.bone_count(), model.animations.len());

    Ok(model)
}

// ============================================================================
// IMPORTER
// ============================================================================

struct GltfImporter<'a> {
    path: &'a Path,
    base: &'a Path,
    buffers: &'a [gltf::buffer::Data],
    model: Model,
}

/// Name used for a glTF node (unnamed nodes get a stable synthetic name)
fn node_name(node: &gltf::Node) -> String {
    match node.name() {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => format!("node{}", node.index()),
    }
}

fn local_transform(node: &gltf::Node) -> Mat4 {
    Mat4::from_cols_array_2d(&node.transform().matrix())
}

impl<'a> GltfImporter<'a> {
    fn run(mut self, document: &gltf::Document) -> Result<Model> {
        let scene = document
            .default_scene()
            .or_else(|| document.scenes().next())
            .ok_or_else(|| import_error(self.path, "no root node"))?;
        let roots: Vec<gltf::Node> = scene.nodes().collect();
        if roots.is_empty() {
            return Err(import_error(self.path, "no root node"));
        }

        if roots.len() == 1 {
            let root = &roots[0];
            let local = local_transform(root);
            self.model.nodes[0] = Node::new(node_name(root), None, local);
            self.model.node_by_name.clear();
            self.model.node_by_name.insert(node_name(root), 0);
            self.visit_meshes(root, local)?;
            for child in root.children() {
                self.visit(&child, 0, local)?;
            }
        } else {
            // Synthetic identity root keeps a single tree
            for root in &roots {
                self.visit(root, 0, Mat4::IDENTITY)?;
            }
        }

        self.model.assign_bones_to_nodes();
        self.read_animations(document);
        Ok(self.model)
    }

    /// Depth-first node walk
    fn visit(&mut self, node: &gltf::Node, parent: usize, parent_world: Mat4) -> Result<()> {
        let local = local_transform(node);
        let index = self.model.add_node(node_name(node), parent, local);
        let world = parent_world * local;
        self.visit_meshes(node, world)?;
        for child in node.children() {
            self.visit(&child, index, world)?;
        }
        Ok(())
    }

    fn visit_meshes(&mut self, node: &gltf::Node, world: Mat4) -> Result<()> {
        let Some(mesh) = node.mesh() else {
            return Ok(());
        };
        let joint_bones = match node.skin() {
            Some(skin) => Some(self.register_skin(&skin)),
            None => None,
        };

        for (prim_index, primitive) in mesh.primitives().enumerate() {
            if primitive.mode() != gltf::mesh::Mode::Triangles {
                engine_warn!("quasar3d::import", "'{}': skipping non-triangle primitive {} of mesh '{}'",
                    self.path.display(), prim_index, mesh.name().unwrap_or(""));
                continue;
            }
            let name = match mesh.name() {
                Some(n) => format!("{}#{}", n, prim_index),
                None => format!("mesh{}#{}", mesh.index(), prim_index),
            };
            let imported = self.read_primitive(&primitive, name, world, joint_bones.as_deref())?;
            self.model.meshes.push(imported);
        }
        Ok(())
    }

    /// Register a skin's joints as bones, returning joint index → bone id
    ///
    /// Bones are shared by name across meshes; the first registration of a
    /// name fixes its offset.
    fn register_skin(&mut self, skin: &gltf::Skin) -> Vec<u32> {
        let buffers = self.buffers;
        let reader = skin.reader(|b| buffers.get(b.index()).map(|d| d.0.as_slice()));
        let inverse_binds: Vec<Mat4> = match reader.read_inverse_bind_matrices() {
            Some(iter) => iter.map(|m| Mat4::from_cols_array_2d(&m)).collect(),
            None => Vec::new(),
        };

        // Skinned meshes are bound at identity
        let mesh_bind = Mat4::IDENTITY;
        skin.joints()
            .enumerate()
            .map(|(i, joint)| {
                let inverse_bind = inverse_binds.get(i).copied().unwrap_or(Mat4::IDENTITY);
                self.model.add_bone(&node_name(&joint), inverse_bind * mesh_bind) as u32
            })
            .collect()
    }

    fn read_primitive(
        &self,
        primitive: &gltf::Primitive,
        name: String,
        world: Mat4,
        joint_bones: Option<&[u32]>,
    ) -> Result<Mesh> {
        let buffers = self.buffers;
        let reader = primitive.reader(|b| buffers.get(b.index()).map(|d| d.0.as_slice()));

        let positions: Vec<Vec3> = match reader.read_positions() {
            Some(iter) => iter.map(Vec3::from).collect(),
            None => return Err(import_error(self.path, format!("mesh '{}' has no positions", name))),
        };
        let count = positions.len();
        let normals: Vec<Vec3> = match reader.read_normals() {
            Some(iter) => iter.map(Vec3::from).collect(),
            None => vec![Vec3::Z; count],
        };
        let uvs: Vec<Vec2> = match reader.read_tex_coords(0) {
            Some(iter) => iter.into_f32().map(Vec2::from).collect(),
            None => vec![Vec2::ZERO; count],
        };

        let mut vertices: Vec<ImportedVertex> = (0..count)
            .map(|i| {
                ImportedVertex::new(
                    positions[i],
                    normals.get(i).copied().unwrap_or(Vec3::Z),
                    uvs.get(i).copied().unwrap_or(Vec2::ZERO),
                )
            })
            .collect();

        let mut skinned = false;
        if let Some(joint_bones) = joint_bones {
            for set in 0..2 {
                let (Some(joints), Some(weights)) = (reader.read_joints(set), reader.read_weights(set)) else {
                    continue;
                };
                skinned = true;
                for (vertex, (j, w)) in vertices.iter_mut().zip(joints.into_u16().zip(weights.into_f32())) {
                    for slot in 0..4 {
                        if w[slot] == 0.0 {
                            continue;
                        }
                        let Some(&bone) = joint_bones.get(j[slot] as usize) else {
                            engine_warn!("quasar3d::import", "'{}': joint {} out of range in mesh '{}'",
                                self.path.display(), j[slot], name);
                            continue;
                        };
                        vertex.influences.push(BoneInfluence { bone, weight: w[slot] });
                    }
                }
            }
        }

        let indices: Vec<u32> = match reader.read_indices() {
            Some(iter) => iter.into_u32().collect(),
            None => (0..count as u32).collect(),
        };

        let pbr = primitive.material().pbr_metallic_roughness();
        let mut textures = Vec::new();
        if let Some(info) = pbr.base_color_texture() {
            if let Some(source) = self.texture_source(&info.texture()) {
                textures.push(source);
            }
        }

        Ok(Mesh {
            name,
            vertices,
            indices,
            textures,
            diffuse_colour: pbr.base_color_factor(),
            bind_transform: if skinned { Mat4::IDENTITY } else { world },
        })
    }

    fn texture_source(&self, texture: &gltf::Texture) -> Option<TextureSource> {
        let image = texture.source();
        match image.source() {
            gltf::image::Source::Uri { uri, .. } => {
                if uri.starts_with("data:") {
                    engine_warn!("quasar3d::import", "'{}': data URI images are not supported (image {})",
                        self.path.display(), image.index());
                    return None;
                }
                Some(TextureSource::File(self.base.join(PathBuf::from(uri))))
            }
            gltf::image::Source::View { view, .. } => {
                let data = self.buffers.get(view.buffer().index())?;
                let start = view.offset();
                let end = start + view.length();
                if end > data.0.len() {
                    engine_warn!("quasar3d::import", "'{}': image {} view out of bounds",
                        self.path.display(), image.index());
                    return None;
                }
                Some(TextureSource::Embedded {
                    key: format!("{}#image{}", self.path.display(), image.index()),
                    bytes: Arc::new(data.0[start..end].to_vec()),
                })
            }
        }
    }

    // ========================================================================
    // ANIMATIONS
    // ========================================================================

    fn read_animations(&mut self, document: &gltf::Document) {
        let buffers = self.buffers;
        for (anim_index, anim) in document.animations().enumerate() {
            let name = match anim.name() {
                Some(n) if !n.is_empty() => n.to_string(),
                _ => format!("animation{}", anim_index),
            };
            let mut channels = vec![NodeChannels::default(); self.model.nodes.len()];
            let mut duration = 0.0f32;

            for channel in anim.channels() {
                let target_name = node_name(&channel.target().node());
                let Some(&node) = self.model.node_by_name.get(&target_name) else {
                    engine_warn!("quasar3d::import", "'{}': animation '{}' targets unknown node '{}'",
                        self.path.display(), name, target_name);
                    continue;
                };
                let cubic = channel.sampler().interpolation() == Interpolation::CubicSpline;
                let reader = channel.reader(|b| buffers.get(b.index()).map(|d| d.0.as_slice()));
                let Some(inputs) = reader.read_inputs() else {
                    continue;
                };
                let times: Vec<f32> = inputs.map(|t| t * MS_PER_SECOND).collect();
                if let Some(&last) = times.last() {
                    duration = duration.max(last);
                }
                let Some(outputs) = reader.read_outputs() else {
                    continue;
                };

                let target = &mut channels[node];
                match (channel.target().property(), outputs) {
                    (Property::Translation, ReadOutputs::Translations(iter)) => {
                        target.positions = keyframes(&times, iter.map(Vec3::from).collect(), cubic);
                    }
                    (Property::Rotation, ReadOutputs::Rotations(iter)) => {
                        let values = iter.into_f32().map(|q| Quat::from_array(q).normalize()).collect();
                        target.rotations = keyframes(&times, values, cubic);
                    }
                    (Property::Scale, ReadOutputs::Scales(iter)) => {
                        target.scales = keyframes(&times, iter.map(Vec3::from).collect(), cubic);
                    }
                    _ => {}
                }
            }

            self.model.animations.push(Animation {
                name,
                duration,
                ticks_per_ms: 1.0,
                channels,
            });
        }
    }
}

/// Pair sampler times with values; cubic-spline samplers keep only the value
/// element of each (in-tangent, value, out-tangent) triple
fn keyframes<T: Copy>(times: &[f32], values: Vec<T>, cubic: bool) -> Vec<Keyframe<T>> {
    let values: Vec<T> = if cubic {
        values.chunks_exact(3).map(|c| c[1]).collect()
    } else {
        values
    };
    times
        .iter()
        .zip(values)
        .map(|(&time, value)| Keyframe { time, value })
        .collect()
}

#[cfg(test)]
#[path = "gltf_importer_tests.rs"]
mod tests;
