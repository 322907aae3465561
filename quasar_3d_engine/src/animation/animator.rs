//! Skeletal animation evaluation.
//!
//! An `Animator` owns a copy of a model's node tree together with one
//! animation clip's keyframe tracks. Each `update` advances the clip time,
//! walks the tree from the root and rewrites the bone matrix array consumed
//! by the draw path.

use glam::{Mat4, Quat, Vec3};
use crate::error::Result;
use crate::graphics_device::Buffer;
use crate::import::{Animation, Keyframe, Model, Node, NodeChannels};
use crate::engine_warn;

/// Node copy with the clip's tracks for that node
#[derive(Debug, Clone)]
struct AnimatedNode {
    node: Node,
    channels: NodeChannels,
}

/// Per-clip animation instance
#[derive(Debug, Clone)]
pub struct Animator {
    name: String,
    /// Current time in ticks, always in `[0, duration)`
    time: f32,
    ticks_per_ms: f32,
    duration: f32,
    nodes: Vec<AnimatedNode>,
    root: usize,
    bone_offsets: Vec<Mat4>,
    bone_matrices: Vec<Mat4>,
    sentinel: bool,
}

impl Animator {
    /// Build an animator for one clip of `model`
    ///
    /// Bone matrices start in bind pose.
    pub fn new(model: &Model, animation: &Animation) -> Self {
        let ticks_per_ms = if animation.ticks_per_ms > 0.0 {
            animation.ticks_per_ms
        } else {
            engine_warn!("quasar3d::Animator", "Animation '{}' has ticks_per_ms {}, using 1 tick/ms",
                animation.name, animation.ticks_per_ms);
            1.0
        };

        let nodes = model
            .nodes
            .iter()
            .enumerate()
            .map(|(i, node)| AnimatedNode {
                node: node.clone(),
                channels: animation.channels.get(i).cloned().unwrap_or_default(),
            })
            .collect();

        let mut animator = Self {
            name: animation.name.clone(),
            time: 0.0,
            ticks_per_ms,
            duration: animation.duration,
            nodes,
            root: model.root,
            bone_offsets: model.bone_offsets.clone(),
            bone_matrices: vec![Mat4::IDENTITY; model.bone_offsets.len()],
            sentinel: false,
        };
        animator.return_to_bind_pose();
        animator
    }

    /// Sentinel animator: identity matrices, `update` does nothing
    pub fn empty(bone_count: usize) -> Self {
        Self {
            name: String::new(),
            time: 0.0,
            ticks_per_ms: 1.0,
            duration: 0.0,
            nodes: Vec::new(),
            root: 0,
            bone_offsets: Vec::new(),
            bone_matrices: vec![Mat4::IDENTITY; bone_count],
            sentinel: true,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.sentinel
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current time in ticks
    pub fn time(&self) -> f32 {
        self.time
    }

    pub fn duration(&self) -> f32 {
        self.duration
    }

    pub fn ticks_per_ms(&self) -> f32 {
        self.ticks_per_ms
    }

    /// Bone matrices indexed by bone id
    pub fn bone_matrices(&self) -> &[Mat4] {
        &self.bone_matrices
    }

    /// Advance the clip by `elapsed_ms` and recompute the bone matrices
    pub fn update(&mut self, elapsed_ms: f32) {
        if self.sentinel {
            return;
        }
        if self.duration > 0.0 {
            self.time = (self.time + elapsed_ms * self.ticks_per_ms) % self.duration;
        } else {
            self.time = 0.0;
        }
        if self.root < self.nodes.len() {
            self.evaluate(self.root, Mat4::IDENTITY, true);
        }
    }

    /// Recompute the bone matrices from bind transforms only
    pub fn return_to_bind_pose(&mut self) {
        if self.sentinel {
            return;
        }
        if self.root < self.nodes.len() {
            self.evaluate(self.root, Mat4::IDENTITY, false);
        }
    }

    /// Upload the bone matrices as tightly packed column-major `f32`s
    pub fn write_bone_matrices(&self, buffer: &dyn Buffer, offset: u64) -> Result<()> {
        buffer.update(offset, bytemuck::cast_slice(&self.bone_matrices))
    }

    /// Byte size of the bone matrix array
    pub fn bone_matrices_size(&self) -> u64 {
        (self.bone_matrices.len() * std::mem::size_of::<Mat4>()) as u64
    }

    fn evaluate(&mut self, index: usize, parent_world: Mat4, animated: bool) {
        let entry = &self.nodes[index];
        let local = match entry.node.bone_id {
            Some(_) if animated && entry.channels.has_keys() => {
                let t = self.time;
                let translation = sample_vec3(&entry.channels.positions, t, Vec3::ZERO);
                let rotation = sample_quat(&entry.channels.rotations, t);
                let scale = sample_vec3(&entry.channels.scales, t, Vec3::ONE);
                Mat4::from_translation(translation) * Mat4::from_quat(rotation) * Mat4::from_scale(scale)
            }
            _ => entry.node.bind_transform,
        };
        let world = parent_world * local;

        if let Some(bone) = entry.node.bone_id {
            if let Some(slot) = self.bone_matrices.get_mut(bone) {
                let offset = self.bone_offsets.get(bone).copied().unwrap_or(entry.node.bone_offset);
                *slot = world * offset;
            }
        }

        let children = entry.node.children.clone();
        for child in children {
            if child < self.nodes.len() {
                self.evaluate(child, world, animated);
            }
        }
    }
}

// ============================================================================
// SAMPLING
// ============================================================================

/// Locate the key pair around `t` and the blend factor between them
///
/// `second` is the first key with `time >= t`; `first` is the one before it,
/// wrapping to the last key when `second` is the first key. Returns `None`
/// when no key is at or after `t`.
fn key_pair<T>(keys: &[Keyframe<T>], t: f32) -> Option<(usize, usize, f32)> {
    let second = keys.iter().position(|k| k.time >= t)?;
    let first = if second == 0 { keys.len() - 1 } else { second - 1 };
    let span = keys[second].time - keys[first].time;
    let factor = if span == 0.0 {
        1.0
    } else {
        ((t - keys[first].time) / span).clamp(0.0, 1.0)
    };
    Some((first, second, factor))
}

/// Sample a translation or scale track (`identity` when the track is empty)
pub fn sample_vec3(keys: &[Keyframe<Vec3>], t: f32, identity: Vec3) -> Vec3 {
    match keys {
        [] => identity,
        [only] => only.value,
        _ => match key_pair(keys, t) {
            Some((first, second, factor)) => keys[first].value.lerp(keys[second].value, factor),
            None => keys[keys.len() - 1].value,
        },
    }
}

/// Sample a rotation track (identity when the track is empty)
pub fn sample_quat(keys: &[Keyframe<Quat>], t: f32) -> Quat {
    match keys {
        [] => Quat::IDENTITY,
        [only] => only.value,
        _ => match key_pair(keys, t) {
            Some((first, second, factor)) => keys[first]
                .value
                .normalize()
                .slerp(keys[second].value.normalize(), factor),
            None => keys[keys.len() - 1].value,
        },
    }
}

#[cfg(test)]
#[path = "animator_tests.rs"]
mod tests;
