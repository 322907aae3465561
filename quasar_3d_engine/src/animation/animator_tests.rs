//! Unit tests for animator.rs
//!
//! Tests keyframe sampling, time wrapping, bone matrix composition, bind pose
//! and the sentinel animator.

use glam::{Mat4, Quat, Vec3};
use crate::animation::{Animator, sample_vec3, sample_quat};
use crate::graphics_device::mock_graphics_device::MockBuffer;
use crate::graphics_device::{Buffer, BufferUsage};
use crate::import::{Animation, Keyframe, Model, NodeChannels};

// ============================================================================
// FIXTURE
// ============================================================================

fn key<T>(time: f32, value: T) -> Keyframe<T> {
    Keyframe { time, value }
}

/// root → hip (bone 0, bind +Y) → knee (bone 1, bind +Y), plus a non-bone prop
fn skeleton() -> Model {
    let mut model = Model::new("skeleton");
    let hip = model.add_node("hip", 0, Mat4::from_translation(Vec3::Y));
    model.add_node("knee", hip, Mat4::from_translation(Vec3::Y));
    model.add_node("prop", 0, Mat4::from_translation(Vec3::X));
    model.add_bone("hip", Mat4::from_translation(-Vec3::Y));
    model.add_bone("knee", Mat4::from_translation(-2.0 * Vec3::Y));
    model.assign_bones_to_nodes();
    model
}

/// Knee translates from (0,1,0) to (0,3,0) over 10 ticks
fn walk(model: &Model, ticks_per_ms: f32) -> Animation {
    let mut channels = vec![NodeChannels::default(); model.nodes.len()];
    let knee = model.node_by_name["knee"];
    channels[knee].positions = vec![key(0.0, Vec3::Y), key(10.0, 3.0 * Vec3::Y)];
    Animation {
        name: "walk".to_string(),
        duration: 10.0,
        ticks_per_ms,
        channels,
    }
}

// ============================================================================
// SAMPLING TESTS
// ============================================================================

#[test]
fn test_sample_empty_track_is_identity() {
    assert_eq!(sample_vec3(&[], 3.0, Vec3::ONE), Vec3::ONE);
    assert_eq!(sample_quat(&[], 3.0), Quat::IDENTITY);
}

#[test]
fn test_sample_single_key_returns_value() {
    let keys = [key(4.0, Vec3::new(1.0, 2.0, 3.0))];
    assert_eq!(sample_vec3(&keys, 0.0, Vec3::ZERO), Vec3::new(1.0, 2.0, 3.0));
    assert_eq!(sample_vec3(&keys, 99.0, Vec3::ZERO), Vec3::new(1.0, 2.0, 3.0));
}

#[test]
fn test_sample_linear_interpolation() {
    let keys = [key(0.0, Vec3::ZERO), key(10.0, Vec3::new(10.0, 0.0, 0.0))];
    assert_eq!(sample_vec3(&keys, 0.0, Vec3::ZERO), Vec3::ZERO);
    assert_eq!(sample_vec3(&keys, 5.0, Vec3::ZERO), Vec3::new(5.0, 0.0, 0.0));
    assert_eq!(sample_vec3(&keys, 10.0, Vec3::ZERO), Vec3::new(10.0, 0.0, 0.0));
}

#[test]
fn test_sample_past_last_key_holds_last_value() {
    let keys = [key(0.0, Vec3::ZERO), key(10.0, Vec3::X)];
    assert_eq!(sample_vec3(&keys, 12.0, Vec3::ZERO), Vec3::X);
}

#[test]
fn test_sample_before_first_key_clamps() {
    let keys = [key(2.0, Vec3::X), key(10.0, Vec3::Y)];
    assert_eq!(sample_vec3(&keys, 1.0, Vec3::ZERO), Vec3::X);
}

#[test]
fn test_sample_zero_span_takes_second_key() {
    let keys = [key(5.0, Vec3::X), key(5.0, Vec3::Y)];
    assert_eq!(sample_vec3(&keys, 5.0, Vec3::ZERO), Vec3::X);
    let keys = [key(0.0, Vec3::Z), key(5.0, Vec3::X), key(5.0, Vec3::Y)];
    assert_eq!(sample_vec3(&keys, 5.0, Vec3::ZERO), Vec3::X);
}

#[test]
fn test_sample_quat_slerp_halfway() {
    let keys = [
        key(0.0, Quat::IDENTITY),
        key(10.0, Quat::from_rotation_z(std::f32::consts::FRAC_PI_2)),
    ];
    let half = sample_quat(&keys, 5.0);
    let expected = Quat::from_rotation_z(std::f32::consts::FRAC_PI_4);
    assert!(half.abs_diff_eq(expected, 1e-5));
}

// ============================================================================
// TIME TESTS
// ============================================================================

#[test]
fn test_time_wraps_modulo_duration() {
    let model = skeleton();
    let mut animator = Animator::new(&model, &walk(&model, 1.0));
    animator.update(13.0);
    assert!((animator.time() - 3.0).abs() < 1e-5);
}

#[test]
fn test_wrapped_pose_matches_unwrapped_pose() {
    let model = skeleton();
    let mut wrapped = Animator::new(&model, &walk(&model, 1.0));
    wrapped.update(6.0);
    wrapped.update(7.0);

    let mut direct = Animator::new(&model, &walk(&model, 1.0));
    direct.update(3.0);

    assert!((wrapped.time() - direct.time()).abs() < 1e-5);
    for (a, b) in wrapped.bone_matrices().iter().zip(direct.bone_matrices()) {
        assert!(a.abs_diff_eq(*b, 1e-5), "{:?} != {:?}", a, b);
    }
    // knee at t=3: local = +1.6Y, world = +2.6Y, offset -2Y
    let knee = wrapped.bone_matrices()[1].transform_point3(Vec3::ZERO);
    assert!(knee.abs_diff_eq(Vec3::new(0.0, 0.6, 0.0), 1e-5), "{:?}", knee);
}

#[test]
fn test_ticks_per_ms_scales_time() {
    let model = skeleton();
    let mut animator = Animator::new(&model, &walk(&model, 0.5));
    animator.update(8.0);
    assert!((animator.time() - 4.0).abs() < 1e-5);
}

#[test]
fn test_non_positive_ticks_per_ms_defaults_to_one() {
    let model = skeleton();
    let animator = Animator::new(&model, &walk(&model, 0.0));
    assert_eq!(animator.ticks_per_ms(), 1.0);
}

#[test]
fn test_zero_duration_keeps_time_at_zero() {
    let model = skeleton();
    let mut clip = walk(&model, 1.0);
    clip.duration = 0.0;
    let mut animator = Animator::new(&model, &clip);
    animator.update(50.0);
    assert_eq!(animator.time(), 0.0);
}

// ============================================================================
// BONE MATRIX TESTS
// ============================================================================

#[test]
fn test_bone_matrix_count_matches_model() {
    let model = skeleton();
    let animator = Animator::new(&model, &walk(&model, 1.0));
    assert_eq!(animator.bone_matrices().len(), model.bone_offsets.len());
}

#[test]
fn test_bind_pose_cancels_offsets() {
    let model = skeleton();
    let animator = Animator::new(&model, &walk(&model, 1.0));
    // world(hip) = +1Y, offset = -1Y; world(knee) = +2Y, offset = -2Y
    for m in animator.bone_matrices() {
        assert!(m.abs_diff_eq(Mat4::IDENTITY, 1e-5));
    }
}

#[test]
fn test_update_composes_parent_local_offset() {
    let model = skeleton();
    let mut animator = Animator::new(&model, &walk(&model, 1.0));
    animator.update(5.0);

    // hip has no keys: bind. knee at t=5: local = +2Y, world = +3Y, offset -2Y
    let knee = animator.bone_matrices()[1];
    let moved = knee.transform_point3(Vec3::ZERO);
    assert!(moved.abs_diff_eq(Vec3::Y, 1e-5));
    assert!(animator.bone_matrices()[0].abs_diff_eq(Mat4::IDENTITY, 1e-5));
}

#[test]
fn test_return_to_bind_pose_is_idempotent() {
    let model = skeleton();
    let mut animator = Animator::new(&model, &walk(&model, 1.0));
    animator.update(7.0);
    animator.return_to_bind_pose();
    let first: Vec<Mat4> = animator.bone_matrices().to_vec();
    animator.return_to_bind_pose();
    assert_eq!(animator.bone_matrices(), first.as_slice());
    assert!(first[1].abs_diff_eq(Mat4::IDENTITY, 1e-5));
}

// ============================================================================
// SENTINEL TESTS
// ============================================================================

#[test]
fn test_empty_animator_is_identity_and_static() {
    let mut animator = Animator::empty(3);
    assert!(animator.is_empty());
    animator.update(100.0);
    assert_eq!(animator.time(), 0.0);
    assert_eq!(animator.bone_matrices(), &[Mat4::IDENTITY; 3]);
}

// ============================================================================
// UPLOAD TESTS
// ============================================================================

#[test]
fn test_write_bone_matrices_packs_column_major() {
    let model = skeleton();
    let mut animator = Animator::new(&model, &walk(&model, 1.0));
    animator.update(5.0);

    let buffer = MockBuffer::new(1, 16 + animator.bone_matrices_size(), BufferUsage::Uniform);
    animator.write_bone_matrices(&buffer, 16).unwrap();

    let bytes = buffer.contents();
    let floats: Vec<f32> = bytes[16..]
        .chunks_exact(4)
        .map(|c| f32::from_ne_bytes([c[0], c[1], c[2], c[3]]))
        .collect();
    assert_eq!(floats.len(), 32);
    assert_eq!(&floats[16..32], &animator.bone_matrices()[1].to_cols_array());
    assert!(buffer.size() > 0);
}
