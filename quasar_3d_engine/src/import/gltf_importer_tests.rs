//! Unit tests for gltf_importer.rs
//!
//! Writes a small glTF scene (JSON + external .bin) into a temporary directory
//! and checks the resulting node tree, bone tables, meshes and animations.

use std::path::{Path, PathBuf};
use glam::{Mat4, Vec3};
use crate::error::Error;
use crate::import::{load_model, TextureSource};
use super::keyframes;

// ============================================================================
// FIXTURE
// ============================================================================

fn temp_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("quasar3d_gltf_{}_{}", name, std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

fn push_f32s(bytes: &mut Vec<u8>, values: &[f32]) {
    for v in values {
        bytes.extend_from_slice(&v.to_le_bytes());
    }
}

fn inverse_bind(i: usize) -> Mat4 {
    Mat4::from_translation(Vec3::new(0.0, -(i as f32 + 1.0), 0.0))
}

/// Binary buffer: positions, joints, weights, inverse binds, anim times, anim translations
fn scene_buffer() -> Vec<u8> {
    let mut bytes = Vec::new();
    // 0: positions (36)
    push_f32s(&mut bytes, &[0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0]);
    // 36: joints u16x4 (24)
    for _ in 0..3 {
        for j in [0u16, 1, 0, 0] {
            bytes.extend_from_slice(&j.to_le_bytes());
        }
    }
    // 60: weights (48)
    for _ in 0..3 {
        push_f32s(&mut bytes, &[0.5, 0.5, 0.0, 0.0]);
    }
    // 108: inverse bind matrices (128)
    for i in 0..2 {
        push_f32s(&mut bytes, &inverse_bind(i).to_cols_array());
    }
    // 236: times (8)
    push_f32s(&mut bytes, &[0.0, 1.0]);
    // 244: translations (24)
    push_f32s(&mut bytes, &[0.0, 1.0, 0.0, 0.0, 3.0, 0.0]);
    assert_eq!(bytes.len(), 268);
    bytes
}

const SCENE_JSON: &str = r#"{
  "asset": { "version": "2.0" },
  "scene": 0,
  "scenes": [ { "nodes": [0, 4] } ],
  "nodes": [
    { "name": "Armature", "children": [1, 2] },
    { "name": "body", "mesh": 0, "skin": 0 },
    { "name": "hip", "translation": [0.0, 1.0, 0.0], "children": [3] },
    { "name": "knee", "translation": [0.0, 1.0, 0.0] },
    { "name": "prop", "mesh": 1, "translation": [5.0, 0.0, 0.0] }
  ],
  "meshes": [
    { "name": "body", "primitives": [ { "attributes": { "POSITION": 0, "JOINTS_0": 1, "WEIGHTS_0": 2 } } ] },
    { "name": "prop", "primitives": [ { "attributes": { "POSITION": 0 }, "material": 0 } ] }
  ],
  "materials": [
    { "pbrMetallicRoughness": { "baseColorFactor": [1.0, 0.0, 0.0, 1.0], "baseColorTexture": { "index": 0 } } }
  ],
  "textures": [ { "source": 0 } ],
  "images": [ { "uri": "diffuse.png" } ],
  "skins": [ { "joints": [2, 3], "inverseBindMatrices": 3 } ],
  "animations": [
    {
      "name": "walk",
      "channels": [ { "sampler": 0, "target": { "node": 3, "path": "translation" } } ],
      "samplers": [ { "input": 4, "output": 5, "interpolation": "LINEAR" } ]
    }
  ],
  "buffers": [ { "uri": "scene.bin", "byteLength": 268 } ],
  "bufferViews": [
    { "buffer": 0, "byteOffset": 0, "byteLength": 36 },
    { "buffer": 0, "byteOffset": 36, "byteLength": 24 },
    { "buffer": 0, "byteOffset": 60, "byteLength": 48 },
    { "buffer": 0, "byteOffset": 108, "byteLength": 128 },
    { "buffer": 0, "byteOffset": 236, "byteLength": 8 },
    { "buffer": 0, "byteOffset": 244, "byteLength": 24 }
  ],
  "accessors": [
    { "bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3", "min": [0.0, 0.0, 0.0], "max": [1.0, 1.0, 0.0] },
    { "bufferView": 1, "componentType": 5123, "count": 3, "type": "VEC4" },
    { "bufferView": 2, "componentType": 5126, "count": 3, "type": "VEC4" },
    { "bufferView": 3, "componentType": 5126, "count": 2, "type": "MAT4" },
    { "bufferView": 4, "componentType": 5126, "count": 2, "type": "SCALAR", "min": [0.0], "max": [1.0] },
    { "bufferView": 5, "componentType": 5126, "count": 2, "type": "VEC3" }
  ]
}"#;

fn write_scene(name: &str) -> PathBuf {
    let dir = temp_dir(name);
    std::fs::write(dir.join("scene.bin"), scene_buffer()).unwrap();
    let path = dir.join("scene.gltf");
    std::fs::write(&path, SCENE_JSON).unwrap();
    path
}

// ============================================================================
// NODE TREE TESTS
// ============================================================================

#[test]
fn test_multiple_roots_get_synthetic_root() {
    let model = load_model(write_scene("roots")).unwrap();

    let names: Vec<&str> = model.nodes.iter().map(|n| n.name.as_str()).collect();
    assert_eq!(names, vec!["root", "Armature", "body", "hip", "knee", "prop"]);
    assert_eq!(model.nodes[0].bind_transform, Mat4::IDENTITY);
    assert_eq!(model.nodes[0].children, vec![1, 5]);
    assert_eq!(model.nodes[4].parent, Some(3));
}

#[test]
fn test_bones_assigned_by_name() {
    let model = load_model(write_scene("bones")).unwrap();

    assert_eq!(model.bone_count(), 2);
    assert_eq!(model.bone_by_name["hip"], 0);
    assert_eq!(model.bone_by_name["knee"], 1);
    assert_eq!(model.bone_offsets[1], inverse_bind(1));

    let knee = &model.nodes[model.node_by_name["knee"]];
    assert_eq!(knee.bone_id, Some(1));
    assert_eq!(knee.bone_offset, inverse_bind(1));
    assert_eq!(model.nodes[model.node_by_name["prop"]].bone_id, None);
}

// ============================================================================
// MESH TESTS
// ============================================================================

#[test]
fn test_skinned_mesh_has_identity_bind_and_influences() {
    let model = load_model(write_scene("skinned")).unwrap();
    let body = &model.meshes[0];

    assert_eq!(body.bind_transform, Mat4::IDENTITY);
    assert_eq!(body.vertices.len(), 3);
    // Generated indices
    assert_eq!(body.indices, vec![0, 1, 2]);
    // Zero weights dropped
    let influences = &body.vertices[0].influences;
    assert_eq!(influences.len(), 2);
    assert_eq!((influences[0].bone, influences[1].bone), (0, 1));
    assert!(body.textures.is_empty());
}

#[test]
fn test_static_mesh_bind_is_world_transform() {
    let model = load_model(write_scene("static")).unwrap();
    let prop = &model.meshes[1];

    assert_eq!(prop.bind_transform, Mat4::from_translation(Vec3::new(5.0, 0.0, 0.0)));
    assert_eq!(prop.diffuse_colour, [1.0, 0.0, 0.0, 1.0]);
    assert!(prop.vertices.iter().all(|v| v.influences.is_empty()));
}

#[test]
fn test_texture_uri_resolves_next_to_model() {
    let path = write_scene("texture");
    let model = load_model(&path).unwrap();

    let expected = path.parent().unwrap().join("diffuse.png");
    assert_eq!(model.meshes[1].textures, vec![TextureSource::File(expected)]);
}

// ============================================================================
// ANIMATION TESTS
// ============================================================================

#[test]
fn test_animation_times_in_milliseconds() {
    let model = load_model(write_scene("anim")).unwrap();
    assert_eq!(model.animations.len(), 1);

    let walk = &model.animations[0];
    assert_eq!(walk.name, "walk");
    assert_eq!(walk.ticks_per_ms, 1.0);
    assert_eq!(walk.duration, 1000.0);
    assert_eq!(walk.channels.len(), model.nodes.len());

    let knee = model.node_by_name["knee"];
    let keys = &walk.channels[knee].positions;
    assert_eq!(keys.len(), 2);
    assert_eq!(keys[1].time, 1000.0);
    assert_eq!(keys[1].value, Vec3::new(0.0, 3.0, 0.0));
    assert!(!walk.channels[model.node_by_name["hip"]].has_keys());
}

#[test]
fn test_cubic_spline_keeps_value_elements() {
    let values = vec![1.0f32, 2.0, 3.0, 4.0, 5.0, 6.0];
    let keys = keyframes(&[0.0, 10.0], values, true);
    assert_eq!(keys.len(), 2);
    assert_eq!(keys[0].value, 2.0);
    assert_eq!(keys[1].value, 5.0);
    assert_eq!(keys[1].time, 10.0);
}

// ============================================================================
// FAILURE TESTS
// ============================================================================

#[test]
fn test_missing_file_is_import_failed() {
    let result = load_model(Path::new("/definitely/not/here/model.gltf"));
    assert!(matches!(result, Err(Error::ImportFailed(_))));
}

#[test]
fn test_empty_scene_has_no_root_node() {
    let dir = temp_dir("empty");
    let path = dir.join("empty.gltf");
    std::fs::write(&path, r#"{ "asset": { "version": "2.0" }, "scenes": [ { "nodes": [] } ] }"#).unwrap();

    match load_model(&path) {
        Err(Error::ImportFailed(msg)) => assert!(msg.contains("no root node")),
        other => panic!("expected ImportFailed, got {:?}", other.map(|m| m.nodes.len())),
    }
}
