use std::path::PathBuf;

use lod_ngin::{
    PipelineConfig, build_mesh_data,
    resources::{
        ImportedScene,
        mesh_file::{self, MeshFileError},
    },
};

mod common;

use common::test_utils::{grid_mesh, two_node_scene};

fn cache_path(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("lod-ngin-cache-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    dir.join(name)
}

#[test]
fn saved_mesh_data_loads_back_unchanged() {
    let mut imported = two_node_scene();
    imported.meshes.push(grid_mesh(48));
    let mesh_data = build_mesh_data(&imported, &PipelineConfig::default());
    let path = cache_path("scene.meshdata");

    mesh_file::save_mesh_data(&path, &mesh_data).unwrap();
    assert!(mesh_file::is_mesh_data_valid(&path));
    let loaded = mesh_file::load_mesh_data(&path).unwrap();
    assert_eq!(loaded, mesh_data);
}

#[test]
fn missing_or_damaged_caches_are_invalid() {
    let missing = cache_path("never-written.meshdata");
    assert!(!mesh_file::is_mesh_data_valid(&missing));
    assert!(matches!(
        mesh_file::load_mesh_data(&missing),
        Err(MeshFileError::Io(_))
    ));

    let mesh_data = build_mesh_data(&two_node_scene(), &PipelineConfig::default());
    let path = cache_path("damaged.meshdata");
    let mut bytes = mesh_file::serialize_mesh_data(&mesh_data);
    bytes.truncate(bytes.len() / 2);
    std::fs::write(&path, &bytes).unwrap();
    assert!(!mesh_file::is_mesh_data_valid(&path));
    assert!(mesh_file::load_mesh_data(&path).is_err());
}

#[test]
fn empty_mesh_data_round_trips() {
    let mesh_data = build_mesh_data(&ImportedScene::default(), &PipelineConfig::default());
    let path = cache_path("empty.meshdata");
    mesh_file::save_mesh_data(&path, &mesh_data).unwrap();
    assert_eq!(mesh_file::load_mesh_data(&path).unwrap(), mesh_data);
}
