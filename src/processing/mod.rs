//! Turning imported geometry into a packed [`MeshData`].
//!
//! - `optimizer` deduplicates and reorders vertex/index streams
//! - `lod` builds the simplified LOD cascade of one index buffer
//! - `packer` appends submeshes and their LODs to the shared buffers
//! - `material` bakes imported materials and interns texture paths
//! - `texture_cache` resolves texture slots to loaded textures on demand

use std::path::Path;

use instant::Instant;

use crate::{
    config::PipelineConfig,
    data_structures::{material::Material, mesh::MeshData, scene_graph::Scene},
    resources::{self, ImportError, ImportedScene},
};

pub mod lod;
pub mod material;
pub mod optimizer;
pub mod packer;
pub mod texture_cache;

/// Bakes every material and packs every submesh of `imported`, in order.
///
/// Submesh `i` of the result is imported mesh `i`. Meshes without a valid
/// material share a default one appended after the imported materials.
pub fn build_mesh_data(imported: &ImportedScene, config: &PipelineConfig) -> MeshData {
    let mut data = MeshData::default();
    data.materials = imported
        .materials
        .iter()
        .map(|m| material::bake_material(m, &mut data.texture_files))
        .collect();

    let mut default_material = None;
    let mut packer = packer::MeshPacker::new(config);
    for (i, mesh) in imported.meshes.iter().enumerate() {
        log::info!("Converting meshes {}/{}...", i + 1, imported.meshes.len());
        let material_id = match mesh.material_index {
            Some(index) if index < imported.materials.len() => index as u32,
            _ => *default_material.get_or_insert_with(|| {
                data.materials.push(Material::default());
                (data.materials.len() - 1) as u32
            }),
        };
        let packed = packer.pack(mesh, material_id, &mut data);
        data.meshes.push(packed);
    }

    data.recalculate_bounding_boxes();
    debug_assert!(data.validate().is_ok());
    data
}

/// Imports the model at `path` and prepares both its mesh data and scene.
pub fn load_model(
    path: &Path,
    config: &PipelineConfig,
) -> Result<(MeshData, Scene), ImportError> {
    log::info!("Loading '{}'...", path.display());
    let start = Instant::now();
    let imported = resources::load_mesh_file(path)?;
    let mesh_data = build_mesh_data(&imported, config);
    let scene = Scene::from_import(&imported, &mesh_data);
    log::info!(
        "Prepared {} submeshes, {} materials, {} textures in {:?}",
        mesh_data.meshes.len(),
        mesh_data.materials.len(),
        mesh_data.texture_files.len(),
        start.elapsed()
    );
    Ok((mesh_data, scene))
}
