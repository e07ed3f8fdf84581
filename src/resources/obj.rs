//! Wavefront OBJ import via `tobj`.

use std::path::Path;

use cgmath::{Matrix4, SquareMatrix};

use crate::resources::{
    ImportError, ImportedMaterial, ImportedMesh, ImportedNode, ImportedScene, texture_path,
};

pub fn import(path: &Path) -> Result<ImportedScene, ImportError> {
    let (models, materials) = tobj::load_obj(
        path,
        &tobj::LoadOptions {
            triangulate: true,
            single_index: true,
            ..Default::default()
        },
    )
    .map_err(|e| ImportError::Parse {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;

    let materials = match materials {
        Ok(materials) => materials,
        Err(e) => {
            log::warn!("Materials of '{}' could not be loaded: {}", path.display(), e);
            Vec::new()
        }
    };

    let model_dir = path.parent().unwrap_or_else(|| Path::new("."));
    let materials = materials
        .iter()
        .map(|m| convert_material(m, model_dir))
        .collect();

    let mut meshes = Vec::with_capacity(models.len());
    let mut nodes = Vec::with_capacity(models.len());
    for model in models {
        if model.mesh.positions.is_empty() || model.mesh.indices.is_empty() {
            log::warn!("Skipping empty object '{}' in '{}'", model.name, path.display());
            continue;
        }
        nodes.push(ImportedNode {
            name: model.name.clone(),
            parent: None,
            transform: Matrix4::identity(),
            meshes: vec![meshes.len() as u32],
        });
        meshes.push(convert_mesh(model));
    }

    Ok(ImportedScene {
        meshes,
        materials,
        nodes,
    })
}

fn convert_mesh(model: tobj::Model) -> ImportedMesh {
    let mesh = model.mesh;
    let positions: Vec<[f32; 3]> = mesh
        .positions
        .chunks_exact(3)
        .map(|p| [p[0], p[1], p[2]])
        .collect();
    let normals: Vec<[f32; 3]> = mesh
        .normals
        .chunks_exact(3)
        .map(|n| [n[0], n[1], n[2]])
        .collect();
    let tex_coords = (mesh.texcoords.len() / 2 == positions.len() && !positions.is_empty())
        .then(|| mesh.texcoords.chunks_exact(2).map(|t| [t[0], t[1]]).collect());

    let mut imported = ImportedMesh {
        name: model.name,
        positions,
        normals,
        tex_coords,
        indices: mesh.indices,
        face_arities: mesh.face_arities,
        material_index: mesh.material_id,
    };
    imported.ensure_normals();
    imported
}

/// Parses an "r g b" parameter that `tobj` does not know about.
fn parse_color(value: &str) -> Option<[f32; 3]> {
    let mut channels = value.split_whitespace().map(|c| c.parse::<f32>());
    let r = channels.next()?.ok()?;
    let g = channels.next().and_then(Result::ok).unwrap_or(r);
    let b = channels.next().and_then(Result::ok).unwrap_or(r);
    Some([r, g, b])
}

/// The file part of a texture statement, dropping options such as `-bm 1.0`.
fn texture_reference(statement: &str) -> Option<&str> {
    statement.split_whitespace().last()
}

fn convert_material(m: &tobj::Material, model_dir: &Path) -> ImportedMaterial {
    let param = |key: &str| m.unknown_param.get(key).map(String::as_str);
    let texture = |statement: Option<&str>| {
        statement
            .and_then(texture_reference)
            .map(|reference| texture_path(model_dir, reference))
    };
    let rgba = |c: [f32; 3]| [c[0], c[1], c[2], 1.0];

    ImportedMaterial {
        name: m.name.clone(),
        ambient_color: m.ambient.map(rgba),
        diffuse_color: m.diffuse.map(rgba),
        emissive_color: param("Ke").and_then(parse_color).map(rgba),
        transparent_color: param("Tf").and_then(parse_color).filter(|c| c.iter().any(|&v| v > 0.0)),
        opacity: m.dissolve,
        metallic_factor: param("Pm").and_then(|v| v.trim().parse().ok()),
        roughness_factor: param("Pr").and_then(|v| v.trim().parse().ok()),
        emissive_texture: texture(param("map_Ke")),
        diffuse_texture: texture(m.diffuse_texture.as_deref()),
        normal_texture: texture(m.normal_texture.as_deref()),
        height_texture: texture(param("disp").or_else(|| param("map_disp"))),
        opacity_texture: texture(m.dissolve_texture.as_deref()),
    }
}
