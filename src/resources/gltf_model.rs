//! glTF 2.0 import via the `gltf` crate.
//!
//! Every primitive becomes its own [`ImportedMesh`]; a node referencing a
//! glTF mesh references all of that mesh's primitives. Only textures stored
//! as external files are kept, embedded images are skipped.

use std::path::Path;

use gltf::{image::Source, material::AlphaMode, mesh::Mode};

use crate::resources::{
    ImportError, ImportedMaterial, ImportedMesh, ImportedNode, ImportedScene, texture_path,
};

pub fn import(path: &Path) -> Result<ImportedScene, ImportError> {
    let parse_error = |e: gltf::Error| ImportError::Parse {
        path: path.display().to_string(),
        reason: e.to_string(),
    };
    let model_dir = path.parent().unwrap_or_else(|| Path::new("."));
    let gltf::Gltf { document, blob } = gltf::Gltf::open(path).map_err(parse_error)?;
    // images are loaded later through the texture cache
    let buffers = gltf::import_buffers(&document, Some(model_dir), blob).map_err(parse_error)?;

    let materials = document
        .materials()
        .map(|m| convert_material(&m, model_dir))
        .collect();

    let mut meshes = Vec::new();
    let mut primitives_of_mesh: Vec<Vec<u32>> = Vec::new();
    for mesh in document.meshes() {
        let mut primitive_ids = Vec::new();
        for primitive in mesh.primitives() {
            let reader = primitive.reader(|buffer| Some(&buffers[buffer.index()]));
            let Some(positions) = reader.read_positions() else {
                log::warn!("Skipping primitive without positions in {:?}", mesh.name());
                continue;
            };
            let positions: Vec<[f32; 3]> = positions.collect();
            let normals = reader
                .read_normals()
                .map(|n| n.collect())
                .unwrap_or_default();
            let tex_coords = reader.read_tex_coords(0).map(|t| t.into_f32().collect());
            let raw_indices: Vec<u32> = match reader.read_indices() {
                Some(indices) => indices.into_u32().collect(),
                None => (0..positions.len() as u32).collect(),
            };
            let (indices, face_arities) = faces_for_mode(primitive.mode(), raw_indices);
            if positions.is_empty() || indices.is_empty() {
                log::warn!("Skipping empty primitive in {:?}", mesh.name());
                continue;
            }

            let mut imported = ImportedMesh {
                name: mesh.name().unwrap_or("unknown_mesh").to_string(),
                positions,
                normals,
                tex_coords,
                indices,
                face_arities,
                material_index: primitive.material().index(),
            };
            imported.ensure_normals();
            primitive_ids.push(meshes.len() as u32);
            meshes.push(imported);
        }
        primitives_of_mesh.push(primitive_ids);
    }

    let mut nodes = Vec::new();
    let scene = document.default_scene().or_else(|| document.scenes().next());
    match scene {
        Some(scene) => {
            for root in scene.nodes() {
                collect_nodes(&root, None, &primitives_of_mesh, &mut nodes);
            }
        }
        None => {
            for (i, primitive_ids) in primitives_of_mesh.iter().enumerate() {
                nodes.push(ImportedNode {
                    name: format!("mesh_{i}"),
                    meshes: primitive_ids.clone(),
                    ..Default::default()
                });
            }
        }
    }

    Ok(ImportedScene {
        meshes,
        materials,
        nodes,
    })
}

fn collect_nodes(
    node: &gltf::Node,
    parent: Option<usize>,
    primitives_of_mesh: &[Vec<u32>],
    nodes: &mut Vec<ImportedNode>,
) {
    let index = nodes.len();
    nodes.push(ImportedNode {
        name: node.name().unwrap_or_default().to_string(),
        parent,
        transform: node.transform().matrix().into(),
        meshes: node
            .mesh()
            .and_then(|mesh| primitives_of_mesh.get(mesh.index()).cloned())
            .unwrap_or_default(),
    });
    for child in node.children() {
        collect_nodes(&child, Some(index), primitives_of_mesh, nodes);
    }
}

/// Expands strips and fans into triangle lists. Point and line primitives
/// keep their arities so the packer can drop them.
fn faces_for_mode(mode: Mode, indices: Vec<u32>) -> (Vec<u32>, Vec<u32>) {
    match mode {
        Mode::Triangles => (indices, Vec::new()),
        Mode::TriangleStrip => {
            let triangles = indices
                .windows(3)
                .enumerate()
                .flat_map(|(i, w)| {
                    if i % 2 == 0 {
                        [w[0], w[1], w[2]]
                    } else {
                        [w[1], w[0], w[2]]
                    }
                })
                .collect();
            (triangles, Vec::new())
        }
        Mode::TriangleFan => {
            let triangles = match indices.split_first() {
                Some((&center, rest)) => rest
                    .windows(2)
                    .flat_map(|w| [center, w[0], w[1]])
                    .collect(),
                None => Vec::new(),
            };
            (triangles, Vec::new())
        }
        Mode::Points => {
            let arities = vec![1; indices.len()];
            (indices, arities)
        }
        Mode::Lines => {
            let arities = vec![2; indices.len() / 2];
            (indices, arities)
        }
        Mode::LineStrip | Mode::LineLoop => {
            let mut lines: Vec<u32> = indices.windows(2).flatten().copied().collect();
            if mode == Mode::LineLoop && indices.len() > 2 {
                lines.extend([indices[indices.len() - 1], indices[0]]);
            }
            let arities = vec![2; lines.len() / 2];
            (lines, arities)
        }
    }
}

fn texture_file(texture: gltf::Texture, model_dir: &Path) -> Option<String> {
    match texture.source().source() {
        Source::Uri { uri, .. } if !uri.starts_with("data:") => Some(texture_path(model_dir, uri)),
        _ => {
            log::warn!("Skipping embedded texture {}", texture.index());
            None
        }
    }
}

fn convert_material(m: &gltf::Material, model_dir: &Path) -> ImportedMaterial {
    let pbr = m.pbr_metallic_roughness();
    let [er, eg, eb] = m.emissive_factor();
    let base_color = pbr.base_color_factor();
    let diffuse_texture = pbr
        .base_color_texture()
        .and_then(|info| texture_file(info.texture(), model_dir));

    let (opacity, opacity_texture) = match m.alpha_mode() {
        AlphaMode::Opaque => (None, None),
        AlphaMode::Blend => (Some(base_color[3]), None),
        // the cutout lives in the base color alpha channel
        AlphaMode::Mask => (None, diffuse_texture.clone()),
    };

    ImportedMaterial {
        name: m.name().unwrap_or_default().to_string(),
        diffuse_color: Some(base_color),
        emissive_color: Some([er, eg, eb, 0.0]),
        opacity,
        metallic_factor: Some(pbr.metallic_factor()),
        roughness_factor: Some(pbr.roughness_factor()),
        emissive_texture: m
            .emissive_texture()
            .and_then(|info| texture_file(info.texture(), model_dir)),
        diffuse_texture,
        normal_texture: m
            .normal_texture()
            .and_then(|normal| texture_file(normal.texture(), model_dir)),
        opacity_texture,
        ..Default::default()
    }
}
