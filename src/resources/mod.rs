//! Loading meshes, materials and textures from external files.
//!
//! Importers translate a file format into the neutral [`ImportedScene`]:
//! triangulated submeshes with smooth normals, plain material records and a
//! parent-first node list. `mesh_file` stores and loads the packed result.

use std::path::Path;

use cgmath::{InnerSpace, Matrix4, SquareMatrix, Vector3};

pub mod gltf_model;
pub mod mesh_file;
pub mod obj;
pub mod texture;

/// Why a model could not be imported. Each kind maps to a process exit code.
#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("mesh file '{0}' not found")]
    NotFound(String),
    #[error("unable to load '{path}': {reason}")]
    Parse { path: String, reason: String },
    #[error("'{0}' contains no meshes")]
    NoMeshes(String),
    #[error("unsupported mesh format '{0}'")]
    Unsupported(String),
}

impl ImportError {
    pub fn exit_code(&self) -> i32 {
        match self {
            ImportError::Parse { .. } | ImportError::NoMeshes(_) => 0xFF,
            ImportError::NotFound(_) => 0xFE,
            ImportError::Unsupported(_) => 0xFD,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ImportedMesh {
    pub name: String,
    pub positions: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    pub tex_coords: Option<Vec<[f32; 2]>>,
    pub indices: Vec<u32>,
    /// Index count of every face. Empty means every face is a triangle.
    pub face_arities: Vec<u32>,
    pub material_index: Option<usize>,
}

impl ImportedMesh {
    /// The index slice of every face.
    pub fn faces(&self) -> impl Iterator<Item = &[u32]> + '_ {
        let mut offset = 0usize;
        let mut face = 0usize;
        std::iter::from_fn(move || {
            if offset >= self.indices.len() {
                return None;
            }
            let arity = if self.face_arities.is_empty() {
                3
            } else {
                *self.face_arities.get(face)? as usize
            };
            face += 1;
            let end = (offset + arity).min(self.indices.len());
            let slice = &self.indices[offset..end];
            offset = end;
            Some(slice)
        })
    }

    /// Fills in smooth normals when the source had none.
    pub fn ensure_normals(&mut self) {
        if self.normals.len() != self.positions.len() {
            self.normals = generate_smooth_normals(&self.positions, self.faces());
        }
    }
}

/// A material as the source file describes it, before baking.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ImportedMaterial {
    pub name: String,
    pub ambient_color: Option<[f32; 4]>,
    pub diffuse_color: Option<[f32; 4]>,
    pub emissive_color: Option<[f32; 4]>,
    pub transparent_color: Option<[f32; 3]>,
    pub opacity: Option<f32>,
    pub metallic_factor: Option<f32>,
    pub roughness_factor: Option<f32>,
    pub emissive_texture: Option<String>,
    pub diffuse_texture: Option<String>,
    pub normal_texture: Option<String>,
    pub height_texture: Option<String>,
    pub opacity_texture: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ImportedNode {
    pub name: String,
    /// Index into [`ImportedScene::nodes`], always smaller than this node's.
    pub parent: Option<usize>,
    pub transform: Matrix4<f32>,
    /// Indices into [`ImportedScene::meshes`].
    pub meshes: Vec<u32>,
}

impl Default for ImportedNode {
    fn default() -> Self {
        Self {
            name: String::new(),
            parent: None,
            transform: Matrix4::identity(),
            meshes: Vec::new(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ImportedScene {
    pub meshes: Vec<ImportedMesh>,
    pub materials: Vec<ImportedMaterial>,
    pub nodes: Vec<ImportedNode>,
}

/// Imports a mesh-interchange file, picking the importer by extension.
pub fn load_mesh_file(path: &Path) -> Result<ImportedScene, ImportError> {
    let display = path.display().to_string();
    if !path.is_file() {
        return Err(ImportError::NotFound(display));
    }
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    let scene = match extension.as_str() {
        "obj" => obj::import(path)?,
        "gltf" | "glb" => gltf_model::import(path)?,
        _ => return Err(ImportError::Unsupported(display)),
    };
    let has_triangles = scene
        .meshes
        .iter()
        .any(|mesh| mesh.faces().any(|face| face.len() == 3));
    if !has_triangles {
        return Err(ImportError::NoMeshes(display));
    }
    log::info!(
        "Imported '{}': {} meshes, {} materials, {} nodes",
        display,
        scene.meshes.len(),
        scene.materials.len(),
        scene.nodes.len()
    );
    Ok(scene)
}

/// Area-weighted vertex normals accumulated over all triangle faces.
pub fn generate_smooth_normals<'a>(
    positions: &[[f32; 3]],
    faces: impl Iterator<Item = &'a [u32]>,
) -> Vec<[f32; 3]> {
    let mut normals = vec![Vector3::new(0.0f32, 0.0, 0.0); positions.len()];
    for face in faces {
        let [a, b, c] = match face {
            &[a, b, c] => [a as usize, b as usize, c as usize],
            _ => continue,
        };
        if a.max(b).max(c) >= positions.len() {
            continue;
        }
        let pa = Vector3::from(positions[a]);
        let pb = Vector3::from(positions[b]);
        let pc = Vector3::from(positions[c]);
        let n = (pb - pa).cross(pc - pa);
        normals[a] += n;
        normals[b] += n;
        normals[c] += n;
    }
    normals
        .into_iter()
        .map(|n| {
            if n.magnitude2() > f32::EPSILON {
                n.normalize().into()
            } else {
                [0.0, 0.0, 1.0]
            }
        })
        .collect()
}

/// Joins a texture reference from a model file onto the model's directory.
pub fn texture_path(model_dir: &Path, reference: &str) -> String {
    let reference = reference.trim().replace('\\', "/");
    model_dir.join(reference).to_string_lossy().into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_are_distinct() {
        let codes = [
            ImportError::NotFound("a".into()).exit_code(),
            ImportError::Parse {
                path: "a".into(),
                reason: "b".into(),
            }
            .exit_code(),
            ImportError::Unsupported("a".into()).exit_code(),
        ];
        assert_eq!(codes, [0xFE, 0xFF, 0xFD]);
        assert_eq!(ImportError::NoMeshes("a".into()).exit_code(), 0xFF);
    }

    #[test]
    fn missing_files_are_reported_as_not_found() {
        let err = load_mesh_file(Path::new("does/not/exist.obj")).unwrap_err();
        assert!(matches!(err, ImportError::NotFound(_)));
    }

    #[test]
    fn files_without_triangles_have_no_meshes() {
        let dir = std::env::temp_dir().join(format!("lod-ngin-import-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        for (name, contents) in [
            ("blank.obj", "# nothing here\n"),
            ("points.obj", "v 0 0 0\nv 1 0 0\nv 0 1 0\n"),
        ] {
            let path = dir.join(name);
            std::fs::write(&path, contents).unwrap();
            let err = load_mesh_file(&path).unwrap_err();
            assert!(matches!(err, ImportError::NoMeshes(_)), "{name}: {err:?}");
        }

        let path = dir.join("triangle.obj");
        std::fs::write(&path, "o tri\nv 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n").unwrap();
        let scene = load_mesh_file(&path).unwrap();
        assert_eq!(scene.meshes.len(), 1);
        assert_eq!(scene.nodes.len(), 1);
        assert_eq!(scene.nodes[0].meshes, vec![0]);
    }

    #[test]
    fn smooth_normals_face_the_winding() {
        let mut mesh = ImportedMesh {
            positions: vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
            indices: vec![0, 1, 2],
            ..Default::default()
        };
        mesh.ensure_normals();
        for n in &mesh.normals {
            assert!((n[2] - 1.0).abs() < 1e-6);
        }
    }

    #[test]
    fn faces_follow_arities() {
        let mesh = ImportedMesh {
            indices: vec![0, 1, 2, 3, 4, 5, 6],
            face_arities: vec![3, 4],
            ..Default::default()
        };
        let faces: Vec<&[u32]> = mesh.faces().collect();
        assert_eq!(faces, vec![&[0, 1, 2][..], &[3, 4, 5, 6][..]]);
    }

    #[test]
    fn texture_paths_are_relative_to_the_model() {
        let path = texture_path(Path::new("assets/sponza"), "textures\\brick.png");
        assert_eq!(Path::new(&path), Path::new("assets/sponza/textures/brick.png"));
    }
}
