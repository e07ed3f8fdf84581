//! Packing imported submeshes into the mesh-wide buffers of a [`MeshData`].

use crate::{
    config::PipelineConfig,
    data_structures::{
        mesh::{K_MAX_LODS, Mesh, MeshData},
        vertex::PackedVertex,
    },
    processing::{
        lod::LodCascade,
        optimizer::{self, OptimizedMesh},
    },
    resources::ImportedMesh,
};

/// Appends submeshes to a [`MeshData`], keeping the running index and
/// vertex cursors so consecutive submeshes occupy disjoint, contiguous
/// ranges of the shared buffers.
pub struct MeshPacker<'a> {
    config: &'a PipelineConfig,
    index_offset: u32,
    vertex_offset: u32,
}

impl<'a> MeshPacker<'a> {
    pub fn new(config: &'a PipelineConfig) -> Self {
        Self {
            config,
            index_offset: 0,
            vertex_offset: 0,
        }
    }

    /// Continue packing after the submeshes already stored in `data`.
    pub fn resume(config: &'a PipelineConfig, data: &MeshData) -> Self {
        Self {
            config,
            index_offset: data.index_data.len() as u32,
            vertex_offset: data.vertex_count() as u32,
        }
    }

    pub fn index_offset(&self) -> u32 {
        self.index_offset
    }

    pub fn vertex_offset(&self) -> u32 {
        self.vertex_offset
    }

    /// Packs, optimizes and simplifies `mesh`, appends its vertices and all
    /// of its LODs to `data` and returns the record describing them.
    pub fn pack(&mut self, mesh: &ImportedMesh, material_id: u32, data: &mut MeshData) -> Mesh {
        let vertices = pack_vertices(mesh);
        let indices = triangle_indices(mesh);

        let OptimizedMesh { vertices, indices } = if self.config.optimize_vertices {
            optimizer::optimize(&vertices, &indices, self.config)
        } else {
            OptimizedMesh { vertices, indices }
        };
        let vertex_bytes: &[u8] = bytemuck::cast_slice(&vertices);

        let lods: Vec<Vec<u32>> =
            LodCascade::new(indices, vertex_bytes, PackedVertex::STRIDE, self.config).collect();
        debug_assert!(!lods.is_empty() && lods.len() <= K_MAX_LODS);
        log::info!("Calculated LOD count for {}: {}", mesh.name, lods.len());

        let mut result = Mesh {
            lod_count: lods.len() as u32,
            index_offset: self.index_offset,
            vertex_offset: self.vertex_offset,
            vertex_count: vertices.len() as u32,
            material_id,
            lod_offset: [0; K_MAX_LODS + 1],
        };

        let mut num_indices = 0;
        for (i, lod) in lods.iter().enumerate() {
            result.lod_offset[i] = num_indices;
            data.index_data.extend_from_slice(lod);
            num_indices += lod.len() as u32;
        }
        result.lod_offset[lods.len()] = num_indices;
        data.vertex_data.extend_from_slice(vertex_bytes);

        self.index_offset += num_indices;
        self.vertex_offset += result.vertex_count;
        result
    }
}

/// Converts the per-vertex attributes of `mesh` into the packed layout.
/// Missing normals default to +Z, missing UVs to zero.
pub fn pack_vertices(mesh: &ImportedMesh) -> Vec<PackedVertex> {
    mesh.positions
        .iter()
        .enumerate()
        .map(|(i, &position)| {
            let normal = mesh.normals.get(i).copied().unwrap_or([0.0, 0.0, 1.0]);
            let uv = mesh
                .tex_coords
                .as_ref()
                .and_then(|uvs| uvs.get(i).copied())
                .unwrap_or_default();
            PackedVertex::new(position, uv, normal)
        })
        .collect()
}

/// Triangle list of `mesh`. Faces that are not triangles, reference missing
/// vertices or collapse to a line or point are dropped.
pub fn triangle_indices(mesh: &ImportedMesh) -> Vec<u32> {
    let vertex_count = mesh.positions.len() as u32;
    let mut indices = Vec::with_capacity(mesh.indices.len());
    let (mut skipped, mut degenerate) = (0usize, 0usize);

    for face in mesh.faces() {
        if face.len() != 3 {
            skipped += 1;
            continue;
        }
        let (a, b, c) = (face[0], face[1], face[2]);
        if a >= vertex_count || b >= vertex_count || c >= vertex_count {
            skipped += 1;
            continue;
        }
        if a == b || b == c || a == c {
            degenerate += 1;
            continue;
        }
        indices.extend_from_slice(face);
    }

    if skipped > 0 {
        log::warn!("Skipped {} non-triangle or invalid faces in {}", skipped, mesh.name);
    }
    if degenerate > 0 {
        log::debug!("Removed {} degenerate triangles from {}", degenerate, mesh.name);
    }
    indices
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quad() -> ImportedMesh {
        ImportedMesh {
            name: "quad".into(),
            positions: vec![
                [0.0, 0.0, 0.0],
                [1.0, 0.0, 0.0],
                [1.0, 1.0, 0.0],
                [0.0, 1.0, 0.0],
            ],
            normals: vec![[0.0, 0.0, 1.0]; 4],
            tex_coords: None,
            indices: vec![0, 1, 2, 0, 2, 3],
            ..Default::default()
        }
    }

    #[test]
    fn non_triangle_faces_are_skipped() {
        let mesh = ImportedMesh {
            indices: vec![0, 1, 2, 0, 2, 3, 1, 3],
            face_arities: vec![3, 3, 2],
            ..quad()
        };
        assert_eq!(triangle_indices(&mesh), vec![0, 1, 2, 0, 2, 3]);
    }

    #[test]
    fn degenerate_and_out_of_range_triangles_are_dropped() {
        let mesh = ImportedMesh {
            indices: vec![0, 1, 2, 0, 0, 3, 1, 2, 9],
            ..quad()
        };
        assert_eq!(triangle_indices(&mesh), vec![0, 1, 2]);
    }

    #[test]
    fn missing_uvs_pack_as_zero() {
        let vertices = pack_vertices(&quad());
        assert_eq!(vertices.len(), 4);
        assert!(vertices.iter().all(|v| v.uv == 0));
        assert_eq!(vertices[2].position, [1.0, 1.0, 0.0]);
    }

    #[test]
    fn consecutive_submeshes_get_disjoint_ranges() {
        let config = PipelineConfig::default();
        let mut data = MeshData::default();
        let mut packer = MeshPacker::new(&config);

        let first = packer.pack(&quad(), 0, &mut data);
        let second = packer.pack(&quad(), 1, &mut data);

        assert_eq!(first.index_offset, 0);
        assert_eq!(first.vertex_offset, 0);
        assert_eq!(second.index_offset, first.index_count());
        assert_eq!(second.vertex_offset, first.vertex_count);
        assert_eq!(second.material_id, 1);
        assert_eq!(data.index_data.len() as u32, packer.index_offset());
        assert_eq!(data.vertex_count() as u32, packer.vertex_offset());
        assert_eq!(first.lod_count, 1);
        assert_eq!(first.lod_offset[0], 0);
        assert_eq!(first.lod_offset[1], 6);
    }
}
