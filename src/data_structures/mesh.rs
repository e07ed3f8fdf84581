//! Submesh records and the mesh-wide buffers they point into.

use std::ops::Range;

use anyhow::ensure;

use crate::data_structures::{bounds::BoundingBox, material::Material, vertex::VertexStreams};

/// Maximum number of LOD levels a submesh can carry, LOD 0 included.
pub const K_MAX_LODS: usize = 8;

/// One submesh inside [`MeshData`].
///
/// `index_offset` and `vertex_offset` are element offsets into the shared
/// index and vertex buffers. The indices of LOD `k` are
/// `lod_offset[k]..lod_offset[k + 1]`, relative to `index_offset`.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Mesh {
    pub lod_count: u32,
    pub index_offset: u32,
    pub vertex_offset: u32,
    pub vertex_count: u32,
    pub material_id: u32,
    pub lod_offset: [u32; K_MAX_LODS + 1],
}

impl Mesh {
    pub fn lod_indices_count(&self, lod: u32) -> u32 {
        if lod < self.lod_count {
            self.lod_offset[lod as usize + 1] - self.lod_offset[lod as usize]
        } else {
            0
        }
    }

    /// Range of LOD `lod` inside the shared index buffer.
    pub fn lod_range(&self, lod: u32) -> Range<usize> {
        let lod = lod.min(self.lod_count.saturating_sub(1)) as usize;
        let start = (self.index_offset + self.lod_offset[lod]) as usize;
        let end = (self.index_offset + self.lod_offset[lod + 1]) as usize;
        start..end
    }

    /// Indices of all LODs together.
    pub fn index_count(&self) -> u32 {
        self.lod_offset[self.lod_count as usize]
    }
}

impl Default for Mesh {
    fn default() -> Self {
        Self {
            lod_count: 1,
            index_offset: 0,
            vertex_offset: 0,
            vertex_count: 0,
            material_id: 0,
            lod_offset: [0; K_MAX_LODS + 1],
        }
    }
}

/// Everything the packer produced for one model: shared buffers, submeshes,
/// materials and the texture files they reference.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MeshData {
    pub streams: VertexStreams,
    pub vertex_data: Vec<u8>,
    pub index_data: Vec<u32>,
    pub meshes: Vec<Mesh>,
    pub boxes: Vec<BoundingBox>,
    pub materials: Vec<Material>,
    pub texture_files: Vec<String>,
}

impl MeshData {
    pub fn vertex_count(&self) -> usize {
        self.vertex_data.len() / self.streams.stride.max(1) as usize
    }

    /// Position of the vertex at absolute index `vertex` in the shared vertex buffer.
    pub fn position(&self, vertex: usize) -> [f32; 3] {
        let offset = vertex * self.streams.stride as usize;
        bytemuck::pod_read_unaligned(&self.vertex_data[offset..offset + 12])
    }

    /// Recomputes each submesh box from the vertices its LOD 0 references.
    pub fn recalculate_bounding_boxes(&mut self) {
        let boxes = self
            .meshes
            .iter()
            .map(|mesh| {
                let mut bbox = BoundingBox::empty();
                for &index in &self.index_data[mesh.lod_range(0)] {
                    bbox.expand(self.position((index + mesh.vertex_offset) as usize));
                }
                bbox
            })
            .collect();
        self.boxes = boxes;
    }

    /// Box enclosing every submesh.
    pub fn bounds(&self) -> BoundingBox {
        let mut bbox = BoundingBox::empty();
        self.boxes.iter().for_each(|b| bbox.combine(b));
        bbox
    }

    /// Checks the buffer and table invariants every consumer relies on.
    pub fn validate(&self) -> anyhow::Result<()> {
        ensure!(self.streams.stride > 0, "vertex stride must not be zero");
        ensure!(
            self.vertex_data.len() % self.streams.stride as usize == 0,
            "vertex data ({} bytes) is not a multiple of the stride {}",
            self.vertex_data.len(),
            self.streams.stride
        );
        ensure!(
            self.boxes.len() == self.meshes.len(),
            "{} bounding boxes for {} meshes",
            self.boxes.len(),
            self.meshes.len()
        );
        let vertex_count = self.vertex_count();
        for (i, mesh) in self.meshes.iter().enumerate() {
            ensure!(
                mesh.lod_count >= 1 && mesh.lod_count as usize <= K_MAX_LODS,
                "mesh {i} has {} LODs",
                mesh.lod_count
            );
            ensure!(mesh.lod_offset[0] == 0, "mesh {i} LOD table does not start at 0");
            let lods = &mesh.lod_offset[..=mesh.lod_count as usize];
            ensure!(
                lods.windows(2).all(|w| w[0] <= w[1]),
                "mesh {i} LOD table is not monotonic"
            );
            ensure!(
                mesh.index_offset as usize + mesh.index_count() as usize <= self.index_data.len(),
                "mesh {i} indices exceed the index buffer"
            );
            ensure!(
                mesh.vertex_offset as usize + mesh.vertex_count as usize <= vertex_count,
                "mesh {i} vertices exceed the vertex buffer"
            );
            for (lod, w) in lods.windows(2).enumerate() {
                let base = mesh.index_offset as usize;
                let indices = &self.index_data[base + w[0] as usize..base + w[1] as usize];
                ensure!(
                    indices.iter().all(|&index| index < mesh.vertex_count),
                    "mesh {i} LOD{lod} indexes past its {} vertices",
                    mesh.vertex_count
                );
            }
            ensure!(
                (mesh.material_id as usize) < self.materials.len(),
                "mesh {i} references missing material {}",
                mesh.material_id
            );
        }
        for (i, material) in self.materials.iter().enumerate() {
            for slot in material.texture_slots() {
                ensure!(
                    slot == -1 || (slot >= 0 && (slot as usize) < self.texture_files.len()),
                    "material {i} references missing texture {slot}"
                );
            }
        }
        Ok(())
    }
}
