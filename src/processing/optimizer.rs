//! Vertex/index stream optimization.
//!
//! Bit-identical vertices are merged first, then the index buffer is
//! reordered for the post-transform vertex cache, for overdraw and finally
//! the vertex buffer is reordered to match the order indices fetch it.

use meshopt::VertexDataAdapter;

use crate::{config::PipelineConfig, data_structures::vertex::PackedVertex};

/// An indexed triangle list after optimization.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct OptimizedMesh {
    pub vertices: Vec<PackedVertex>,
    pub indices: Vec<u32>,
}

/// Deduplicates and reorders `vertices`/`indices`.
///
/// The result draws the same triangles: expanding its indices yields the
/// same multiset of vertices as expanding the input. `indices` must be a
/// triangle list referencing only existing vertices.
pub fn optimize(
    vertices: &[PackedVertex],
    indices: &[u32],
    config: &PipelineConfig,
) -> OptimizedMesh {
    debug_assert!(indices.len() % 3 == 0);
    debug_assert!(indices.iter().all(|&i| (i as usize) < vertices.len()));
    if indices.is_empty() {
        return OptimizedMesh {
            vertices: vertices.to_vec(),
            indices: Vec::new(),
        };
    }

    let (unique_count, remap) = meshopt::generate_vertex_remap(vertices, Some(indices));
    let mut indices = meshopt::remap_index_buffer(Some(indices), indices.len(), &remap);
    let vertices = meshopt::remap_vertex_buffer(vertices, unique_count, &remap);

    meshopt::optimize_vertex_cache_in_place(&mut indices, vertices.len());

    match VertexDataAdapter::new(
        bytemuck::cast_slice(&vertices),
        PackedVertex::STRIDE,
        0,
    ) {
        Ok(adapter) => {
            meshopt::optimize_overdraw_in_place(&mut indices, &adapter, config.overdraw_threshold)
        }
        Err(e) => log::warn!("Skipping overdraw optimization: {:?}", e),
    }

    let vertices = meshopt::optimize_vertex_fetch(&mut indices, &vertices);

    log::debug!(
        "Optimized mesh: {} -> {} vertices, {} indices",
        remap.len(),
        vertices.len(),
        indices.len()
    );
    OptimizedMesh { vertices, indices }
}
