//! Tunables for the mesh preparation pipeline.
//!
//! The defaults reproduce the behaviour the renderer was tuned against; tweak
//! them per asset when a model simplifies too aggressively (raise
//! `target_error`) or not at all (lower `lod_index_floor`).

use crate::data_structures::mesh::K_MAX_LODS;

/// Settings consumed by the optimizer, the LOD cascade and the packer.
#[derive(Clone, Debug, PartialEq)]
pub struct PipelineConfig {
    /// Upper bound on LOD levels per submesh, LOD 0 included. Clamped to [`K_MAX_LODS`].
    pub max_lods: usize,
    /// Meshes with at most this many indices are never simplified.
    pub lod_index_floor: usize,
    /// Geometric error tolerance, relative to the mesh extent.
    pub target_error: f32,
    /// A simplification pass is rejected unless `new_count * min_reduction <= old_count`.
    pub min_reduction: f32,
    /// Allowed vertex cache degradation while optimizing for overdraw.
    pub overdraw_threshold: f32,
    /// Run the vertex/index optimizer before building LODs.
    pub optimize_vertices: bool,
}

impl PipelineConfig {
    /// Effective LOD limit, never above what a [`Mesh`](crate::data_structures::mesh::Mesh) can store.
    pub fn lod_limit(&self) -> usize {
        self.max_lods.clamp(1, K_MAX_LODS)
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_lods: K_MAX_LODS,
            lod_index_floor: 1024,
            target_error: 0.02,
            min_reduction: 1.1,
            overdraw_threshold: 1.05,
            optimize_vertices: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lod_limit_is_clamped() {
        let config = PipelineConfig {
            max_lods: 100,
            ..Default::default()
        };
        assert_eq!(config.lod_limit(), K_MAX_LODS);

        let config = PipelineConfig {
            max_lods: 0,
            ..Default::default()
        };
        assert_eq!(config.lod_limit(), 1);
    }
}
