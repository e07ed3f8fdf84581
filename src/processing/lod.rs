//! LOD cascade generation.
//!
//! [`LodCascade`] yields LOD 0 unchanged, then keeps halving the index
//! count with meshopt's simplifier until the mesh is small enough, the LOD
//! limit is reached or the simplifier stops making progress.

use meshopt::{SimplifyOptions, VertexDataAdapter};

use crate::config::PipelineConfig;

/// The two simplification passes a cascade step may run.
pub trait Simplifier {
    /// Topology-preserving simplification towards `target_count` indices.
    fn simplify(
        &self,
        indices: &[u32],
        vertices: &VertexDataAdapter<'_>,
        target_count: usize,
        target_error: f32,
    ) -> Vec<u32>;

    /// Fallback that may merge unconnected geometry.
    fn simplify_sloppy(
        &self,
        indices: &[u32],
        vertices: &VertexDataAdapter<'_>,
        target_count: usize,
        target_error: f32,
    ) -> Vec<u32>;
}

/// meshopt's `simplify` and `simplify_sloppy`.
#[derive(Clone, Copy, Debug, Default)]
pub struct Meshopt;

impl Simplifier for Meshopt {
    fn simplify(
        &self,
        indices: &[u32],
        vertices: &VertexDataAdapter<'_>,
        target_count: usize,
        target_error: f32,
    ) -> Vec<u32> {
        meshopt::simplify(
            indices,
            vertices,
            target_count,
            target_error,
            SimplifyOptions::empty(),
            None,
        )
    }

    fn simplify_sloppy(
        &self,
        indices: &[u32],
        vertices: &VertexDataAdapter<'_>,
        target_count: usize,
        target_error: f32,
    ) -> Vec<u32> {
        meshopt::simplify_sloppy(indices, vertices, target_count, target_error, None)
    }
}

/// Lazily simplifies one index buffer, one LOD per `next()`.
///
/// Each LOD is simplified from the previous one, so the index count never
/// grows along the cascade. The iterator is finite and cannot be restarted.
pub struct LodCascade<'a, S = Meshopt> {
    indices: Vec<u32>,
    vertex_data: &'a [u8],
    stride: usize,
    vertex_count: usize,
    simplifier: S,
    target: usize,
    produced: usize,
    sloppy_lods: usize,
    limit: usize,
    index_floor: usize,
    target_error: f32,
    min_reduction: f32,
    finished: bool,
}

impl<'a> LodCascade<'a> {
    /// `vertex_data` holds interleaved vertices with the position as three
    /// floats at offset 0 of every `stride` bytes.
    pub fn new(
        indices: Vec<u32>,
        vertex_data: &'a [u8],
        stride: usize,
        config: &PipelineConfig,
    ) -> Self {
        LodCascade::with_simplifier(indices, vertex_data, stride, config, Meshopt)
    }
}

impl<'a, S: Simplifier> LodCascade<'a, S> {
    pub fn with_simplifier(
        indices: Vec<u32>,
        vertex_data: &'a [u8],
        stride: usize,
        config: &PipelineConfig,
        simplifier: S,
    ) -> Self {
        let target = indices.len();
        Self {
            indices,
            vertex_data,
            stride,
            vertex_count: vertex_data.len() / stride.max(1),
            simplifier,
            target,
            produced: 0,
            sloppy_lods: 0,
            limit: config.lod_limit(),
            index_floor: config.lod_index_floor,
            target_error: config.target_error,
            min_reduction: config.min_reduction,
            finished: false,
        }
    }

    /// How many of the LODs produced so far came from the sloppy pass.
    pub fn sloppy_lods(&self) -> usize {
        self.sloppy_lods
    }

    fn finish(&mut self) -> Option<Vec<u32>> {
        self.finished = true;
        None
    }

    fn simplify_next(&mut self) -> Option<Vec<u32>> {
        if self.target <= self.index_floor || self.produced >= self.limit {
            return self.finish();
        }
        self.target = self.indices.len() / 2;

        let adapter = match VertexDataAdapter::new(self.vertex_data, self.stride, 0) {
            Ok(adapter) => adapter,
            Err(e) => {
                log::warn!("Cannot simplify mesh: {:?}", e);
                return self.finish();
            }
        };

        let mut sloppy = false;
        let mut simplified = self.simplifier.simplify(
            &self.indices,
            &adapter,
            self.target,
            self.target_error,
        );
        if (simplified.len() as f32 * self.min_reduction) as usize > self.indices.len() {
            // the topology-preserving pass stalled, only accept a sloppy one
            // once a first simplified LOD exists
            if self.produced < 2 {
                return self.finish();
            }
            simplified = self.simplifier.simplify_sloppy(
                &self.indices,
                &adapter,
                self.target,
                self.target_error,
            );
            sloppy = true;
            if simplified.len() == self.indices.len() || simplified.is_empty() {
                return self.finish();
            }
        }

        meshopt::optimize_vertex_cache_in_place(&mut simplified, self.vertex_count);
        log::info!(
            "LOD{}: {} indices {}",
            self.produced,
            simplified.len(),
            if sloppy { "[sloppy]" } else { "" }
        );
        if sloppy {
            self.sloppy_lods += 1;
        }
        self.indices = simplified;
        Some(self.indices.clone())
    }
}

impl<S: Simplifier> Iterator for LodCascade<'_, S> {
    type Item = Vec<u32>;

    fn next(&mut self) -> Option<Vec<u32>> {
        if self.finished {
            return None;
        }
        let lod = if self.produced == 0 {
            log::info!("LOD0: {} indices", self.indices.len());
            Some(self.indices.clone())
        } else {
            self.simplify_next()
        };
        if lod.is_some() {
            self.produced += 1;
        }
        lod
    }
}

impl<S: Simplifier> std::iter::FusedIterator for LodCascade<'_, S> {}
