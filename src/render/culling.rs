//! CPU frustum culling over the assembled draws.
//!
//! Culling only flips each command's `instance_count` between 0 and 1. The
//! number of commands and every other field stay untouched, so the indirect
//! buffer never has to be rebuilt.

use std::ops::Range;

use crate::data_structures::{
    bounds::{BoundingBox, Frustum},
    mesh::MeshData,
    scene_graph::SceneView,
};

use super::indirect::DrawBuffers;

/// World-space box of draw `draw`, or `None` if it references no box.
pub fn world_bounds(
    draws: &DrawBuffers,
    draw: usize,
    mesh_data: &MeshData,
    scene: &impl SceneView,
) -> Option<BoundingBox> {
    let mesh = *draws.draw_meshes.get(draw)? as usize;
    let node = draws.draw_data.get(draw)?.transform_id;
    let bbox = mesh_data.boxes.get(mesh)?;
    Some(bbox.transformed(&scene.global_transform(node)))
}

/// Recomputes visibility of every draw against `frustum`.
///
/// Returns the span of commands whose instance count changed, which is the
/// only part of the indirect buffer that needs uploading.
pub fn cull(
    draws: &mut DrawBuffers,
    frustum: &Frustum,
    mesh_data: &MeshData,
    scene: &impl SceneView,
) -> Option<Range<usize>> {
    let visible: Vec<bool> = (0..draws.len())
        .map(|draw| match world_bounds(draws, draw, mesh_data, scene) {
            Some(bbox) => frustum.intersects_box(&bbox),
            // nothing to test against, keep it
            None => true,
        })
        .collect();
    let dirty = draws.set_visibility(|draw| visible[draw]);
    if log::log_enabled!(log::Level::Debug) {
        let culled = visible.iter().filter(|v| !**v).count();
        log::debug!("culled {} of {} draws", culled, visible.len());
    }
    dirty
}

/// Makes every draw visible again.
pub fn reset(draws: &mut DrawBuffers) -> Option<Range<usize>> {
    draws.set_visibility(|_| true)
}
