//! Core data types shared by the import, processing and GPU stages.
//!
//! - `vertex` is the packed vertex layout and its stream descriptor
//! - `mesh` holds submesh records and the mesh-wide buffers
//! - `material` contains baked material records and their GPU layout
//! - `bounds` has bounding boxes and the culling frustum
//! - `scene_graph` is the flat node hierarchy with mesh/material assignments
//! - `texture` contains the GPU texture wrapper

pub mod bounds;
pub mod material;
pub mod mesh;
pub mod scene_graph;
pub mod texture;
pub mod vertex;
