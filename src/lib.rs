//! lod-ngin
//!
//! Mesh preparation for GPU-driven rendering. Imported triangle meshes are
//! optimized, simplified into a cascade of levels of detail and packed into
//! shared vertex/index buffers together with baked materials. A packed model
//! plus its scene is then uploaded as one set of storage and indirect buffers
//! that a renderer draws with a single multi-draw-indirect call.
//!
//! High-level modules
//! - `config`: tunables of the optimization and simplification pipeline
//! - `context`: headless WGPU device/queue, the default [`gpu::GpuDevice`]
//! - `data_structures`: packed meshes, materials, bounds, scene and textures
//! - `gpu`: the buffer/texture interface the GPU scene is written against
//! - `processing`: optimizer, LOD cascade, mesh packer and material baker
//! - `resources`: model import (OBJ, glTF) and the cached mesh file format
//! - `render`: indirect draw assembly, frustum culling and the GPU scene
//!

pub mod config;
pub mod context;
pub mod data_structures;
pub mod gpu;
pub mod processing;
pub mod render;
pub mod resources;

pub use config::PipelineConfig;
pub use data_structures::mesh::{K_MAX_LODS, Mesh, MeshData};
pub use processing::{build_mesh_data, load_model};
pub use render::{CullingMode, GpuScene};
