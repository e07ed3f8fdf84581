//! Turning packed mesh data plus a scene into GPU draw state.
//!
//! - `indirect`: draw command and draw-data assembly
//! - `culling`: CPU frustum culling of assembled draws
//! - `gpu_scene`: the uploaded buffers and their per-frame updates

pub mod culling;
pub mod gpu_scene;
pub mod indirect;

pub use gpu_scene::{CullingMode, GpuScene};
pub use indirect::{DrawBuffers, DrawData, DrawIndexedIndirectCommand, LodSelection};
