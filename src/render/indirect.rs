//! Indirect draw commands and the per-draw data they index.
//!
//! One draw is emitted per `(node, submesh)` assignment of the scene. Draw
//! `i` has `base_instance == i`, which is how the vertex shader finds its
//! [`DrawData`] entry and through it the node transform and material.

use std::ops::Range;

use crate::data_structures::{mesh::MeshData, scene_graph::SceneView};

/// Matches the layout `draw_indexed_indirect` reads (`wgpu::util::DrawIndexedIndirectArgs`).
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct DrawIndexedIndirectCommand {
    pub count: u32,
    pub instance_count: u32,
    pub first_index: u32,
    pub base_vertex: i32,
    pub base_instance: u32,
}

#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct DrawData {
    pub transform_id: u32,
    pub material_id: u32,
}

/// Which LOD the assembled commands draw.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum LodSelection {
    /// Always the full resolution LOD 0.
    #[default]
    Base,
}

impl LodSelection {
    pub fn lod(&self) -> u32 {
        match self {
            LodSelection::Base => 0,
        }
    }
}

/// CPU copy of the indirect command and draw-data arrays.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DrawBuffers {
    pub commands: Vec<DrawIndexedIndirectCommand>,
    pub draw_data: Vec<DrawData>,
    /// Submesh drawn by each command.
    pub draw_meshes: Vec<u32>,
}

impl DrawBuffers {
    /// Byte offset of the first command in the indirect buffer, after the
    /// leading draw count.
    pub const COMMANDS_OFFSET: u64 = size_of::<u32>() as u64;
    pub const COMMAND_SIZE: u64 = size_of::<DrawIndexedIndirectCommand>() as u64;

    pub fn assemble(mesh_data: &MeshData, scene: &impl SceneView, selection: LodSelection) -> Self {
        let mut buffers = DrawBuffers::default();
        for (node, mesh_index) in scene.mesh_assignments() {
            let base_instance = buffers.commands.len() as u32;
            let (command, material_id) = match mesh_data.meshes.get(mesh_index as usize) {
                Some(mesh) => {
                    let lod = selection.lod().min(mesh.lod_count.saturating_sub(1));
                    (
                        DrawIndexedIndirectCommand {
                            count: mesh.lod_indices_count(lod),
                            instance_count: 1,
                            first_index: mesh.index_offset + mesh.lod_offset[lod as usize],
                            base_vertex: mesh.vertex_offset as i32,
                            base_instance,
                        },
                        mesh.material_id,
                    )
                }
                None => {
                    log::warn!("Node {} references missing mesh {}", node, mesh_index);
                    (
                        DrawIndexedIndirectCommand {
                            base_instance,
                            ..Default::default()
                        },
                        0,
                    )
                }
            };
            log::debug!("draw {}: node {} mesh {} {:?}", base_instance, node, mesh_index, command);
            buffers.commands.push(command);
            buffers.draw_data.push(DrawData {
                transform_id: node,
                material_id,
            });
            buffers.draw_meshes.push(mesh_index);
        }
        buffers
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// The indirect buffer contents: the draw count followed by all commands.
    pub fn indirect_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(
            Self::COMMANDS_OFFSET as usize + self.commands.len() * Self::COMMAND_SIZE as usize,
        );
        bytes.extend_from_slice(&(self.commands.len() as u32).to_ne_bytes());
        bytes.extend_from_slice(bytemuck::cast_slice(&self.commands));
        bytes
    }

    /// Byte offset inside the indirect buffer and bytes of `commands`.
    pub fn command_span(&self, commands: Range<usize>) -> (u64, &[u8]) {
        let offset = Self::COMMANDS_OFFSET + commands.start as u64 * Self::COMMAND_SIZE;
        (offset, bytemuck::cast_slice(&self.commands[commands]))
    }

    /// Sets every instance count to `visible` as 0/1. Returns the range of
    /// commands that changed.
    pub fn set_visibility(&mut self, mut visible: impl FnMut(usize) -> bool) -> Option<Range<usize>> {
        let mut dirty: Option<Range<usize>> = None;
        for (i, command) in self.commands.iter_mut().enumerate() {
            let instance_count = u32::from(visible(i));
            if command.instance_count != instance_count {
                command.instance_count = instance_count;
                dirty = Some(match dirty {
                    Some(range) => range.start..i + 1,
                    None => i..i + 1,
                });
            }
        }
        dirty
    }
}
