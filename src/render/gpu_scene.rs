//! GPU-resident copy of a packed model and its scene.
//!
//! [`GpuScene`] uploads the vertex, index, transform, material, draw-data and
//! indirect buffers once at construction. After that only three things change,
//! each through its own update call: node transforms, single materials, and
//! per-draw instance counts written by culling.

use cgmath::Matrix4;

use crate::{
    context::Context,
    data_structures::{
        bounds::Frustum,
        material::GpuMaterial,
        mesh::MeshData,
        scene_graph::SceneView,
    },
    gpu::GpuDevice,
    processing::texture_cache::TextureCache,
};

use super::{
    culling,
    indirect::{DrawBuffers, LodSelection},
};

const MATERIAL_SIZE: u64 = size_of::<GpuMaterial>() as u64;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum CullingMode {
    #[default]
    Off,
    /// Frustum test per draw on the CPU every [`GpuScene::update_culling`].
    Cpu,
}

pub struct GpuScene<G: GpuDevice> {
    pub vertex_buffer: G::Buffer,
    pub index_buffer: G::Buffer,
    pub transforms_buffer: G::Buffer,
    pub materials_buffer: G::Buffer,
    pub draw_data_buffer: G::Buffer,
    pub indirect_buffer: G::Buffer,
    draws: DrawBuffers,
    materials: Vec<GpuMaterial>,
    textures: TextureCache<G::Texture>,
    transform_count: usize,
    culling: CullingMode,
}

fn transform_bytes(transforms: &[Matrix4<f32>]) -> Vec<u8> {
    let raw: Vec<[[f32; 4]; 4]> = transforms.iter().map(|m| (*m).into()).collect();
    bytemuck::cast_slice(&raw).to_vec()
}

impl<G: GpuDevice> GpuScene<G> {
    pub fn new(gpu: &G, mesh_data: &MeshData, scene: &impl SceneView) -> Self {
        let mut textures = TextureCache::new(gpu.placeholder_texture());
        let materials: Vec<GpuMaterial> = mesh_data
            .materials
            .iter()
            .map(|material| {
                textures.resolve_material(material, &mesh_data.texture_files, |path, linear| {
                    gpu.load_texture(path, linear)
                })
            })
            .collect();
        log::info!(
            "{} materials, {} textures ({} files)",
            materials.len(),
            textures.len(),
            mesh_data.texture_files.len()
        );

        let draws = DrawBuffers::assemble(mesh_data, scene, LodSelection::Base);
        log::info!("{} indirect draws", draws.len());

        let storage = wgpu::BufferUsages::STORAGE;
        let vertex_buffer =
            gpu.create_buffer("vertex buffer", &mesh_data.vertex_data, wgpu::BufferUsages::VERTEX);
        let index_buffer = gpu.create_buffer(
            "index buffer",
            bytemuck::cast_slice(&mesh_data.index_data),
            wgpu::BufferUsages::INDEX,
        );
        let transforms_buffer = gpu.create_buffer(
            "transforms buffer",
            &transform_bytes(scene.global_transforms()),
            storage,
        );
        let materials_buffer =
            gpu.create_buffer("materials buffer", bytemuck::cast_slice(&materials), storage);
        let draw_data_buffer = gpu.create_buffer(
            "draw data buffer",
            bytemuck::cast_slice(&draws.draw_data),
            storage,
        );
        let indirect_buffer =
            gpu.create_buffer("indirect buffer", &draws.indirect_bytes(), wgpu::BufferUsages::INDIRECT);

        Self {
            vertex_buffer,
            index_buffer,
            transforms_buffer,
            materials_buffer,
            draw_data_buffer,
            indirect_buffer,
            draws,
            materials,
            textures,
            transform_count: scene.global_transforms().len(),
            culling: CullingMode::Off,
        }
    }

    pub fn draws(&self) -> &DrawBuffers {
        &self.draws
    }

    pub fn materials(&self) -> &[GpuMaterial] {
        &self.materials
    }

    pub fn textures(&self) -> &TextureCache<G::Texture> {
        &self.textures
    }

    pub fn culling(&self) -> CullingMode {
        self.culling
    }

    /// Uploads all global transforms of `scene`.
    ///
    /// Returns `true` when the node count grew and the transforms buffer had
    /// to be recreated, in which case bind groups referencing it are stale.
    pub fn update_global_transforms(&mut self, gpu: &G, scene: &impl SceneView) -> bool {
        let transforms = scene.global_transforms();
        let bytes = transform_bytes(transforms);
        if transforms.len() > self.transform_count {
            log::info!(
                "transforms buffer grows from {} to {} nodes",
                self.transform_count,
                transforms.len()
            );
            self.transforms_buffer =
                gpu.create_buffer("transforms buffer", &bytes, wgpu::BufferUsages::STORAGE);
            self.transform_count = transforms.len();
            return true;
        }
        gpu.write_buffer(&self.transforms_buffer, 0, &bytes);
        false
    }

    /// Re-bakes material `index` from `mesh_data` and uploads only that slot.
    /// Negative indices are ignored.
    pub fn update_material(&mut self, gpu: &G, index: i32, mesh_data: &MeshData) {
        if index < 0 {
            return;
        }
        let slot = index as usize;
        let Some(material) = mesh_data
            .materials
            .get(slot)
            .filter(|_| slot < self.materials.len())
        else {
            log::warn!(
                "Material {} out of range ({} materials)",
                index,
                self.materials.len()
            );
            return;
        };
        let gpu_material = self
            .textures
            .resolve_material(material, &mesh_data.texture_files, |path, linear| {
                gpu.load_texture(path, linear)
            });
        self.materials[slot] = gpu_material;
        gpu.write_buffer(
            &self.materials_buffer,
            slot as u64 * MATERIAL_SIZE,
            bytemuck::bytes_of(&gpu_material),
        );
    }

    /// Switches culling on or off. Turning it off makes every draw visible
    /// again in place.
    pub fn set_culling(&mut self, gpu: &G, mode: CullingMode) {
        self.culling = mode;
        if mode == CullingMode::Off {
            let dirty = culling::reset(&mut self.draws);
            self.upload_commands(gpu, dirty);
        }
    }

    /// Re-runs the frustum test for `view_proj` when culling is on.
    pub fn update_culling(
        &mut self,
        gpu: &G,
        view_proj: &Matrix4<f32>,
        mesh_data: &MeshData,
        scene: &impl SceneView,
    ) {
        if self.culling == CullingMode::Off {
            return;
        }
        let frustum = Frustum::from_view_proj(view_proj);
        let dirty = culling::cull(&mut self.draws, &frustum, mesh_data, scene);
        self.upload_commands(gpu, dirty);
    }

    fn upload_commands(&self, gpu: &G, dirty: Option<std::ops::Range<usize>>) {
        if let Some(range) = dirty {
            let (offset, bytes) = self.draws.command_span(range);
            gpu.write_buffer(&self.indirect_buffer, offset, bytes);
        }
    }
}

/// Layout of the scene bind group: transforms, draw data and materials as
/// read-only storage buffers at bindings 0, 1 and 2.
pub fn mk_bind_group_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    let storage = |binding| wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Storage { read_only: true },
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    };
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &[storage(0), storage(1), storage(2)],
        label: Some("scene bind group layout"),
    })
}

impl GpuScene<Context> {
    pub fn mk_bind_group(
        &self,
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
    ) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: self.transforms_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: self.draw_data_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: self.materials_buffer.as_entire_binding(),
                },
            ],
            label: Some("scene bind group"),
        })
    }

    /// Records every draw of the scene as one multi-draw-indirect call.
    ///
    /// The pipeline must be set already; `scene_group` is bound at `group_index`.
    pub fn draw(
        &self,
        ctx: &Context,
        render_pass: &mut wgpu::RenderPass<'_>,
        scene_group: &wgpu::BindGroup,
        group_index: u32,
    ) {
        if self.draws.is_empty() {
            return;
        }
        render_pass.set_bind_group(group_index, scene_group, &[]);
        render_pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
        render_pass.set_index_buffer(self.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
        let max_count = self.draws.len() as u32;
        if ctx.supports_indirect_count() {
            render_pass.multi_draw_indexed_indirect_count(
                &self.indirect_buffer,
                DrawBuffers::COMMANDS_OFFSET,
                &self.indirect_buffer,
                0,
                max_count,
            );
        } else {
            render_pass.multi_draw_indexed_indirect(
                &self.indirect_buffer,
                DrawBuffers::COMMANDS_OFFSET,
                max_count,
            );
        }
    }
}
