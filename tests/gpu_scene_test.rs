use cgmath::{Matrix4, Vector3};
use lod_ngin::{
    PipelineConfig, build_mesh_data,
    data_structures::{
        material::GpuMaterial,
        mesh::MeshData,
        scene_graph::{Scene, SceneView},
    },
    render::{CullingMode, DrawBuffers, DrawData, DrawIndexedIndirectCommand, GpuScene},
};

mod common;

use common::test_utils::{BufferWrite, MockGpu, forward_view_proj, two_node_scene};

fn setup() -> (MockGpu, MeshData, Scene) {
    let imported = two_node_scene();
    let mesh_data = build_mesh_data(&imported, &PipelineConfig::default());
    let scene = Scene::from_import(&imported, &mesh_data);
    (MockGpu::new(), mesh_data, scene)
}

fn commands(gpu: &MockGpu, buffer: usize) -> Vec<DrawIndexedIndirectCommand> {
    let bytes = gpu.contents(buffer);
    bytemuck::pod_collect_to_vec(&bytes[DrawBuffers::COMMANDS_OFFSET as usize..])
}

#[test]
fn uploaded_draws_are_index_aligned() {
    let (gpu, mesh_data, scene) = setup();
    let gpu_scene = GpuScene::new(&gpu, &mesh_data, &scene);

    let indirect = gpu.contents(gpu_scene.indirect_buffer);
    assert_eq!(u32::from_ne_bytes([indirect[0], indirect[1], indirect[2], indirect[3]]), 3);
    let commands = commands(&gpu, gpu_scene.indirect_buffer);
    let draw_data: Vec<DrawData> =
        bytemuck::pod_collect_to_vec(&gpu.contents(gpu_scene.draw_data_buffer));
    assert_eq!(commands.len(), scene.mesh_assignments().count());
    assert_eq!(draw_data.len(), commands.len());

    for (i, ((node, mesh_index), (command, data))) in scene
        .mesh_assignments()
        .zip(commands.iter().zip(&draw_data))
        .enumerate()
    {
        let mesh = mesh_data.meshes[mesh_index as usize];
        assert_eq!(command.base_instance, i as u32);
        assert_eq!(command.instance_count, 1);
        assert_eq!(command.count, mesh.lod_indices_count(0));
        assert_eq!(command.first_index, mesh.index_offset);
        assert_eq!(command.base_vertex, mesh.vertex_offset as i32);
        assert_eq!(data.transform_id, node);
        assert_eq!(data.material_id, mesh.material_id);
    }
}

#[test]
fn buffers_hold_transforms_and_materials() {
    let (gpu, mesh_data, scene) = setup();
    let gpu_scene = GpuScene::new(&gpu, &mesh_data, &scene);

    let transforms: Vec<[[f32; 4]; 4]> =
        bytemuck::pod_collect_to_vec(&gpu.contents(gpu_scene.transforms_buffer));
    assert_eq!(transforms.len(), scene.node_count());
    assert_eq!(transforms[2][3][2], -10.0);
    assert_eq!(transforms[5][3][2], 10.0);

    let materials: Vec<GpuMaterial> =
        bytemuck::pod_collect_to_vec(&gpu.contents(gpu_scene.materials_buffer));
    assert_eq!(materials.len(), mesh_data.materials.len());
    assert_eq!(materials, gpu_scene.materials());
    // slot 0 is the placeholder, the broken texture falls back to it
    assert_eq!(materials[0].base_color_texture, 1);
    assert_eq!(materials[0].normal_texture, 2);
    assert_eq!(materials[1].base_color_texture, 0);
    assert_eq!(materials[2].base_color_texture, 0);
    assert_eq!(
        gpu_scene.textures().textures(),
        ["placeholder", "textures/albedo.png", "textures/normal.png"]
    );
    assert_eq!(
        *gpu.loads.borrow(),
        vec![
            ("textures/albedo.png".to_string(), false),
            ("textures/normal.png".to_string(), true),
            ("textures/missing.png".to_string(), false),
        ]
    );
}

#[test]
fn culling_only_touches_instance_counts() {
    let (gpu, mesh_data, scene) = setup();
    let mut gpu_scene = GpuScene::new(&gpu, &mesh_data, &scene);
    let before = commands(&gpu, gpu_scene.indirect_buffer);

    // off by default, so nothing is culled
    gpu_scene.update_culling(&gpu, &forward_view_proj(), &mesh_data, &scene);
    assert!(gpu.writes.borrow().is_empty());

    gpu_scene.set_culling(&gpu, CullingMode::Cpu);
    gpu_scene.update_culling(&gpu, &forward_view_proj(), &mesh_data, &scene);
    let culled = commands(&gpu, gpu_scene.indirect_buffer);
    let counts: Vec<u32> = culled.iter().map(|c| c.instance_count).collect();
    assert_eq!(counts, vec![1, 1, 0]);
    assert_eq!(culled.len(), before.len());
    for (a, b) in culled.iter().zip(&before) {
        assert_eq!(
            (a.count, a.first_index, a.base_vertex, a.base_instance),
            (b.count, b.first_index, b.base_vertex, b.base_instance)
        );
    }
    assert_eq!(
        gpu.writes_to(gpu_scene.indirect_buffer),
        vec![BufferWrite {
            buffer: gpu_scene.indirect_buffer,
            offset: 4 + 2 * 20,
            len: 20,
        }]
    );
    assert_eq!(gpu_scene.draws().commands, culled);

    let buffers_before = gpu.buffers.borrow().len();
    gpu_scene.set_culling(&gpu, CullingMode::Off);
    assert_eq!(commands(&gpu, gpu_scene.indirect_buffer), before);
    assert_eq!(gpu.buffers.borrow().len(), buffers_before);
}

#[test]
fn moving_a_node_updates_its_transform() {
    let (gpu, mesh_data, mut scene) = setup();
    let mut gpu_scene = GpuScene::new(&gpu, &mesh_data, &scene);

    scene.set_local_transform(1, Matrix4::from_translation(Vector3::new(0.0, 0.0, -20.0)));
    assert!(scene.recalculate_global_transforms());
    assert!(!gpu_scene.update_global_transforms(&gpu, &scene));

    let transforms: Vec<[[f32; 4]; 4]> =
        bytemuck::pod_collect_to_vec(&gpu.contents(gpu_scene.transforms_buffer));
    assert_eq!(transforms[2][3][2], -20.0);
    assert_eq!(transforms[3][3][2], -20.0);
    assert_eq!(transforms[5][3][2], 10.0);

    // the moved quads are now out of the far plane
    gpu_scene.set_culling(&gpu, CullingMode::Cpu);
    let far = cgmath::perspective(cgmath::Deg(60.0), 1.0, 0.1, 15.0)
        * Matrix4::look_at_rh(
            cgmath::Point3::new(0.0, 0.0, 0.0),
            cgmath::Point3::new(0.0, 0.0, -1.0),
            Vector3::unit_y(),
        );
    gpu_scene.update_culling(&gpu, &far, &mesh_data, &scene);
    let counts: Vec<u32> = gpu_scene
        .draws()
        .commands
        .iter()
        .map(|c| c.instance_count)
        .collect();
    assert_eq!(counts, vec![0, 0, 0]);
}

#[test]
fn growing_scenes_recreate_the_transforms_buffer() {
    let (gpu, mesh_data, mut scene) = setup();
    let mut gpu_scene = GpuScene::new(&gpu, &mesh_data, &scene);
    let old = gpu_scene.transforms_buffer;

    scene.add_node(Some(0));
    assert!(gpu_scene.update_global_transforms(&gpu, &scene));
    assert_ne!(gpu_scene.transforms_buffer, old);
    assert_eq!(gpu.contents(gpu_scene.transforms_buffer).len(), 7 * 64);
}

#[test]
fn editing_a_material_rewrites_only_its_slot() {
    let (gpu, mut mesh_data, scene) = setup();
    let mut gpu_scene = GpuScene::new(&gpu, &mesh_data, &scene);
    let loads_before = gpu.loads.borrow().len();

    mesh_data.materials[1].base_color_texture = 0;
    mesh_data.materials[1].roughness = 0.25;
    gpu_scene.update_material(&gpu, 1, &mesh_data);

    assert_eq!(
        gpu.writes_to(gpu_scene.materials_buffer),
        vec![BufferWrite {
            buffer: gpu_scene.materials_buffer,
            offset: 80,
            len: 80,
        }]
    );
    let materials: Vec<GpuMaterial> =
        bytemuck::pod_collect_to_vec(&gpu.contents(gpu_scene.materials_buffer));
    assert_eq!(materials[1].base_color_texture, 1);
    assert_eq!(materials[1].roughness, 0.25);
    assert_eq!(materials[0], gpu_scene.materials()[0]);
    // albedo was already cached
    assert_eq!(gpu.loads.borrow().len(), loads_before);

    gpu.clear_writes();
    gpu_scene.update_material(&gpu, -1, &mesh_data);
    gpu_scene.update_material(&gpu, 17, &mesh_data);
    assert!(gpu.writes.borrow().is_empty());
}
