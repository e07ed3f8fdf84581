#[cfg(feature = "integration-tests")]
mod common;

#[test]
#[cfg(feature = "integration-tests")]
fn gpu_buffers_match_the_assembled_scene() {
    use lod_ngin::{
        PipelineConfig, build_mesh_data,
        context::Context,
        data_structures::{material::GpuMaterial, scene_graph::Scene},
        render::{CullingMode, DrawBuffers, GpuScene, gpu_scene::mk_bind_group_layout},
    };

    use crate::common::test_utils::{forward_view_proj, two_node_scene};

    let runtime = tokio::runtime::Runtime::new().unwrap();
    runtime.block_on(async {
        let ctx = Context::new().await.expect("no GPU adapter available");
        let imported = two_node_scene();
        let mut mesh_data = build_mesh_data(&imported, &PipelineConfig::default());
        let scene = Scene::from_import(&imported, &mesh_data);
        let mut gpu_scene = GpuScene::new(&ctx, &mesh_data, &scene);

        let indirect_size =
            DrawBuffers::COMMANDS_OFFSET + gpu_scene.draws().len() as u64 * DrawBuffers::COMMAND_SIZE;
        let bytes = ctx
            .read_buffer(&gpu_scene.indirect_buffer, 0, indirect_size)
            .await
            .unwrap();
        assert_eq!(bytes, gpu_scene.draws().indirect_bytes());

        gpu_scene.set_culling(&ctx, CullingMode::Cpu);
        gpu_scene.update_culling(&ctx, &forward_view_proj(), &mesh_data, &scene);
        let bytes = ctx
            .read_buffer(&gpu_scene.indirect_buffer, 0, indirect_size)
            .await
            .unwrap();
        assert_eq!(bytes, gpu_scene.draws().indirect_bytes());
        assert_eq!(gpu_scene.draws().commands[2].instance_count, 0);

        mesh_data.materials[0].roughness = 0.5;
        gpu_scene.update_material(&ctx, 0, &mesh_data);
        let size = size_of::<GpuMaterial>() as u64;
        let bytes = ctx
            .read_buffer(&gpu_scene.materials_buffer, 0, size)
            .await
            .unwrap();
        let material: GpuMaterial = bytemuck::pod_read_unaligned(&bytes);
        assert_eq!(material.roughness, 0.5);

        let layout = mk_bind_group_layout(&ctx.device);
        let _group = gpu_scene.mk_bind_group(&ctx.device, &layout);
    });
}
