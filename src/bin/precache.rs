//! Imports a model, caches its packed mesh data and reports what was built.
//!
//! Usage: `precache <model> <cache-file> [--upload]`
//!
//! The cache is only rebuilt when it is missing or fails validation. With
//! `--upload` the cached data is also uploaded to a headless GPU device and
//! the indirect buffer is read back for verification.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context as _;
use lod_ngin::{
    PipelineConfig,
    context::Context,
    data_structures::{mesh::MeshData, scene_graph::Scene},
    load_model,
    render::{DrawBuffers, GpuScene},
    resources::mesh_file,
};

struct Args {
    model: PathBuf,
    cache: PathBuf,
    upload: bool,
}

fn parse_args() -> Option<Args> {
    let mut positional = Vec::new();
    let mut upload = false;
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--upload" => upload = true,
            _ => positional.push(PathBuf::from(arg)),
        }
    }
    let [model, cache] = <[PathBuf; 2]>::try_from(positional).ok()?;
    Some(Args {
        model,
        cache,
        upload,
    })
}

fn report(mesh_data: &MeshData) {
    let lods: u32 = mesh_data.meshes.iter().map(|m| m.lod_count).sum();
    let lod0: u32 = mesh_data.meshes.iter().map(|m| m.lod_indices_count(0)).sum();
    println!("submeshes:     {}", mesh_data.meshes.len());
    println!("lods:          {}", lods);
    println!("lod0 indices:  {}", lod0);
    println!("all indices:   {}", mesh_data.index_data.len());
    println!("vertices:      {}", mesh_data.vertex_count());
    println!("materials:     {}", mesh_data.materials.len());
    println!("texture files: {}", mesh_data.texture_files.len());
    let bounds = mesh_data.bounds();
    println!("bounds:        {:?} .. {:?}", bounds.min, bounds.max);
}

async fn upload(mesh_data: &MeshData, scene: &Scene) -> anyhow::Result<()> {
    let ctx = Context::new().await?;
    let gpu_scene = GpuScene::new(&ctx, mesh_data, scene);
    let draws = gpu_scene.draws();
    let size = DrawBuffers::COMMANDS_OFFSET + draws.len() as u64 * DrawBuffers::COMMAND_SIZE;
    let bytes = ctx
        .read_buffer(&gpu_scene.indirect_buffer, 0, size)
        .await
        .context("reading back the indirect buffer")?;
    anyhow::ensure!(
        bytes == draws.indirect_bytes(),
        "indirect buffer on the GPU differs from the assembled commands"
    );
    println!("uploaded:      {} draws, {} textures", draws.len(), gpu_scene.textures().len());
    Ok(())
}

fn run(args: &Args) -> Result<(), ExitCode> {
    let config = PipelineConfig::default();
    let mut scene = None;
    if !mesh_file::is_mesh_data_valid(&args.cache) {
        let (mesh_data, imported_scene) = load_model(&args.model, &config).map_err(|e| {
            log::error!("{}", e);
            eprintln!("{}", e);
            ExitCode::from(e.exit_code() as u8)
        })?;
        mesh_file::save_mesh_data(&args.cache, &mesh_data).map_err(|e| fail(&args.cache, e))?;
        scene = Some(imported_scene);
    }

    let mesh_data = mesh_file::load_mesh_data(&args.cache).map_err(|e| fail(&args.cache, e))?;
    report(&mesh_data);

    if args.upload {
        // The cache holds no scene, so a freshly loaded cache draws every
        // submesh once with an identity transform.
        let scene = scene.unwrap_or_else(|| flat_scene(&mesh_data));
        let runtime = tokio::runtime::Runtime::new().map_err(|e| fail(&args.cache, e))?;
        runtime
            .block_on(upload(&mesh_data, &scene))
            .map_err(|e| fail(&args.cache, e))?;
    }
    Ok(())
}

fn flat_scene(mesh_data: &MeshData) -> Scene {
    let mut scene = Scene::new();
    let root = scene.add_node(None);
    for (mesh_index, mesh) in mesh_data.meshes.iter().enumerate() {
        let node = scene.add_node(Some(root));
        scene.mesh_for_node.insert(node, mesh_index as u32);
        scene.material_for_node.insert(node, mesh.material_id);
    }
    scene
}

fn fail(path: &Path, e: impl std::fmt::Display) -> ExitCode {
    log::error!("'{}': {}", path.display(), e);
    eprintln!("'{}': {}", path.display(), e);
    ExitCode::FAILURE
}

fn main() -> ExitCode {
    if let Err(e) = env_logger::try_init() {
        println!("Warning: Could not initialize logger: {}", e);
    };

    let Some(args) = parse_args() else {
        eprintln!("usage: precache <model> <cache-file> [--upload]");
        return ExitCode::from(2);
    };
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(code) => code,
    }
}
