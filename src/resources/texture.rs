use std::path::Path;

use anyhow::Context as _;

use crate::data_structures::texture::Texture;

pub fn load_binary(path: &str) -> anyhow::Result<Vec<u8>> {
    std::fs::read(path).with_context(|| format!("reading {path}"))
}

/// Reads an image file and uploads it. The file extension is used as a
/// format hint, everything else is auto-detected.
pub fn load_texture(
    path: &str,
    is_linear: bool,
    device: &wgpu::Device,
    queue: &wgpu::Queue,
) -> anyhow::Result<Texture> {
    let data = load_binary(path)?;
    let format = Path::new(path).extension().and_then(|ext| ext.to_str());
    Texture::decode(device, queue, &data, path, format, is_linear)
        .with_context(|| format!("decoding texture {path}"))
}
