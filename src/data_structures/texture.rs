//! GPU textures referenced by baked materials.
//!
//! Material textures are decoded with [`Texture::decode`]; the texture cache
//! keeps a [`placeholder`](Texture::placeholder) in slot 0 for every material
//! slot without a texture.

use image::ImageFormat;
use wgpu::util::DeviceExt;

/// An RGBA8 material texture with its view and sampler.
#[derive(Clone, Debug)]
pub struct Texture {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub sampler: wgpu::Sampler,
}

impl Texture {
    /// A `width` x `height` texture filled with one color.
    pub fn solid_color(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        color: [u8; 4],
        width: u32,
        height: u32,
        label: &str,
    ) -> Texture {
        let texels = width as usize * height as usize;
        let data = color.repeat(texels);
        Self::upload(device, queue, &data, (width, height), label, true)
    }

    /// The 1x1 white texture living in texture cache slot 0, so shaders can
    /// sample unconditionally.
    pub fn placeholder(device: &wgpu::Device, queue: &wgpu::Queue) -> Texture {
        Self::solid_color(device, queue, [u8::MAX; 4], 1, 1, "placeholder texture")
    }

    /// Decodes an encoded image (PNG, JPEG, ...) and uploads it.
    ///
    /// `extension` is a format hint such as `"png"`; unknown or missing hints
    /// fall back to sniffing the data. Color textures are stored as sRGB,
    /// `is_linear` keeps the data linear as normal and opacity maps need.
    pub fn decode(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoded: &[u8],
        label: &str,
        extension: Option<&str>,
        is_linear: bool,
    ) -> anyhow::Result<Self> {
        let decoded = match extension.and_then(ImageFormat::from_extension) {
            Some(format) => image::load_from_memory_with_format(encoded, format)?,
            None => image::load_from_memory(encoded)?,
        }
        .into_rgba8();
        let dimensions = decoded.dimensions();
        Ok(Self::upload(device, queue, &decoded, dimensions, label, is_linear))
    }

    fn upload(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        rgba: &[u8],
        (width, height): (u32, u32),
        label: &str,
        is_linear: bool,
    ) -> Self {
        let texture = device.create_texture_with_data(
            queue,
            &wgpu::TextureDescriptor {
                label: Some(label),
                size: wgpu::Extent3d {
                    width,
                    height,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: if is_linear {
                    wgpu::TextureFormat::Rgba8Unorm
                } else {
                    wgpu::TextureFormat::Rgba8UnormSrgb
                },
                usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
                view_formats: &[],
            },
            wgpu::util::TextureDataOrder::LayerMajor,
            rgba,
        );
        Self {
            view: texture.create_view(&Default::default()),
            sampler: material_sampler(device),
            texture,
        }
    }
}

/// Trilinear, wrapping sampler used for every material texture.
pub fn material_sampler(device: &wgpu::Device) -> wgpu::Sampler {
    let wrap = wgpu::AddressMode::Repeat;
    let linear = wgpu::FilterMode::Linear;
    device.create_sampler(&wgpu::SamplerDescriptor {
        label: Some("material sampler"),
        address_mode_u: wrap,
        address_mode_v: wrap,
        address_mode_w: wrap,
        mag_filter: linear,
        min_filter: linear,
        mipmap_filter: wgpu::MipmapFilterMode::Linear,
        ..Default::default()
    })
}
