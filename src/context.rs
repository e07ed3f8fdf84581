//! Headless WGPU device and queue.
//!
//! The renderer embedding this crate owns the window and surface; all the
//! mesh pipeline needs is a device to create buffers and textures on.

use anyhow::{Context as _, anyhow};
use wgpu::util::DeviceExt;

use crate::{data_structures::texture::Texture, gpu::GpuDevice, resources};

/// Storage buffers must not be empty, so empty contents are padded to this.
const MIN_BUFFER_SIZE: usize = 16;

#[derive(Debug)]
pub struct Context {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub features: wgpu::Features,
}

impl Context {
    /// Features used when the adapter offers them.
    pub fn optional_features() -> wgpu::Features {
        wgpu::Features::INDIRECT_FIRST_INSTANCE | wgpu::Features::MULTI_DRAW_INDIRECT_COUNT
    }

    pub async fn new() -> anyhow::Result<Self> {
        log::info!("WGPU setup");
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..wgpu::InstanceDescriptor::new_without_display_handle()
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .context("no suitable GPU adapter")?;
        Self::from_adapter(&adapter).await
    }

    pub async fn from_adapter(adapter: &wgpu::Adapter) -> anyhow::Result<Self> {
        let features = adapter.features() & Self::optional_features();
        if !features.contains(wgpu::Features::INDIRECT_FIRST_INSTANCE) {
            log::warn!("Adapter lacks INDIRECT_FIRST_INSTANCE, per-draw data will not be indexed");
        }
        log::info!("device and queue");
        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("lod-ngin device"),
                required_features: features,
                required_limits: wgpu::Limits::default(),
                ..Default::default()
            })
            .await
            .context("requesting device")?;

        Ok(Self {
            device,
            queue,
            features,
        })
    }

    /// Copies `size` bytes of `buffer` starting at `offset` back to the CPU.
    ///
    /// `buffer` needs `COPY_SRC` usage. Blocks until all previously
    /// submitted work has finished.
    pub async fn read_buffer(
        &self,
        buffer: &wgpu::Buffer,
        offset: u64,
        size: u64,
    ) -> anyhow::Result<Vec<u8>> {
        let staging = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("readback buffer"),
            size,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("readback encoder"),
            });
        encoder.copy_buffer_to_buffer(buffer, offset, &staging, 0, size);
        self.queue.submit(std::iter::once(encoder.finish()));

        // NOTE: the mapping has to be requested before polling, otherwise the
        // receiver never resolves.
        let (tx, rx) = futures_intrusive::channel::shared::oneshot_channel();
        let slice = staging.slice(..);
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        self.device
            .poll(wgpu::PollType::Wait {
                submission_index: None,
                timeout: None,
            })
            .context("waiting for the readback")?;
        rx.receive()
            .await
            .ok_or_else(|| anyhow!("readback channel closed"))?
            .context("mapping readback buffer")?;

        let data = slice.get_mapped_range().to_vec();
        staging.unmap();
        Ok(data)
    }
}

impl GpuDevice for Context {
    type Buffer = wgpu::Buffer;
    type Texture = Texture;

    fn create_buffer(
        &self,
        label: &str,
        contents: &[u8],
        usage: wgpu::BufferUsages,
    ) -> wgpu::Buffer {
        let padding = [0u8; MIN_BUFFER_SIZE];
        let contents = if contents.is_empty() {
            &padding[..]
        } else {
            contents
        };
        self.device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(label),
                contents,
                usage: usage | wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::COPY_SRC,
            })
    }

    fn write_buffer(&self, buffer: &wgpu::Buffer, offset: u64, data: &[u8]) {
        if data.is_empty() {
            return;
        }
        self.queue.write_buffer(buffer, offset, data);
    }

    fn placeholder_texture(&self) -> Texture {
        Texture::placeholder(&self.device, &self.queue)
    }

    fn load_texture(&self, path: &str, is_linear: bool) -> anyhow::Result<Texture> {
        resources::texture::load_texture(path, is_linear, &self.device, &self.queue)
    }

    fn supports_indirect_count(&self) -> bool {
        self.features
            .contains(wgpu::Features::MULTI_DRAW_INDIRECT_COUNT)
    }
}
