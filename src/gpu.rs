//! The buffer and texture operations the GPU scene needs from a device.
//!
//! [`Context`](crate::context::Context) implements this on top of WGPU.
//! Keeping it a trait lets the assembly and update logic run against a
//! recording device in tests.

/// Creates and updates GPU resources.
///
/// There is a single writer. A [`write_buffer`](GpuDevice::write_buffer) is
/// the publish step: its bytes become visible to every GPU command submitted
/// after it, never to commands already in flight.
pub trait GpuDevice {
    type Buffer;
    type Texture;

    /// Creates a buffer initialized with `contents`. Buffers are always
    /// created writable so they can be updated later.
    fn create_buffer(&self, label: &str, contents: &[u8], usage: wgpu::BufferUsages)
    -> Self::Buffer;

    /// Overwrites `data.len()` bytes of `buffer` starting at `offset`.
    fn write_buffer(&self, buffer: &Self::Buffer, offset: u64, data: &[u8]);

    /// The texture every absent material texture slot resolves to.
    fn placeholder_texture(&self) -> Self::Texture;

    /// Loads an image file. `is_linear` requests non-sRGB storage.
    fn load_texture(&self, path: &str, is_linear: bool) -> anyhow::Result<Self::Texture>;

    /// Whether draws may read their count from a buffer.
    fn supports_indirect_count(&self) -> bool {
        false
    }
}
