//! Deduplicating cache from texture-file index to loaded texture handle.
//!
//! Handle `0` always refers to the placeholder texture and is what every
//! absent (`-1`) material slot resolves to. A file that fails to load is
//! logged once and permanently resolves to the placeholder as well.

use crate::data_structures::material::{GpuMaterial, Material};

#[derive(Debug)]
pub struct TextureCache<T> {
    textures: Vec<T>,
    /// Indexed by texture-file index. `None` means "not requested yet".
    handles: Vec<Option<u32>>,
}

impl<T> TextureCache<T> {
    pub fn new(placeholder: T) -> Self {
        Self {
            textures: vec![placeholder],
            handles: Vec::new(),
        }
    }

    /// Resolves a material texture slot to a handle, loading
    /// `files[texture]` on its first request.
    pub fn get_or_load<F>(&mut self, texture: i32, files: &[String], load: F) -> u32
    where
        F: FnOnce(&str) -> anyhow::Result<T>,
    {
        if texture < 0 {
            return 0;
        }
        let index = texture as usize;
        if let Some(Some(handle)) = self.handles.get(index) {
            return *handle;
        }
        let Some(path) = files.get(index) else {
            log::warn!("Texture index {} is out of range ({} files)", index, files.len());
            return 0;
        };

        let handle = match load(path) {
            Ok(texture) => {
                self.textures.push(texture);
                (self.textures.len() - 1) as u32
            }
            Err(e) => {
                log::warn!("Failed to load texture {}: {:#}", path, e);
                0
            }
        };
        if index >= self.handles.len() {
            self.handles.resize(index + 1, None);
        }
        self.handles[index] = Some(handle);
        handle
    }

    /// Converts a baked material into its GPU layout, loading any texture
    /// it references for the first time. The loader's flag requests linear
    /// (non-sRGB) storage.
    pub fn resolve_material<F>(
        &mut self,
        material: &Material,
        files: &[String],
        mut load: F,
    ) -> GpuMaterial
    where
        F: FnMut(&str, bool) -> anyhow::Result<T>,
    {
        GpuMaterial {
            emissive_factor: material.emissive_factor,
            base_color_factor: material.base_color_factor,
            roughness: material.roughness,
            transparency_factor: material.transparency_factor,
            alpha_test: material.alpha_test,
            metallic_factor: material.metallic_factor,
            base_color_texture: self
                .get_or_load(material.base_color_texture, files, |p| load(p, false)),
            emissive_texture: self.get_or_load(material.emissive_texture, files, |p| load(p, false)),
            normal_texture: self.get_or_load(material.normal_texture, files, |p| load(p, true)),
            opacity_texture: self.get_or_load(material.opacity_texture, files, |p| load(p, true)),
            flags: material.flags,
            _padding: [0; 3],
        }
    }

    pub fn get(&self, handle: u32) -> Option<&T> {
        self.textures.get(handle as usize)
    }

    pub fn textures(&self) -> &[T] {
        &self.textures
    }

    /// Number of textures including the placeholder.
    pub fn len(&self) -> usize {
        self.textures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.textures.is_empty()
    }

    pub fn is_requested(&self, texture: i32) -> bool {
        texture >= 0 && matches!(self.handles.get(texture as usize), Some(Some(_)))
    }
}
