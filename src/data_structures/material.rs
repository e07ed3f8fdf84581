//! Material records: the baked CPU-side form and the layout the shaders read.

/// Bit flags stored in [`Material::flags`] and [`GpuMaterial::flags`].
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct MaterialFlags(pub u32);

impl MaterialFlags {
    pub const CAST_SHADOW: MaterialFlags = MaterialFlags(0x1);
    pub const RECEIVE_SHADOW: MaterialFlags = MaterialFlags(0x2);
    pub const TRANSPARENT: MaterialFlags = MaterialFlags(0x4);

    pub fn contains(self, other: MaterialFlags) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn insert(&mut self, other: MaterialFlags) {
        self.0 |= other.0;
    }
}

impl std::ops::BitOr for MaterialFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        MaterialFlags(self.0 | rhs.0)
    }
}

/// Texture slot value meaning "no texture".
pub const NO_TEXTURE: i32 = -1;

/// A baked material. Texture slots index into [`MeshData::texture_files`](super::mesh::MeshData)
/// or hold [`NO_TEXTURE`].
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Material {
    pub emissive_factor: [f32; 4],
    pub base_color_factor: [f32; 4],
    pub roughness: f32,
    /// 0.0 is fully opaque.
    pub transparency_factor: f32,
    pub alpha_test: f32,
    pub metallic_factor: f32,
    pub base_color_texture: i32,
    pub emissive_texture: i32,
    pub normal_texture: i32,
    pub opacity_texture: i32,
    pub flags: u32,
    pub _padding: [u32; 3],
}

impl Material {
    pub fn flags(&self) -> MaterialFlags {
        MaterialFlags(self.flags)
    }

    pub fn set_flag(&mut self, flag: MaterialFlags) {
        let mut flags = self.flags();
        flags.insert(flag);
        self.flags = flags.0;
    }

    pub fn is_transparent(&self) -> bool {
        self.flags().contains(MaterialFlags::TRANSPARENT)
    }

    pub fn texture_slots(&self) -> [i32; 4] {
        [
            self.base_color_texture,
            self.emissive_texture,
            self.normal_texture,
            self.opacity_texture,
        ]
    }
}

impl Default for Material {
    fn default() -> Self {
        Self {
            emissive_factor: [0.0; 4],
            base_color_factor: [1.0; 4],
            roughness: 1.0,
            transparency_factor: 0.0,
            alpha_test: 0.0,
            metallic_factor: 0.0,
            base_color_texture: NO_TEXTURE,
            emissive_texture: NO_TEXTURE,
            normal_texture: NO_TEXTURE,
            opacity_texture: NO_TEXTURE,
            flags: (MaterialFlags::CAST_SHADOW | MaterialFlags::RECEIVE_SHADOW).0,
            _padding: [0; 3],
        }
    }
}

/// The material as the shaders see it. Texture slots are texture cache
/// handles, `0` being the placeholder for "no texture".
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct GpuMaterial {
    pub emissive_factor: [f32; 4],
    pub base_color_factor: [f32; 4],
    pub roughness: f32,
    pub transparency_factor: f32,
    pub alpha_test: f32,
    pub metallic_factor: f32,
    pub base_color_texture: u32,
    pub emissive_texture: u32,
    pub normal_texture: u32,
    pub opacity_texture: u32,
    pub flags: u32,
    pub _padding: [u32; 3],
}
