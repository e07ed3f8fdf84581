//! Packed vertex layout shared by every submesh of a [`MeshData`](super::mesh::MeshData).
//!
//! A vertex is 20 bytes: a full precision position, the first UV channel as
//! two half floats and the normal packed as signed normalized 10:10:10:2.

use half::f16;

/// Anything that can describe itself as a vertex buffer layout.
pub trait Vertex {
    fn desc() -> wgpu::VertexBufferLayout<'static>;
}

/// The interleaved vertex as it is stored in the shared vertex buffer.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct PackedVertex {
    pub position: [f32; 3],
    pub uv: u32,
    pub normal: u32,
}

impl PackedVertex {
    pub const STRIDE: usize = std::mem::size_of::<PackedVertex>();

    pub fn new(position: [f32; 3], uv: [f32; 2], normal: [f32; 3]) -> Self {
        Self {
            position,
            uv: pack_half2x16(uv),
            normal: pack_snorm3x10_1x2(normal),
        }
    }

    pub fn tex_coords(&self) -> [f32; 2] {
        unpack_half2x16(self.uv)
    }

    pub fn unpacked_normal(&self) -> [f32; 3] {
        unpack_snorm3x10_1x2(self.normal)
    }
}

const PACKED_VERTEX_ATTRIBUTES: [wgpu::VertexAttribute; 3] = [
    wgpu::VertexAttribute {
        offset: 0,
        shader_location: 0,
        format: wgpu::VertexFormat::Float32x3,
    },
    wgpu::VertexAttribute {
        offset: 12,
        shader_location: 1,
        format: wgpu::VertexFormat::Float16x2,
    },
    // wgpu has no signed 10:10:10:2 vertex format, the shader unpacks the raw word
    wgpu::VertexAttribute {
        offset: 16,
        shader_location: 2,
        format: wgpu::VertexFormat::Uint32,
    },
];

impl Vertex for PackedVertex {
    fn desc() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: PackedVertex::STRIDE as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &PACKED_VERTEX_ATTRIBUTES,
        }
    }
}

/// Formats a vertex attribute can be stored in.
#[repr(u32)]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum AttributeFormat {
    Float3 = 0,
    HalfFloat2 = 1,
    /// Signed normalized 10:10:10:2 packed into one word.
    Snorm10x3_2 = 2,
}

impl AttributeFormat {
    pub fn from_raw(raw: u32) -> Option<Self> {
        match raw {
            0 => Some(Self::Float3),
            1 => Some(Self::HalfFloat2),
            2 => Some(Self::Snorm10x3_2),
            _ => None,
        }
    }

    pub fn to_wgpu(self) -> wgpu::VertexFormat {
        match self {
            Self::Float3 => wgpu::VertexFormat::Float32x3,
            Self::HalfFloat2 => wgpu::VertexFormat::Float16x2,
            Self::Snorm10x3_2 => wgpu::VertexFormat::Uint32,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct VertexAttributeDesc {
    pub location: u32,
    pub format: AttributeFormat,
    pub offset: u32,
}

/// Describes the interleaved vertex stream: attribute list plus stride.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VertexStreams {
    pub attributes: Vec<VertexAttributeDesc>,
    pub stride: u32,
}

impl VertexStreams {
    /// Layout written by the mesh packer.
    pub fn packed() -> Self {
        Self {
            attributes: vec![
                VertexAttributeDesc {
                    location: 0,
                    format: AttributeFormat::Float3,
                    offset: 0,
                },
                VertexAttributeDesc {
                    location: 1,
                    format: AttributeFormat::HalfFloat2,
                    offset: 12,
                },
                VertexAttributeDesc {
                    location: 2,
                    format: AttributeFormat::Snorm10x3_2,
                    offset: 16,
                },
            ],
            stride: PackedVertex::STRIDE as u32,
        }
    }

    pub fn wgpu_attributes(&self) -> Vec<wgpu::VertexAttribute> {
        self.attributes
            .iter()
            .map(|attr| wgpu::VertexAttribute {
                offset: attr.offset as wgpu::BufferAddress,
                shader_location: attr.location,
                format: attr.format.to_wgpu(),
            })
            .collect()
    }
}

impl Default for VertexStreams {
    fn default() -> Self {
        Self::packed()
    }
}

/// Packs two floats into one word, `x` in the low half.
pub fn pack_half2x16(v: [f32; 2]) -> u32 {
    let x = f16::from_f32(v[0]).to_bits() as u32;
    let y = f16::from_f32(v[1]).to_bits() as u32;
    x | (y << 16)
}

pub fn unpack_half2x16(packed: u32) -> [f32; 2] {
    [
        f16::from_bits(packed as u16).to_f32(),
        f16::from_bits((packed >> 16) as u16).to_f32(),
    ]
}

/// Packs a normal as 3x10 bit signed normalized components, the 2 bit `w` is zero.
pub fn pack_snorm3x10_1x2(n: [f32; 3]) -> u32 {
    let component = |v: f32| -> u32 {
        let scaled = (v.clamp(-1.0, 1.0) * 511.0).round() as i32;
        (scaled as u32) & 0x3FF
    };
    component(n[0]) | (component(n[1]) << 10) | (component(n[2]) << 20)
}

pub fn unpack_snorm3x10_1x2(packed: u32) -> [f32; 3] {
    let component = |shift: u32| -> f32 {
        let raw = ((packed >> shift) & 0x3FF) as i32;
        // sign extend the 10 bit value
        let signed = (raw << 22) >> 22;
        (signed as f32 / 511.0).max(-1.0)
    };
    [component(0), component(10), component(20)]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packed_vertex_is_twenty_bytes() {
        assert_eq!(PackedVertex::STRIDE, 20);
        assert_eq!(VertexStreams::packed().stride, 20);
    }

    #[test]
    fn half_floats_keep_uv_precision() {
        let uv = unpack_half2x16(pack_half2x16([0.25, 0.75]));
        assert_eq!(uv, [0.25, 0.75]);
        assert_eq!(pack_half2x16([0.0, 0.0]), 0);
    }

    #[test]
    fn normals_survive_snorm_packing() {
        for n in [[0.0, 1.0, 0.0], [-1.0, 0.0, 0.0], [0.577, -0.577, 0.577]] {
            let unpacked = unpack_snorm3x10_1x2(pack_snorm3x10_1x2(n));
            for (a, b) in n.iter().zip(unpacked.iter()) {
                assert!((a - b).abs() < 1.0 / 511.0, "{n:?} -> {unpacked:?}");
            }
        }
    }

    #[test]
    fn attribute_formats_round_trip_through_raw() {
        for format in [
            AttributeFormat::Float3,
            AttributeFormat::HalfFloat2,
            AttributeFormat::Snorm10x3_2,
        ] {
            assert_eq!(AttributeFormat::from_raw(format as u32), Some(format));
        }
        assert_eq!(AttributeFormat::from_raw(7), None);
    }
}
