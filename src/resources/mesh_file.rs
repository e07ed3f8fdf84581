//! Binary cache of a packed [`MeshData`].
//!
//! Layout (little-endian `u32` words unless noted):
//!
//! ```text
//! header        magic, mesh_count, material_count, texture_file_count,
//!               index_data_size, vertex_data_size
//! streams       attribute_count, (location, format, offset) * count, stride
//! meshes        Mesh * mesh_count
//! boxes         BoundingBox * mesh_count
//! indices       index_data_size bytes
//! vertices      vertex_data_size bytes
//! materials     Material * material_count
//! textures      (byte_len, utf-8 bytes) * texture_file_count
//! ```

use std::{fs, io, path::Path};

use bytemuck::Pod;

use crate::data_structures::{
    bounds::BoundingBox,
    material::Material,
    mesh::{Mesh, MeshData},
    vertex::{AttributeFormat, VertexAttributeDesc, VertexStreams},
};

pub const MESH_FILE_MAGIC: u32 = 0x1234_5678;

#[derive(Copy, Clone, Debug, PartialEq, Eq, bytemuck::Pod, bytemuck::Zeroable)]
#[repr(C)]
pub struct MeshFileHeader {
    pub magic: u32,
    pub mesh_count: u32,
    pub material_count: u32,
    pub texture_file_count: u32,
    /// In bytes.
    pub index_data_size: u32,
    /// In bytes.
    pub vertex_data_size: u32,
}

impl MeshFileHeader {
    pub fn for_mesh_data(data: &MeshData) -> Self {
        Self {
            magic: MESH_FILE_MAGIC,
            mesh_count: data.meshes.len() as u32,
            material_count: data.materials.len() as u32,
            texture_file_count: data.texture_files.len() as u32,
            index_data_size: (data.index_data.len() * size_of::<u32>()) as u32,
            vertex_data_size: data.vertex_data.len() as u32,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum MeshFileError {
    #[error("bad magic number {0:#010x}")]
    BadMagic(u32),
    #[error("file ends after {available} bytes, expected at least {needed}")]
    Truncated { needed: usize, available: usize },
    #[error("file is {actual} bytes but its header declares {declared}")]
    SizeMismatch { declared: usize, actual: usize },
    #[error("invalid mesh data: {0}")]
    Invalid(String),
    #[error(transparent)]
    Io(#[from] io::Error),
}

struct Reader<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, len: usize) -> Result<&'a [u8], MeshFileError> {
        let end = self.offset.checked_add(len).filter(|&end| end <= self.bytes.len());
        let Some(end) = end else {
            return Err(MeshFileError::Truncated {
                needed: self.offset.saturating_add(len),
                available: self.bytes.len(),
            });
        };
        let slice = &self.bytes[self.offset..end];
        self.offset = end;
        Ok(slice)
    }

    fn u32(&mut self) -> Result<u32, MeshFileError> {
        let bytes = self.take(4)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    fn pods<T: Pod>(&mut self, count: usize) -> Result<Vec<T>, MeshFileError> {
        let len = count.saturating_mul(size_of::<T>());
        Ok(bytemuck::pod_collect_to_vec(self.take(len)?))
    }
}

fn read_header(reader: &mut Reader) -> Result<MeshFileHeader, MeshFileError> {
    let header: MeshFileHeader = bytemuck::pod_read_unaligned(reader.take(size_of::<MeshFileHeader>())?);
    if header.magic != MESH_FILE_MAGIC {
        return Err(MeshFileError::BadMagic(header.magic));
    }
    Ok(header)
}

fn read_streams(reader: &mut Reader) -> Result<VertexStreams, MeshFileError> {
    let count = reader.u32()? as usize;
    let mut attributes = Vec::with_capacity(count.min(16));
    for _ in 0..count {
        let location = reader.u32()?;
        let raw_format = reader.u32()?;
        let offset = reader.u32()?;
        let format = AttributeFormat::from_raw(raw_format)
            .ok_or_else(|| MeshFileError::Invalid(format!("unknown attribute format {raw_format}")))?;
        attributes.push(VertexAttributeDesc {
            location,
            format,
            offset,
        });
    }
    let stride = reader.u32()?;
    Ok(VertexStreams { attributes, stride })
}

/// Decodes a whole cache file. Rejects bad magic numbers, files whose size
/// disagrees with their header and contents that break [`MeshData`] invariants.
pub fn parse_mesh_data(bytes: &[u8]) -> Result<MeshData, MeshFileError> {
    let mut reader = Reader { bytes, offset: 0 };
    let header = read_header(&mut reader)?;
    if header.index_data_size % 4 != 0 {
        return Err(MeshFileError::Invalid(format!(
            "index data size {} is not a multiple of 4",
            header.index_data_size
        )));
    }

    let streams = read_streams(&mut reader)?;
    let meshes: Vec<Mesh> = reader.pods(header.mesh_count as usize)?;
    let boxes: Vec<BoundingBox> = reader.pods(header.mesh_count as usize)?;
    let index_data: Vec<u32> = reader.pods(header.index_data_size as usize / 4)?;
    let vertex_data = reader.take(header.vertex_data_size as usize)?.to_vec();
    let materials: Vec<Material> = reader.pods(header.material_count as usize)?;
    let mut texture_files = Vec::with_capacity((header.texture_file_count as usize).min(1024));
    for _ in 0..header.texture_file_count {
        let len = reader.u32()? as usize;
        let name = std::str::from_utf8(reader.take(len)?)
            .map_err(|e| MeshFileError::Invalid(format!("texture path is not utf-8: {e}")))?;
        texture_files.push(name.to_string());
    }

    if reader.offset != bytes.len() {
        return Err(MeshFileError::SizeMismatch {
            declared: reader.offset,
            actual: bytes.len(),
        });
    }

    let data = MeshData {
        streams,
        vertex_data,
        index_data,
        meshes,
        boxes,
        materials,
        texture_files,
    };
    data.validate()
        .map_err(|e| MeshFileError::Invalid(format!("{e:#}")))?;
    Ok(data)
}

pub fn serialize_mesh_data(data: &MeshData) -> Vec<u8> {
    let header = MeshFileHeader::for_mesh_data(data);
    let mut bytes = Vec::with_capacity(
        size_of::<MeshFileHeader>()
            + header.index_data_size as usize
            + header.vertex_data_size as usize
            + data.meshes.len() * (size_of::<Mesh>() + size_of::<BoundingBox>())
            + data.materials.len() * size_of::<Material>(),
    );
    let mut put = |word: u32| bytes.extend_from_slice(&word.to_le_bytes());

    put(header.magic);
    put(header.mesh_count);
    put(header.material_count);
    put(header.texture_file_count);
    put(header.index_data_size);
    put(header.vertex_data_size);

    put(data.streams.attributes.len() as u32);
    for attr in &data.streams.attributes {
        put(attr.location);
        put(attr.format as u32);
        put(attr.offset);
    }
    put(data.streams.stride);

    bytes.extend_from_slice(bytemuck::cast_slice(&data.meshes));
    bytes.extend_from_slice(bytemuck::cast_slice(&data.boxes));
    bytes.extend_from_slice(bytemuck::cast_slice(&data.index_data));
    bytes.extend_from_slice(&data.vertex_data);
    bytes.extend_from_slice(bytemuck::cast_slice(&data.materials));
    for file in &data.texture_files {
        bytes.extend_from_slice(&(file.len() as u32).to_le_bytes());
        bytes.extend_from_slice(file.as_bytes());
    }
    bytes
}

pub fn save_mesh_data(path: &Path, data: &MeshData) -> Result<(), MeshFileError> {
    debug_assert!(data.validate().is_ok());
    fs::write(path, serialize_mesh_data(data))?;
    log::info!("Saved {} submeshes to '{}'", data.meshes.len(), path.display());
    Ok(())
}

/// Whether `path` holds a cache file that [`load_mesh_data`] would accept.
pub fn is_mesh_data_valid(path: &Path) -> bool {
    match fs::read(path) {
        Ok(bytes) => match parse_mesh_data(&bytes) {
            Ok(_) => true,
            Err(e) => {
                log::warn!("Cached mesh '{}' is invalid: {}", path.display(), e);
                false
            }
        },
        Err(_) => false,
    }
}

pub fn load_mesh_data(path: &Path) -> Result<MeshData, MeshFileError> {
    let bytes = fs::read(path)?;
    let data = parse_mesh_data(&bytes)?;
    log::info!(
        "Loaded {} submeshes, {} materials from '{}'",
        data.meshes.len(),
        data.materials.len(),
        path.display()
    );
    Ok(data)
}
