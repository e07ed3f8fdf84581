use std::cell::RefCell;

use anyhow::anyhow;
use cgmath::{Matrix4, Vector3};
use lod_ngin::{
    gpu::GpuDevice,
    resources::{ImportedMaterial, ImportedMesh, ImportedNode, ImportedScene},
};

/// A buffer created through [`MockGpu`].
#[derive(Clone, Debug)]
pub struct MockBuffer {
    pub label: String,
    pub usage: wgpu::BufferUsages,
    pub contents: Vec<u8>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BufferWrite {
    pub buffer: usize,
    pub offset: u64,
    pub len: usize,
}

/// Records every buffer and texture operation instead of talking to a GPU.
///
/// Textures are their file path. Loading any path containing "missing" fails.
#[derive(Debug, Default)]
pub struct MockGpu {
    pub buffers: RefCell<Vec<MockBuffer>>,
    pub writes: RefCell<Vec<BufferWrite>>,
    pub loads: RefCell<Vec<(String, bool)>>,
}

impl MockGpu {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self, buffer: usize) -> Vec<u8> {
        self.buffers.borrow()[buffer].contents.clone()
    }

    pub fn label(&self, buffer: usize) -> String {
        self.buffers.borrow()[buffer].label.clone()
    }

    pub fn writes_to(&self, buffer: usize) -> Vec<BufferWrite> {
        self.writes
            .borrow()
            .iter()
            .filter(|w| w.buffer == buffer)
            .cloned()
            .collect()
    }

    pub fn clear_writes(&self) {
        self.writes.borrow_mut().clear();
    }
}

impl GpuDevice for MockGpu {
    type Buffer = usize;
    type Texture = String;

    fn create_buffer(&self, label: &str, contents: &[u8], usage: wgpu::BufferUsages) -> usize {
        let mut buffers = self.buffers.borrow_mut();
        buffers.push(MockBuffer {
            label: label.to_string(),
            usage,
            contents: contents.to_vec(),
        });
        buffers.len() - 1
    }

    fn write_buffer(&self, buffer: &usize, offset: u64, data: &[u8]) {
        let mut buffers = self.buffers.borrow_mut();
        let contents = &mut buffers[*buffer].contents;
        let start = offset as usize;
        assert!(
            start + data.len() <= contents.len(),
            "write of {} bytes at {} overflows buffer of {} bytes",
            data.len(),
            start,
            contents.len()
        );
        contents[start..start + data.len()].copy_from_slice(data);
        self.writes.borrow_mut().push(BufferWrite {
            buffer: *buffer,
            offset,
            len: data.len(),
        });
    }

    fn placeholder_texture(&self) -> String {
        "placeholder".to_string()
    }

    fn load_texture(&self, path: &str, is_linear: bool) -> anyhow::Result<String> {
        self.loads.borrow_mut().push((path.to_string(), is_linear));
        if path.contains("missing") {
            return Err(anyhow!("no such file: {}", path));
        }
        Ok(path.to_string())
    }
}

/// A unit quad in the XY plane made of two triangles.
pub fn quad_mesh(material_index: Option<usize>) -> ImportedMesh {
    ImportedMesh {
        name: "quad".into(),
        positions: vec![
            [0.0, 0.0, 0.0],
            [1.0, 0.0, 0.0],
            [1.0, 1.0, 0.0],
            [0.0, 1.0, 0.0],
        ],
        normals: vec![[0.0, 0.0, 1.0]; 4],
        tex_coords: Some(vec![[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]]),
        indices: vec![0, 1, 2, 0, 2, 3],
        face_arities: Vec::new(),
        material_index,
    }
}

/// An `n` x `n` grid of quads in the XY plane, `2 * n * n` triangles.
pub fn grid_mesh(n: u32) -> ImportedMesh {
    let mut positions = Vec::new();
    let mut tex_coords = Vec::new();
    for y in 0..=n {
        for x in 0..=n {
            positions.push([x as f32, y as f32, 0.0]);
            tex_coords.push([x as f32 / n as f32, y as f32 / n as f32]);
        }
    }
    let mut indices = Vec::new();
    for y in 0..n {
        for x in 0..n {
            let i = y * (n + 1) + x;
            indices.extend_from_slice(&[i, i + 1, i + n + 1, i + 1, i + n + 2, i + n + 1]);
        }
    }
    ImportedMesh {
        name: format!("grid{}", n),
        normals: vec![[0.0, 0.0, 1.0]; positions.len()],
        positions,
        tex_coords: Some(tex_coords),
        indices,
        face_arities: Vec::new(),
        material_index: None,
    }
}

pub fn translated_node(name: &str, offset: [f32; 3], meshes: Vec<u32>) -> ImportedNode {
    ImportedNode {
        name: name.into(),
        parent: None,
        transform: Matrix4::from_translation(Vector3::from(offset)),
        meshes,
    }
}

/// One quad without a material or UVs, drawn by a single node.
pub fn quad_scene() -> ImportedScene {
    ImportedScene {
        meshes: vec![ImportedMesh {
            tex_coords: None,
            ..quad_mesh(None)
        }],
        materials: Vec::new(),
        nodes: vec![translated_node("quad", [0.0, 0.0, 0.0], vec![0])],
    }
}

/// Two materials and three quads. The first node is in front of a camera at
/// the origin looking down -Z, the second behind it.
pub fn two_node_scene() -> ImportedScene {
    ImportedScene {
        meshes: vec![quad_mesh(Some(0)), quad_mesh(Some(1)), quad_mesh(None)],
        materials: vec![
            ImportedMaterial {
                name: "painted".into(),
                diffuse_color: Some([0.8, 0.2, 0.2, 1.0]),
                diffuse_texture: Some("textures/albedo.png".into()),
                normal_texture: Some("textures/normal.png".into()),
                ..Default::default()
            },
            ImportedMaterial {
                name: "Glass".into(),
                diffuse_texture: Some("textures/missing.png".into()),
                ..Default::default()
            },
        ],
        nodes: vec![
            translated_node("front", [0.0, 0.0, -10.0], vec![0, 1]),
            translated_node("back", [0.0, 0.0, 10.0], vec![2]),
        ],
    }
}

/// A camera at the origin looking down -Z.
pub fn forward_view_proj() -> Matrix4<f32> {
    let view = Matrix4::look_at_rh(
        cgmath::Point3::new(0.0, 0.0, 0.0),
        cgmath::Point3::new(0.0, 0.0, -1.0),
        Vector3::unit_y(),
    );
    cgmath::perspective(cgmath::Deg(60.0), 1.0, 0.1, 100.0) * view
}
