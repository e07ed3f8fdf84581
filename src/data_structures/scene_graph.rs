//! Flat scene graph.
//!
//! Nodes live in parallel arrays indexed by node id: the hierarchy links,
//! local and global transforms. Which submesh and material a node draws is
//! kept in sparse maps, so container nodes cost nothing there.
//!
//! The GPU side never owns a [`Scene`]; it reads one through [`SceneView`].

use std::collections::BTreeMap;

use cgmath::{Matrix4, SquareMatrix};

use crate::{data_structures::mesh::MeshData, resources::ImportedScene};

/// Deepest hierarchy level transform propagation tracks.
pub const MAX_NODE_LEVEL: usize = 16;

/// Links of one node into the hierarchy.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Hierarchy {
    pub parent: Option<u32>,
    pub first_child: Option<u32>,
    pub next_sibling: Option<u32>,
    /// Only maintained on the first child of a parent.
    pub last_sibling: Option<u32>,
    pub level: u32,
}

/// Read-only access the renderer needs from a scene.
pub trait SceneView {
    fn node_count(&self) -> usize;

    /// `(node, submesh)` pairs in ascending node order.
    fn mesh_assignments(&self) -> impl Iterator<Item = (u32, u32)> + '_;

    fn global_transform(&self, node: u32) -> Matrix4<f32>;

    fn global_transforms(&self) -> &[Matrix4<f32>];
}

#[derive(Clone, Debug, Default)]
pub struct Scene {
    pub hierarchy: Vec<Hierarchy>,
    pub local_transform: Vec<Matrix4<f32>>,
    pub global_transform: Vec<Matrix4<f32>>,
    pub mesh_for_node: BTreeMap<u32, u32>,
    pub material_for_node: BTreeMap<u32, u32>,
    pub name_for_node: BTreeMap<u32, String>,
    changed_at_level: Vec<Vec<u32>>,
}

impl Scene {
    pub fn new() -> Self {
        Self {
            changed_at_level: vec![Vec::new(); MAX_NODE_LEVEL],
            ..Default::default()
        }
    }

    /// Appends a node below `parent` (or as a root) with an identity transform.
    pub fn add_node(&mut self, parent: Option<u32>) -> u32 {
        let node = self.hierarchy.len() as u32;
        let level = parent.map_or(0, |p| self.hierarchy[p as usize].level + 1);
        self.local_transform.push(Matrix4::identity());
        self.global_transform.push(Matrix4::identity());
        self.hierarchy.push(Hierarchy {
            parent,
            level,
            ..Default::default()
        });

        let Some(parent) = parent else {
            return node;
        };
        match self.hierarchy[parent as usize].first_child {
            None => {
                self.hierarchy[parent as usize].first_child = Some(node);
                self.hierarchy[node as usize].last_sibling = Some(node);
            }
            Some(first) => {
                let mut dest = match self.hierarchy[first as usize].last_sibling {
                    Some(last) => last,
                    None => first,
                };
                while let Some(next) = self.hierarchy[dest as usize].next_sibling {
                    dest = next;
                }
                self.hierarchy[dest as usize].next_sibling = Some(node);
                self.hierarchy[first as usize].last_sibling = Some(node);
            }
        }
        node
    }

    pub fn children(&self, node: u32) -> impl Iterator<Item = u32> + '_ {
        std::iter::successors(self.hierarchy[node as usize].first_child, move |&child| {
            self.hierarchy[child as usize].next_sibling
        })
    }

    pub fn set_local_transform(&mut self, node: u32, transform: Matrix4<f32>) {
        self.local_transform[node as usize] = transform;
        self.mark_as_changed(node);
    }

    /// Queues `node` and its whole subtree for the next transform update.
    pub fn mark_as_changed(&mut self, node: u32) {
        if self.changed_at_level.len() < MAX_NODE_LEVEL {
            self.changed_at_level.resize(MAX_NODE_LEVEL, Vec::new());
        }
        let mut stack = vec![node];
        while let Some(node) = stack.pop() {
            let level = (self.hierarchy[node as usize].level as usize).min(MAX_NODE_LEVEL - 1);
            self.changed_at_level[level].push(node);
            stack.extend(self.children(node));
        }
    }

    /// Recomputes the global transforms of every queued node, parents before
    /// children. Returns `false` when nothing was queued.
    pub fn recalculate_global_transforms(&mut self) -> bool {
        if self.changed_at_level.iter().all(|nodes| nodes.is_empty()) {
            return false;
        }
        let mut changed = std::mem::take(&mut self.changed_at_level);
        for nodes in changed.iter_mut() {
            for node in nodes.drain(..) {
                let node = node as usize;
                self.global_transform[node] = match self.hierarchy[node].parent {
                    Some(parent) => self.global_transform[parent as usize] * self.local_transform[node],
                    None => self.local_transform[node],
                };
            }
        }
        self.changed_at_level = changed;
        true
    }

    /// Builds the scene for an imported model whose submeshes were packed into
    /// `mesh_data` in import order.
    ///
    /// Every imported node becomes a scene node under a common root, and each
    /// submesh it references gets its own leaf carrying the mesh and material.
    pub fn from_import(imported: &ImportedScene, mesh_data: &MeshData) -> Self {
        let mut scene = Scene::new();
        let root = scene.add_node(None);
        scene.name_for_node.insert(root, "Root".to_string());

        let mut node_ids: Vec<u32> = Vec::with_capacity(imported.nodes.len());
        for node in &imported.nodes {
            let parent = node
                .parent
                .and_then(|p| node_ids.get(p).copied())
                .unwrap_or(root);
            let id = scene.add_node(Some(parent));
            scene.local_transform[id as usize] = node.transform;
            if !node.name.is_empty() {
                scene.name_for_node.insert(id, node.name.clone());
            }
            node_ids.push(id);

            for &mesh in &node.meshes {
                let Some(packed) = mesh_data.meshes.get(mesh as usize) else {
                    log::warn!("Node {} references missing mesh {}", node.name, mesh);
                    continue;
                };
                let leaf = scene.add_node(Some(id));
                scene.mesh_for_node.insert(leaf, mesh);
                scene.material_for_node.insert(leaf, packed.material_id);
            }
        }

        scene.mark_as_changed(root);
        scene.recalculate_global_transforms();
        scene
    }
}

impl SceneView for Scene {
    fn node_count(&self) -> usize {
        self.global_transform.len()
    }

    fn mesh_assignments(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        self.mesh_for_node.iter().map(|(&node, &mesh)| (node, mesh))
    }

    fn global_transform(&self, node: u32) -> Matrix4<f32> {
        self.global_transform
            .get(node as usize)
            .copied()
            .unwrap_or_else(Matrix4::identity)
    }

    fn global_transforms(&self) -> &[Matrix4<f32>] {
        &self.global_transform
    }
}
