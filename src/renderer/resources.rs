use slotmap::{new_key_type, SlotMap};

use super::{
    materials::Material,
    meshes::{Mesh, MeshData},
};

new_key_type! {
    /// Stable handle to a mesh stored in `RenderResources`.
    pub struct MeshKey;
    /// Stable handle to a material stored in `RenderResources`.
    pub struct MaterialKey;
}

/// Arena of the meshes and materials that scene objects refer to.
///
/// Objects hold keys rather than references. Removing a resource invalidates
/// its key, and any object still holding that key is skipped when rendering
/// instead of dangling.
#[derive(Default)]
pub struct RenderResources {
    meshes: SlotMap<MeshKey, Mesh>,
    materials: SlotMap<MaterialKey, Material>,
}

impl RenderResources {
    pub fn new() -> Self {
        Default::default()
    }

    /// Derive the mesh properties from `data` and store it.
    pub fn add_mesh(&mut self, data: &MeshData) -> MeshKey {
        self.meshes.insert(Mesh::new(data))
    }

    pub fn add_material(&mut self, material: Material) -> MaterialKey {
        self.materials.insert(material)
    }

    pub fn mesh(&self, key: MeshKey) -> Option<&Mesh> {
        self.meshes.get(key)
    }

    pub fn material(&self, key: MaterialKey) -> Option<&Material> {
        self.materials.get(key)
    }

    pub fn material_mut(&mut self, key: MaterialKey) -> Option<&mut Material> {
        self.materials.get_mut(key)
    }

    /// Replace the mesh stored under `key`, keeping the key valid for every
    /// object that refers to it. Returns false if the key is stale.
    pub fn replace_mesh(&mut self, key: MeshKey, data: &MeshData) -> bool {
        match self.meshes.get_mut(key) {
            Some(mesh) => {
                *mesh = Mesh::new(data);
                true
            }
            None => false,
        }
    }

    pub fn remove_mesh(&mut self, key: MeshKey) -> Option<Mesh> {
        self.meshes.remove(key)
    }

    pub fn remove_material(&mut self, key: MaterialKey) -> Option<Material> {
        self.materials.remove(key)
    }

    pub fn mesh_count(&self) -> usize {
        self.meshes.len()
    }

    pub fn material_count(&self) -> usize {
        self.materials.len()
    }
}
