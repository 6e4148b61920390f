use glam::{Mat4, Quat, Vec3};

use super::resources::{MaterialKey, MeshKey, RenderResources};
use crate::math_utils::max_axis_scale;

/// A renderable instance of a shared mesh drawn with a shared material.
///
/// Either resource may be missing (for instance while a scene is being
/// assembled). Such objects are not an error, they are simply not drawn.
#[derive(Clone, Debug)]
pub struct SceneObject {
    /// Local to world transform. May contain non-uniform scale.
    transform: Mat4,
    mesh: Option<MeshKey>,
    material: Option<MaterialKey>,
}

impl SceneObject {
    pub fn new(mesh: Option<MeshKey>, material: Option<MaterialKey>) -> Self {
        Self {
            transform: Mat4::IDENTITY,
            mesh,
            material,
        }
    }

    /// Builder style helper to set the initial transform.
    pub fn with_transform(mut self, transform: Mat4) -> Self {
        self.transform = transform;
        self
    }

    pub fn transform(&self) -> &Mat4 {
        &self.transform
    }

    pub fn set_transform(&mut self, transform: Mat4) {
        self.transform = transform;
    }

    /// Set position, rotation and scale of this object.
    pub fn set_scale_rotation_translation(&mut self, scale: Vec3, rotation: Quat, translation: Vec3) {
        self.transform = Mat4::from_scale_rotation_translation(scale, rotation, translation);
    }

    pub fn mesh(&self) -> Option<MeshKey> {
        self.mesh
    }

    pub fn material(&self) -> Option<MaterialKey> {
        self.material
    }

    /// World space position of the object's local origin.
    pub fn position(&self) -> Vec3 {
        self.transform.w_axis.truncate()
    }

    /// World space bounding sphere `(center, radius)` of this object.
    ///
    /// Returns `None` when the object cannot be drawn because its mesh or
    /// material is missing or no longer exists in `resources`.
    pub fn bounding_sphere(&self, resources: &RenderResources) -> Option<(Vec3, f32)> {
        let mesh = resources.mesh(self.mesh?)?;
        resources.material(self.material?)?;

        Some((self.position(), mesh.radius() * max_axis_scale(&self.transform)))
    }
}
