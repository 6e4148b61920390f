//! Groups visible scene objects into batches that are each drawn with a single
//! instanced draw call.
use std::collections::HashMap;

use glam::Vec3;
use tracing::debug;

use super::{
    frustum::{sphere_in_frustum, Frustum},
    instancing::InstanceRawData,
    models::SceneObject,
    resources::{MaterialKey, MeshKey, RenderResources},
};

/// Objects with equal keys share a batch. Materials are compared by identity
/// while meshes are compared by content, so two distinct meshes holding the
/// same vertices and indices are drawn together.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BatchKey {
    pub material: MaterialKey,
    pub mesh_hash: u64,
}

/// Every instance of one mesh drawn with one material.
#[derive(Clone, Debug)]
pub struct RenderBatch {
    pub key: BatchKey,
    pub material: MaterialKey,
    /// Mesh bound for the draw. Taken from the first object added to the
    /// batch.
    pub mesh: MeshKey,
    /// Scene indices of the objects in this batch, in scene order.
    pub instances: Vec<usize>,
    /// One model matrix per entry in `instances`.
    pub transforms: Vec<InstanceRawData>,
}

impl RenderBatch {
    pub fn instance_count(&self) -> u32 {
        self.transforms.len() as u32
    }
}

/// Every instance of one mesh drawn into a shadow map. Materials do not affect
/// depth only rendering so they are ignored.
#[derive(Clone, Debug)]
pub struct ShadowBatch {
    pub mesh: MeshKey,
    pub instances: Vec<usize>,
    pub transforms: Vec<InstanceRawData>,
}

impl ShadowBatch {
    pub fn instance_count(&self) -> u32 {
        self.transforms.len() as u32
    }
}

/// Returns the indices of objects that can be drawn and whose bounding sphere
/// passes the frustum test, in scene order.
pub fn cull_objects(
    objects: &[SceneObject],
    resources: &RenderResources,
    frustum: &Frustum,
    camera_position: Vec3,
) -> Vec<usize> {
    objects
        .iter()
        .enumerate()
        .filter_map(|(index, object)| match object.bounding_sphere(resources) {
            Some((center, radius)) => {
                sphere_in_frustum(frustum, camera_position, center, radius).then_some(index)
            }
            None => {
                debug!(index, "skipping object with a missing mesh or material");
                None
            }
        })
        .collect()
}

/// Group the objects at `visible` indices into batches.
///
/// Every drawable object in `visible` ends up in exactly one batch. Instances
/// keep the order of `visible` while the order of the returned batches is
/// unspecified.
pub fn batch_objects(
    objects: &[SceneObject],
    visible: &[usize],
    resources: &RenderResources,
) -> Vec<RenderBatch> {
    let mut batches: HashMap<BatchKey, RenderBatch> = HashMap::new();

    for &index in visible {
        let Some(object) = objects.get(index) else {
            continue;
        };
        let (Some(mesh_key), Some(material)) = (object.mesh(), object.material()) else {
            continue;
        };
        let Some(mesh) = resources.mesh(mesh_key) else {
            continue;
        };

        let key = BatchKey {
            material,
            mesh_hash: mesh.content_hash(),
        };

        let batch = batches.entry(key).or_insert_with(|| RenderBatch {
            key,
            material,
            mesh: mesh_key,
            instances: Vec::new(),
            transforms: Vec::new(),
        });

        batch.instances.push(index);
        batch.transforms.push(object.transform().into());
    }

    batches.into_values().collect()
}

/// Cull and batch `objects` for drawing from the camera at `camera_position`.
pub fn build_batches(
    objects: &[SceneObject],
    resources: &RenderResources,
    frustum: &Frustum,
    camera_position: Vec3,
) -> Vec<RenderBatch> {
    let visible = cull_objects(objects, resources, frustum, camera_position);
    batch_objects(objects, &visible, resources)
}

/// Group every drawable object by mesh for the shadow pass.
///
/// No frustum culling is applied because casters outside the camera's view can
/// still throw shadows into it.
pub fn build_shadow_batches(
    objects: &[SceneObject],
    resources: &RenderResources,
) -> Vec<ShadowBatch> {
    let mut batches: HashMap<MeshKey, ShadowBatch> = HashMap::new();

    for (index, object) in objects.iter().enumerate() {
        if object.bounding_sphere(resources).is_none() {
            continue;
        }
        let Some(mesh) = object.mesh() else {
            continue;
        };

        let batch = batches.entry(mesh).or_insert_with(|| ShadowBatch {
            mesh,
            instances: Vec::new(),
            transforms: Vec::new(),
        });

        batch.instances.push(index);
        batch.transforms.push(object.transform().into());
    }

    batches.into_values().collect()
}
