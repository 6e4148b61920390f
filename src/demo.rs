//! A small scene used by the headless demo binary.
use glam::{Mat4, Quat, Vec3};
use tracing::{debug, trace};

use crate::{
    camera::Camera,
    renderer::{
        instancing::InstanceRawData,
        lighting::PointLight,
        materials::{MaterialBuilder, ProgramDesc},
        meshes::{builtin_mesh, BuiltinMesh},
        models::SceneObject,
        passes::{DrawExecutor, RenderPass},
        resources::{MaterialKey, MeshKey, RenderResources},
        scene::Scene,
        shaders::packed_structs::{FrameData, PackedPointLight},
    },
};

/// Number of cubes along each side of the demo grid.
pub const GRID_SIZE: usize = 5;
/// Distance between neighbouring cubes in the grid.
const GRID_SPACING: f32 = 3.0;

/// Point lights placed in the default scene.
pub fn default_lights() -> Vec<PointLight> {
    vec![
        PointLight::new(Vec3::new(1.0, 2.0, 4.0), Vec3::new(0.0, 10.0, 0.0), 100.0),
        PointLight::new(Vec3::new(1.0, 2.0, -4.0), Vec3::new(10.0, 0.0, 0.0), 50.0),
    ]
}

/// Build a grid of cubes sharing one mesh and one material, lit by the default
/// point lights, registering the resources it needs in `resources`.
pub fn build_default_scene(resources: &mut RenderResources) -> Scene {
    let cube = resources.add_mesh(&builtin_mesh(BuiltinMesh::Cube));
    let material = resources.add_material(
        MaterialBuilder::new(ProgramDesc::new("shaders/lit.frag", "shaders/lit.vert")).build(),
    );

    let mut scene = Scene::new();
    let half = (GRID_SIZE as f32 - 1.0) * GRID_SPACING * 0.5;

    for z in 0..GRID_SIZE {
        for x in 0..GRID_SIZE {
            let position = Vec3::new(x as f32 * GRID_SPACING - half, 0.0, z as f32 * GRID_SPACING - half);
            let rotation = Quat::from_rotation_y((x * GRID_SIZE + z) as f32 * 0.3);

            scene.add_object(
                SceneObject::new(Some(cube), Some(material)).with_transform(
                    Mat4::from_scale_rotation_translation(Vec3::ONE, rotation, position),
                ),
            );
        }
    }

    for light in default_lights() {
        scene.add_point_light(light);
    }

    scene
}

/// Place `camera` on a circle around the scene origin, looking at it.
pub fn orbit_camera(camera: &mut Camera, angle_radians: f32, radius: f32, height: f32) {
    let eye = Vec3::new(angle_radians.sin() * radius, height, angle_radians.cos() * radius);
    camera.reorient(eye, Vec3::ZERO);
}

/// A `DrawExecutor` that records nothing on the GPU and only logs the work it
/// is handed.
#[derive(Debug, Default)]
pub struct TracingExecutor {
    pub passes: usize,
    pub draws: usize,
    pub instances: usize,
    current: Option<RenderPass>,
}

impl DrawExecutor for TracingExecutor {
    fn begin_pass(&mut self, pass: RenderPass) {
        trace!(?pass, "begin pass");
        self.current = Some(pass);
        self.passes += 1;
    }

    fn bind_frame(&mut self, frame: &FrameData, lights: &[PackedPointLight]) {
        trace!(
            point_lights = frame.point_light_count,
            light_slots = lights.len(),
            cascades = frame.cascade_count,
            "bind frame"
        );
    }

    fn draw_instanced(
        &mut self,
        mesh: MeshKey,
        material: Option<MaterialKey>,
        instances: &[InstanceRawData],
    ) {
        debug!(pass = ?self.current, ?mesh, ?material, count = instances.len(), "draw instanced");
        self.draws += 1;
        self.instances += instances.len();
    }

    fn draw_fullscreen(&mut self, pass: RenderPass) {
        trace!(?pass, "draw fullscreen");
    }

    fn end_pass(&mut self) {
        self.current = None;
    }
}
