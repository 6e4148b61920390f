pub mod batching;
pub mod frame;
pub mod frustum;
pub mod gpu_buffers;
pub mod instancing;
pub mod lighting;
pub mod materials;
pub mod meshes;
pub mod models;
pub mod passes;
pub mod resources;
pub mod scene;
pub mod settings;
pub mod shaders;
pub mod shadows;

use thiserror::Error;
use tracing::debug;

use crate::camera::Camera;

use batching::{build_batches, build_shadow_batches};
use frame::{build_frame_data, FramePacket, RenderInfo};
use frustum::build_frustum;
use lighting::{light_volume_instances, pack_lights, resolve_visible_lights};
use meshes::{builtin_mesh, BuiltinMesh};
use passes::{pass_sequence, DrawExecutor, RenderPass};
use resources::{MeshKey, RenderResources};
use scene::Scene;
use settings::RendererSettings;
use shadows::{build_cascades, ShadowError};

/// Segment counts of the sphere used to draw light volumes.
const LIGHT_VOLUME_SECTORS: u32 = 16;
const LIGHT_VOLUME_STACKS: u32 = 8;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("failed to fit the shadow cascades")]
    Shadows(#[from] ShadowError),
    #[error("the light volume mesh is no longer in the render resources")]
    MissingLightVolumeMesh,
}

/// Decides what gets drawn each frame and in which order.
///
/// The renderer holds no reference to the scene or camera. Both are passed in
/// for every frame, and the GPU work itself is delegated to a `DrawExecutor`.
pub struct Renderer {
    settings: RendererSettings,
    light_volume_mesh: MeshKey,
    last_render_info: RenderInfo,
}

impl Renderer {
    /// Create a new renderer, registering the light volume proxy mesh in
    /// `resources`.
    pub fn new(settings: RendererSettings, resources: &mut RenderResources) -> Self {
        let light_volume_mesh = resources.add_mesh(&builtin_mesh(BuiltinMesh::Sphere {
            sectors: LIGHT_VOLUME_SECTORS,
            stacks: LIGHT_VOLUME_STACKS,
        }));

        Self {
            settings,
            light_volume_mesh,
            last_render_info: Default::default(),
        }
    }

    pub fn settings(&self) -> &RendererSettings {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut RendererSettings {
        &mut self.settings
    }

    pub fn light_volume_mesh(&self) -> MeshKey {
        self.light_volume_mesh
    }

    /// Summary of the most recently prepared frame.
    pub fn last_render_info(&self) -> RenderInfo {
        self.last_render_info
    }

    /// Cull, batch and light `scene` as seen from `camera`, and fit the sun's
    /// shadow cascades.
    ///
    /// Objects with a missing or stale mesh or material are skipped. The scene
    /// must not change until the returned packet has been executed.
    #[tracing::instrument(level = "debug", skip_all)]
    pub fn prepare_frame(
        &mut self,
        scene: &Scene,
        camera: &Camera,
        resources: &RenderResources,
    ) -> Result<FramePacket, RenderError> {
        if resources.mesh(self.light_volume_mesh).is_none() {
            return Err(RenderError::MissingLightVolumeMesh);
        }

        let frustum = build_frustum(camera);
        let camera_position = camera.position();

        let batches = build_batches(&scene.objects, resources, &frustum, camera_position);

        let visible_lights = resolve_visible_lights(&scene.point_lights, &frustum, camera_position);
        let lights = pack_lights(&visible_lights);
        let light_volumes = light_volume_instances(&visible_lights);

        let cascades = build_cascades(camera, self.settings.sun_direction(), self.settings.shadows())?;
        let shadow_batches = build_shadow_batches(&scene.objects, resources);

        let frame_data = build_frame_data(camera, &self.settings, visible_lights.len(), &cascades);

        let info = RenderInfo {
            total_scene_objects: scene.objects.len(),
            instanced_draw_call_count: batches.len(),
        };
        self.last_render_info = info;

        debug!(
            objects = info.total_scene_objects,
            draw_calls = info.instanced_draw_call_count,
            lights = visible_lights.len(),
            cascades = cascades.len(),
            "prepared frame"
        );

        Ok(FramePacket {
            frame_data,
            lights,
            visible_light_count: visible_lights.len(),
            light_volumes,
            batches,
            shadow_batches,
            cascades,
            info,
        })
    }

    /// Walk the pass sequence for the current settings, handing each pass's
    /// draws from `packet` to `executor`.
    pub fn execute<E: DrawExecutor>(&self, packet: &FramePacket, executor: &mut E) {
        for pass in pass_sequence(&self.settings, packet.cascades.len()) {
            executor.begin_pass(pass);
            executor.bind_frame(&packet.frame_data, &packet.lights);

            if pass.is_fullscreen() {
                executor.draw_fullscreen(pass);
            } else {
                self.draw_geometry(pass, packet, executor);
            }

            executor.end_pass();
        }
    }

    /// Issue the instanced draws of a pass that renders scene geometry.
    fn draw_geometry<E: DrawExecutor>(&self, pass: RenderPass, packet: &FramePacket, executor: &mut E) {
        match pass {
            RenderPass::ShadowCascade(_) => {
                for batch in &packet.shadow_batches {
                    executor.draw_instanced(batch.mesh, None, &batch.transforms);
                }
            }
            RenderPass::Geometry | RenderPass::Forward => {
                for batch in &packet.batches {
                    executor.draw_instanced(batch.mesh, Some(batch.material), &batch.transforms);
                }
            }
            RenderPass::LightVolumes => {
                if !packet.light_volumes.is_empty() {
                    executor.draw_instanced(self.light_volume_mesh, None, &packet.light_volumes);
                }
            }
            RenderPass::Lighting
            | RenderPass::DebugView(_)
            | RenderPass::Tonemap
            | RenderPass::Present => {}
        }
    }

    /// Prepare and execute one frame.
    pub fn render_frame<E: DrawExecutor>(
        &mut self,
        scene: &Scene,
        camera: &Camera,
        resources: &RenderResources,
        executor: &mut E,
    ) -> Result<RenderInfo, RenderError> {
        let packet = self.prepare_frame(scene, camera, resources)?;
        self.execute(&packet, executor);
        Ok(packet.info)
    }
}

#[cfg(test)]
mod tests {
    use glam::{Mat4, Vec3};

    use super::*;
    use crate::renderer::{
        instancing::InstanceRawData,
        lighting::PointLight,
        materials::{Material, ProgramDesc},
        models::SceneObject,
        resources::MaterialKey,
        settings::{DebugView, PipelineMode},
        shaders::packed_structs::{FrameData, PackedPointLight},
    };

    #[derive(Debug, PartialEq)]
    enum Call {
        Begin(RenderPass),
        Bind { point_lights: u32, buffer_len: usize },
        Draw { mesh: MeshKey, material: Option<MaterialKey>, count: usize },
        Fullscreen(RenderPass),
        End,
    }

    #[derive(Default)]
    struct RecordingExecutor {
        calls: Vec<Call>,
    }

    impl RecordingExecutor {
        fn begun_passes(&self) -> Vec<RenderPass> {
            self.calls
                .iter()
                .filter_map(|c| match c {
                    Call::Begin(pass) => Some(*pass),
                    _ => None,
                })
                .collect()
        }

        fn draws(&self) -> Vec<&Call> {
            self.calls
                .iter()
                .filter(|c| matches!(c, Call::Draw { .. }))
                .collect()
        }
    }

    impl DrawExecutor for RecordingExecutor {
        fn begin_pass(&mut self, pass: RenderPass) {
            self.calls.push(Call::Begin(pass));
        }

        fn bind_frame(&mut self, frame: &FrameData, lights: &[PackedPointLight]) {
            self.calls.push(Call::Bind {
                point_lights: frame.point_light_count,
                buffer_len: lights.len(),
            });
        }

        fn draw_instanced(
            &mut self,
            mesh: MeshKey,
            material: Option<MaterialKey>,
            instances: &[InstanceRawData],
        ) {
            self.calls.push(Call::Draw {
                mesh,
                material,
                count: instances.len(),
            });
        }

        fn draw_fullscreen(&mut self, pass: RenderPass) {
            self.calls.push(Call::Fullscreen(pass));
        }

        fn end_pass(&mut self) {
            self.calls.push(Call::End);
        }
    }

    fn camera() -> Camera {
        Camera::new(
            Vec3::new(0.0, 1.0, 8.0),
            Vec3::new(0.0, 1.0, 0.0),
            Vec3::Y,
            f32::to_radians(60.0),
            0.1,
            250.0,
            1024,
            768,
        )
    }

    struct Fixture {
        resources: RenderResources,
        renderer: Renderer,
        cube: MeshKey,
        material: MaterialKey,
    }

    fn fixture() -> Fixture {
        let mut resources = RenderResources::new();
        let renderer = Renderer::new(RendererSettings::default(), &mut resources);
        let cube = resources.add_mesh(&builtin_mesh(BuiltinMesh::Cube));
        let material = resources.add_material(Material::material(ProgramDesc::default(), &[]));

        Fixture {
            resources,
            renderer,
            cube,
            material,
        }
    }

    #[test]
    fn object_outside_the_view_is_not_drawn() {
        let mut f = fixture();
        let mut scene = Scene::new();
        scene.add_object(
            SceneObject::new(Some(f.cube), Some(f.material))
                .with_transform(Mat4::from_translation(Vec3::new(400.0, -400.0, 400.0))),
        );

        let packet = f.renderer.prepare_frame(&scene, &camera(), &f.resources).unwrap();

        assert!(packet.batches.is_empty());
        assert_eq!(
            RenderInfo {
                total_scene_objects: 1,
                instanced_draw_call_count: 0
            },
            packet.info
        );
    }

    #[test]
    fn two_objects_sharing_resources_make_one_instanced_draw() {
        let mut f = fixture();
        let mut scene = Scene::new();
        for x in [-1.5, 1.5] {
            scene.add_object(
                SceneObject::new(Some(f.cube), Some(f.material))
                    .with_transform(Mat4::from_translation(Vec3::new(x, 1.0, 0.0))),
            );
        }

        let mut executor = RecordingExecutor::default();
        let info = f
            .renderer
            .render_frame(&scene, &camera(), &f.resources, &mut executor)
            .unwrap();

        assert_eq!(
            RenderInfo {
                total_scene_objects: 2,
                instanced_draw_call_count: 1
            },
            info
        );
        assert_eq!(info, f.renderer.last_render_info());

        let geometry_draw = Call::Draw {
            mesh: f.cube,
            material: Some(f.material),
            count: 2,
        };
        assert_eq!(
            1,
            executor.draws().iter().filter(|c| ***c == geometry_draw).count()
        );
    }

    #[test]
    fn no_lights_still_binds_one_light_slot() {
        let mut f = fixture();
        let scene = Scene::new();

        let packet = f.renderer.prepare_frame(&scene, &camera(), &f.resources).unwrap();

        assert_eq!(1, packet.lights.len());
        assert_eq!(0, packet.visible_light_count);
        assert_eq!(0, packet.frame_data.point_light_count);
        assert!(packet.light_volumes.is_empty());

        let mut executor = RecordingExecutor::default();
        f.renderer.execute(&packet, &mut executor);
        assert!(executor.calls.contains(&Call::Bind {
            point_lights: 0,
            buffer_len: 1
        }));
        // No light volumes to draw.
        assert!(executor.draws().is_empty());
    }

    #[test]
    fn straight_down_sun_produces_finite_cascades() {
        let mut f = fixture();
        f.renderer
            .settings_mut()
            .set_sun_direction(Vec3::new(0.0, -1.0, 0.0))
            .unwrap();

        let camera = Camera::new(
            Vec3::ZERO,
            Vec3::NEG_Z,
            Vec3::Y,
            f32::to_radians(60.0),
            0.1,
            250.0,
            800,
            600,
        );
        let packet = f.renderer.prepare_frame(&Scene::new(), &camera, &f.resources).unwrap();

        assert_eq!(4, packet.cascades.len());
        for cascade in &packet.cascades {
            assert!(cascade.view_proj.is_finite());
        }
        for view_proj in packet.frame_data.cascade_view_projs {
            assert!(!view_proj.is_nan());
        }
    }

    #[test]
    fn visible_lights_are_counted_and_drawn_as_volumes() {
        let mut f = fixture();
        let mut scene = Scene::new();
        scene.add_point_light(PointLight::new(Vec3::new(1.0, 2.0, 4.0), Vec3::new(0.0, 10.0, 0.0), 100.0));
        scene.add_point_light(PointLight::new(Vec3::new(1.0, 2.0, -4.0), Vec3::new(10.0, 0.0, 0.0), 50.0));
        scene.add_point_light(PointLight::new(Vec3::new(0.0, 1.0, 300.0), Vec3::ONE, 1.0));

        let packet = f.renderer.prepare_frame(&scene, &camera(), &f.resources).unwrap();
        assert_eq!(2, packet.visible_light_count);
        assert_eq!(2, packet.frame_data.point_light_count);

        let mut executor = RecordingExecutor::default();
        f.renderer.execute(&packet, &mut executor);
        assert!(executor.calls.contains(&Call::Draw {
            mesh: f.renderer.light_volume_mesh(),
            material: None,
            count: 2
        }));
    }

    #[test]
    fn shadow_passes_draw_every_caster_before_lighting() {
        let mut f = fixture();
        let mut scene = Scene::new();
        scene.add_object(SceneObject::new(Some(f.cube), Some(f.material)));
        // Behind the camera but still casts.
        scene.add_object(
            SceneObject::new(Some(f.cube), Some(f.material))
                .with_transform(Mat4::from_translation(Vec3::new(0.0, 1.0, 40.0))),
        );

        let packet = f.renderer.prepare_frame(&scene, &camera(), &f.resources).unwrap();
        let mut executor = RecordingExecutor::default();
        f.renderer.execute(&packet, &mut executor);

        let passes = executor.begun_passes();
        let lighting = passes.iter().position(|p| *p == RenderPass::Lighting).unwrap();
        let geometry = passes.iter().position(|p| *p == RenderPass::Geometry).unwrap();
        for (i, pass) in passes.iter().enumerate() {
            if let RenderPass::ShadowCascade(_) = pass {
                assert!(i < geometry && i < lighting);
            }
        }
        assert_eq!(Some(&RenderPass::Present), passes.last());

        let shadow_draw = Call::Draw {
            mesh: f.cube,
            material: None,
            count: 2,
        };
        assert_eq!(
            4,
            executor.draws().iter().filter(|c| ***c == shadow_draw).count()
        );
        assert_eq!(1, packet.info.instanced_draw_call_count);
    }

    #[test]
    fn forward_mode_draws_batches_without_light_volumes() {
        let mut f = fixture();
        f.renderer.settings_mut().set_pipeline_mode(PipelineMode::Forward);
        let mut scene = Scene::new();
        scene.add_object(SceneObject::new(Some(f.cube), Some(f.material)));
        scene.add_point_light(PointLight::new(Vec3::new(0.0, 1.0, 0.0), Vec3::ONE, 5.0));

        let packet = f.renderer.prepare_frame(&scene, &camera(), &f.resources).unwrap();
        let mut executor = RecordingExecutor::default();
        f.renderer.execute(&packet, &mut executor);

        assert!(!executor.begun_passes().contains(&RenderPass::LightVolumes));
        assert!(!executor
            .draws()
            .iter()
            .any(|c| matches!(c, Call::Draw { mesh, .. } if *mesh == f.renderer.light_volume_mesh())));
    }

    #[test]
    fn removing_the_light_volume_mesh_fails_the_frame() {
        let mut f = fixture();
        f.resources.remove_mesh(f.renderer.light_volume_mesh());

        assert!(matches!(
            f.renderer.prepare_frame(&Scene::new(), &camera(), &f.resources),
            Err(RenderError::MissingLightVolumeMesh)
        ));
    }

    #[test]
    fn only_fullscreen_passes_draw_a_fullscreen_triangle() {
        let mut f = fixture();
        f.renderer.settings_mut().set_debug_view(Some(DebugView::Depth));
        let mut scene = Scene::new();
        scene.add_object(SceneObject::new(Some(f.cube), Some(f.material)));

        let packet = f.renderer.prepare_frame(&scene, &camera(), &f.resources).unwrap();
        let mut executor = RecordingExecutor::default();
        f.renderer.execute(&packet, &mut executor);

        let fullscreen: Vec<RenderPass> = executor
            .calls
            .iter()
            .filter_map(|c| match c {
                Call::Fullscreen(pass) => Some(*pass),
                _ => None,
            })
            .collect();
        let expected: Vec<RenderPass> = executor
            .begun_passes()
            .into_iter()
            .filter(RenderPass::is_fullscreen)
            .collect();

        assert_eq!(
            vec![
                RenderPass::DebugView(DebugView::Depth),
                RenderPass::Tonemap,
                RenderPass::Present,
            ],
            fullscreen
        );
        assert_eq!(expected, fullscreen);
    }
}
