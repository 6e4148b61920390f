use glam::{Mat4, Vec3};

use super::{
    frustum::{sphere_in_frustum, Frustum},
    instancing::InstanceRawData,
    shaders::packed_structs::PackedPointLight,
};

/// A light that radiates from a single point in all directions.
#[derive(Clone, Debug, PartialEq)]
pub struct PointLight {
    /// World space position of the light.
    position: Vec3,
    /// Linear color of the light. Values above one are allowed for bright
    /// lights.
    color: Vec3,
    /// Distance past which the light has no influence. Used both for culling
    /// and for sizing the light volume.
    radius: f32,
}

impl Default for PointLight {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            color: Vec3::ONE,
            radius: 10.0,
        }
    }
}

impl PointLight {
    pub fn new(position: Vec3, color: Vec3, radius: f32) -> Self {
        Self {
            position,
            color,
            radius: radius.max(0.0),
        }
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn color(&self) -> Vec3 {
        self.color
    }

    pub fn radius(&self) -> f32 {
        self.radius
    }

    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
    }

    pub fn set_color(&mut self, color: Vec3) {
        self.color = color;
    }

    /// Set the influence radius. Negative values are clamped to zero.
    pub fn set_radius(&mut self, radius: f32) {
        self.radius = radius.max(0.0);
    }

    /// Transform of the unit sphere proxy mesh that covers this light's
    /// influence.
    pub fn volume_transform(&self) -> Mat4 {
        Mat4::from_translation(self.position) * Mat4::from_scale(Vec3::splat(self.radius))
    }
}

/// The scene's single directional light.
#[derive(Clone, Debug, PartialEq)]
pub struct Sun {
    /// Normalized direction the light travels, pointing from the sky toward
    /// the ground.
    pub direction: Vec3,
    pub color: Vec3,
}

impl Default for Sun {
    fn default() -> Self {
        Self {
            direction: -Vec3::new(0.2, 1.0, 0.1).normalize(),
            color: Vec3::ONE,
        }
    }
}

/// Returns the lights whose influence sphere passes the frustum test, in scene
/// order.
pub fn resolve_visible_lights<'a>(
    lights: &'a [PointLight],
    frustum: &Frustum,
    camera_position: Vec3,
) -> Vec<&'a PointLight> {
    lights
        .iter()
        .filter(|light| sphere_in_frustum(frustum, camera_position, light.position, light.radius))
        .collect()
}

/// Pack resolved lights into the layout read by the lighting shaders.
///
/// The result always holds at least one element so it can be bound as a
/// storage buffer even when no light is visible. The padding element is
/// zeroed and ignored by shaders, which read the real count from the frame
/// data.
pub fn pack_lights(lights: &[&PointLight]) -> Vec<PackedPointLight> {
    let mut packed: Vec<PackedPointLight> = lights.iter().map(|l| (*l).into()).collect();
    if packed.is_empty() {
        packed.push(PackedPointLight::default());
    }
    packed
}

/// Instance transforms for drawing one light volume per resolved light.
pub fn light_volume_instances(lights: &[&PointLight]) -> Vec<InstanceRawData> {
    lights
        .iter()
        .map(|light| InstanceRawData::from(light.volume_transform()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{camera::Camera, renderer::frustum::build_frustum};

    fn camera() -> Camera {
        Camera::new(
            Vec3::new(0.0, 1.0, 5.0),
            Vec3::new(0.0, 1.0, 0.0),
            Vec3::Y,
            f32::to_radians(60.0),
            0.1,
            200.0,
            1600,
            900,
        )
    }

    #[test]
    fn lights_outside_the_view_are_dropped() {
        let camera = camera();
        let frustum = build_frustum(&camera);
        let lights = vec![
            PointLight::new(Vec3::new(0.0, 1.0, -4.0), Vec3::X, 1.0),
            PointLight::new(Vec3::new(0.0, 1.0, 50.0), Vec3::Y, 2.0),
            PointLight::new(Vec3::new(3.0, 1.0, -10.0), Vec3::Z, 1.0),
        ];

        let visible = resolve_visible_lights(&lights, &frustum, camera.position());

        assert_eq!(2, visible.len());
        assert_eq!(&lights[0], visible[0]);
        assert_eq!(&lights[2], visible[1]);
    }

    #[test]
    fn large_radius_behind_camera_is_visible() {
        let camera = camera();
        let frustum = build_frustum(&camera);
        let lights = vec![PointLight::new(Vec3::new(0.0, 1.0, 50.0), Vec3::ONE, 100.0)];

        assert_eq!(1, resolve_visible_lights(&lights, &frustum, camera.position()).len());
    }

    #[test]
    fn shrinking_radius_keeps_only_lights_inside_the_view() {
        let camera = camera();
        let frustum = build_frustum(&camera);
        let mut lights = vec![
            PointLight::new(Vec3::new(0.0, 1.0, 7.0), Vec3::ONE, 5.0),
            PointLight::new(Vec3::new(0.0, 1.0, -7.0), Vec3::ONE, 5.0),
        ];
        assert_eq!(2, resolve_visible_lights(&lights, &frustum, camera.position()).len());

        lights.iter_mut().for_each(|l| l.set_radius(0.0));
        let visible = resolve_visible_lights(&lights, &frustum, camera.position());
        assert_eq!(1, visible.len());
        assert_eq!(Vec3::new(0.0, 1.0, -7.0), visible[0].position());
    }

    #[test]
    fn light_at_camera_position_is_always_visible() {
        let camera = camera();
        let frustum = build_frustum(&camera);
        let lights = vec![PointLight::new(camera.position(), Vec3::ONE, 0.01)];

        assert_eq!(1, resolve_visible_lights(&lights, &frustum, camera.position()).len());
    }

    #[test]
    fn empty_light_list_packs_one_unused_slot() {
        let packed = pack_lights(&[]);

        assert_eq!(1, packed.len());
        assert_eq!(PackedPointLight::default(), packed[0]);
        assert!(light_volume_instances(&[]).is_empty());
    }

    #[test]
    fn light_volume_is_scaled_by_radius() {
        let light = PointLight::new(Vec3::new(1.0, 2.0, 3.0), Vec3::ONE, 4.0);
        let transform = light.volume_transform();

        assert!(transform
            .transform_point3(Vec3::X)
            .abs_diff_eq(Vec3::new(5.0, 2.0, 3.0), 1e-5));
    }

    #[test]
    fn negative_radius_is_clamped() {
        let mut light = PointLight::default();
        light.set_radius(-3.0);
        assert_eq!(0.0, light.radius());
    }
}
