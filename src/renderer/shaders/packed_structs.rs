//! Rust structs with memory layouts that match their same named counterparts
//! in shader code.
//!
//! These structs must exactly match the memory layout whenever their
//! representation is changed in shader code or vice versa. Vec3 values that
//! live in uniform buffers are widened to `Vec4` and every gap is filled with
//! an explicit field so the structs stay `Pod`.
use glam::{Mat4, UVec2, Vec3, Vec4};

use crate::renderer::lighting::PointLight;

/// Maximum number of shadow cascades the frame data can describe.
pub const MAX_CASCADES: usize = 4;

/// Frame global values bound at slot 0 and read by every pass in a frame.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct FrameData {
    pub view_proj: Mat4,
    pub view: Mat4,
    pub camera_position: Vec4, // .w is unused.
    pub sun_dir: Vec4,         // .xyz is normalized, .w is unused.
    pub sun_color: Vec4,       // .w is unused.
    pub ambient_color: Vec4,   // .w is unused.
    /// Far split distance of each cascade in view space units.
    pub cascade_splits: Vec4,
    pub window_size: UVec2,
    pub point_light_count: u32,
    pub cascade_count: u32,
    pub cascade_view_projs: [Mat4; MAX_CASCADES],
}

impl Default for FrameData {
    fn default() -> Self {
        Self {
            view_proj: Mat4::IDENTITY,
            view: Mat4::IDENTITY,
            camera_position: Vec4::W,
            sun_dir: Vec4::NEG_Y,
            sun_color: Vec4::ONE,
            ambient_color: Vec4::ZERO,
            cascade_splits: Vec4::ZERO,
            window_size: UVec2::ZERO,
            point_light_count: 0,
            cascade_count: 0,
            cascade_view_projs: [Mat4::IDENTITY; MAX_CASCADES],
        }
    }
}

/// Rust struct with the same memory layout as the `PointLight` storage buffer
/// element used by the lighting shaders (binding slot 1).
#[repr(C)]
#[derive(Clone, Copy, Default, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct PackedPointLight {
    pub position: Vec3,
    pub radius: f32,
    pub color: Vec3,
    pub _padding: f32,
}

impl From<&PointLight> for PackedPointLight {
    fn from(val: &PointLight) -> Self {
        Self {
            position: val.position(),
            radius: val.radius(),
            color: val.color(),
            _padding: 0.0,
        }
    }
}

/// Returns a new `Vec4` value that is the combination of a `Vec3` x, y and z
/// and an additional `w` value.
pub fn vec3_w(xyz: Vec3, w: f32) -> Vec4 {
    Vec4::new(xyz.x, xyz.y, xyz.z, w)
}
