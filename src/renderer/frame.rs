use glam::{Mat4, UVec2, Vec4};

use super::{
    batching::{RenderBatch, ShadowBatch},
    instancing::InstanceRawData,
    settings::RendererSettings,
    shaders::packed_structs::{vec3_w, FrameData, PackedPointLight, MAX_CASCADES},
    shadows::CascadeDescriptor,
};
use crate::camera::Camera;

/// Summary of a prepared frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RenderInfo {
    pub total_scene_objects: usize,
    /// One instanced draw is issued per visible batch.
    pub instanced_draw_call_count: usize,
}

/// Everything the draw passes of one frame consume. Rebuilt every frame and
/// never mutated once handed to an executor.
#[derive(Clone, Debug)]
pub struct FramePacket {
    pub frame_data: FrameData,
    /// Packed visible lights. Always holds at least one element; only the
    /// first `visible_light_count` are meaningful.
    pub lights: Vec<PackedPointLight>,
    pub visible_light_count: usize,
    /// One light volume transform per visible light.
    pub light_volumes: Vec<InstanceRawData>,
    pub batches: Vec<RenderBatch>,
    pub shadow_batches: Vec<ShadowBatch>,
    pub cascades: Vec<CascadeDescriptor>,
    pub info: RenderInfo,
}

/// Assemble the frame uniform block.
pub fn build_frame_data(
    camera: &Camera,
    settings: &RendererSettings,
    visible_light_count: usize,
    cascades: &[CascadeDescriptor],
) -> FrameData {
    let (width, height) = camera.viewport_size();
    let cascade_count = cascades.len().min(MAX_CASCADES);

    let mut cascade_splits = [0.0; MAX_CASCADES];
    let mut cascade_view_projs = [Mat4::IDENTITY; MAX_CASCADES];

    for (i, cascade) in cascades.iter().take(cascade_count).enumerate() {
        cascade_splits[i] = cascade.far;
        cascade_view_projs[i] = cascade.view_proj;
    }

    FrameData {
        view_proj: camera.view_projection_matrix(),
        view: camera.view_matrix(),
        camera_position: vec3_w(camera.position(), 1.0),
        sun_dir: vec3_w(settings.sun_direction().normalize_or_zero(), 0.0),
        sun_color: vec3_w(settings.sun_color(), 1.0),
        ambient_color: vec3_w(settings.ambient_color(), 1.0),
        cascade_splits: Vec4::from_array(cascade_splits),
        window_size: UVec2::new(width, height),
        point_light_count: visible_light_count as u32,
        cascade_count: cascade_count as u32,
        cascade_view_projs,
    }
}
