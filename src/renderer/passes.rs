//! Ordering of the externally executed render passes.
//!
//! The renderer never talks to the GPU while drawing. Instead it walks the
//! pass list for the current settings and hands each pass's draws to a
//! `DrawExecutor`, which owns the pipelines, targets and command encoding.
use super::{
    instancing::InstanceRawData,
    resources::{MaterialKey, MeshKey},
    settings::{DebugView, PipelineMode, RendererSettings},
    shaders::packed_structs::{FrameData, PackedPointLight},
};

/// A single pass of a frame, in the order it must be submitted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RenderPass {
    /// Depth only render of every caster into one shadow cascade.
    ShadowCascade(usize),
    /// Fill the geometry buffer with visible batches.
    Geometry,
    /// Full screen shading of the geometry buffer, sampling the shadow
    /// cascades and the light buffer.
    Lighting,
    /// Full screen display of one geometry buffer attachment instead of the lit
    /// image.
    DebugView(DebugView),
    /// Additive shading restricted to each visible light's volume.
    LightVolumes,
    /// Shade visible batches directly into the color target.
    Forward,
    Tonemap,
    Present,
}

impl RenderPass {
    /// Full screen passes draw a single triangle and no scene geometry.
    pub fn is_fullscreen(&self) -> bool {
        matches!(
            self,
            RenderPass::Lighting | RenderPass::DebugView(_) | RenderPass::Tonemap | RenderPass::Present
        )
    }
}

/// Build the ordered list of passes for the current settings.
///
/// Every shadow cascade is rendered before any pass that samples the shadow
/// maps. The geometry pass precedes lighting, lighting precedes light volumes
/// and tonemapping always runs immediately before presenting.
pub fn pass_sequence(settings: &RendererSettings, cascade_count: usize) -> Vec<RenderPass> {
    let mut passes: Vec<RenderPass> = (0..cascade_count).map(RenderPass::ShadowCascade).collect();

    match settings.pipeline_mode() {
        PipelineMode::Deferred => {
            passes.push(RenderPass::Geometry);
            match settings.debug_view() {
                Some(view) => passes.push(RenderPass::DebugView(view)),
                None => {
                    passes.push(RenderPass::Lighting);
                    passes.push(RenderPass::LightVolumes);
                }
            }
        }
        PipelineMode::Forward => passes.push(RenderPass::Forward),
    }

    if settings.tonemapping() {
        passes.push(RenderPass::Tonemap);
    }

    passes.push(RenderPass::Present);
    passes
}

/// Performs the GPU work of each pass on behalf of the renderer.
pub trait DrawExecutor {
    /// Start recording `pass`.
    fn begin_pass(&mut self, pass: RenderPass);

    /// Bind the frame uniforms (slot 0) and light buffer (slot 1) for the
    /// current pass.
    fn bind_frame(&mut self, frame: &FrameData, lights: &[PackedPointLight]);

    /// Bind `material` once, or no material for depth only passes, and draw
    /// `mesh` once per entry in `instances`.
    fn draw_instanced(
        &mut self,
        mesh: MeshKey,
        material: Option<MaterialKey>,
        instances: &[InstanceRawData],
    );

    /// Draw a full screen triangle for `pass`.
    fn draw_fullscreen(&mut self, pass: RenderPass);

    /// Finish recording the current pass.
    fn end_pass(&mut self);
}
