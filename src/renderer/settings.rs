use glam::Vec3;
use thiserror::Error;

use super::{
    lighting::Sun,
    shadows::{CascadeSplits, ShadowSettings},
};

/// Which sequence of passes draws the frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PipelineMode {
    /// Fill a geometry buffer, then shade it with a full screen pass and light
    /// volumes.
    #[default]
    Deferred,
    /// Shade every object while it is drawn.
    Forward,
}

/// Intermediate deferred buffers that can be shown instead of the lit image.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DebugView {
    Albedo,
    Normal,
    Depth,
}

#[derive(Debug, Error, PartialEq)]
pub enum SettingsError {
    #[error("sun direction {0} cannot be normalized")]
    InvalidSunDirection(Vec3),
}

/// Configurable state of the renderer.
///
/// None of these values change how objects are culled, batched or how shadow
/// cascades are fitted. They only choose which passes run and feed the frame
/// uniforms.
#[derive(Clone, Debug, PartialEq)]
pub struct RendererSettings {
    pipeline_mode: PipelineMode,
    debug_view: Option<DebugView>,
    tonemapping: bool,
    sun: Sun,
    ambient_color: Vec3,
    shadows: ShadowSettings,
}

impl Default for RendererSettings {
    fn default() -> Self {
        Self {
            pipeline_mode: PipelineMode::Deferred,
            debug_view: None,
            tonemapping: true,
            sun: Default::default(),
            ambient_color: Vec3::splat(0.05),
            shadows: Default::default(),
        }
    }
}

impl RendererSettings {
    pub fn pipeline_mode(&self) -> PipelineMode {
        self.pipeline_mode
    }

    pub fn set_pipeline_mode(&mut self, mode: PipelineMode) {
        self.pipeline_mode = mode;
    }

    /// Flip between deferred and forward shading.
    pub fn toggle_pipeline_mode(&mut self) {
        self.pipeline_mode = match self.pipeline_mode {
            PipelineMode::Deferred => PipelineMode::Forward,
            PipelineMode::Forward => PipelineMode::Deferred,
        };
    }

    pub fn debug_view(&self) -> Option<DebugView> {
        self.debug_view
    }

    /// Show an intermediate buffer instead of the lit image. Only has an effect
    /// in deferred mode.
    pub fn set_debug_view(&mut self, view: Option<DebugView>) {
        self.debug_view = view;
    }

    pub fn tonemapping(&self) -> bool {
        self.tonemapping
    }

    pub fn set_tonemapping(&mut self, enabled: bool) {
        self.tonemapping = enabled;
    }

    pub fn sun(&self) -> &Sun {
        &self.sun
    }

    /// Normalized direction the sun's light travels.
    pub fn sun_direction(&self) -> Vec3 {
        self.sun.direction
    }

    pub fn set_sun_direction(&mut self, direction: Vec3) -> Result<(), SettingsError> {
        self.sun.direction = direction
            .try_normalize()
            .ok_or(SettingsError::InvalidSunDirection(direction))?;
        Ok(())
    }

    pub fn sun_color(&self) -> Vec3 {
        self.sun.color
    }

    pub fn set_sun_color(&mut self, color: Vec3) {
        self.sun.color = color;
    }

    pub fn ambient_color(&self) -> Vec3 {
        self.ambient_color
    }

    pub fn set_ambient_color(&mut self, color: Vec3) {
        self.ambient_color = color;
    }

    pub fn shadows(&self) -> &ShadowSettings {
        &self.shadows
    }

    pub fn shadows_mut(&mut self) -> &mut ShadowSettings {
        &mut self.shadows
    }

    pub fn set_cascade_splits(&mut self, splits: CascadeSplits) {
        self.shadows.splits = splits;
    }
}
