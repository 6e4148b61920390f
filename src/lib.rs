pub mod camera;
pub mod content;
pub mod demo;
pub mod math_utils;
pub mod renderer;

pub use camera::Camera;
pub use renderer::{
    frame::{FramePacket, RenderInfo},
    passes::{DrawExecutor, RenderPass},
    resources::RenderResources,
    scene::Scene,
    settings::RendererSettings,
    RenderError, Renderer,
};
