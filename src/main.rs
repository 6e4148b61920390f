use std::path::Path;

use glam::Vec3;
use tracing::info;
use tracing_subscriber::EnvFilter;

use owlet::{
    content::SceneLibrary,
    demo::{build_default_scene, orbit_camera, TracingExecutor},
    renderer::settings::PipelineMode,
    Camera, RenderResources, Renderer, RendererSettings, Scene,
};

const DEFAULT_FRAME_COUNT: u32 = 120;

fn main() -> anyhow::Result<()> {
    tracing_log::LogTracer::init()?;

    let stdout_subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,owlet=debug")),
        )
        .finish();
    tracing::subscriber::set_global_default(stdout_subscriber)?;

    let frame_count = match std::env::args().nth(1) {
        Some(arg) => arg.parse()?,
        None => DEFAULT_FRAME_COUNT,
    };

    let mut resources = RenderResources::new();
    let mut renderer = Renderer::new(RendererSettings::default(), &mut resources);

    let mut library = SceneLibrary::new();
    let mut load_default = |_: &Path, resources: &mut RenderResources| -> anyhow::Result<Scene> {
        Ok(build_default_scene(resources))
    };
    library.load(Path::new("default"), &mut load_default, &mut resources)?;

    let mut camera = Camera::new(
        Vec3::new(0.0, 8.0, 20.0),
        Vec3::ZERO,
        Vec3::Y,
        f32::to_radians(60.0),
        0.1,
        250.0,
        1280,
        720,
    );

    let mut executor = TracingExecutor::default();

    for frame in 0..frame_count {
        // Alternate shading paths halfway through to exercise both pass
        // sequences.
        if frame == frame_count / 2 {
            renderer.settings_mut().set_pipeline_mode(PipelineMode::Forward);
        }

        orbit_camera(&mut camera, frame as f32 * 0.05, 20.0, 8.0);

        let Some(scene) = library.active() else {
            anyhow::bail!("no active scene");
        };
        renderer.render_frame(scene, &camera, &resources, &mut executor)?;
    }

    let last = renderer.last_render_info();
    info!(
        frames = frame_count,
        objects = last.total_scene_objects,
        draw_calls = last.instanced_draw_call_count,
        executed_draws = executor.draws,
        executed_instances = executor.instances,
        "finished"
    );

    Ok(())
}
