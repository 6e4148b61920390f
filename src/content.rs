use std::path::{Path, PathBuf};

use anyhow::Context;
use tracing::{info, warn};

use crate::renderer::{resources::RenderResources, scene::Scene};

/// Builds a scene from a file. Parsing scene and mesh formats is left to
/// implementors; the renderer only consumes the resulting `Scene` and the
/// meshes and materials registered in `resources`.
pub trait SceneLoader {
    fn load_scene(&mut self, path: &Path, resources: &mut RenderResources) -> anyhow::Result<Scene>;
}

impl<F> SceneLoader for F
where
    F: FnMut(&Path, &mut RenderResources) -> anyhow::Result<Scene>,
{
    fn load_scene(&mut self, path: &Path, resources: &mut RenderResources) -> anyhow::Result<Scene> {
        self(path, resources)
    }
}

/// Holds the active scene and swaps it for newly loaded ones.
///
/// A failed load never touches the active scene, so the previous scene keeps
/// rendering.
#[derive(Debug, Default)]
pub struct SceneLibrary {
    active: Option<Scene>,
    active_path: Option<PathBuf>,
}

impl SceneLibrary {
    pub fn new() -> Self {
        Default::default()
    }

    /// Make an already built scene the active scene.
    pub fn set_active(&mut self, scene: Scene, path: Option<PathBuf>) {
        self.active = Some(scene);
        self.active_path = path;
    }

    /// Load the scene at `path` and make it the active scene.
    ///
    /// On failure the error is logged and returned, and the previously active
    /// scene (if any) stays active. Callers loading their first scene should
    /// treat an error as fatal.
    #[tracing::instrument(level = "info", skip(self, loader, resources))]
    pub fn load<L: SceneLoader>(
        &mut self,
        path: &Path,
        loader: &mut L,
        resources: &mut RenderResources,
    ) -> anyhow::Result<&Scene> {
        match loader
            .load_scene(path, resources)
            .with_context(|| format!("failed to load scene {}", path.display()))
        {
            Ok(scene) => {
                info!(objects = scene.objects.len(), lights = scene.point_lights.len(), "loaded scene");
                self.active_path = Some(path.to_path_buf());
                Ok(self.active.insert(scene))
            }
            Err(err) => {
                if let Some(previous) = &self.active_path {
                    warn!(?previous, "{err:#}, keeping the previous scene");
                } else {
                    warn!("{err:#}");
                }
                Err(err)
            }
        }
    }

    pub fn active(&self) -> Option<&Scene> {
        self.active.as_ref()
    }

    pub fn active_mut(&mut self) -> Option<&mut Scene> {
        self.active.as_mut()
    }

    pub fn active_path(&self) -> Option<&Path> {
        self.active_path.as_deref()
    }
}

/// List the files directly inside `dir` whose extension matches `extension`
/// (case insensitive), sorted by path.
pub fn discover_scenes<P: AsRef<Path>>(dir: P, extension: &str) -> anyhow::Result<Vec<PathBuf>> {
    let dir = dir.as_ref();
    let mut scenes = Vec::new();

    for entry in std::fs::read_dir(dir)
        .with_context(|| format!("failed to read scene directory {}", dir.display()))?
    {
        let path = entry?.path();
        let matches = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case(extension));

        if matches && path.is_file() {
            scenes.push(path);
        }
    }

    scenes.sort();
    Ok(scenes)
}

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use super::*;
    use crate::renderer::{lighting::PointLight, models::SceneObject};

    fn scene_with_lights(count: usize) -> Scene {
        let mut scene = Scene::new();
        for i in 0..count {
            scene.add_point_light(PointLight::new(Vec3::X * i as f32, Vec3::ONE, 1.0));
        }
        scene
    }

    #[test]
    fn failed_load_keeps_previous_scene() {
        let mut resources = RenderResources::new();
        let mut library = SceneLibrary::new();

        let mut good = |_: &Path, _: &mut RenderResources| -> anyhow::Result<Scene> {
            Ok(scene_with_lights(2))
        };
        library.load(Path::new("a.scene"), &mut good, &mut resources).unwrap();

        let mut bad = |_: &Path, _: &mut RenderResources| -> anyhow::Result<Scene> {
            anyhow::bail!("corrupt file")
        };
        let err = library
            .load(Path::new("b.scene"), &mut bad, &mut resources)
            .unwrap_err();

        assert!(format!("{err:#}").contains("corrupt file"));
        assert_eq!(2, library.active().unwrap().point_lights.len());
        assert_eq!(Some(Path::new("a.scene")), library.active_path());
    }

    #[test]
    fn failed_initial_load_leaves_no_scene() {
        let mut resources = RenderResources::new();
        let mut library = SceneLibrary::new();
        let mut bad = |_: &Path, _: &mut RenderResources| -> anyhow::Result<Scene> {
            anyhow::bail!("missing")
        };

        assert!(library.load(Path::new("x.scene"), &mut bad, &mut resources).is_err());
        assert!(library.active().is_none());
    }

    #[test]
    fn successful_load_replaces_scene() {
        let mut resources = RenderResources::new();
        let mut library = SceneLibrary::new();
        library.set_active(scene_with_lights(1), None);

        let mut loader = |_: &Path, _: &mut RenderResources| -> anyhow::Result<Scene> {
            let mut scene = Scene::new();
            scene.add_object(SceneObject::new(None, None));
            Ok(scene)
        };
        library.load(Path::new("c.scene"), &mut loader, &mut resources).unwrap();

        let active = library.active().unwrap();
        assert_eq!(1, active.objects.len());
        assert!(active.point_lights.is_empty());
    }

    #[test]
    fn discovers_matching_files_in_order() {
        let dir = std::env::temp_dir().join(format!("owlet-discover-{}", std::process::id()));
        std::fs::create_dir_all(dir.join("nested.scene")).unwrap();
        for name in ["b.scene", "a.SCENE", "notes.txt"] {
            std::fs::write(dir.join(name), "").unwrap();
        }

        let found = discover_scenes(&dir, "scene").unwrap();
        std::fs::remove_dir_all(&dir).unwrap();

        assert_eq!(vec![dir.join("a.SCENE"), dir.join("b.scene")], found);
    }

    #[test]
    fn missing_directory_is_an_error() {
        assert!(discover_scenes("/definitely/not/a/scene/dir", "scene").is_err());
    }
}
