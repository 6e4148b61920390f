use super::{lighting::PointLight, models::SceneObject};

/// A set of objects and lights that can be drawn with the renderer.
///
/// A `Scene` is not a scene graph! Objects and lights have no identity beyond
/// their position in the scene's lists, and the scene must not be edited while
/// a frame is being prepared.
#[derive(Clone, Debug, Default)]
pub struct Scene {
    pub objects: Vec<SceneObject>,
    pub point_lights: Vec<PointLight>,
}

impl Scene {
    pub fn new() -> Self {
        Default::default()
    }

    /// Add an object and return its index.
    pub fn add_object(&mut self, object: SceneObject) -> usize {
        self.objects.push(object);
        self.objects.len() - 1
    }

    /// Add a point light and return its index.
    pub fn add_point_light(&mut self, light: PointLight) -> usize {
        self.point_lights.push(light);
        self.point_lights.len() - 1
    }

    /// Remove the object at `index`, shifting later objects down by one.
    pub fn remove_object(&mut self, index: usize) -> Option<SceneObject> {
        (index < self.objects.len()).then(|| self.objects.remove(index))
    }

    /// Remove the point light at `index`, shifting later lights down by one.
    pub fn remove_point_light(&mut self, index: usize) -> Option<PointLight> {
        (index < self.point_lights.len()).then(|| self.point_lights.remove(index))
    }

    pub fn objects(&self) -> impl Iterator<Item = &SceneObject> {
        self.objects.iter()
    }

    pub fn objects_mut(&mut self) -> impl Iterator<Item = &mut SceneObject> {
        self.objects.iter_mut()
    }

    pub fn point_lights(&self) -> impl Iterator<Item = &PointLight> {
        self.point_lights.iter()
    }

    pub fn point_lights_mut(&mut self) -> impl Iterator<Item = &mut PointLight> {
        self.point_lights.iter_mut()
    }

    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    pub fn clear(&mut self) {
        self.objects.clear();
        self.point_lights.clear();
    }
}
