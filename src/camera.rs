use glam::{Mat4, Quat, Vec3};
use thiserror::Error;

/// Camera assumes a right-handed system with the +Z axis going _out_ of the
/// screen rather than in, so the camera looks down its local -Z axis.
///
/// The projection uses reverse-Z: the near plane maps to a depth of 1 and the
/// far plane maps to 0. Depth tests and depth clears must be inverted relative
/// to a conventional depth buffer (clear to 0, pass with `GreaterEqual`).
///
/// The following transforms points from local space to clip space:
///  `V_clip = M_projection * M_view * M_model * M_local`
#[derive(Clone, Debug)]
pub struct Camera {
    /// The position of the camera in world space.
    eye: Vec3,
    /// The target position the camera should look at.
    target: Vec3,
    /// The camera's up direction.
    up: Vec3,
    /// A world space direction vector indicating which direction is considered
    /// straight up.
    world_up: Vec3,
    /// The ratio of the viewport width to its height.
    aspect: f32,
    /// The vertical field of view for the camera.
    fov_y: f32,
    /// The minimum camera view distance.
    z_near: f32,
    /// The maximum camera view distance.
    z_far: f32,
    viewport_width: u32,
    viewport_height: u32,
}

impl Camera {
    /// Create a new camera centered at `eye` with the center of the view
    /// aiming at `target` with `up` as the camera's upward direction.
    ///
    /// The aspect ratio is set to one if either the viewport width or height
    /// is zero.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        eye: Vec3,
        target: Vec3,
        up: Vec3,
        fov_y: f32,
        z_near: f32,
        z_far: f32,
        viewport_width: u32,
        viewport_height: u32,
    ) -> Self {
        assert!(fov_y > 0.0);
        assert!(z_near > 0.0);
        assert!(z_far > z_near);
        assert!(eye != target);

        let world_up = up.normalize();
        let mut camera = Self {
            eye,
            target,
            up: world_up,
            world_up,
            aspect: if viewport_width > 0 && viewport_height > 0 {
                viewport_width as f32 / viewport_height as f32
            } else {
                1.0
            },
            fov_y,
            z_near,
            z_far,
            viewport_width,
            viewport_height,
        };

        camera.reorient(eye, target);
        camera
    }

    /// Reorient the camera to be located at `eye` and look at `target`. Both
    /// points are should be in world space.
    ///
    /// Calling `reorient` will rebuild the camera's local coordinate system
    /// using the Gram-Schmidt process. When looking straight along the world up
    /// axis the previous up vector is used as the reference instead.
    pub fn reorient(&mut self, new_eye: Vec3, new_target: Vec3) {
        self.eye = new_eye;
        self.target = new_target;

        // NOTE: This direction goes from target to eye, the opposite of the
        // facing direction, because the camera looks down its local -Z axis.
        let new_direction = (self.eye - self.target).normalize();

        let mut new_right = Vec3::cross(self.world_up, new_direction);
        if new_right.length_squared() <= f32::EPSILON {
            new_right = Vec3::cross(self.up, new_direction);
        }
        if new_right.length_squared() <= f32::EPSILON {
            new_right = new_direction.any_orthonormal_vector();
        }

        self.up = Vec3::cross(new_direction, new_right.normalize());
    }

    /// Move the camera (and its target) by `offset` in world space.
    pub fn translate(&mut self, offset: Vec3) {
        self.reorient(self.eye + offset, self.target + offset);
    }

    /// Rotate the viewing direction around the camera position.
    pub fn rotate(&mut self, rotation: Quat) {
        let distance = (self.target - self.eye).length();
        let direction = rotation * self.forward();
        self.reorient(self.eye, self.eye + direction * distance);
    }

    /// Get the camera's view matrix.
    ///
    /// A view matrix transforms coordinates from world space to view space
    /// where the camera is located at the origin looking down the -Z axis.
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.eye, self.target, self.up)
    }

    /// Get the camera's reverse-Z projection matrix.
    ///
    /// Swapping the near and far distances of a standard [0, 1] depth range
    /// perspective projection maps the near plane to 1 and the far plane to 0.
    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov_y, self.aspect, self.z_far, self.z_near)
    }

    /// Get the camera's view projection matrix. The view projection matrix will
    /// transform points from world space to clip space.
    pub fn view_projection_matrix(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    /// Resize the camera's viewport.
    pub fn set_viewport_size(
        &mut self,
        new_width: u32,
        new_height: u32,
    ) -> Result<(), InvalidCameraSize> {
        if new_width > 0 && new_height > 0 {
            self.aspect = new_width as f32 / new_height as f32;
            self.viewport_width = new_width;
            self.viewport_height = new_height;
            Ok(())
        } else {
            Err(InvalidCameraSize(new_width, new_height))
        }
    }

    /// Get the position of the camera in world space.
    pub fn position(&self) -> Vec3 {
        self.eye
    }

    /// Get the point at which the camera is focused on.
    pub fn target(&self) -> Vec3 {
        self.target
    }

    /// Get the normalized direction the camera is facing.
    pub fn forward(&self) -> Vec3 {
        (self.target - self.eye).normalize()
    }

    /// Get the camera's right axis.
    pub fn right(&self) -> Vec3 {
        Vec3::cross(self.forward(), self.up).normalize()
    }

    /// Get the camera's up axis.
    pub fn up(&self) -> Vec3 {
        self.up
    }

    /// Get the world up axis (not the camera's up axis).
    pub fn world_up(&self) -> Vec3 {
        self.world_up
    }

    pub fn fov_y(&self) -> f32 {
        self.fov_y
    }

    pub fn aspect(&self) -> f32 {
        self.aspect
    }

    pub fn z_near(&self) -> f32 {
        self.z_near
    }

    pub fn z_far(&self) -> f32 {
        self.z_far
    }

    /// Get the camera viewport size in pixels.
    pub fn viewport_size(&self) -> (u32, u32) {
        (self.viewport_width, self.viewport_height)
    }
}

#[derive(Debug, Error)]
#[error("camera viewport width and height must be larger than zero but width was {} and height was {}", .0, .1)]
pub struct InvalidCameraSize(pub u32, pub u32);
