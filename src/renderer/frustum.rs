//! View frustum construction and conservative sphere visibility tests.
//!
//! Every plane is referenced from the camera position: a point `p` is inside
//! a plane when `dot(p - camera_position, normal) + offset >= 0`. The four
//! side planes and the near plane pass through the camera itself so their
//! offset is zero, while the optional far plane sits `z_far` units along the
//! view direction.
use glam::Vec3;

use crate::camera::Camera;

/// A half space boundary of the view frustum. The normal points into the
/// visible volume.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Plane {
    pub normal: Vec3,
    pub offset: f32,
}

impl Plane {
    /// Signed distance of a point given relative to the camera position.
    /// Positive values are inside the half space.
    pub fn signed_distance(&self, relative_point: Vec3) -> f32 {
        relative_point.dot(self.normal) + self.offset
    }
}

/// World space view frustum derived from a camera.
#[derive(Clone, Debug)]
pub struct Frustum {
    pub near: Plane,
    pub far: Option<Plane>,
    pub top: Plane,
    pub bottom: Plane,
    pub left: Plane,
    pub right: Plane,
    /// The camera's normalized view direction, used to scale corner rays.
    pub forward: Vec3,
}

impl Frustum {
    /// Iterate over all planes that bound this frustum.
    pub fn planes(&self) -> impl Iterator<Item = &Plane> {
        [&self.near, &self.top, &self.bottom, &self.left, &self.right]
            .into_iter()
            .chain(self.far.as_ref())
    }

    /// Returns a copy of this frustum with no far plane, making it extend
    /// infinitely along the view direction.
    pub fn without_far_plane(&self) -> Self {
        Self {
            far: None,
            ..self.clone()
        }
    }

    /// The four edge directions of the frustum in world space, ordered top
    /// right, bottom right, bottom left, top left.
    ///
    /// Each edge is the intersection of two adjacent side planes, found with a
    /// cross product of their normals. Edges are scaled so that their
    /// projection onto the view direction is exactly one, meaning
    /// `camera_position + edge * d` is the frustum corner at view depth `d`.
    pub fn corner_directions(&self) -> [Vec3; 4] {
        let edge = |a: &Plane, b: &Plane| {
            let direction = Vec3::cross(a.normal, b.normal);
            let depth = direction.dot(self.forward);
            if depth.abs() <= f32::EPSILON {
                self.forward
            } else {
                direction / depth
            }
        };

        [
            edge(&self.top, &self.right),
            edge(&self.right, &self.bottom),
            edge(&self.bottom, &self.left),
            edge(&self.left, &self.top),
        ]
    }

    /// The eight world space corners of the slice of this frustum between view
    /// depths `near` and `far`. The first four corners are on the near slice.
    pub fn slice_corners(&self, camera_position: Vec3, near: f32, far: f32) -> [Vec3; 8] {
        let directions = self.corner_directions();
        let mut corners = [Vec3::ZERO; 8];

        for (i, direction) in directions.iter().enumerate() {
            corners[i] = camera_position + *direction * near;
            corners[i + 4] = camera_position + *direction * far;
        }

        corners
    }
}

/// Build the view frustum for `camera`.
///
/// The result is a pure function of the camera's orientation, field of view,
/// aspect ratio and far distance.
pub fn build_frustum(camera: &Camera) -> Frustum {
    let forward = camera.forward();
    let right = camera.right();
    let up = camera.up();

    let tan_y = (camera.fov_y() * 0.5).tan();
    let tan_x = tan_y * camera.aspect();

    let through_camera = |normal: Vec3| Plane {
        normal: normal.normalize(),
        offset: 0.0,
    };

    Frustum {
        near: through_camera(forward),
        far: Some(Plane {
            normal: -forward,
            offset: camera.z_far(),
        }),
        top: through_camera(forward * tan_y - up),
        bottom: through_camera(forward * tan_y + up),
        left: through_camera(forward * tan_x + right),
        right: through_camera(forward * tan_x - right),
        forward,
    }
}

/// Conservative sphere visibility test.
///
/// Returns true unless the sphere lies entirely on the outside of at least one
/// frustum plane. Spheres straddling a frustum corner may be reported visible
/// even when they are not, which only costs a wasted draw.
pub fn sphere_in_frustum(frustum: &Frustum, camera_position: Vec3, center: Vec3, radius: f32) -> bool {
    let relative_center = center - camera_position;

    frustum
        .planes()
        .all(|plane| plane.signed_distance(relative_center) >= -radius)
}
