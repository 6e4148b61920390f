use glam::{Mat4, Vec3};

/// Returns the largest scale factor applied by `transform` along any of its
/// three basis axes.
///
/// The scale is measured from the length of each basis column rather than a
/// separately stored scale value, so it works for any affine transform
/// including ones with non-uniform scale and rotation.
pub fn max_axis_scale(transform: &Mat4) -> f32 {
    let scale_x = transform.x_axis.truncate().length();
    let scale_y = transform.y_axis.truncate().length();
    let scale_z = transform.z_axis.truncate().length();

    scale_x.max(scale_y).max(scale_z)
}

/// An axis aligned bounding box.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    /// An "inverted" box that any point will expand.
    pub const EMPTY: Aabb = Aabb {
        min: Vec3::splat(f32::INFINITY),
        max: Vec3::splat(f32::NEG_INFINITY),
    };

    /// Create the tightest box that encloses every point in `points`. An empty
    /// iterator yields `Aabb::EMPTY`.
    pub fn from_points<I>(points: I) -> Self
    where
        I: IntoIterator<Item = Vec3>,
    {
        points.into_iter().fold(Self::EMPTY, |aabb, p| Aabb {
            min: aabb.min.min(p),
            max: aabb.max.max(p),
        })
    }

    /// The center point of the box.
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// The width, height and depth of the box.
    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    /// Returns true if the box has a positive, finite extent on every axis.
    pub fn is_valid(&self) -> bool {
        let size = self.size();
        size.is_finite() && size.cmpgt(Vec3::ZERO).all()
    }
}
