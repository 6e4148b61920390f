//! Cascaded shadow map fitting for the sun.
//!
//! Each cascade covers one distance slice of the camera view. The slice's
//! eight corners are wrapped in a light space bounding box, and an
//! orthographic projection is built around that box using the same reversed
//! depth convention as the main camera.
use glam::{Mat4, Vec2, Vec3, Vec4};
use thiserror::Error;
use tracing::debug;

use super::{frustum::build_frustum, shaders::packed_structs::MAX_CASCADES};
use crate::{camera::Camera, math_utils::Aabb};

/// Remaps a standard `[0, 1]` depth range to `[1, 0]` so that the nearest
/// depth is 1 and the farthest is 0.
pub const REVERSE_Z: Mat4 = Mat4::from_cols(
    Vec4::new(1.0, 0.0, 0.0, 0.0),
    Vec4::new(0.0, 1.0, 0.0, 0.0),
    Vec4::new(0.0, 0.0, -1.0, 0.0),
    Vec4::new(0.0, 0.0, 1.0, 1.0),
);

/// Cosine above which the sun is treated as parallel to a reference up axis.
const PARALLEL_THRESHOLD: f32 = 0.999;

#[derive(Debug, Error, PartialEq)]
pub enum ShadowError {
    #[error("the sun direction must have a non-zero finite length")]
    ZeroSunDirection,
    #[error("cascade splits {0:?} must hold 1 to 4 strictly increasing positive slices")]
    InvalidSplits(Vec<f32>),
    #[error("cascade slice {near}..{far} is empty or negative")]
    InvalidSlice { near: f32, far: f32 },
    #[error("cascade {near}..{far} has a degenerate light space extent")]
    DegenerateCascade { near: f32, far: f32 },
}

/// Distance boundaries of the shadow cascades along the camera view direction.
///
/// `N + 1` boundaries describe `N` contiguous cascades, the far distance of a
/// cascade being the near distance of the next.
#[derive(Clone, Debug, PartialEq)]
pub struct CascadeSplits {
    boundaries: Vec<f32>,
}

impl Default for CascadeSplits {
    fn default() -> Self {
        Self {
            boundaries: vec![0.001, 15.0, 50.0, 100.0, 200.0],
        }
    }
}

impl CascadeSplits {
    pub fn new(boundaries: &[f32]) -> Result<Self, ShadowError> {
        let cascade_count = boundaries.len().saturating_sub(1);
        let increasing = boundaries.windows(2).all(|w| w[0] < w[1]);
        let positive = boundaries.first().is_some_and(|first| *first > 0.0);
        let finite = boundaries.iter().all(|b| b.is_finite());

        if (1..=MAX_CASCADES).contains(&cascade_count) && increasing && positive && finite {
            Ok(Self {
                boundaries: boundaries.to_vec(),
            })
        } else {
            Err(ShadowError::InvalidSplits(boundaries.to_vec()))
        }
    }

    pub fn cascade_count(&self) -> usize {
        self.boundaries.len() - 1
    }

    pub fn boundaries(&self) -> &[f32] {
        &self.boundaries
    }

    /// The `(near, far)` distances of each cascade, closest first.
    pub fn ranges(&self) -> impl Iterator<Item = (f32, f32)> + '_ {
        self.boundaries.windows(2).map(|w| (w[0], w[1]))
    }

    /// Far split of each cascade packed for the frame uniform block. Unused
    /// lanes are zero.
    pub fn far_splits(&self) -> Vec4 {
        let mut splits = [0.0; MAX_CASCADES];
        for (slot, far) in splits.iter_mut().zip(self.boundaries.iter().skip(1)) {
            *slot = *far;
        }
        Vec4::from_array(splits)
    }
}

/// Tunable inputs to cascade fitting.
#[derive(Clone, Debug, PartialEq)]
pub struct ShadowSettings {
    pub splits: CascadeSplits,
    /// Width and height of one cascade's shadow map in texels.
    pub resolution: u32,
    /// Extra depth range added in front of and behind each cascade so casters
    /// outside the view slice still land in the shadow map.
    pub depth_margin: f32,
    /// Align each cascade to whole shadow map texels so shadow edges do not
    /// shimmer as the camera moves.
    pub texel_snapping: bool,
}

impl Default for ShadowSettings {
    fn default() -> Self {
        Self {
            splits: Default::default(),
            resolution: 2048,
            depth_margin: 50.0,
            texel_snapping: true,
        }
    }
}

/// A fitted shadow cascade.
#[derive(Clone, Debug, PartialEq)]
pub struct CascadeDescriptor {
    pub near: f32,
    pub far: f32,
    pub view_proj: Mat4,
    /// Light view space bounds of the slice corners the projection was built
    /// from.
    pub bounds: Aabb,
}

/// Orthonormal basis looking along the direction the sun's light travels.
#[derive(Clone, Copy, Debug)]
pub struct LightBasis {
    pub forward: Vec3,
    pub right: Vec3,
    pub up: Vec3,
}

impl LightBasis {
    /// Build a basis for `sun_direction`. When the sun runs parallel to the
    /// world up axis, +Z (and then +X) is used as the reference up instead so
    /// the basis never collapses.
    pub fn new(sun_direction: Vec3) -> Result<Self, ShadowError> {
        let forward = sun_direction.try_normalize().ok_or(ShadowError::ZeroSunDirection)?;

        let reference_up = [Vec3::Y, Vec3::Z, Vec3::X]
            .into_iter()
            .find(|axis| forward.dot(*axis).abs() < PARALLEL_THRESHOLD)
            .unwrap_or(Vec3::X);

        if reference_up != Vec3::Y {
            debug!(?sun_direction, ?reference_up, "sun is parallel to world up, using fallback axis");
        }

        let right = forward.cross(reference_up).normalize();
        let up = right.cross(forward);

        Ok(Self { forward, right, up })
    }

    /// A light view matrix placed at `eye`.
    pub fn view_matrix(&self, eye: Vec3) -> Mat4 {
        Mat4::look_at_rh(eye, eye + self.forward, self.up)
    }
}

/// Compute the sun view projection matrix that tightly encloses the slice of
/// the camera view between `near` and `far`, using default shadow settings.
pub fn compute_cascade(
    camera: &Camera,
    near: f32,
    far: f32,
    sun_direction: Vec3,
) -> Result<Mat4, ShadowError> {
    fit_cascade(camera, near, far, sun_direction, &ShadowSettings::default())
        .map(|cascade| cascade.view_proj)
}

/// Fit a single cascade. See `compute_cascade`.
pub fn fit_cascade(
    camera: &Camera,
    near: f32,
    far: f32,
    sun_direction: Vec3,
    settings: &ShadowSettings,
) -> Result<CascadeDescriptor, ShadowError> {
    if !(near >= 0.0 && far > near) {
        return Err(ShadowError::InvalidSlice { near, far });
    }

    let basis = LightBasis::new(sun_direction)?;
    let corners = build_frustum(camera).slice_corners(camera.position(), near, far);

    // The light view never moves with the camera, so a static point keeps its
    // light space position from frame to frame.
    let view = basis.view_matrix(Vec3::ZERO);
    let bounds = Aabb::from_points(corners.iter().map(|c| view.transform_point3(*c)));

    let size = bounds.size();
    if !(size.is_finite() && size.x > 0.0 && size.y > 0.0) {
        return Err(ShadowError::DegenerateCascade { near, far });
    }

    let (min, max) = if settings.texel_snapping && settings.resolution > 1 {
        snap_to_texels(bounds.min.truncate(), size.x.max(size.y), settings.resolution)
    } else {
        (bounds.min.truncate(), bounds.max.truncate())
    };

    // The light view looks down -Z, so the closest corner has the largest z.
    let depth_near = -bounds.max.z - settings.depth_margin;
    let depth_far = -bounds.min.z + settings.depth_margin;

    let projection = REVERSE_Z
        * Mat4::orthographic_rh(min.x, max.x, min.y, max.y, depth_near, depth_far);

    let view_proj = projection * view;
    if !view_proj.is_finite() {
        return Err(ShadowError::DegenerateCascade { near, far });
    }

    Ok(CascadeDescriptor {
        near,
        far,
        view_proj,
        bounds,
    })
}

/// Light space x/y extents of a square shadow map covering a box of at most
/// `extent` units that starts at `min`.
///
/// The map is one texel wider than `extent` so the lower corner can be floored
/// to a whole texel without losing coverage. With the corner on the texel grid
/// and a texel size that only depends on `extent`, a point that does not move
/// keeps the same position inside its texel while the camera translates.
fn snap_to_texels(min: Vec2, extent: f32, resolution: u32) -> (Vec2, Vec2) {
    let texel = extent / (resolution - 1) as f32;
    let min = (min / texel).floor() * texel;
    (min, min + Vec2::splat(texel * resolution as f32))
}

/// Fit every cascade described by `settings`, closest first.
#[tracing::instrument(level = "debug", skip(camera, settings))]
pub fn build_cascades(
    camera: &Camera,
    sun_direction: Vec3,
    settings: &ShadowSettings,
) -> Result<Vec<CascadeDescriptor>, ShadowError> {
    settings
        .splits
        .ranges()
        .map(|(near, far)| fit_cascade(camera, near, far, sun_direction, settings))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn camera_looking_down_neg_z() -> Camera {
        Camera::new(
            Vec3::new(0.0, 2.0, 10.0),
            Vec3::new(0.0, 2.0, 0.0),
            Vec3::Y,
            f32::to_radians(60.0),
            0.1,
            200.0,
            1280,
            720,
        )
    }

    #[test]
    fn default_splits_are_contiguous_and_increasing() {
        let splits = CascadeSplits::default();
        let ranges: Vec<_> = splits.ranges().collect();

        assert_eq!(4, splits.cascade_count());
        for (near, far) in &ranges {
            assert!(near < far);
        }
        for pair in ranges.windows(2) {
            assert_eq!(pair[0].1, pair[1].0);
        }
        assert_eq!(Vec4::new(15.0, 50.0, 100.0, 200.0), splits.far_splits());
    }

    #[test]
    fn invalid_splits_are_rejected() {
        assert!(CascadeSplits::new(&[1.0]).is_err());
        assert!(CascadeSplits::new(&[0.0, 10.0]).is_err());
        assert!(CascadeSplits::new(&[1.0, 10.0, 10.0]).is_err());
        assert!(CascadeSplits::new(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).is_err());
        assert!(CascadeSplits::new(&[0.5, 20.0]).is_ok());
    }

    #[test]
    fn far_splits_leave_unused_lanes_zero() {
        let splits = CascadeSplits::new(&[0.5, 20.0, 40.0]).unwrap();
        assert_eq!(Vec4::new(20.0, 40.0, 0.0, 0.0), splits.far_splits());
    }

    #[test]
    fn cascades_have_non_degenerate_extents() {
        let camera = camera_looking_down_neg_z();
        let cascades =
            build_cascades(&camera, Vec3::new(-0.3, -1.0, -0.2), &ShadowSettings::default())
                .unwrap();

        assert_eq!(4, cascades.len());
        for cascade in &cascades {
            assert!(cascade.bounds.is_valid());
            assert!(cascade.view_proj.is_finite());
        }
        for pair in cascades.windows(2) {
            assert!(pair[0].near < pair[0].far);
            assert_eq!(pair[0].far, pair[1].near);
        }
    }

    #[test]
    fn slice_corners_project_inside_the_cascade() {
        let camera = camera_looking_down_neg_z();
        let settings = ShadowSettings::default();
        let cascade = fit_cascade(&camera, 1.0, 15.0, Vec3::new(0.4, -1.0, 0.1), &settings).unwrap();

        let corners = build_frustum(&camera).slice_corners(camera.position(), 1.0, 15.0);
        for corner in corners {
            let clip = cascade.view_proj.project_point3(corner);
            assert!(clip.x >= -1.0 - 1e-4 && clip.x <= 1.0 + 1e-4, "{clip:?}");
            assert!(clip.y >= -1.0 - 1e-4 && clip.y <= 1.0 + 1e-4, "{clip:?}");
            assert!(clip.z > 0.0 && clip.z < 1.0, "{clip:?}");
        }
    }

    #[test]
    fn cascade_depth_is_reversed() {
        let camera = camera_looking_down_neg_z();
        let sun = Vec3::new(0.0, -1.0, -0.5);
        let cascade = fit_cascade(&camera, 1.0, 15.0, sun, &ShadowSettings::default()).unwrap();

        let center = Aabb::from_points(
            build_frustum(&camera).slice_corners(camera.position(), 1.0, 15.0),
        )
        .center();
        let toward_sun = cascade.view_proj.project_point3(center - sun.normalize() * 5.0);
        let away_from_sun = cascade.view_proj.project_point3(center + sun.normalize() * 5.0);

        // Closer to the light means a larger depth value.
        assert!(toward_sun.z > away_from_sun.z);
    }

    #[test]
    fn straight_down_sun_does_not_produce_nan() {
        let camera = camera_looking_down_neg_z();
        let view_proj = compute_cascade(&camera, 0.001, 15.0, Vec3::new(0.0, -1.0, 0.0)).unwrap();

        assert!(view_proj.is_finite());
        assert!(!view_proj.is_nan());

        let basis = LightBasis::new(Vec3::NEG_Y).unwrap();
        assert!((basis.up.length() - 1.0).abs() < 1e-5);
        assert!((basis.right.length() - 1.0).abs() < 1e-5);
        assert!(basis.up.dot(basis.forward).abs() < 1e-5);
    }

    #[test]
    fn zero_sun_direction_is_an_error() {
        let camera = camera_looking_down_neg_z();
        assert_eq!(
            Err(ShadowError::ZeroSunDirection),
            compute_cascade(&camera, 0.1, 15.0, Vec3::ZERO)
        );
    }

    #[test]
    fn empty_slice_is_an_error() {
        let camera = camera_looking_down_neg_z();
        assert!(matches!(
            compute_cascade(&camera, 15.0, 15.0, Vec3::NEG_Y),
            Err(ShadowError::InvalidSlice { .. })
        ));
    }

    /// Position of `point` inside its shadow map texel, in `[0, 1)` on x and y.
    fn texel_fraction(cascade: &CascadeDescriptor, point: Vec3, resolution: u32) -> Vec2 {
        let clip = cascade.view_proj.project_point3(point);
        let texels = (clip.truncate() + Vec2::ONE) * 0.5 * resolution as f32;
        texels - texels.floor()
    }

    fn wrapped_distance(a: f32, b: f32) -> f32 {
        let d = (a - b).abs();
        d.min(1.0 - d)
    }

    #[test]
    fn static_point_keeps_its_texel_position_as_the_camera_moves() {
        let mut camera = camera_looking_down_neg_z();
        let settings = ShadowSettings::default();
        let sun = Vec3::new(0.3, -1.0, 0.2);
        let point = Vec3::new(0.7, 1.3, -4.1);

        for (near, far) in settings.splits.ranges().collect::<Vec<_>>() {
            let before = fit_cascade(&camera, near, far, sun, &settings).unwrap();
            let before = texel_fraction(&before, point, settings.resolution);

            for step in [0.003, 0.0071, 0.25] {
                camera.translate(Vec3::new(step, 0.0, step * 0.5));
                let after = fit_cascade(&camera, near, far, sun, &settings).unwrap();
                let after = texel_fraction(&after, point, settings.resolution);

                assert!(wrapped_distance(before.x, after.x) < 0.01, "{before} vs {after}");
                assert!(wrapped_distance(before.y, after.y) < 0.01, "{before} vs {after}");
            }
        }
    }

    #[test]
    fn snapped_cascade_still_covers_the_slice() {
        let camera = camera_looking_down_neg_z();
        let sun = Vec3::new(0.3, -1.0, 0.2);
        let settings = ShadowSettings {
            resolution: 64,
            ..Default::default()
        };

        let cascade = fit_cascade(&camera, 0.5, 15.0, sun, &settings).unwrap();
        for corner in build_frustum(&camera).slice_corners(camera.position(), 0.5, 15.0) {
            let clip = cascade.view_proj.project_point3(corner);
            assert!(clip.x >= -1.0 - 1e-4 && clip.x <= 1.0 + 1e-4, "{clip:?}");
            assert!(clip.y >= -1.0 - 1e-4 && clip.y <= 1.0 + 1e-4, "{clip:?}");
        }
    }

    #[test]
    fn snapped_extents_are_whole_texels() {
        let (min, max) = snap_to_texels(Vec2::new(0.37, -2.9), 10.0, 11);

        // One texel is exactly one unit.
        assert_eq!(Vec2::new(0.0, -3.0), min);
        assert_eq!(Vec2::new(11.0, 8.0), max);
    }
}
