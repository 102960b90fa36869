//! View-dependent LOD judgment of a patch.
//!
//! A [`FrameOfReference`] is derived once per frame from the viewpoint;
//! [`Patch::evaluate`] turns it into a fresh [`LodState`] for one patch.

use glam::DVec3;

use super::renderable::Patch;
use crate::frustum::Frustum;

/// Per-frame LOD parameters in planet-local space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameOfReference {
  /// Camera position.
  pub camera: DVec3,
  /// Unit direction from the planet center to the camera.
  pub camera_plane: DVec3,
  pub frustum: Frustum,
  /// Cosine of the largest angle from `camera_plane` at which terrain can
  /// still rise above the horizon; -1 disables horizon culling.
  pub sphere_clip: f64,
  /// Squared ratio converting geometric error into view distance.
  pub geo_factor_sq: f64,
  /// Screen pixels per texel budget, as a distance ratio.
  pub texel_factor: f64,
}

impl FrameOfReference {
  pub fn new(
    camera: DVec3,
    frustum: Frustum,
    radius: f64,
    height: f64,
    pixel_factor: f64,
    texel_factor: f64,
  ) -> Self {
    Self {
      camera,
      camera_plane: camera.normalize_or_zero(),
      frustum,
      sphere_clip: sphere_clip(radius, height, camera.length()),
      geo_factor_sq: pixel_factor * pixel_factor,
      texel_factor,
    }
  }
}

/// Horizon clip cosine for a camera `distance` from the planet center.
///
/// Terrain at most `height` above `radius` is visible up to the angle where
/// the camera's horizon ray grazes the sea-level sphere plus the angle at
/// which the highest peak pokes above it.
pub fn sphere_clip(radius: f64, height: f64, distance: f64) -> f64 {
  if distance <= radius {
    return -1.0;
  }
  let peak = (radius / (radius + height)).acos();
  let horizon = (radius / distance).acos();
  (peak + horizon).cos()
}

/// Ratio of view distance to geometric error for a `geo_detail` pixel
/// budget on a screen `screen_height` pixels tall.
#[inline]
pub fn pixel_factor(screen_height: u32, geo_detail: f64, fov_y: f64) -> f64 {
  screen_height as f64 / (2.0 * geo_detail * fov_y.tan())
}

/// Visibility and detail judgment of one patch for the current frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LodState {
  /// Outside the frustum or beyond the horizon.
  pub clipped: bool,
  /// Beyond the horizon.
  pub far_away: bool,
  /// Geometric error projects within the pixel budget.
  pub in_lod_range: bool,
  /// Texels project within the pixel budget.
  pub in_mip_range: bool,
}

impl Patch {
  /// Judge this patch against the frame and cache the result.
  pub fn evaluate(&mut self, frame: &FrameOfReference) -> LodState {
    let mut state = LodState {
      clipped: !frame.frustum.intersects_aabb(&self.bounds),
      ..LodState::default()
    };

    let mut offset = frame.camera - self.center;
    let view_direction = offset.normalize_or_zero();

    // Grid point closest to the camera, roughly.
    let mut reference = 0.5 * (offset - self.surface_normal.dot(offset) * self.surface_normal);
    if reference.length() > self.tile_radius {
      reference = reference.normalize_or_zero() * self.tile_radius;
    }

    let reference_direction = (self.center + reference).normalize_or_zero();
    state.far_away = frame.camera_plane.dot(reference_direction) < frame.sphere_clip;
    state.clipped |= state.far_away;

    offset += reference;
    let distance_sq = offset.length_squared();
    let distance = distance_sq.sqrt();

    // Grazing views shorten the projected error; pad by the cell span since
    // the grid curves away from its centroid normal.
    let span = if distance > 0.0 {
      self.tile_radius / distance
    } else {
      f64::INFINITY
    };
    let shorten = (self.surface_normal.cross(view_direction).length() + span).min(1.0);

    let error = self.lod_distance();
    state.in_lod_range = distance_sq > error * error * frame.geo_factor_sq * shorten * shorten;
    state.in_mip_range = self.texel_size * frame.texel_factor < distance;

    self.state = state;
    state
  }
}
