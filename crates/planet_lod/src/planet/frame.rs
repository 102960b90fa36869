//! Viewpoint and its conversion into planet-local LOD parameters.

use glam::{DAffine3, DMat4, DVec3};

use crate::config::{PlanetConfig, PlanetDescriptor};
use crate::frustum::Frustum;
use crate::patch::{pixel_factor, FrameOfReference};

/// Camera the planet is rendered for, in world space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewpoint {
  /// Camera position.
  pub position: DVec3,
  /// World to clip space.
  pub view_projection: DMat4,
  /// Vertical field of view in radians.
  pub fov_y: f64,
}

impl Viewpoint {
  /// Right-handed perspective camera at `eye` looking at `target`.
  pub fn look_at(eye: DVec3, target: DVec3, up: DVec3, fov_y: f64, aspect: f64, near: f64, far: f64) -> Self {
    let view = DMat4::look_at_rh(eye, target, up);
    let projection = DMat4::perspective_rh(fov_y, aspect, near, far);
    Self {
      position: eye,
      view_projection: projection * view,
      fov_y,
    }
  }

  /// LOD parameters for a planet placed at `transform`.
  ///
  /// The frustum and camera are moved into planet space, so patches never
  /// need transforming during traversal.
  pub fn frame_of_reference(
    &self,
    transform: &DAffine3,
    descriptor: &PlanetDescriptor,
    config: &PlanetConfig,
  ) -> FrameOfReference {
    let camera = transform.inverse().transform_point3(self.position);
    let frustum = Frustum::from_view_projection(self.view_projection * DMat4::from(*transform));
    FrameOfReference::new(
      camera,
      frustum,
      descriptor.radius,
      descriptor.height,
      pixel_factor(config.screen_height, config.geo_detail, self.fov_y),
      pixel_factor(config.screen_height, config.tex_detail, self.fov_y),
    )
  }
}

#[cfg(test)]
mod tests {
  use approx::assert_relative_eq;

  use super::*;

  fn viewpoint() -> Viewpoint {
    Viewpoint::look_at(DVec3::new(0.0, 0.0, 500.0), DVec3::ZERO, DVec3::Y, 0.8, 4.0 / 3.0, 0.1, 5000.0)
  }

  #[test]
  fn test_camera_moves_into_planet_space() {
    let transform = DAffine3::from_translation(DVec3::new(0.0, 0.0, 100.0));
    let frame = viewpoint().frame_of_reference(&transform, &PlanetDescriptor::default(), &PlanetConfig::default());
    assert_relative_eq!(frame.camera.z, 400.0, epsilon = 1e-9);
    assert_relative_eq!(frame.camera_plane.z, 1.0, epsilon = 1e-12);
    // Planet center is straight ahead.
    assert!(frame.frustum.contains_point(DVec3::ZERO));
    assert!(!frame.frustum.contains_point(DVec3::new(0.0, 0.0, 450.0)), "behind the camera");
  }

  #[test]
  fn test_scaled_planet_shrinks_camera_distance() {
    let transform = DAffine3::from_scale(DVec3::splat(2.0));
    let frame = viewpoint().frame_of_reference(&transform, &PlanetDescriptor::default(), &PlanetConfig::default());
    assert_relative_eq!(frame.camera.length(), 250.0, epsilon = 1e-9);
  }

  /// Finer pixel budgets push both thresholds out.
  #[test]
  fn test_detail_scales_thresholds() {
    let descriptor = PlanetDescriptor::default();
    let coarse = viewpoint().frame_of_reference(&DAffine3::IDENTITY, &descriptor, &PlanetConfig::default());
    let fine = viewpoint().frame_of_reference(
      &DAffine3::IDENTITY,
      &descriptor,
      &PlanetConfig {
        geo_detail: 3.0,
        tex_detail: 0.5,
        ..PlanetConfig::default()
      },
    );
    assert_relative_eq!(fine.geo_factor_sq, coarse.geo_factor_sq * 4.0, max_relative = 1e-12);
    assert_relative_eq!(fine.texel_factor, coarse.texel_factor * 2.0, max_relative = 1e-12);
  }
}
