//! Six-plane view frustum for patch culling.
//!
//! Planes are extracted from a combined model-view-projection matrix
//! (Gribb/Hartmann) and normalized so signed distances are in world units.

use glam::{DMat4, DVec3, DVec4};

use crate::bounds::Aabb;

/// Plane `normal . p + d = 0`, with the inside on the positive side.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Plane {
  pub normal: DVec3,
  pub d: f64,
}

impl Plane {
  /// Build from `(a, b, c, d)` coefficients, normalizing the normal.
  pub fn from_coefficients(v: DVec4) -> Self {
    let normal = v.truncate();
    let length = normal.length();
    if length > 0.0 {
      Self {
        normal: normal / length,
        d: v.w / length,
      }
    } else {
      Self { normal, d: v.w }
    }
  }

  /// Signed distance from the plane, positive inside.
  #[inline]
  pub fn distance(&self, point: DVec3) -> f64 {
    self.normal.dot(point) + self.d
  }
}

/// Closed convex view volume.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Frustum {
  /// Left, right, bottom, top, near, far.
  pub planes: [Plane; 6],
}

impl Frustum {
  /// Frustum that contains everything.
  pub const UNBOUNDED: Self = Self {
    planes: [Plane {
      normal: DVec3::ZERO,
      d: 1.0,
    }; 6],
  };

  /// Extract the six planes from a model-view-projection matrix.
  ///
  /// Works for both `[-1, 1]` and `[0, 1]` clip depth; the near plane is
  /// taken as `w + z >= 0`, which is exact for the former and conservative
  /// for the latter.
  pub fn from_view_projection(m: DMat4) -> Self {
    let r0 = m.row(0);
    let r1 = m.row(1);
    let r2 = m.row(2);
    let r3 = m.row(3);
    Self {
      planes: [
        Plane::from_coefficients(r3 + r0),
        Plane::from_coefficients(r3 - r0),
        Plane::from_coefficients(r3 + r1),
        Plane::from_coefficients(r3 - r1),
        Plane::from_coefficients(r3 + r2),
        Plane::from_coefficients(r3 - r2),
      ],
    }
  }

  /// Check if a point is inside or on the boundary.
  pub fn contains_point(&self, point: DVec3) -> bool {
    self.planes.iter().all(|plane| plane.distance(point) >= 0.0)
  }

  /// Check if a sphere touches the volume.
  pub fn intersects_sphere(&self, center: DVec3, radius: f64) -> bool {
    self
      .planes
      .iter()
      .all(|plane| plane.distance(center) >= -radius)
  }

  /// Check if a box touches the volume.
  ///
  /// Conservative: a box straddling two planes outside a frustum corner is
  /// reported visible.
  pub fn intersects_aabb(&self, aabb: &Aabb) -> bool {
    self.planes.iter().all(|plane| {
      // Corner furthest along the plane normal.
      let positive = DVec3::select(plane.normal.cmpge(DVec3::ZERO), aabb.max, aabb.min);
      plane.distance(positive) >= 0.0
    })
  }
}

impl Default for Frustum {
  fn default() -> Self {
    Self::UNBOUNDED
  }
}

#[cfg(test)]
#[path = "frustum_test.rs"]
mod frustum_test;
