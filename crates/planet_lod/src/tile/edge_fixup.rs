//! Cube seam fix-up for tile borders.
//!
//! Border texels of a tile on the edge of a cube face fall outside that
//! face. Instead of extrapolating the face plane, they are folded around the
//! cube edge and resampled from the adjacent face, using a transform per
//! (face, edge) pair computed once up front. Two tiles that meet across a
//! seam therefore see exactly the same surface on both sides, which is what
//! keeps the normal filter continuous over the seam.

use glam::{DMat3, DVec2, DVec3};

use crate::constants::FACE_COUNT;
use crate::face::{Edge, Face};

/// Face-local to neighbor-local transforms for every face edge.
#[derive(Clone, Debug)]
pub struct SeamTable {
  transforms: [[DMat3; 4]; FACE_COUNT],
}

impl SeamTable {
  pub fn new() -> Self {
    let mut transforms = [[DMat3::IDENTITY; 4]; FACE_COUNT];
    for face in Face::ALL {
      for edge in Edge::ALL {
        let neighbor = face.neighbor(edge);
        transforms[face.index()][edge.index()] = neighbor.transform().transpose() * face.transform();
      }
    }
    Self { transforms }
  }

  /// Transform from `face`-local coordinates into the local frame of the
  /// face across `edge`.
  #[inline]
  pub fn transform(&self, face: Face, edge: Edge) -> DMat3 {
    self.transforms[face.index()][edge.index()]
  }

  /// Face and face coordinates for a possibly out-of-range `uv`.
  ///
  /// Points inside `[-1, 1]^2` are returned unchanged. Points past an edge
  /// are folded onto the neighbor face, preserving distance along the cube
  /// surface. Past a corner, the axis that overshoots most is folded and the
  /// other is clamped to the edge.
  pub fn resolve(&self, face: Face, uv: DVec2) -> (Face, DVec2) {
    let excess = uv.abs() - DVec2::ONE;
    if excess.x <= 0.0 && excess.y <= 0.0 {
      return (face, uv);
    }

    let (edge, folded) = if excess.x >= excess.y {
      let edge = if uv.x > 0.0 { Edge::Right } else { Edge::Left };
      (
        edge,
        DVec3::new(uv.x.signum(), uv.y.clamp(-1.0, 1.0), 1.0 - excess.x),
      )
    } else {
      let edge = if uv.y > 0.0 { Edge::Up } else { Edge::Down };
      (
        edge,
        DVec3::new(uv.x.clamp(-1.0, 1.0), uv.y.signum(), 1.0 - excess.y),
      )
    };

    let local = self.transform(face, edge) * folded;
    (face.neighbor(edge), DVec2::new(local.x, local.y) / local.z)
  }

  /// Unit sphere direction for a possibly out-of-range `uv`.
  #[inline]
  pub fn direction(&self, face: Face, uv: DVec2) -> DVec3 {
    let (face, uv) = self.resolve(face, uv);
    face.direction(uv)
  }
}

impl Default for SeamTable {
  fn default() -> Self {
    Self::new()
  }
}
