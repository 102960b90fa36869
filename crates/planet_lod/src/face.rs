//! Cube faces and their mapping onto the sphere.
//!
//! Each face owns a local frame in which the face is the plane `z = 1` and
//! face coordinates `(u, v)` span `[-1, 1]`. A face transform rotates that
//! frame into planet space; normalizing `(u, v, 1)` first projects the cube
//! onto the unit sphere.

use glam::{DMat3, DVec2, DVec3};

use crate::constants::FACE_COUNT;

/// One of the six cube faces.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Face {
  /// +X
  Right = 0,
  /// -X
  Left = 1,
  /// +Y
  Top = 2,
  /// -Y
  Bottom = 3,
  /// +Z
  Front = 4,
  /// -Z
  Back = 5,
}

/// Edge of a face, named by the face-local direction it lies in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Edge {
  /// -v
  Down = 0,
  /// +v
  Up = 1,
  /// +u
  Right = 2,
  /// -u
  Left = 3,
}

impl Edge {
  pub const ALL: [Edge; 4] = [Edge::Down, Edge::Up, Edge::Right, Edge::Left];

  /// Face-local outward direction of this edge.
  #[inline]
  pub fn direction(self) -> DVec2 {
    match self {
      Edge::Down => DVec2::NEG_Y,
      Edge::Up => DVec2::Y,
      Edge::Right => DVec2::X,
      Edge::Left => DVec2::NEG_X,
    }
  }

  #[inline]
  pub fn index(self) -> usize {
    self as usize
  }
}

/// Adjacent face across each edge, in `Edge` order (down, up, right, left).
const ADJACENT_FACES: [[Face; 4]; FACE_COUNT] = [
  // Right
  [Face::Top, Face::Bottom, Face::Back, Face::Front],
  // Left
  [Face::Top, Face::Bottom, Face::Front, Face::Back],
  // Top
  [Face::Back, Face::Front, Face::Right, Face::Left],
  // Bottom
  [Face::Front, Face::Back, Face::Right, Face::Left],
  // Front
  [Face::Top, Face::Bottom, Face::Right, Face::Left],
  // Back
  [Face::Top, Face::Bottom, Face::Left, Face::Right],
];

/// Build a matrix from its rows.
#[inline]
fn from_rows(r0: [f64; 3], r1: [f64; 3], r2: [f64; 3]) -> DMat3 {
  DMat3::from_cols(DVec3::from(r0), DVec3::from(r1), DVec3::from(r2)).transpose()
}

impl Face {
  pub const ALL: [Face; FACE_COUNT] = [
    Face::Right,
    Face::Left,
    Face::Top,
    Face::Bottom,
    Face::Front,
    Face::Back,
  ];

  #[inline]
  pub fn index(self) -> usize {
    self as usize
  }

  pub fn from_index(index: usize) -> Option<Self> {
    Self::ALL.get(index).copied()
  }

  /// Rotation from face-local space into planet space.
  ///
  /// The v axis runs top-down on the side faces, following cube-map texture
  /// conventions, so every transform maps `(0, 0, 1)` to the face normal.
  pub fn transform(self) -> DMat3 {
    match self {
      Face::Right => from_rows([0.0, 0.0, 1.0], [0.0, -1.0, 0.0], [-1.0, 0.0, 0.0]),
      Face::Left => from_rows([0.0, 0.0, -1.0], [0.0, -1.0, 0.0], [1.0, 0.0, 0.0]),
      Face::Top => from_rows([1.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 1.0, 0.0]),
      Face::Bottom => from_rows([1.0, 0.0, 0.0], [0.0, 0.0, -1.0], [0.0, -1.0, 0.0]),
      Face::Front => from_rows([1.0, 0.0, 0.0], [0.0, -1.0, 0.0], [0.0, 0.0, 1.0]),
      Face::Back => from_rows([-1.0, 0.0, 0.0], [0.0, -1.0, 0.0], [0.0, 0.0, -1.0]),
    }
  }

  /// Outward normal of the face in planet space.
  #[inline]
  pub fn normal(self) -> DVec3 {
    self.transform() * DVec3::Z
  }

  /// Face across the given edge.
  #[inline]
  pub fn neighbor(self, edge: Edge) -> Face {
    ADJACENT_FACES[self.index()][edge.index()]
  }

  /// Unit sphere direction for face coordinates `uv`.
  #[inline]
  pub fn direction(self, uv: DVec2) -> DVec3 {
    self.transform() * uv.extend(1.0).normalize()
  }

  /// Face whose normal is closest to `direction`, and the face coordinates
  /// where `direction` pierces it.
  pub fn project(direction: DVec3) -> (Face, DVec2) {
    let abs = direction.abs();
    let face = if abs.x >= abs.y && abs.x >= abs.z {
      if direction.x >= 0.0 {
        Face::Right
      } else {
        Face::Left
      }
    } else if abs.y >= abs.z {
      if direction.y >= 0.0 {
        Face::Top
      } else {
        Face::Bottom
      }
    } else if direction.z >= 0.0 {
      Face::Front
    } else {
      Face::Back
    };
    let local = face.transform().transpose() * direction;
    (face, DVec2::new(local.x, local.y) / local.z)
  }
}

#[cfg(test)]
#[path = "face_test.rs"]
mod face_test;
