//! NodeKey - immutable value type identifying one quadtree cell.
//!
//! Cells are identified by face, level and grid coordinates at that level.
//! Level 0 = the whole face, higher level = finer detail.

use glam::{DVec2, DVec3};

use crate::face::Face;

/// Quadtree cell identity - immutable value type.
///
/// Grid coordinates are at the cell's own level, so a level-`l` face has
/// `2^l x 2^l` cells.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct NodeKey {
  /// Cube face this cell lies on
  pub face: Face,
  /// Level of detail (0 = whole face, higher = finer)
  pub lod: u32,
  /// Grid X position at this level
  pub x: u32,
  /// Grid Y position at this level
  pub y: u32,
}

impl NodeKey {
  /// Create a new key at the given position and level.
  pub fn new(face: Face, lod: u32, x: u32, y: u32) -> Self {
    debug_assert!(
      (x as u64) < (1u64 << lod) && (y as u64) < (1u64 << lod),
      "coordinates out of range for level"
    );
    Self { face, lod, x, y }
  }

  /// Key of a face root.
  pub fn root(face: Face) -> Self {
    Self {
      face,
      lod: 0,
      x: 0,
      y: 0,
    }
  }

  /// Get child key (finer detail: level + 1).
  ///
  /// Slot: 0-3 where bits represent +X, +Y offsets:
  /// - bit 0: X offset (0 or 1)
  /// - bit 1: Y offset (0 or 1)
  pub fn child(&self, slot: usize) -> Self {
    debug_assert!(slot < 4, "quadtree slot out of range");
    Self {
      face: self.face,
      lod: self.lod + 1,
      x: self.x * 2 + (slot & 1) as u32,
      y: self.y * 2 + ((slot >> 1) & 1) as u32,
    }
  }

  /// Get parent key (coarser: level - 1).
  ///
  /// Returns None for a face root.
  pub fn parent(&self) -> Option<Self> {
    if self.lod == 0 {
      return None;
    }
    Some(Self {
      face: self.face,
      lod: self.lod - 1,
      x: self.x / 2,
      y: self.y / 2,
    })
  }

  /// Slot this key occupies in its parent (0 for roots).
  #[inline]
  pub fn slot(&self) -> usize {
    ((self.x & 1) | ((self.y & 1) << 1)) as usize
  }

  /// Cells per face side at this level.
  #[inline]
  pub fn cells_per_side(&self) -> f64 {
    (1u64 << self.lod) as f64
  }

  /// Width of this cell in face coordinates (`[-1, 1]` spans the face).
  #[inline]
  pub fn face_scale(&self) -> f64 {
    2.0 / self.cells_per_side()
  }

  /// Face coordinates of the cell's minimum corner.
  #[inline]
  pub fn face_origin(&self) -> DVec2 {
    let scale = self.face_scale();
    DVec2::new(-1.0 + scale * self.x as f64, -1.0 + scale * self.y as f64)
  }

  /// Face coordinates at fractional position `t` inside the cell.
  #[inline]
  pub fn face_point(&self, t: DVec2) -> DVec2 {
    self.face_origin() + t * self.face_scale()
  }

  /// Unit sphere direction through the cell center.
  #[inline]
  pub fn center_direction(&self) -> DVec3 {
    self.face.direction(self.face_point(DVec2::splat(0.5)))
  }

  /// True if `self` is `other` or one of its ancestors.
  pub fn contains(&self, other: &NodeKey) -> bool {
    if self.face != other.face || self.lod > other.lod {
      return false;
    }
    let shift = other.lod - self.lod;
    (other.x >> shift) == self.x && (other.y >> shift) == self.y
  }

  /// Position of `self` inside an ancestor's cell.
  ///
  /// Returns `(levels, x, y)` where `x, y` are grid coordinates relative to
  /// the ancestor's corner at `self`'s level, or None if `ancestor` does not
  /// contain `self`.
  pub fn relative_to(&self, ancestor: &NodeKey) -> Option<(u32, u32, u32)> {
    if !ancestor.contains(self) {
      return None;
    }
    let levels = self.lod - ancestor.lod;
    Some((
      levels,
      self.x - (ancestor.x << levels),
      self.y - (ancestor.y << levels),
    ))
  }
}

impl std::fmt::Display for NodeKey {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{:?}/{}/{},{}", self.face, self.lod, self.x, self.y)
  }
}

#[cfg(test)]
#[path = "key_test.rs"]
mod key_test;
