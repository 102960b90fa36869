//! TileView - the viewpoint a tile is synthesized from.
//!
//! Binds a quadtree cell to a texel grid: every texel, border included, gets
//! the unit sphere direction it samples. Border texels past a cube edge are
//! routed through the seam table.

use glam::{DVec2, DVec3};

use super::edge_fixup::SeamTable;
use crate::quadtree::NodeKey;

/// Texel directions for one tile, border included, row-major.
#[derive(Clone, Debug)]
pub struct TileView {
  /// Cell the tile covers.
  pub key: NodeKey,
  /// Interior texels per side.
  pub size: u32,
  /// Border texels on each side.
  pub border: u32,
  directions: Vec<DVec3>,
}

impl TileView {
  pub fn new(key: NodeKey, size: u32, border: u32, seams: &SeamTable) -> Self {
    debug_assert!(size >= 2, "tile needs at least two texels per side");
    let full = (size + 2 * border) as usize;
    let mut directions = Vec::with_capacity(full * full);
    for row in 0..full {
      for col in 0..full {
        let uv = texel_uv(key, size, col as i64 - border as i64, row as i64 - border as i64);
        directions.push(seams.direction(key.face, uv));
      }
    }
    Self {
      key,
      size,
      border,
      directions,
    }
  }

  /// Texels per side including both borders.
  #[inline]
  pub fn full_size(&self) -> u32 {
    self.size + 2 * self.border
  }

  /// Direction of a texel, indexed on the full (bordered) grid.
  #[inline]
  pub fn direction(&self, col: usize, row: usize) -> DVec3 {
    self.directions[row * self.full_size() as usize + col]
  }

  /// All texel directions, row-major on the full grid.
  #[inline]
  pub fn directions(&self) -> &[DVec3] {
    &self.directions
  }

  /// Face coordinates of an interior-indexed texel (negative or `>= size`
  /// for border texels).
  #[inline]
  pub fn texel_uv(&self, i: i64, j: i64) -> DVec2 {
    texel_uv(self.key, self.size, i, j)
  }
}

/// Interior texel `i` lies at `origin + scale * i / (size - 1)`.
#[inline]
fn texel_uv(key: NodeKey, size: u32, i: i64, j: i64) -> DVec2 {
  let span = (size - 1) as f64;
  key.face_point(DVec2::new(i as f64 / span, j as f64 / span))
}
