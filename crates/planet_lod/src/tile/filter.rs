//! Normal filter pass.
//!
//! Normals come from central differences of the displaced surface positions,
//! not of raw heights, so curvature of the sphere is part of the result and
//! the filter needs nothing but the tile view and the height map. The outer
//! ring of the bordered grid has no neighbors; it gets the plain sphere
//! direction and is never read back.

use glam::DVec3;
use rayon::prelude::*;

use super::view::TileView;
use crate::constants::LEVEL_RANGE;

/// Maps a normalized height sample onto a distance from the planet center.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SurfaceScale {
  /// Sea-level radius.
  pub radius: f64,
  /// Height of a full-range sample above `radius`.
  pub height: f64,
}

impl SurfaceScale {
  pub fn new(radius: f64, height: f64) -> Self {
    Self { radius, height }
  }

  /// Distance from the planet center for a height sample.
  #[inline]
  pub fn elevate(&self, sample: f32) -> f64 {
    self.radius + sample as f64 * LEVEL_RANGE * self.height
  }

  /// Planet-space position of a sample along a unit direction.
  #[inline]
  pub fn position(&self, direction: DVec3, sample: f32) -> DVec3 {
    direction * self.elevate(sample)
  }
}

/// Derive unit outward normals from a bordered height grid.
///
/// `heights` holds one sample per texel of the full grid, `normals` three
/// interleaved channels per texel of the same grid.
#[tracing::instrument(skip_all, name = "tile::derive_normals")]
pub fn derive_normals(view: &TileView, heights: &[f32], surface: SurfaceScale, normals: &mut [f32]) {
  let full = view.full_size() as usize;
  assert_eq!(heights.len(), full * full, "height grid size mismatch");
  assert_eq!(normals.len(), full * full * 3, "normal grid size mismatch");

  let position = |col: usize, row: usize| surface.position(view.direction(col, row), heights[row * full + col]);

  normals
    .par_chunks_mut(full * 3)
    .enumerate()
    .for_each(|(row, out)| {
      for col in 0..full {
        let direction = view.direction(col, row);
        let normal = if row == 0 || col == 0 || row + 1 == full || col + 1 == full {
          direction
        } else {
          let du = position(col + 1, row) - position(col - 1, row);
          let dv = position(col, row + 1) - position(col, row - 1);
          let n = du.cross(dv).normalize_or_zero();
          if n == DVec3::ZERO {
            direction
          } else if n.dot(direction) < 0.0 {
            -n
          } else {
            n
          }
        };
        out[col * 3] = normal.x as f32;
        out[col * 3 + 1] = normal.y as f32;
        out[col * 3 + 2] = normal.z as f32;
      }
    });
}
