//! PatchBuilder - turns tile heights into a skirted grid mesh.
//!
//! # Vertex layout
//!
//! ```text
//! [0, G*G)            grid, row-major
//! [G*G, G*G + G)      skirt under row 0
//! [G*G + G, G*G + 2G) skirt under row G-1
//! [G*G + 2G, +G)      skirt under column 0
//! [G*G + 3G, +G)      skirt under column G-1
//! ```
//!
//! Skirts hang below the grid edges so cracks between patches of different
//! levels are hidden. The index buffer depends only on `G` and is shared by
//! every patch.

use std::f64::consts::{FRAC_PI_2, PI};
use std::sync::Arc;

use glam::{DVec2, DVec3};

use super::lod::LodState;
use super::renderable::{Patch, PatchParams};
use crate::bounds::Aabb;
use crate::constants::{patch_index_count, patch_vertex_count, LEVEL_RANGE, SPHERE_ERROR_PADDING};
use crate::quadtree::{NodeId, NodeKey};
use crate::tile::{SurfaceScale, Tile};

/// Fraction of the cell extent skirts always hang, even on flat patches.
const MIN_SKIRT_FRACTION: f64 = 0.01;

/// Builds patches for one planet.
#[derive(Clone, Debug)]
pub struct PatchBuilder {
  grid_size: u32,
  surface: SurfaceScale,
  indices: Arc<[u32]>,
}

impl PatchBuilder {
  pub fn new(grid_size: u32, surface: SurfaceScale) -> Self {
    Self {
      grid_size,
      surface,
      indices: patch_indices(grid_size).into(),
    }
  }

  #[inline]
  pub fn grid_size(&self) -> u32 {
    self.grid_size
  }

  /// Shared triangle list.
  #[inline]
  pub fn indices(&self) -> &Arc<[u32]> {
    &self.indices
  }

  /// Build the patch for `key` from `tile`, owned by node `tile_owner`.
  ///
  /// Panics if `tile` does not cover `key` at a stride of at least one texel.
  #[tracing::instrument(skip_all, name = "patch::build")]
  pub fn build(&self, key: NodeKey, tile_owner: NodeId, tile: &Tile) -> Patch {
    let g = self.grid_size as usize;
    let Some((levels, rel_x, rel_y)) = key.relative_to(&tile.key) else {
      panic!("tile {} does not cover patch {}", tile.key, key);
    };
    let span = (tile.size - 1) >> levels;
    assert!(
      span >= self.grid_size - 1 && span % (self.grid_size - 1) == 0,
      "tile {} too coarse for patch {}",
      tile.key,
      key
    );
    let stride = span / (self.grid_size - 1);
    let corner_x = rel_x * span;
    let corner_y = rel_y * span;
    let sample = |i: usize, j: usize| tile.height(corner_x + i as u32 * stride, corner_y + j as u32 * stride);

    // Grid positions in planet space.
    let last = (g - 1) as f64;
    let mut directions = Vec::with_capacity(g * g);
    let mut world = Vec::with_capacity(g * g);
    let mut bounds = Aabb::EMPTY;
    let mut sum = DVec3::ZERO;
    for j in 0..g {
      for i in 0..g {
        let uv = key.face_point(DVec2::new(i as f64 / last, j as f64 / last));
        let direction = key.face.direction(uv);
        let position = self.surface.position(direction, sample(i, j));
        bounds.extend(position);
        sum += position;
        directions.push(direction);
        world.push(position);
      }
    }
    let center = sum / (g * g) as f64;
    let surface_normal = center.normalize();

    let distance = self.error_distance(key, &sample);
    let tile_radius = self.surface.radius / key.cells_per_side();
    let skirt_depth = distance.max(tile_radius * MIN_SKIRT_FRACTION);

    let normals = grid_normals(&world, &directions, g);

    // Grid, then skirts in the documented order.
    let mut positions = Vec::with_capacity(patch_vertex_count(self.grid_size));
    let mut vertex_normals = Vec::with_capacity(patch_vertex_count(self.grid_size));
    let edges = skirt_vertices(g);
    for index in (0..g * g).chain(edges) {
      let mut position = world[index];
      if positions.len() >= g * g {
        position -= directions[index] * skirt_depth;
      }
      positions.push((position - center).as_vec3());
      vertex_normals.push(normals[index].as_vec3());
    }

    // Texture placement inside the source tile.
    let face_position = key.face_origin();
    let uv_correction = 0.05 / (tile.size + 1) as f64;
    let texture_scale = (1.0 - uv_correction) / (1u64 << levels) as f64;
    let texture_offset = DVec2::new(rel_x as f64, rel_y as f64) * texture_scale + DVec2::splat(uv_correction);

    let scale_factor = (1.0 / ((face_position.x * face_position.x + 1.0) * (face_position.y * face_position.y + 1.0))).sqrt();
    let face_size = scale_factor * self.surface.radius * FRAC_PI_2;
    let texel_size = face_size / tile.key.cells_per_side() / tile.size as f64;

    Patch {
      key,
      tile_owner,
      tile_key: tile.key,
      center,
      positions: positions.into(),
      normals: vertex_normals.into(),
      bounds,
      surface_normal,
      distance,
      child_distance: 0.0,
      scale_factor,
      texel_size,
      tile_radius,
      params: PatchParams {
        face: key.face,
        face_scale: key.face_scale(),
        face_position,
        texture_scale,
        texture_offset,
        radius: self.surface.radius,
        height: self.surface.height,
        distance,
      },
      material: tile.material,
      state: LodState::default(),
    }
  }

  /// Geometric error in world units.
  ///
  /// Largest deviation of a grid sample from the midpoint of its two
  /// neighbors two steps apart (along u, along v and diagonally), plus the
  /// error of approximating the curved cell with a flat grid.
  fn error_distance(&self, key: NodeKey, sample: &impl Fn(usize, usize) -> f32) -> f64 {
    let g = self.grid_size as usize;
    let h = |i: usize, j: usize| sample(i, j) as f64;
    let deviation = |a: f64, b: f64, mid: f64| ((a + b) * 0.5 - mid).abs();

    let mut diff = 0.0f64;
    for j in (0..g - 1).step_by(2) {
      for i in (0..g - 1).step_by(2) {
        diff = diff
          .max(deviation(h(i, j), h(i + 2, j), h(i + 1, j)))
          .max(deviation(h(i, j + 2), h(i + 2, j + 2), h(i + 1, j + 2)))
          .max(deviation(h(i, j), h(i, j + 2), h(i, j + 1)))
          .max(deviation(h(i + 2, j), h(i + 2, j + 2), h(i + 2, j + 1)))
          .max(deviation(h(i + 2, j), h(i, j + 2), h(i + 1, j + 1)));
      }
    }
    let diff = diff / LEVEL_RANGE;

    let angle = PI / (self.grid_size as u64 * (1u64 << key.lod.saturating_sub(1))) as f64;
    let sphere_error = (1.0 - angle.cos()) * SPHERE_ERROR_PADDING * self.surface.radius;
    if self.surface.height > 0.0 {
      (diff + sphere_error / self.surface.height) * self.surface.height
    } else {
      sphere_error
    }
  }
}

/// Grid vertex each skirt vertex hangs from, in buffer order.
fn skirt_vertices(g: usize) -> impl Iterator<Item = usize> {
  let rows = [0, g - 1]
    .into_iter()
    .flat_map(move |j| (0..g).map(move |i| j * g + i));
  let columns = [0, g - 1]
    .into_iter()
    .flat_map(move |i| (0..g).map(move |j| j * g + i));
  rows.chain(columns)
}

/// Outward vertex normals from grid differences (one-sided at the rim).
fn grid_normals(world: &[DVec3], directions: &[DVec3], g: usize) -> Vec<DVec3> {
  let at = |i: usize, j: usize| world[j * g + i];
  let mut normals = Vec::with_capacity(g * g);
  for j in 0..g {
    for i in 0..g {
      let du = at((i + 1).min(g - 1), j) - at(i.saturating_sub(1), j);
      let dv = at(i, (j + 1).min(g - 1)) - at(i, j.saturating_sub(1));
      let direction = directions[j * g + i];
      let n = du.cross(dv).normalize_or_zero();
      normals.push(if n == DVec3::ZERO {
        direction
      } else if n.dot(direction) < 0.0 {
        -n
      } else {
        n
      });
    }
  }
  normals
}

/// Triangle list for a `g x g` grid with four skirts.
pub fn patch_indices(grid_size: u32) -> Vec<u32> {
  let g = grid_size;
  let mut indices = Vec::with_capacity(patch_index_count(grid_size));

  for j in 0..g - 1 {
    for i in 0..g - 1 {
      let index = j * g + i;
      indices.extend_from_slice(&[index, index + g, index + 1, index + g, index + g + 1, index + 1]);
    }
  }

  // Skirt under row 0.
  let skirt = g * g;
  for i in 0..g - 1 {
    let (index, s) = (i, skirt + i);
    indices.extend_from_slice(&[index, index + 1, s, s, index + 1, s + 1]);
  }
  // Skirt under row g-1.
  let skirt = g * (g + 1);
  for i in 0..g - 1 {
    let (index, s) = (g * (g - 1) + i, skirt + i);
    indices.extend_from_slice(&[index, s, index + 1, s, s + 1, index + 1]);
  }
  // Skirt under column 0.
  let skirt = g * (g + 2);
  for j in 0..g - 1 {
    let (index, s) = (j * g, skirt + j);
    indices.extend_from_slice(&[index, s, index + g, s, s + 1, index + g]);
  }
  // Skirt under column g-1.
  let skirt = g * (g + 3);
  for j in 0..g - 1 {
    let (index, s) = (j * g + g - 1, skirt + j);
    indices.extend_from_slice(&[index, index + g, s, s, index + g, s + 1]);
  }

  indices
}

#[cfg(test)]
#[path = "builder_test.rs"]
mod builder_test;
