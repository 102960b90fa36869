//! Tile and grid layout constants for cube-sphere patches.
//!
//! # Tile Layout
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                     TILE TEXEL LAYOUT                        │
//! ├──────────────────────────────────────────────────────────────┤
//! │                                                              │
//! │  Texel index:  -1    0    1   ...   W-2   W-1    W           │
//! │                 │    │                     │     │           │
//! │                 │    └──── W interior ─────┘     │           │
//! │                 │     texels (face cell)         │           │
//! │                 └─ border                border ─┘           │
//! │                                                              │
//! ├──────────────────────────────────────────────────────────────┤
//! │  Interior texel i sits at face coordinate                    │
//! │      u = origin + cell_size * i / (W - 1)                    │
//! │  so the first and last interior texels lie exactly on the    │
//! │  cell edges and are shared with the neighboring tile.        │
//! │  Border texels exist only for the normal filter.             │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! A patch grid of G vertices samples the interior texels with stride
//! `(W - 1) / (G - 1)`. Descendant nodes reuse an ancestor tile by halving
//! the stride once per level, so at most `log2((W - 1) / (G - 1))` levels can
//! share one tile.

/// Number of cube faces.
pub const FACE_COUNT: usize = 6;

/// Number of children of a split quadtree node.
pub const CHILD_COUNT: usize = 4;

/// Default patch grid resolution (vertices per side).
pub const DEFAULT_GRID_SIZE: u32 = 17;

/// Default tile texture resolution (interior texels per side).
pub const DEFAULT_TEXTURE_SIZE: u32 = 257;

/// Border texels around every synthesized tile.
pub const MAP_BORDER: u32 = 1;

/// Height value the map buffer is cleared to before brushes are drawn.
pub const MAP_FILL: f32 = 0.5;

/// Height range covered by a normalized height sample.
pub const LEVEL_RANGE: f64 = 1.0;

/// Deepest quadtree level supported (grid coordinates fit in u32).
pub const MAX_LOD_LIMIT: u32 = 24;

/// Bytes per texel of a height or normal texture.
pub const TEXEL_BYTES: u64 = 8;

/// Brush noise intensity.
pub const BRUSH_NOISE_INTENSITY: f64 = 0.05;

/// Brush noise frequency scale.
pub const BRUSH_NOISE_SCALE: f64 = 0.25;

/// Curvature padding applied to the sphere error of a patch.
pub const SPHERE_ERROR_PADDING: f64 = 1.4;

/// Number of vertices in a patch grid including its four skirts.
#[inline]
pub const fn patch_vertex_count(grid_size: u32) -> usize {
  let g = grid_size as usize;
  g * g + 4 * g
}

/// Number of indices in a patch grid including its four skirts.
#[inline]
pub const fn patch_index_count(grid_size: u32) -> usize {
  let quads = grid_size as usize - 1;
  (quads * quads + 4 * quads) * 6
}

/// Deepest relative level at which a tile can still feed a patch grid.
///
/// Returns `log2((texture_size - 1) / (grid_size - 1))`.
#[inline]
pub const fn max_tile_reuse(grid_size: u32, texture_size: u32) -> u32 {
  let ratio = (texture_size - 1) / (grid_size - 1);
  if ratio == 0 {
    0
  } else {
    ratio.trailing_zeros()
  }
}

/// Approximate GPU memory of one tile (height and normal textures).
#[inline]
pub const fn tile_memory_bytes(texture_size: u32) -> u64 {
  let texels = texture_size as u64 * texture_size as u64;
  texels * TEXEL_BYTES * 2
}

#[cfg(test)]
#[path = "constants_test.rs"]
mod constants_test;
