//! Tile - synthesized surface data for one quadtree cell.

use crate::backend::{MaterialId, RenderBackend, TextureId};
use crate::constants::tile_memory_bytes;
use crate::quadtree::NodeKey;

/// Height and normal data for a node's footprint.
///
/// Reference counted by the patches built against it: one reference belongs
/// to the owning node's own patch, one more to every descendant patch that
/// borrows the tile. A tile with at most one reference can be evicted.
#[derive(Debug)]
pub struct Tile {
  /// Cell the tile was synthesized for.
  pub key: NodeKey,
  /// Interior texels per side.
  pub size: u32,
  /// Interior height samples, row-major, normalized to `[0, 1]`.
  pub heights: Vec<f32>,
  pub height_texture: TextureId,
  pub normal_texture: TextureId,
  pub material: MaterialId,
  refs: u32,
}

impl Tile {
  pub fn new(
    key: NodeKey,
    size: u32,
    heights: Vec<f32>,
    height_texture: TextureId,
    normal_texture: TextureId,
    material: MaterialId,
  ) -> Self {
    assert_eq!(
      heights.len(),
      (size * size) as usize,
      "tile {} height buffer has wrong size",
      key
    );
    Self {
      key,
      size,
      heights,
      height_texture,
      normal_texture,
      material,
      refs: 0,
    }
  }

  /// Height sample at interior texel `(col, row)`.
  #[inline]
  pub fn height(&self, col: u32, row: u32) -> f32 {
    self.heights[(row * self.size + col) as usize]
  }

  #[inline]
  pub fn refs(&self) -> u32 {
    self.refs
  }

  /// Add a patch reference.
  #[inline]
  pub fn retain(&mut self) {
    self.refs += 1;
  }

  /// Drop a patch reference.
  pub fn release(&mut self) {
    assert!(self.refs > 0, "tile {} released with no references", self.key);
    self.refs -= 1;
  }

  /// No patch besides the owner's own depends on this tile.
  #[inline]
  pub fn is_evictable(&self) -> bool {
    self.refs <= 1
  }

  /// Approximate GPU memory held by the tile textures.
  #[inline]
  pub fn memory_bytes(&self) -> u64 {
    tile_memory_bytes(self.size)
  }

  /// Free the backend resources. The tile must no longer be referenced.
  pub fn destroy(self, backend: &mut dyn RenderBackend) {
    assert_eq!(
      self.refs, 0,
      "tile {} destroyed while {} patches still use it",
      self.key, self.refs
    );
    backend.destroy_material(self.material);
    backend.destroy_texture(self.height_texture);
    backend.destroy_texture(self.normal_texture);
  }
}
