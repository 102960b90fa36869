//! QuadTreeNode - one cell of one cube face.

use super::{NodeId, NodeKey};
use crate::bounds::Aabb;
use crate::patch::Patch;
use crate::scheduler::RequestFlags;
use crate::tile::Tile;

/// Arena-allocated quadtree cell.
///
/// Links are [`NodeId`] handles into the owning [`QuadTree`](super::QuadTree);
/// a node is split exactly when `children` is `Some`, so it always has zero
/// or four children.
#[derive(Debug)]
pub struct QuadTreeNode {
  pub key: NodeKey,
  pub parent: Option<NodeId>,
  pub children: Option<[NodeId; 4]>,
  /// Tile synthesized for this node.
  pub tile: Option<Tile>,
  /// Patch rendering this node.
  pub patch: Option<Patch>,
  /// Pending request kinds.
  pub requests: RequestFlags,
  /// The node's tile was evicted.
  pub paged_out: bool,
  /// Frame traversal last wanted to descend into this node.
  pub last_opened: u64,
  /// Frame traversal last asked for this node's patch or tile. Patch and
  /// tile requests older than this frame are dropped.
  pub last_requested: u64,
  /// Frame this node's patch was last drawn.
  pub last_rendered: u64,
  /// Bounds of the most recent patch, kept after it is destroyed so
  /// traversal can skip clipped nodes without rebuilding them.
  pub cached_bounds: Option<Aabb>,
}

impl QuadTreeNode {
  pub fn new(key: NodeKey, parent: Option<NodeId>, frame: u64) -> Self {
    Self {
      key,
      parent,
      children: None,
      tile: None,
      patch: None,
      requests: RequestFlags::EMPTY,
      paged_out: false,
      last_opened: frame,
      last_requested: frame,
      last_rendered: frame,
      cached_bounds: None,
    }
  }

  #[inline]
  pub fn is_split(&self) -> bool {
    self.children.is_some()
  }

  #[inline]
  pub fn has_patch(&self) -> bool {
    self.patch.is_some()
  }

  #[inline]
  pub fn has_tile(&self) -> bool {
    self.tile.is_some()
  }

  /// Attach a freshly synthesized tile.
  pub fn attach_tile(&mut self, tile: Tile) {
    assert!(self.tile.is_none(), "node {} already has a tile", self.key);
    assert_eq!(tile.key, self.key, "tile {} attached to node {}", tile.key, self.key);
    self.tile = Some(tile);
    self.paged_out = false;
  }
}
