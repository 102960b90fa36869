//! Requests and the per-node flags that deduplicate them.

use std::cmp::Ordering;

use crate::quadtree::NodeId;

/// Work a node can ask for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RequestKind {
  /// Build a patch from the node's own or an ancestor's tile.
  BuildRenderable,
  /// Synthesize a tile for the node.
  BuildTile,
  /// Create the four children.
  Split,
  /// Destroy the four children.
  Merge,
}

impl RequestKind {
  pub const ALL: [RequestKind; 4] = [
    RequestKind::BuildRenderable,
    RequestKind::BuildTile,
    RequestKind::Split,
    RequestKind::Merge,
  ];

  /// Flag bit marking a pending request of this kind.
  #[inline]
  pub fn flag(self) -> RequestFlags {
    RequestFlags(1 << self as u8)
  }

  /// Queue that services this kind.
  #[inline]
  pub fn queue(self) -> QueueKind {
    match self {
      RequestKind::BuildTile => QueueKind::Render,
      RequestKind::BuildRenderable | RequestKind::Split | RequestKind::Merge => QueueKind::Inline,
    }
  }
}

/// The two scheduler queues.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum QueueKind {
  /// Tile synthesis, one pipeline step per slot.
  Render,
  /// Patch builds, splits and merges.
  Inline,
}

/// Bit set of pending request kinds, stored on each node.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct RequestFlags(u8);

impl RequestFlags {
  pub const EMPTY: Self = Self(0);

  #[inline]
  pub fn contains(self, kind: RequestKind) -> bool {
    self.0 & kind.flag().0 != 0
  }

  #[inline]
  pub fn insert(&mut self, kind: RequestKind) {
    self.0 |= kind.flag().0;
  }

  #[inline]
  pub fn remove(&mut self, kind: RequestKind) {
    self.0 &= !kind.flag().0;
  }

  #[inline]
  pub fn is_empty(self) -> bool {
    self.0 == 0
  }

  #[inline]
  pub fn clear(&mut self) {
    self.0 = 0;
  }
}

/// One queued job.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Request {
  pub node: NodeId,
  pub kind: RequestKind,
  /// Promoted to the queue front this frame. Cleared by the next resort.
  pub urgent: bool,
}

/// Sort key of a request, recomputed on every resort.
///
/// Requests for nodes with nothing drawn on or above them first, then
/// urgent ones, then nearest to the camera, then coarsest.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PriorityKey {
  /// Neither the node nor any ancestor has a patch.
  pub uncovered: bool,
  pub urgent: bool,
  pub distance: f64,
  pub lod: u32,
}

impl PriorityKey {
  /// Key for requests whose node has vanished; sorts last.
  pub const STALE: Self = Self {
    uncovered: false,
    urgent: false,
    distance: f64::INFINITY,
    lod: u32::MAX,
  };

  pub fn compare(&self, other: &Self) -> Ordering {
    other
      .uncovered
      .cmp(&self.uncovered)
      .then_with(|| other.urgent.cmp(&self.urgent))
      .then_with(|| self.distance.total_cmp(&other.distance))
      .then_with(|| self.lod.cmp(&other.lod))
  }
}
