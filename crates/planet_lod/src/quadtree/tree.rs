//! QuadTree - slotmap arena holding the six face quadtrees of one planet.
//!
//! Besides parent/child links the tree maintains the *open set*: split nodes
//! whose children are all leaves. Those are the only nodes that can merge,
//! so pruning never has to walk the whole tree.

use std::collections::HashSet;

use glam::DVec3;
use slotmap::SlotMap;
use smallvec::SmallVec;

use super::{NodeId, NodeKey, QuadTreeNode};
use crate::constants::{CHILD_COUNT, FACE_COUNT};
use crate::face::Face;
use crate::patch::Patch;

/// Six face quadtrees in one node arena.
#[derive(Debug)]
pub struct QuadTree {
  nodes: SlotMap<NodeId, QuadTreeNode>,
  roots: [NodeId; FACE_COUNT],
  open: HashSet<NodeId>,
}

impl QuadTree {
  /// Create the six face roots.
  pub fn new(frame: u64) -> Self {
    let mut nodes = SlotMap::with_key();
    let roots = Face::ALL.map(|face| nodes.insert(QuadTreeNode::new(NodeKey::root(face), None, frame)));
    Self {
      nodes,
      roots,
      open: HashSet::new(),
    }
  }

  #[inline]
  pub fn roots(&self) -> &[NodeId; FACE_COUNT] {
    &self.roots
  }

  #[inline]
  pub fn root(&self, face: Face) -> NodeId {
    self.roots[face.index()]
  }

  /// Number of live nodes.
  #[inline]
  pub fn len(&self) -> usize {
    self.nodes.len()
  }

  /// Always false: the six roots live as long as the tree.
  #[inline]
  pub fn is_empty(&self) -> bool {
    self.nodes.is_empty()
  }

  #[inline]
  pub fn contains(&self, id: NodeId) -> bool {
    self.nodes.contains_key(id)
  }

  #[inline]
  pub fn get(&self, id: NodeId) -> Option<&QuadTreeNode> {
    self.nodes.get(id)
  }

  #[inline]
  pub fn get_mut(&mut self, id: NodeId) -> Option<&mut QuadTreeNode> {
    self.nodes.get_mut(id)
  }

  /// Node by handle. Panics on a stale handle.
  #[inline]
  pub fn node(&self, id: NodeId) -> &QuadTreeNode {
    match self.nodes.get(id) {
      Some(node) => node,
      None => panic!("stale node handle {:?}", id),
    }
  }

  /// Mutable node by handle. Panics on a stale handle.
  #[inline]
  pub fn node_mut(&mut self, id: NodeId) -> &mut QuadTreeNode {
    match self.nodes.get_mut(id) {
      Some(node) => node,
      None => panic!("stale node handle {:?}", id),
    }
  }

  pub fn iter(&self) -> impl Iterator<Item = (NodeId, &QuadTreeNode)> {
    self.nodes.iter()
  }

  pub fn iter_mut(&mut self) -> impl Iterator<Item = (NodeId, &mut QuadTreeNode)> {
    self.nodes.iter_mut()
  }

  /// Split nodes whose children are all leaves.
  pub fn open_nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
    self.open.iter().copied()
  }

  #[inline]
  pub fn open_len(&self) -> usize {
    self.open.len()
  }

  #[inline]
  pub fn is_open(&self, id: NodeId) -> bool {
    self.open.contains(&id)
  }

  /// Ancestors of `id`, nearest first.
  pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
    std::iter::successors(self.node(id).parent, move |&p| self.node(p).parent)
  }

  /// Create the four children of a leaf.
  ///
  /// Panics if `id` is already split.
  pub fn split(&mut self, id: NodeId, frame: u64) -> [NodeId; CHILD_COUNT] {
    let node = self.node_mut(id);
    assert!(!node.is_split(), "splitting node {} twice", node.key);
    node.last_opened = frame;
    let key = node.key;
    let parent = node.parent;

    let children = [0, 1, 2, 3].map(|slot| self.nodes.insert(QuadTreeNode::new(key.child(slot), Some(id), frame)));
    self.node_mut(id).children = Some(children);

    self.open.insert(id);
    if let Some(parent) = parent {
      self.open.remove(&parent);
    }
    children
  }

  /// Remove the four children of a split node and return them.
  ///
  /// Panics if `id` is a leaf or any child is split. The caller frees the
  /// children's patches, tiles and requests first.
  pub fn merge(&mut self, id: NodeId) -> SmallVec<[QuadTreeNode; CHILD_COUNT]> {
    let node = self.node(id);
    let Some(children) = node.children else {
      panic!("merging leaf node {}", node.key);
    };
    for child in children {
      let child = self.node(child);
      assert!(
        !child.is_split(),
        "merging node {} while child {} is split",
        node.key,
        child.key
      );
    }
    let parent = node.parent;

    let removed = children
      .iter()
      .filter_map(|&child| self.nodes.remove(child))
      .collect();
    self.node_mut(id).children = None;
    self.open.remove(&id);

    if let Some(parent) = parent {
      if self.children_are_leaves(parent) {
        self.open.insert(parent);
      }
    }
    removed
  }

  /// True if `id` is split and none of its children is.
  pub fn children_are_leaves(&self, id: NodeId) -> bool {
    match self.node(id).children {
      Some(children) => children.iter().all(|&child| !self.node(child).is_split()),
      None => false,
    }
  }

  /// Node whose tile `id` should build its patch from: `id` itself or the
  /// nearest ancestor at most `reuse_limit` levels up that has a tile.
  pub fn tile_source(&self, id: NodeId, reuse_limit: u32) -> Option<NodeId> {
    let lod = self.node(id).key.lod;
    std::iter::once(id)
      .chain(self.ancestors(id))
      .take_while(|&a| lod - self.node(a).key.lod <= reuse_limit)
      .find(|&a| self.node(a).has_tile())
  }

  /// Attach a patch, taking a reference on the tile it samples.
  ///
  /// Panics if the node already has a patch or the tile owner has no tile.
  pub fn attach_patch(&mut self, id: NodeId, patch: Patch) {
    assert!(
      self.node(id).patch.is_none(),
      "node {} already has a patch",
      self.node(id).key
    );
    let owner = self.node_mut(patch.tile_owner);
    match owner.tile.as_mut() {
      Some(tile) => tile.retain(),
      None => panic!("patch for {} built from missing tile of {}", patch.key, owner.key),
    }
    let node = self.node_mut(id);
    node.cached_bounds = Some(patch.bounds);
    node.patch = Some(patch);
  }

  /// Detach a node's patch, releasing its tile reference.
  pub fn detach_patch(&mut self, id: NodeId) -> Option<Patch> {
    let patch = self.node_mut(id).patch.take()?;
    if let Some(tile) = self.nodes.get_mut(patch.tile_owner).and_then(|owner| owner.tile.as_mut()) {
      tile.release();
    }
    Some(patch)
  }

  /// Recompute nested LOD distances for `id` and every ancestor.
  ///
  /// A patch's child distance is the largest effective distance among the
  /// nearest descendants with patches, each padded by its centroid offset,
  /// so a parent never switches to its children before they would switch
  /// back.
  pub fn propagate_lod_distances(&mut self, id: NodeId) {
    let chain: SmallVec<[NodeId; 16]> = std::iter::once(id).chain(self.ancestors(id)).collect();
    for node in chain {
      let Some(center) = self.node(node).patch.as_ref().map(|p| p.center) else {
        continue;
      };
      let child_distance = self.descendant_distance(node, center);
      if let Some(patch) = self.node_mut(node).patch.as_mut() {
        patch.child_distance = child_distance;
      }
    }
  }

  fn descendant_distance(&self, id: NodeId, center: DVec3) -> f64 {
    let Some(children) = self.node(id).children else {
      return 0.0;
    };
    children
      .iter()
      .map(|&child| match self.node(child).patch.as_ref() {
        Some(patch) => patch.lod_distance() + (patch.center - center).length(),
        None => self.descendant_distance(child, center),
      })
      .fold(0.0, f64::max)
  }
}

#[cfg(test)]
#[path = "tree_test.rs"]
mod tree_test;
