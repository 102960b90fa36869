//! Recursive render traversal.
//!
//! Traversal never blocks on missing data. Each node decides from its
//! fresh [`LodState`](crate::patch::LodState) whether to draw itself, descend,
//! or ask the scheduler for what it lacks, and keeps drawing the coarser
//! patch until the finer one exists. Patch and tile requests are stamped
//! with the frame; the planet drops the ones no traversal renewed.
//!
//! ```text
//! no patch ............................ request patch      -> 0
//! clipped ............................. nothing            -> 1
//! at limit, or fine enough ............ draw               -> 1
//! texels too coarse, borrowed tile .... request own tile (or a patch
//!                                       from it once it exists)
//! geometry fine, borrowed tile ........ draw               -> 1
//! split, children ready ............... descend            -> 1 + min(children)
//! split, children missing ............. request, draw      -> 1
//! leaf ................................ request split, draw -> 1
//! ```

use super::{NodeId, QuadTree};
use crate::patch::FrameOfReference;
use crate::scheduler::{RequestKind, RequestScheduler};

/// One frame's walk over the six face trees.
pub struct Traversal<'a> {
  pub tree: &'a mut QuadTree,
  pub scheduler: &'a mut RequestScheduler,
  pub frame: &'a FrameOfReference,
  pub frame_number: u64,
  pub lod_limit: u32,
  pub split_freeze: bool,
  /// Nodes whose patches are drawn this frame, in traversal order.
  pub visible: Vec<NodeId>,
}

impl Traversal<'_> {
  /// Walk the subtree under `id`. Returns the depth of detail reached: 0 if
  /// `id` has nothing to show yet.
  pub fn render(&mut self, id: NodeId) -> u32 {
    let node = self.tree.node_mut(id);
    let Some(patch) = node.patch.as_mut() else {
      if node
        .cached_bounds
        .is_some_and(|bounds| !self.frame.frustum.intersects_aabb(&bounds))
      {
        return 1;
      }
      self.want(id, RequestKind::BuildRenderable, false);
      return 0;
    };

    let state = patch.evaluate(self.frame);
    if state.clipped {
      return 1;
    }

    let borrowed = patch.borrows_tile();
    let has_tile = node.has_tile();
    let children = node.children;
    if node.key.lod >= self.lod_limit || (state.in_lod_range && state.in_mip_range) {
      self.draw(id);
      return 1;
    }

    if borrowed && !state.in_mip_range {
      // Own tile landed but the patch was not rebuilt from it yet.
      let kind = if has_tile {
        RequestKind::BuildRenderable
      } else {
        RequestKind::BuildTile
      };
      self.want(id, kind, false);
    }
    if borrowed && state.in_lod_range {
      self.draw(id);
      return 1;
    }

    self.tree.node_mut(id).last_opened = self.frame_number;
    let Some(children) = children else {
      if !self.split_freeze {
        self.want(id, RequestKind::Split, false);
      }
      self.draw(id);
      return 1;
    };

    let mut ready = true;
    for child in children {
      let child_node = self.tree.node(child);
      if child_node.has_patch() {
        continue;
      }
      let culled = child_node
        .cached_bounds
        .is_some_and(|bounds| !self.frame.frustum.intersects_aabb(&bounds));
      if !culled {
        ready = false;
        self.want(child, RequestKind::BuildRenderable, true);
      }
    }

    if !ready {
      self.draw(id);
      return 1;
    }

    let depth = children
      .into_iter()
      .map(|child| self.render(child))
      .min()
      .unwrap_or(0);
    1 + depth
  }

  /// File a request and mark it as wanted this frame.
  fn want(&mut self, id: NodeId, kind: RequestKind, urgent: bool) {
    let node = self.tree.node_mut(id);
    node.last_requested = self.frame_number;
    self.scheduler.request(id, &mut node.requests, kind, urgent);
  }

  fn draw(&mut self, id: NodeId) {
    self.tree.node_mut(id).last_rendered = self.frame_number;
    self.visible.push(id);
  }
}
