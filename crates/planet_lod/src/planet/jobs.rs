//! Scheduler jobs: tile synthesis, patch builds, splits, merges and paging.
//!
//! Jobs re-check their node before acting. A request whose node was merged
//! away, whose work is already done, or that this frame's traversal no
//! longer asked for counts as stale and costs nothing.

use std::cmp::Reverse;

use tracing::{debug, trace};

use super::Planet;
use crate::backend::RenderBackend;
use crate::quadtree::{NodeId, QuadTree};
use crate::scheduler::{QueueKind, Request, RequestKind};
use crate::tile::{SynthesisStage, Tile};

/// True when `request` no longer serves anything at `frame`.
pub(super) fn is_stale(tree: &QuadTree, frame: u64, request: &Request) -> bool {
  let Some(node) = tree.get(request.node) else {
    return true;
  };
  match request.kind {
    RequestKind::BuildTile => node.has_tile() || node.last_requested < frame,
    RequestKind::BuildRenderable => node.last_requested < frame,
    RequestKind::Split => node.is_split() || node.last_opened < frame,
    RequestKind::Merge => !tree.is_open(request.node),
  }
}

/// Order in which merge candidates are requested: least recently opened
/// first, deeper levels before shallower ones.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
struct PruneKey {
  last_opened: u64,
  lod: Reverse<u32>,
  face: usize,
  x: u32,
  y: u32,
}

impl Planet {
  /// Request merges for open nodes nobody has descended into lately.
  pub(super) fn prune(&mut self) {
    let mut candidates: Vec<(PruneKey, NodeId)> = self
      .tree
      .open_nodes()
      .filter(|&id| self.can_merge(id))
      .map(|id| {
        let node = self.tree.node(id);
        let key = PruneKey {
          last_opened: node.last_opened,
          lod: Reverse(node.key.lod),
          face: node.key.face.index(),
          x: node.key.x,
          y: node.key.y,
        };
        (key, id)
      })
      .collect();
    candidates.sort_unstable();

    for (_, id) in candidates {
      let node = self.tree.node_mut(id);
      self.scheduler.request(id, &mut node.requests, RequestKind::Merge, false);
    }
  }

  /// Open node with its own patch, stale, whose children's tiles are free.
  fn can_merge(&self, id: NodeId) -> bool {
    let node = self.tree.node(id);
    if !node.has_patch() || self.frame.saturating_sub(node.last_opened) <= self.config.staleness_frames {
      return false;
    }
    let Some(children) = node.children else {
      return false;
    };
    children.iter().all(|&child| {
      let child = self.tree.node(child);
      !child.is_split() && child.tile.as_ref().map_or(true, Tile::is_evictable)
    })
  }

  /// Evict cold leaf tiles while more than the cache limit are resident.
  pub(super) fn page_out(&mut self, backend: &mut dyn RenderBackend) {
    let resident = self.tree.iter().filter(|(_, node)| node.has_tile()).count();
    if resident <= self.config.max_tiles {
      return;
    }

    let mut candidates: Vec<(u64, NodeId)> = self
      .tree
      .iter()
      .filter(|(_, node)| {
        node.parent.is_some()
          && !node.is_split()
          && self.frame.saturating_sub(node.last_rendered) > self.config.page_frames
          && node.tile.as_ref().is_some_and(|tile| tile.is_evictable())
      })
      .map(|(id, node)| (node.last_rendered, id))
      .collect();
    candidates.sort_unstable_by_key(|&(last_rendered, _)| last_rendered);

    for (_, id) in candidates.into_iter().take(resident - self.config.max_tiles) {
      self.unrequest(backend, id);
      self.tree.detach_patch(id);
      self.tree.propagate_lod_distances(id);
      let node = self.tree.node_mut(id);
      let Some(tile) = node.tile.take() else {
        continue;
      };
      node.paged_out = true;
      debug!(node = %node.key, "page out");
      tile.destroy(backend);
    }
  }

  /// Step tile synthesis for the render queue head until the budget runs out.
  #[tracing::instrument(skip_all, name = "scheduler::render_queue")]
  pub(super) fn run_render_queue(&mut self, backend: &mut dyn RenderBackend) {
    while let Some(request) = self.scheduler.peek(QueueKind::Render) {
      let id = request.node;
      if is_stale(&self.tree, self.frame, &request) {
        if self.synthesizer.active_node() == Some(id) {
          self.synthesizer.reset(backend);
        }
        self.scheduler.pop(QueueKind::Render);
        if let Some(node) = self.tree.get_mut(id) {
          node.requests.remove(RequestKind::BuildTile);
        }
        self.scheduler.stats_mut().stale_jobs += 1;
        continue;
      }
      if !self.scheduler.try_spend(RequestKind::BuildTile) {
        break;
      }

      if self.synthesizer.active_node() != Some(id) {
        // A job left behind by a retracted head; start over for the new one.
        self.synthesizer.reset(backend);
        self.synthesizer.begin(id, self.tree.node(id).key);
        self.scheduler.set_in_flight(Some(id));
      }
      self.scheduler.stats_mut().tile_steps += 1;
      if self.synthesizer.step(backend) != SynthesisStage::Done {
        continue;
      }

      let Some((owner, tile)) = self.synthesizer.finish(backend) else {
        unreachable!("synthesis reported done without a tile");
      };
      self.scheduler.pop(QueueKind::Render);
      self.scheduler.stats_mut().tiles_completed += 1;
      let node = self.tree.node_mut(owner);
      node.requests.remove(RequestKind::BuildTile);
      node.attach_tile(tile);
      node.last_requested = self.frame;
      trace!(node = %node.key, "tile attached");
      self
        .scheduler
        .request(owner, &mut node.requests, RequestKind::BuildRenderable, true);
    }
  }

  /// Drop every queued request that stopped serving anything this frame,
  /// abandoning a synthesis left in flight for one.
  pub(super) fn retract_stale(&mut self, backend: &mut dyn RenderBackend) {
    let tree = &self.tree;
    let frame = self.frame;
    let removed = self.scheduler.retract_where(|request| is_stale(tree, frame, request));
    for request in &removed {
      if request.kind == RequestKind::BuildTile && self.synthesizer.active_node() == Some(request.node) {
        self.synthesizer.reset(backend);
      }
      if let Some(node) = self.tree.get_mut(request.node) {
        node.requests.remove(request.kind);
      }
    }
    if !removed.is_empty() {
      trace!(count = removed.len(), "stale requests retracted");
    }
    self.scheduler.stats_mut().stale_jobs += removed.len();
  }

  /// Run patch builds, splits and merges until the budget runs out.
  #[tracing::instrument(skip_all, name = "scheduler::inline_queue")]
  pub(super) fn run_inline_queue(&mut self, backend: &mut dyn RenderBackend) {
    while let Some(request) = self.scheduler.peek(QueueKind::Inline) {
      if is_stale(&self.tree, self.frame, &request) {
        self.scheduler.pop(QueueKind::Inline);
        if let Some(node) = self.tree.get_mut(request.node) {
          node.requests.remove(request.kind);
        }
        self.scheduler.stats_mut().stale_jobs += 1;
        continue;
      }
      if !self.scheduler.try_spend(request.kind) {
        break;
      }
      self.scheduler.pop(QueueKind::Inline);
      self.tree.node_mut(request.node).requests.remove(request.kind);

      let done = match request.kind {
        RequestKind::BuildRenderable => self.build_renderable(request.node, request.urgent),
        RequestKind::Split => self.split(request.node),
        RequestKind::Merge => self.merge(backend, request.node),
        RequestKind::BuildTile => unreachable!("tile synthesis queued inline"),
      };
      if !done {
        self.scheduler.stats_mut().stale_jobs += 1;
      }
    }
  }

  /// Build a patch from the nearest usable tile, or ask for one.
  fn build_renderable(&mut self, id: NodeId, urgent: bool) -> bool {
    let Some(owner) = self.tree.tile_source(id, self.config.effective_tile_reuse()) else {
      let node = self.tree.node_mut(id);
      self.scheduler.request(id, &mut node.requests, RequestKind::BuildTile, urgent);
      return true;
    };
    let node = self.tree.node(id);
    if node.patch.as_ref().is_some_and(|patch| patch.tile_owner == owner) {
      return false;
    }

    let key = node.key;
    let patch = match self.tree.node(owner).tile.as_ref() {
      Some(tile) => self.builder.build(key, owner, tile),
      None => unreachable!("tile source without a tile"),
    };
    self.tree.detach_patch(id);
    self.tree.attach_patch(id, patch);
    self.tree.propagate_lod_distances(id);
    self.scheduler.stats_mut().renderables_built += 1;
    trace!(node = %key, borrowed = owner != id, "patch built");
    true
  }

  fn split(&mut self, id: NodeId) -> bool {
    let node = self.tree.node(id);
    if node.is_split() || node.key.lod >= self.lod_limit() {
      return false;
    }
    let key = node.key;
    let children = self.tree.split(id, self.frame);
    for child in children {
      let node = self.tree.node_mut(child);
      node.last_requested = self.frame;
      self.scheduler.request(child, &mut node.requests, RequestKind::BuildRenderable, false);
    }
    self.scheduler.stats_mut().splits += 1;
    debug!(node = %key, "split");
    true
  }

  /// Collapse a stale open node, freeing its children's patches and tiles.
  fn merge(&mut self, backend: &mut dyn RenderBackend, id: NodeId) -> bool {
    if !self.tree.is_open(id) || !self.can_merge(id) {
      return false;
    }
    let Some(children) = self.tree.node(id).children else {
      return false;
    };

    for child in children {
      self.unrequest(backend, child);
      self.tree.detach_patch(child);
    }
    for child in children {
      if let Some(tile) = self.tree.node_mut(child).tile.take() {
        tile.destroy(backend);
      }
    }
    self.tree.merge(id);
    self.tree.propagate_lod_distances(id);
    self.scheduler.stats_mut().merges += 1;
    debug!(node = %self.tree.node(id).key, "merge");
    true
  }
}
