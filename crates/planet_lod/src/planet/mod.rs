//! Planet - the cube controller tying tree, scheduler and builders together.
//!
//! # Frame
//!
//! ```text
//! update(viewpoint)
//!   ├─ frame of reference    camera, frustum and thresholds in planet space
//!   ├─ traversal             six roots, files requests, collects patches
//!   ├─ submit                one DrawCall per visible patch
//!   ├─ prune / page out      merge stale subtrees, evict cold tiles
//!   ├─ render queue          tile synthesis steps under the render budget
//!   ├─ inline queue          patches, splits, merges under the inline budget
//!   ├─ retract stale         requests this traversal did not renew
//!   ├─ resort                uncovered nodes, then nearest requests first
//!   └─ report                PlanetStats to the metrics sink
//! ```
//!
//! Everything the traversal asks for lands one frame later at the earliest;
//! until then the coarser patch keeps being drawn.

use glam::DAffine3;
use tracing::warn;
use web_time::Instant;

use crate::backend::{DrawCall, RenderBackend};
use crate::config::{DebugFlags, PlanetConfig, PlanetDescriptor};
use crate::error::ConfigError;
use crate::face::Face;
use crate::metrics::{MetricsSink, NullSink, PlanetStats};
use crate::patch::{FrameOfReference, PatchBuilder};
use crate::quadtree::traversal::Traversal;
use crate::quadtree::{NodeId, QuadTree};
use crate::scheduler::{PriorityKey, QueueKind, RequestScheduler, SchedulerBudget};
use crate::tile::{BrushSet, SurfaceScale, TileSynthesizer};

mod frame;
mod jobs;

pub use frame::Viewpoint;

/// One procedurally generated planet.
pub struct Planet {
  descriptor: PlanetDescriptor,
  config: PlanetConfig,
  transform: DAffine3,
  tree: QuadTree,
  scheduler: RequestScheduler,
  synthesizer: TileSynthesizer,
  builder: PatchBuilder,
  frame: u64,
  /// LOD parameters of the last update, reused while LOD is frozen.
  reference: Option<FrameOfReference>,
  stats: PlanetStats,
  sink: Box<dyn MetricsSink>,
}

impl Planet {
  /// Create a planet with six empty face roots.
  ///
  /// Nothing touches the backend until the first update.
  pub fn new(descriptor: PlanetDescriptor, config: PlanetConfig) -> Result<Self, ConfigError> {
    descriptor.validate()?;
    config.validate()?;
    if config.effective_tile_reuse() < config.tile_reuse_limit {
      warn!(
        requested = config.tile_reuse_limit,
        effective = config.effective_tile_reuse(),
        "tile reuse limit clamped to grid and texture sizes"
      );
    }
    if descriptor.lod_limit > config.lod_limit {
      warn!(
        planet = descriptor.lod_limit,
        engine = config.lod_limit,
        "planet lod limit clamped to engine limit"
      );
    }

    let surface = SurfaceScale::new(descriptor.radius, descriptor.height);
    Ok(Self {
      tree: QuadTree::new(0),
      scheduler: RequestScheduler::new(config.budget),
      synthesizer: TileSynthesizer::new(
        BrushSet::generate(descriptor.seed, descriptor.brushes),
        config.texture_size,
        surface,
      ),
      builder: PatchBuilder::new(config.grid_size, surface),
      transform: DAffine3::IDENTITY,
      frame: 0,
      reference: None,
      stats: PlanetStats::default(),
      sink: Box::new(NullSink),
      descriptor,
      config,
    })
  }

  #[inline]
  pub fn descriptor(&self) -> &PlanetDescriptor {
    &self.descriptor
  }

  #[inline]
  pub fn config(&self) -> &PlanetConfig {
    &self.config
  }

  #[inline]
  pub fn tree(&self) -> &QuadTree {
    &self.tree
  }

  #[inline]
  pub fn scheduler(&self) -> &RequestScheduler {
    &self.scheduler
  }

  #[inline]
  pub fn synthesizer(&self) -> &TileSynthesizer {
    &self.synthesizer
  }

  /// Updates run so far.
  #[inline]
  pub fn frame(&self) -> u64 {
    self.frame
  }

  /// Snapshot from the last update.
  #[inline]
  pub fn stats(&self) -> &PlanetStats {
    &self.stats
  }

  #[inline]
  pub fn transform(&self) -> &DAffine3 {
    &self.transform
  }

  /// Place the planet in the world.
  pub fn set_transform(&mut self, transform: DAffine3) {
    self.transform = transform;
  }

  /// Replace the receiver of per-frame stats.
  pub fn set_metrics_sink(&mut self, sink: Box<dyn MetricsSink>) {
    self.sink = sink;
  }

  pub fn set_budget(&mut self, budget: SchedulerBudget) {
    self.config.budget = budget;
    self.scheduler.set_budget(budget);
  }

  /// Toggle the debug freezes.
  pub fn set_debug(&mut self, debug: DebugFlags) {
    if !debug.lod_freeze {
      self.reference = None;
    }
    self.config.debug = debug;
  }

  /// Deepest level this planet splits to.
  #[inline]
  pub fn lod_limit(&self) -> u32 {
    self.config.effective_lod_limit(&self.descriptor)
  }

  /// Advance one frame for `viewpoint` and return the patches drawn.
  ///
  /// Every returned call was also submitted to `backend`.
  #[tracing::instrument(skip_all, name = "planet::update")]
  pub fn update(&mut self, backend: &mut dyn RenderBackend, viewpoint: &Viewpoint) -> Vec<DrawCall> {
    let start = Instant::now();
    self.frame += 1;
    self.scheduler.begin_frame();

    let reference = match self.reference {
      Some(reference) if self.config.debug.lod_freeze => reference,
      _ => viewpoint.frame_of_reference(&self.transform, &self.descriptor, &self.config),
    };
    self.reference = Some(reference);

    let visible = self.traverse(&reference);
    let draws = self.submit(backend, &visible);

    if !self.config.debug.page_freeze {
      self.prune();
      self.page_out(backend);
    }
    self.run_render_queue(backend);
    self.run_inline_queue(backend);
    self.retract_stale(backend);
    self.resort(&reference);

    self.report(&draws, start.elapsed().as_micros() as u64);
    draws
  }

  fn traverse(&mut self, reference: &FrameOfReference) -> Vec<NodeId> {
    let roots = *self.tree.roots();
    let mut traversal = Traversal {
      lod_limit: self.lod_limit(),
      split_freeze: self.config.debug.split_freeze,
      frame_number: self.frame,
      tree: &mut self.tree,
      scheduler: &mut self.scheduler,
      frame: reference,
      visible: Vec::new(),
    };
    for root in roots {
      traversal.render(root);
    }
    traversal.visible
  }

  fn submit(&mut self, backend: &mut dyn RenderBackend, visible: &[NodeId]) -> Vec<DrawCall> {
    let mut stats = PlanetStats::default();
    let draws: Vec<DrawCall> = visible
      .iter()
      .filter_map(|&id| self.tree.node(id).patch.as_ref())
      .map(|patch| {
        stats.record_patch(patch.key.lod);
        DrawCall {
          key: patch.key,
          transform: self.transform,
          origin: patch.center,
          material: patch.material,
          params: patch.params,
          positions: patch.positions.clone(),
          normals: patch.normals.clone(),
          indices: self.builder.indices().clone(),
        }
      })
      .collect();
    for draw in &draws {
      backend.submit(draw.clone());
    }
    self.stats.rendered = stats.rendered;
    self.stats.patches_per_level = stats.patches_per_level;
    draws
  }

  /// Retract every request of `id`, abandoning its synthesis if in flight.
  pub fn unrequest(&mut self, backend: &mut dyn RenderBackend, id: NodeId) -> usize {
    if self.synthesizer.active_node() == Some(id) {
      self.synthesizer.reset(backend);
    }
    match self.tree.get_mut(id) {
      Some(node) => self.scheduler.unrequest(id, &mut node.requests),
      None => 0,
    }
  }

  /// Rebuild the planet from a new descriptor, keeping configuration,
  /// transform and metrics sink.
  pub fn refresh(&mut self, backend: &mut dyn RenderBackend, descriptor: PlanetDescriptor) -> Result<(), ConfigError> {
    descriptor.validate()?;
    self.teardown(backend);

    let surface = SurfaceScale::new(descriptor.radius, descriptor.height);
    self.synthesizer = TileSynthesizer::new(
      BrushSet::generate(descriptor.seed, descriptor.brushes),
      self.config.texture_size,
      surface,
    );
    self.builder = PatchBuilder::new(self.config.grid_size, surface);
    self.descriptor = descriptor;
    Ok(())
  }

  /// Free every backend resource the planet holds.
  pub fn destroy(mut self, backend: &mut dyn RenderBackend) {
    self.teardown(backend);
  }

  fn teardown(&mut self, backend: &mut dyn RenderBackend) {
    self.synthesizer.release_targets(backend);
    self.scheduler.clear();
    let ids: Vec<NodeId> = self.tree.iter().map(|(id, _)| id).collect();
    for &id in &ids {
      self.tree.detach_patch(id);
    }
    for &id in &ids {
      if let Some(tile) = self.tree.node_mut(id).tile.take() {
        tile.destroy(backend);
      }
    }
    self.tree = QuadTree::new(self.frame);
    self.reference = None;
  }

  /// Queue priority: coverage for blank areas first, then urgent requests,
  /// then nearest to the camera.
  fn resort(&mut self, reference: &FrameOfReference) {
    let tree = &self.tree;
    let radius = self.descriptor.radius;
    self.scheduler.resort(|request| match tree.get(request.node) {
      Some(node) => {
        let anchor = match node.patch.as_ref() {
          Some(patch) => patch.center,
          None => node.key.center_direction() * radius,
        };
        let uncovered = !node.has_patch() && tree.ancestors(request.node).all(|id| !tree.node(id).has_patch());
        PriorityKey {
          uncovered,
          urgent: request.urgent,
          distance: reference.camera.distance(anchor),
          lod: node.key.lod,
        }
      }
      None => PriorityKey::STALE,
    });
  }

  fn report(&mut self, draws: &[DrawCall], update_us: u64) {
    let mut stats = PlanetStats {
      frame: self.frame,
      total_nodes: self.tree.len(),
      open_nodes: self.tree.open_len(),
      rendered: draws.len(),
      patches_per_level: self.stats.patches_per_level,
      render_queue: self.scheduler.queue(QueueKind::Render).len(),
      inline_queue: self.scheduler.queue(QueueKind::Inline).len(),
      scheduler: *self.scheduler.stats(),
      update_us,
      ..PlanetStats::default()
    };
    for (_, node) in self.tree.iter() {
      stats.paged_out += node.paged_out as usize;
      stats.renderables += node.has_patch() as usize;
      if let Some(tile) = node.tile.as_ref() {
        stats.tiles += 1;
        stats.hot_tiles += tile.is_evictable() as usize;
        stats.gpu_memory += tile.memory_bytes();
      }
    }
    self.sink.record(&stats);
    self.stats = stats;
  }

  /// Root of one face.
  #[inline]
  pub fn root(&self, face: Face) -> NodeId {
    self.tree.root(face)
  }
}

#[cfg(test)]
#[path = "planet_test.rs"]
mod planet_test;
