//! Tile synthesizer - resumable pipeline producing one tile at a time.
//!
//! Synthesis is split into stages so the scheduler can spread a tile over
//! several frames, one stage per job slot:
//!
//! ```text
//! Idle -> RenderHeight -> ExtractHeight -> DownloadHeight
//!      -> DeriveNormals -> ExtractNormals -> Done -> (finish) Idle
//! ```
//!
//! The two off-screen targets are scratch space shared by every job and
//! live until [`TileSynthesizer::release_targets`]. Textures produced by a
//! job belong to the job until [`TileSynthesizer::finish`] hands them to a
//! [`Tile`]; [`TileSynthesizer::reset`] frees them if the job is abandoned.

use tracing::trace;

use super::brush::BrushSet;
use super::edge_fixup::SeamTable;
use super::filter::SurfaceScale;
use super::map_tile::Tile;
use super::view::TileView;
use crate::backend::{
  MaterialSlot, RenderBackend, TargetFormat, TargetId, TextureId, HEIGHT_MAP_SLOT, NORMAL_MAP_SLOT,
};
use crate::constants::{MAP_BORDER, MAP_FILL};
use crate::quadtree::{NodeId, NodeKey};

/// Position of the synthesizer in its pipeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SynthesisStage {
  /// No job.
  Idle,
  /// Next step draws the brushes into the height target.
  RenderHeight,
  /// Next step copies the height target into a texture.
  ExtractHeight,
  /// Next step reads the heights back for the patch builder.
  DownloadHeight,
  /// Next step runs the normal filter.
  DeriveNormals,
  /// Next step copies the normal target into a texture.
  ExtractNormals,
  /// Tile ready to collect with `finish`.
  Done,
}

impl SynthesisStage {
  /// Stage following this one.
  #[inline]
  pub fn next(self) -> Self {
    match self {
      SynthesisStage::Idle => SynthesisStage::Idle,
      SynthesisStage::RenderHeight => SynthesisStage::ExtractHeight,
      SynthesisStage::ExtractHeight => SynthesisStage::DownloadHeight,
      SynthesisStage::DownloadHeight => SynthesisStage::DeriveNormals,
      SynthesisStage::DeriveNormals => SynthesisStage::ExtractNormals,
      SynthesisStage::ExtractNormals => SynthesisStage::Done,
      SynthesisStage::Done => SynthesisStage::Done,
    }
  }

  /// Steps needed from `RenderHeight` to `Done`.
  pub const STEPS: u32 = 5;
}

/// In-flight job state.
#[derive(Debug)]
struct SynthesisJob {
  node: NodeId,
  view: TileView,
  height_texture: Option<TextureId>,
  heights: Option<Vec<f32>>,
  normal_texture: Option<TextureId>,
}

/// Builds tiles for one planet, one job at a time.
#[derive(Debug)]
pub struct TileSynthesizer {
  brushes: BrushSet,
  seams: SeamTable,
  size: u32,
  surface: SurfaceScale,
  stage: SynthesisStage,
  job: Option<SynthesisJob>,
  height_target: Option<TargetId>,
  normal_target: Option<TargetId>,
}

impl TileSynthesizer {
  pub fn new(brushes: BrushSet, size: u32, surface: SurfaceScale) -> Self {
    Self {
      brushes,
      seams: SeamTable::new(),
      size,
      surface,
      stage: SynthesisStage::Idle,
      job: None,
      height_target: None,
      normal_target: None,
    }
  }

  #[inline]
  pub fn stage(&self) -> SynthesisStage {
    self.stage
  }

  #[inline]
  pub fn is_idle(&self) -> bool {
    self.stage == SynthesisStage::Idle
  }

  /// Node the in-flight job builds a tile for.
  #[inline]
  pub fn active_node(&self) -> Option<NodeId> {
    self.job.as_ref().map(|job| job.node)
  }

  #[inline]
  pub fn brushes(&self) -> &BrushSet {
    &self.brushes
  }

  #[inline]
  pub fn size(&self) -> u32 {
    self.size
  }

  /// Start a job. Panics if a job is already in flight.
  pub fn begin(&mut self, node: NodeId, key: NodeKey) {
    assert!(
      self.job.is_none(),
      "synthesizer busy with {:?}, cannot start {}",
      self.active_node(),
      key
    );
    trace!(tile = %key, "synthesis started");
    self.job = Some(SynthesisJob {
      node,
      view: TileView::new(key, self.size, MAP_BORDER, &self.seams),
      height_texture: None,
      heights: None,
      normal_texture: None,
    });
    self.stage = SynthesisStage::RenderHeight;
  }

  /// Run the current stage and advance. Returns the new stage.
  #[tracing::instrument(skip_all, name = "tile::step")]
  pub fn step(&mut self, backend: &mut dyn RenderBackend) -> SynthesisStage {
    let Some(job) = self.job.as_mut() else {
      return self.stage;
    };

    match self.stage {
      SynthesisStage::Idle | SynthesisStage::Done => return self.stage,
      SynthesisStage::RenderHeight => {
        let target = *self
          .height_target
          .get_or_insert_with(|| backend.create_target(self.size, MAP_BORDER, TargetFormat::Height));
        backend.render_brushes(target, &job.view, &self.brushes, MAP_FILL);
      }
      SynthesisStage::ExtractHeight => {
        let target = scratch(self.height_target);
        job.height_texture = Some(backend.copy_to_texture(target));
      }
      SynthesisStage::DownloadHeight => {
        let target = scratch(self.height_target);
        job.heights = Some(backend.read_target(target));
      }
      SynthesisStage::DeriveNormals => {
        let source = scratch(self.height_target);
        let target = *self
          .normal_target
          .get_or_insert_with(|| backend.create_target(self.size, MAP_BORDER, TargetFormat::Normal));
        backend.render_normal_filter(target, &job.view, source, self.surface);
      }
      SynthesisStage::ExtractNormals => {
        let target = scratch(self.normal_target);
        job.normal_texture = Some(backend.copy_to_texture(target));
      }
    }

    self.stage = self.stage.next();
    trace!(tile = %job.view.key, stage = ?self.stage, "synthesis step");
    self.stage
  }

  /// Collect the finished tile and return to idle.
  ///
  /// Returns None unless the pipeline reached `Done`.
  pub fn finish(&mut self, backend: &mut dyn RenderBackend) -> Option<(NodeId, Tile)> {
    if self.stage != SynthesisStage::Done {
      return None;
    }
    let job = self.job.take()?;
    self.stage = SynthesisStage::Idle;

    let (Some(height_texture), Some(heights), Some(normal_texture)) =
      (job.height_texture, job.heights, job.normal_texture)
    else {
      unreachable!("synthesis finished without all outputs");
    };
    let material = backend.create_material(&[
      MaterialSlot {
        name: HEIGHT_MAP_SLOT,
        texture: height_texture,
      },
      MaterialSlot {
        name: NORMAL_MAP_SLOT,
        texture: normal_texture,
      },
    ]);
    trace!(tile = %job.view.key, "synthesis finished");
    Some((
      job.node,
      Tile::new(job.view.key, self.size, heights, height_texture, normal_texture, material),
    ))
  }

  /// Abandon the in-flight job, freeing any texture it produced.
  pub fn reset(&mut self, backend: &mut dyn RenderBackend) {
    if let Some(job) = self.job.take() {
      trace!(tile = %job.view.key, stage = ?self.stage, "synthesis reset");
      if let Some(texture) = job.height_texture {
        backend.destroy_texture(texture);
      }
      if let Some(texture) = job.normal_texture {
        backend.destroy_texture(texture);
      }
    }
    self.stage = SynthesisStage::Idle;
  }

  /// Run a whole job to completion in one call.
  pub fn synthesize(&mut self, backend: &mut dyn RenderBackend, node: NodeId, key: NodeKey) -> Tile {
    self.begin(node, key);
    while self.step(backend) != SynthesisStage::Done {}
    match self.finish(backend) {
      Some((_, tile)) => tile,
      None => unreachable!("pipeline reached Done"),
    }
  }

  /// Abandon any job and free the scratch targets.
  pub fn release_targets(&mut self, backend: &mut dyn RenderBackend) {
    self.reset(backend);
    if let Some(target) = self.height_target.take() {
      backend.destroy_target(target);
    }
    if let Some(target) = self.normal_target.take() {
      backend.destroy_target(target);
    }
  }
}

/// Scratch target that an earlier stage must have created.
#[inline]
fn scratch(target: Option<TargetId>) -> TargetId {
  match target {
    Some(target) => target,
    None => panic!("synthesis stage ran before its target was created"),
  }
}

#[cfg(test)]
#[path = "synthesizer_test.rs"]
mod synthesizer_test;
