//! Planet descriptor and engine configuration.
//!
//! Everything the engine tunes is passed in explicitly through these structs;
//! there is no process-wide configuration store.

use crate::constants::{max_tile_reuse, DEFAULT_GRID_SIZE, DEFAULT_TEXTURE_SIZE, MAX_LOD_LIMIT};
use crate::error::ConfigError;
use crate::scheduler::SchedulerBudget;

/// Identity of one planet: everything needed to regenerate it from scratch.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PlanetDescriptor {
  /// Seed for brush placement. Same seed, same planet.
  pub seed: u64,
  /// Number of brush stamps composited into the height field.
  pub brushes: u32,
  /// Sea-level radius in planet-local units.
  pub radius: f64,
  /// Maximum terrain height above `radius`.
  pub height: f64,
  /// Deepest quadtree level for this planet.
  pub lod_limit: u32,
}

impl Default for PlanetDescriptor {
  fn default() -> Self {
    Self {
      seed: 32489,
      brushes: 200,
      radius: 60.0,
      height: 40.0,
      lod_limit: 8,
    }
  }
}

impl PlanetDescriptor {
  /// Reject descriptors the engine cannot represent.
  pub fn validate(&self) -> Result<(), ConfigError> {
    if !(self.radius.is_finite() && self.radius > 0.0) {
      return Err(ConfigError::Radius(self.radius));
    }
    if !(self.height.is_finite() && self.height >= 0.0) {
      return Err(ConfigError::Height(self.height));
    }
    if self.lod_limit > MAX_LOD_LIMIT {
      return Err(ConfigError::LodLimit(self.lod_limit));
    }
    Ok(())
  }

  /// Outer radius of the terrain shell.
  #[inline]
  pub fn outer_radius(&self) -> f64 {
    self.radius + self.height
  }
}

/// Debug switches that pause parts of the engine.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct DebugFlags {
  /// Keep evaluating LOD against the last viewpoint.
  pub lod_freeze: bool,
  /// Stop pruning (merges) and paging.
  pub page_freeze: bool,
  /// Stop requesting new splits.
  pub split_freeze: bool,
}

/// Engine configuration shared by every planet an application drives.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PlanetConfig {
  /// Patch grid resolution, 2^k + 1 vertices per side.
  pub grid_size: u32,
  /// Tile texture resolution, 2^k + 1 texels per side.
  pub texture_size: u32,
  /// Engine-wide cap on quadtree depth, combined with the descriptor's limit.
  pub lod_limit: u32,
  /// Acceptable geometric error in pixels.
  pub geo_detail: f64,
  /// Acceptable screen pixels per texel.
  pub tex_detail: f64,
  /// Viewport width in pixels.
  pub screen_width: u32,
  /// Viewport height in pixels.
  pub screen_height: u32,
  /// Weighted per-frame scheduler budget.
  pub budget: SchedulerBudget,
  /// Frames an open node may go unopened before it is merged.
  pub staleness_frames: u64,
  /// Frames a tile may go unrendered before it can be paged out.
  pub page_frames: u64,
  /// Tiles kept resident before paging starts.
  pub max_tiles: usize,
  /// Levels a descendant may borrow an ancestor tile, clamped to what the
  /// grid and texture sizes allow.
  pub tile_reuse_limit: u32,
  /// Debug switches.
  pub debug: DebugFlags,
}

impl Default for PlanetConfig {
  fn default() -> Self {
    Self {
      grid_size: DEFAULT_GRID_SIZE,
      texture_size: DEFAULT_TEXTURE_SIZE,
      lod_limit: 8,
      geo_detail: 6.0,
      tex_detail: 1.0,
      screen_width: 1024,
      screen_height: 768,
      budget: SchedulerBudget::DEFAULT,
      staleness_frames: 30,
      page_frames: 120,
      max_tiles: 256,
      tile_reuse_limit: 4,
      debug: DebugFlags::default(),
    }
  }
}

impl PlanetConfig {
  /// Reject configurations the engine cannot run with.
  pub fn validate(&self) -> Result<(), ConfigError> {
    if !is_grid_size(self.grid_size) {
      return Err(ConfigError::GridSize(self.grid_size));
    }
    if !is_grid_size(self.texture_size) {
      return Err(ConfigError::TextureSize(self.texture_size));
    }
    if self.texture_size < self.grid_size {
      return Err(ConfigError::TextureSmallerThanGrid {
        grid: self.grid_size,
        texture: self.texture_size,
      });
    }
    if self.lod_limit > MAX_LOD_LIMIT {
      return Err(ConfigError::LodLimit(self.lod_limit));
    }
    for (name, value) in [("geo_detail", self.geo_detail), ("tex_detail", self.tex_detail)] {
      if !(value.is_finite() && value > 0.0) {
        return Err(ConfigError::NonPositive { name, value });
      }
    }
    if self.screen_width == 0 || self.screen_height == 0 {
      return Err(ConfigError::ScreenSize {
        width: self.screen_width,
        height: self.screen_height,
      });
    }
    let costs = [
      ("tile_step_cost", self.budget.tile_step_cost),
      ("renderable_cost", self.budget.renderable_cost),
      ("split_cost", self.budget.split_cost),
      ("merge_cost", self.budget.merge_cost),
    ];
    if let Some(&(name, _)) = costs.iter().find(|(_, cost)| *cost == 0) {
      return Err(ConfigError::ZeroCost(name));
    }
    Ok(())
  }

  /// Levels a tile can be shared with descendants.
  ///
  /// Never exceeds `log2((texture_size - 1) / (grid_size - 1))`, since deeper
  /// patches would sample between texels.
  #[inline]
  pub fn effective_tile_reuse(&self) -> u32 {
    self
      .tile_reuse_limit
      .min(max_tile_reuse(self.grid_size, self.texture_size))
  }

  /// Deepest level for a planet, combining engine and descriptor limits.
  #[inline]
  pub fn effective_lod_limit(&self, descriptor: &PlanetDescriptor) -> u32 {
    self.lod_limit.min(descriptor.lod_limit)
  }
}

/// True for 2^k + 1 with k >= 1.
#[inline]
fn is_grid_size(size: u32) -> bool {
  size >= 3 && (size - 1).is_power_of_two()
}

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;
