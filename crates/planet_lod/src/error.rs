//! Errors surfaced by planet construction.
//!
//! Only configuration is fallible. Broken tree or scheduler invariants panic,
//! and missing tiles or patches are traversal outcomes rather than errors.

/// Rejected planet descriptor or configuration.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
  #[error("grid size {0} must be 2^k + 1 and at least 3")]
  GridSize(u32),

  #[error("texture size {0} must be 2^k + 1 and at least 3")]
  TextureSize(u32),

  #[error("texture size {texture} is smaller than grid size {grid}")]
  TextureSmallerThanGrid { grid: u32, texture: u32 },

  #[error("lod limit {0} exceeds the supported maximum of {max}", max = crate::constants::MAX_LOD_LIMIT)]
  LodLimit(u32),

  #[error("planet radius must be positive and finite, got {0}")]
  Radius(f64),

  #[error("planet height must be non-negative and finite, got {0}")]
  Height(f64),

  #[error("{name} must be positive and finite, got {value}")]
  NonPositive { name: &'static str, value: f64 },

  #[error("screen size {width}x{height} must be non-zero")]
  ScreenSize { width: u32, height: u32 },

  #[error("scheduler cost for {0} must be non-zero")]
  ZeroCost(&'static str),
}
