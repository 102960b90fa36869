//! Procedural tile synthesis.
//!
//! - [`brush`]: seeded brush stamps forming the height field
//! - [`edge_fixup`]: folds border texels across cube seams
//! - [`view`]: per-texel sphere directions for one cell
//! - [`filter`]: normal derivation from displaced positions
//! - [`map_tile`]: reference-counted synthesized tile
//! - [`synthesizer`]: resumable synthesis pipeline

pub mod brush;
pub mod edge_fixup;
pub mod filter;
pub mod map_tile;
pub mod synthesizer;
pub mod view;

pub use brush::{Brush, BrushSet};
pub use edge_fixup::SeamTable;
pub use filter::{derive_normals, SurfaceScale};
pub use map_tile::Tile;
pub use synthesizer::{SynthesisStage, TileSynthesizer};
pub use view::TileView;
