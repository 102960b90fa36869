//! Renderable patches and their LOD judgment.

pub mod builder;
pub mod lod;
pub mod renderable;

pub use builder::{patch_indices, PatchBuilder};
pub use lod::{pixel_factor, sphere_clip, FrameOfReference, LodState};
pub use renderable::{Patch, PatchParams};
