//! Rendering backend seam.
//!
//! The engine never talks to a GPU directly. Everything it needs from the
//! host renderer - off-screen targets, texture upload, materials and draw
//! submission - goes through [`RenderBackend`], so the core stays portable
//! and testable. [`SoftwareBackend`] implements the trait on the CPU.

use std::sync::Arc;

use glam::{DAffine3, DVec3, Vec3};

use crate::patch::PatchParams;
use crate::quadtree::NodeKey;
use crate::tile::{BrushSet, SurfaceScale, TileView};

pub mod software;

pub use software::SoftwareBackend;

/// Handle to an off-screen render target.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TargetId(pub u32);

/// Handle to a GPU texture.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureId(pub u32);

/// Handle to a material.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MaterialId(pub u32);

/// Pixel layout of an off-screen target.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TargetFormat {
  /// One float channel.
  Height,
  /// Three float channels.
  Normal,
}

impl TargetFormat {
  #[inline]
  pub fn channels(self) -> usize {
    match self {
      TargetFormat::Height => 1,
      TargetFormat::Normal => 3,
    }
  }
}

/// Named texture binding of a material.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MaterialSlot {
  pub name: &'static str,
  pub texture: TextureId,
}

/// Slot name of a tile's height texture.
pub const HEIGHT_MAP_SLOT: &str = "heightMap";

/// Slot name of a tile's normal texture.
pub const NORMAL_MAP_SLOT: &str = "normalMap";

/// One patch submitted for drawing.
#[derive(Clone, Debug)]
pub struct DrawCall {
  /// Node the patch belongs to.
  pub key: NodeKey,
  /// Planet world transform.
  pub transform: DAffine3,
  /// Patch origin in planet space; positions are relative to it.
  pub origin: DVec3,
  /// Tile material.
  pub material: MaterialId,
  /// Texture placement parameters.
  pub params: PatchParams,
  /// Vertex positions relative to `origin`, grid then skirts.
  pub positions: Arc<[Vec3]>,
  /// Unit vertex normals.
  pub normals: Arc<[Vec3]>,
  /// Shared triangle list.
  pub indices: Arc<[u32]>,
}

impl DrawCall {
  /// Patch origin in world space.
  #[inline]
  pub fn world_origin(&self) -> DVec3 {
    self.transform.transform_point3(self.origin)
  }
}

/// Capabilities the engine needs from the host renderer.
///
/// Every handle passed in must have been created by the same backend and not
/// yet destroyed. Implementations panic on unknown handles.
pub trait RenderBackend {
  /// Allocate an off-screen target with `size` interior texels and `border`
  /// extra texels on each side.
  fn create_target(&mut self, size: u32, border: u32, format: TargetFormat) -> TargetId;

  fn destroy_target(&mut self, target: TargetId);

  /// Clear `target` to `fill` and draw every brush as seen from `view`.
  fn render_brushes(&mut self, target: TargetId, view: &TileView, brushes: &BrushSet, fill: f32);

  /// Run the normal filter over the height target `source` into `target`.
  fn render_normal_filter(
    &mut self,
    target: TargetId,
    view: &TileView,
    source: TargetId,
    surface: SurfaceScale,
  );

  /// Read the interior texels of `target` into host memory, row-major,
  /// channels interleaved.
  fn read_target(&mut self, target: TargetId) -> Vec<f32>;

  /// Copy the interior texels of `target` into a new texture.
  fn copy_to_texture(&mut self, target: TargetId) -> TextureId;

  fn destroy_texture(&mut self, texture: TextureId);

  fn create_material(&mut self, slots: &[MaterialSlot]) -> MaterialId;

  fn destroy_material(&mut self, material: MaterialId);

  /// Queue a patch for drawing this frame.
  fn submit(&mut self, draw: DrawCall);
}
