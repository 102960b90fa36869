//! CPU implementation of [`RenderBackend`].
//!
//! Targets and textures are plain `f32` buffers. Brush rendering and the
//! normal filter rasterize texel rows in parallel with rayon. Every resource
//! is tracked so callers can check for leaks.

use std::collections::HashMap;

use rayon::prelude::*;

use super::{DrawCall, MaterialId, MaterialSlot, RenderBackend, TargetFormat, TargetId, TextureId};
use crate::tile::{derive_normals, BrushSet, SurfaceScale, TileView};

#[derive(Debug)]
struct Target {
  size: u32,
  border: u32,
  format: TargetFormat,
  /// Full bordered grid, channels interleaved.
  data: Vec<f32>,
}

impl Target {
  fn full_size(&self) -> usize {
    (self.size + 2 * self.border) as usize
  }

  /// Interior texels, row-major.
  fn interior(&self) -> Vec<f32> {
    let full = self.full_size();
    let channels = self.format.channels();
    let border = self.border as usize;
    let size = self.size as usize;
    let mut out = Vec::with_capacity(size * size * channels);
    for row in border..border + size {
      let start = (row * full + border) * channels;
      out.extend_from_slice(&self.data[start..start + size * channels]);
    }
    out
  }
}

/// Texture contents held by the software backend.
#[derive(Clone, Debug, PartialEq)]
pub struct SoftwareTexture {
  pub size: u32,
  pub format: TargetFormat,
  pub data: Vec<f32>,
}

/// Renders on the CPU and records submitted draws.
#[derive(Debug, Default)]
pub struct SoftwareBackend {
  next_handle: u32,
  targets: HashMap<TargetId, Target>,
  textures: HashMap<TextureId, SoftwareTexture>,
  materials: HashMap<MaterialId, Vec<MaterialSlot>>,
  draws: Vec<DrawCall>,
}

impl SoftwareBackend {
  pub fn new() -> Self {
    Self::default()
  }

  fn handle(&mut self) -> u32 {
    self.next_handle += 1;
    self.next_handle
  }

  fn target(&self, id: TargetId) -> &Target {
    match self.targets.get(&id) {
      Some(target) => target,
      None => panic!("unknown render target {:?}", id),
    }
  }

  fn target_mut(&mut self, id: TargetId) -> &mut Target {
    match self.targets.get_mut(&id) {
      Some(target) => target,
      None => panic!("unknown render target {:?}", id),
    }
  }

  #[inline]
  pub fn live_targets(&self) -> usize {
    self.targets.len()
  }

  #[inline]
  pub fn live_textures(&self) -> usize {
    self.textures.len()
  }

  #[inline]
  pub fn live_materials(&self) -> usize {
    self.materials.len()
  }

  /// Contents of a live texture.
  pub fn texture(&self, id: TextureId) -> Option<&SoftwareTexture> {
    self.textures.get(&id)
  }

  /// Texture bound to a named slot of a live material.
  pub fn material_slot(&self, material: MaterialId, name: &str) -> Option<TextureId> {
    self
      .materials
      .get(&material)?
      .iter()
      .find(|slot| slot.name == name)
      .map(|slot| slot.texture)
  }

  /// Draws submitted since the last call.
  pub fn take_draws(&mut self) -> Vec<DrawCall> {
    std::mem::take(&mut self.draws)
  }

  /// Draws submitted since the last `take_draws`.
  pub fn draws(&self) -> &[DrawCall] {
    &self.draws
  }
}

impl RenderBackend for SoftwareBackend {
  fn create_target(&mut self, size: u32, border: u32, format: TargetFormat) -> TargetId {
    let id = TargetId(self.handle());
    let full = (size + 2 * border) as usize;
    self.targets.insert(
      id,
      Target {
        size,
        border,
        format,
        data: vec![0.0; full * full * format.channels()],
      },
    );
    id
  }

  fn destroy_target(&mut self, target: TargetId) {
    if self.targets.remove(&target).is_none() {
      panic!("destroying unknown render target {:?}", target);
    }
  }

  fn render_brushes(&mut self, target: TargetId, view: &TileView, brushes: &BrushSet, fill: f32) {
    let target = self.target_mut(target);
    assert_eq!(target.format, TargetFormat::Height, "brushes need a height target");
    let full = target.full_size();
    assert_eq!(full, view.full_size() as usize, "tile view does not match target");

    target
      .data
      .par_chunks_mut(full)
      .enumerate()
      .for_each(|(row, out)| {
        for (col, texel) in out.iter_mut().enumerate() {
          let height = fill as f64 + brushes.sample(view.direction(col, row));
          *texel = height.clamp(0.0, 1.0) as f32;
        }
      });
  }

  fn render_normal_filter(
    &mut self,
    target: TargetId,
    view: &TileView,
    source: TargetId,
    surface: SurfaceScale,
  ) {
    assert_ne!(target, source, "normal filter cannot run in place");
    let Some(mut output) = self.targets.remove(&target) else {
      panic!("unknown render target {:?}", target);
    };
    assert_eq!(output.format, TargetFormat::Normal, "normal filter needs a normal target");
    let input = self.target(source);
    derive_normals(view, &input.data, surface, &mut output.data);
    self.targets.insert(target, output);
  }

  fn read_target(&mut self, target: TargetId) -> Vec<f32> {
    self.target(target).interior()
  }

  fn copy_to_texture(&mut self, target: TargetId) -> TextureId {
    let source = self.target(target);
    let texture = SoftwareTexture {
      size: source.size,
      format: source.format,
      data: source.interior(),
    };
    let id = TextureId(self.handle());
    self.textures.insert(id, texture);
    id
  }

  fn destroy_texture(&mut self, texture: TextureId) {
    if self.textures.remove(&texture).is_none() {
      panic!("destroying unknown texture {:?}", texture);
    }
  }

  fn create_material(&mut self, slots: &[MaterialSlot]) -> MaterialId {
    for slot in slots {
      assert!(
        self.textures.contains_key(&slot.texture),
        "material slot {} binds unknown texture {:?}",
        slot.name,
        slot.texture
      );
    }
    let id = MaterialId(self.handle());
    self.materials.insert(id, slots.to_vec());
    id
  }

  fn destroy_material(&mut self, material: MaterialId) {
    if self.materials.remove(&material).is_none() {
      panic!("destroying unknown material {:?}", material);
    }
  }

  fn submit(&mut self, draw: DrawCall) {
    self.draws.push(draw);
  }
}
