//! Patch - renderable grid mesh over one node's footprint.

use std::sync::Arc;

use glam::{DVec2, DVec3, Vec3};

use super::lod::LodState;
use crate::backend::MaterialId;
use crate::bounds::Aabb;
use crate::face::Face;
use crate::quadtree::{NodeId, NodeKey};

/// Placement parameters a displacement shader needs to sample the tile.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PatchParams {
  pub face: Face,
  /// Cell size in face coordinates.
  pub face_scale: f64,
  /// Cell minimum corner in face coordinates.
  pub face_position: DVec2,
  /// Fraction of the source tile covered by the patch.
  pub texture_scale: f64,
  /// Patch corner inside the source tile, in texture coordinates.
  pub texture_offset: DVec2,
  pub radius: f64,
  pub height: f64,
  /// Geometric error of the patch in world units.
  pub distance: f64,
}

/// Mesh and LOD metrics for one node.
#[derive(Clone, Debug)]
pub struct Patch {
  /// Node the patch renders.
  pub key: NodeKey,
  /// Node owning the tile the patch samples (the node itself or an ancestor).
  pub tile_owner: NodeId,
  pub tile_key: NodeKey,
  /// Centroid of the grid in planet space; positions are relative to it.
  pub center: DVec3,
  /// Grid vertices followed by the four skirts.
  pub positions: Arc<[Vec3]>,
  /// Unit normals matching `positions`.
  pub normals: Arc<[Vec3]>,
  /// Planet-space bounds of the grid.
  pub bounds: Aabb,
  /// Unit direction of the centroid.
  pub surface_normal: DVec3,
  /// Own geometric error in world units.
  pub distance: f64,
  /// Largest descendant error plus its offset, maintained by propagation.
  pub child_distance: f64,
  /// Area of the cell relative to an even face division.
  pub scale_factor: f64,
  /// World size of one texel of the source tile.
  pub texel_size: f64,
  /// Sea-level extent of the cell.
  pub tile_radius: f64,
  pub params: PatchParams,
  pub material: MaterialId,
  /// Judgment from the most recent evaluation.
  pub state: LodState,
}

impl Patch {
  /// Effective LOD distance: own error or the nested children's, whichever
  /// is larger.
  #[inline]
  pub fn lod_distance(&self) -> f64 {
    self.distance.max(self.child_distance)
  }

  /// Patch samples a tile owned by an ancestor.
  #[inline]
  pub fn borrows_tile(&self) -> bool {
    self.tile_key != self.key
  }
}
