use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use glam::DVec2;

use super::*;

// =========================================================================
// Batch 1: NodeKey identity
// =========================================================================

/// Two keys with same face, lod, x, y should be equal.
#[test]
fn test_key_equality() {
  let key1 = NodeKey::new(Face::Top, 3, 1, 2);
  let key2 = NodeKey::new(Face::Top, 3, 1, 2);
  let key3 = NodeKey::new(Face::Bottom, 3, 1, 2); // different face

  assert_eq!(key1, key2);
  assert_ne!(key1, key3);
}

/// Equal keys must produce equal hashes (HashMap invariant).
#[test]
fn test_key_hash_consistency() {
  let key1 = NodeKey::new(Face::Front, 4, 10, 7);
  let key2 = NodeKey::new(Face::Front, 4, 10, 7);

  let hash = |key: &NodeKey| {
    let mut hasher = DefaultHasher::new();
    key.hash(&mut hasher);
    hasher.finish()
  };

  assert_eq!(hash(&key1), hash(&key2), "Equal keys must have equal hashes");
}

// =========================================================================
// Batch 2: Parent/child math
// =========================================================================

/// All 4 slots produce children with coordinate = parent * 2 + offset.
///
/// child.x = parent.x * 2 + (slot & 1)
/// child.y = parent.y * 2 + ((slot >> 1) & 1)
#[test]
fn test_child_all_4_slots() {
  let parent = NodeKey::new(Face::Left, 2, 3, 1);

  for slot in 0..4 {
    let child = parent.child(slot);
    assert_eq!(child.face, parent.face, "Slot {} face mismatch", slot);
    assert_eq!(child.lod, parent.lod + 1, "Slot {} lod mismatch", slot);
    assert_eq!(child.x, parent.x * 2 + (slot & 1) as u32, "Slot {} X mismatch", slot);
    assert_eq!(
      child.y,
      parent.y * 2 + ((slot >> 1) & 1) as u32,
      "Slot {} Y mismatch",
      slot
    );
    assert_eq!(child.slot(), slot, "Slot {} not recovered", slot);
  }
}

/// Parent of child is the original key.
#[test]
fn test_child_parent_roundtrip() {
  let key = NodeKey::new(Face::Right, 5, 17, 30);
  for slot in 0..4 {
    assert_eq!(key.child(slot).parent(), Some(key));
  }
}

#[test]
fn test_root_has_no_parent() {
  assert_eq!(NodeKey::root(Face::Back).parent(), None);
}

// =========================================================================
// Batch 3: Face placement
// =========================================================================

/// The root spans the whole face.
#[test]
fn test_root_face_coordinates() {
  let root = NodeKey::root(Face::Front);
  assert_eq!(root.face_scale(), 2.0);
  assert_eq!(root.face_origin(), DVec2::new(-1.0, -1.0));
  assert_eq!(root.face_point(DVec2::ONE), DVec2::ONE);
}

/// Children tile the parent exactly.
#[test]
fn test_children_tile_parent() {
  let parent = NodeKey::new(Face::Top, 1, 1, 0);
  let origin = parent.face_origin();
  let half = parent.face_scale() * 0.5;

  assert_eq!(parent.child(0).face_origin(), origin);
  assert_eq!(parent.child(1).face_origin(), origin + DVec2::new(half, 0.0));
  assert_eq!(parent.child(2).face_origin(), origin + DVec2::new(0.0, half));
  assert_eq!(parent.child(3).face_origin(), origin + DVec2::splat(half));
}

// =========================================================================
// Batch 4: Ancestry
// =========================================================================

#[test]
fn test_contains_descendants() {
  let ancestor = NodeKey::new(Face::Front, 1, 1, 1);
  let grandchild = ancestor.child(2).child(1);
  assert!(ancestor.contains(&ancestor));
  assert!(ancestor.contains(&grandchild));
  assert!(!grandchild.contains(&ancestor));
  assert!(!NodeKey::new(Face::Front, 1, 0, 1).contains(&grandchild));
  assert!(!NodeKey::new(Face::Back, 1, 1, 1).contains(&grandchild));
}

/// Relative coordinates locate a descendant inside its ancestor's cell.
#[test]
fn test_relative_to() {
  let ancestor = NodeKey::new(Face::Front, 1, 1, 0);
  // Slot 3 then slot 2: x = (1*2+1)*2+0 = 6, y = (0*2+1)*2+1 = 3.
  let descendant = ancestor.child(3).child(2);
  assert_eq!(descendant.x, 6);
  assert_eq!(descendant.y, 3);
  assert_eq!(descendant.relative_to(&ancestor), Some((2, 2, 3)));
  assert_eq!(ancestor.relative_to(&ancestor), Some((0, 0, 0)));
  assert_eq!(ancestor.relative_to(&descendant), None);
}
