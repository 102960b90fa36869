use approx::assert_relative_eq;
use glam::{DVec2, DVec3};

use super::*;

// =========================================================================
// Batch 1: Face transforms
// =========================================================================

/// Face transforms are rotations (possibly mirrored): M^T M = I.
#[test]
fn test_transforms_are_orthonormal() {
  for face in Face::ALL {
    let m = face.transform();
    let identity = m.transpose() * m;
    for col in 0..3 {
      let expected = DVec3::AXES[col];
      assert!(
        identity.col(col).abs_diff_eq(expected, 1e-12),
        "{:?} transform is not orthonormal",
        face
      );
    }
  }
}

/// Each face normal points along its named axis.
#[test]
fn test_face_normals() {
  assert_eq!(Face::Right.normal(), DVec3::X);
  assert_eq!(Face::Left.normal(), DVec3::NEG_X);
  assert_eq!(Face::Top.normal(), DVec3::Y);
  assert_eq!(Face::Bottom.normal(), DVec3::NEG_Y);
  assert_eq!(Face::Front.normal(), DVec3::Z);
  assert_eq!(Face::Back.normal(), DVec3::NEG_Z);
}

#[test]
fn test_from_index_roundtrip() {
  for face in Face::ALL {
    assert_eq!(Face::from_index(face.index()), Some(face));
  }
  assert_eq!(Face::from_index(6), None);
}

// =========================================================================
// Batch 2: Adjacency
// =========================================================================

/// The face across an edge is the one whose normal the edge points at.
#[test]
fn test_neighbor_matches_edge_direction() {
  for face in Face::ALL {
    for edge in Edge::ALL {
      let toward = face.transform() * edge.direction().extend(0.0);
      let neighbor = face.neighbor(edge);
      assert!(
        neighbor.normal().abs_diff_eq(toward, 1e-12),
        "{:?} {:?} edge should border {:?}",
        face,
        edge,
        neighbor
      );
    }
  }
}

/// Adjacency is symmetric: some edge of the neighbor leads back.
#[test]
fn test_neighbor_is_symmetric() {
  for face in Face::ALL {
    for edge in Edge::ALL {
      let neighbor = face.neighbor(edge);
      assert!(
        Edge::ALL.iter().any(|&back| neighbor.neighbor(back) == face),
        "{:?} does not lead back to {:?}",
        neighbor,
        face
      );
    }
  }
}

// =========================================================================
// Batch 3: Sphere projection
// =========================================================================

#[test]
fn test_direction_is_unit() {
  for face in Face::ALL {
    for uv in [DVec2::ZERO, DVec2::ONE, DVec2::new(-0.3, 0.8)] {
      assert_relative_eq!(face.direction(uv).length(), 1.0, epsilon = 1e-12);
    }
  }
}

/// Projecting a face direction returns the same face and coordinates.
#[test]
fn test_project_inverts_direction() {
  for face in Face::ALL {
    let uv = DVec2::new(0.25, -0.5);
    let (projected, back) = Face::project(face.direction(uv));
    assert_eq!(projected, face);
    assert!(back.abs_diff_eq(uv, 1e-12), "{:?}: {:?} != {:?}", face, back, uv);
  }
}
