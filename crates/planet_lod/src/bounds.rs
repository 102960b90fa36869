//! Axis-aligned bounding box with double precision for planet-scale patches.

use glam::DVec3;

/// Double-precision axis-aligned bounding box in planet-local space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Aabb {
	/// Minimum corner (inclusive).
	pub min: DVec3,
	/// Maximum corner (inclusive).
	pub max: DVec3,
}

impl Aabb {
	/// Inverted box that any `extend` call replaces.
	pub const EMPTY: Self = Self {
		min: DVec3::splat(f64::INFINITY),
		max: DVec3::splat(f64::NEG_INFINITY),
	};

	/// Create a new AABB from min and max corners.
	///
	/// # Panics
	/// Debug-asserts that min <= max on all axes.
	pub fn new(min: DVec3, max: DVec3) -> Self {
		debug_assert!(
			min.x <= max.x && min.y <= max.y && min.z <= max.z,
			"AABB min must be <= max on all axes"
		);
		Self { min, max }
	}

	/// Smallest box containing every point, or `EMPTY` for no points.
	pub fn from_points(points: impl IntoIterator<Item = DVec3>) -> Self {
		let mut aabb = Self::EMPTY;
		for point in points {
			aabb.extend(point);
		}
		aabb
	}

	/// Grow to include a point.
	#[inline]
	pub fn extend(&mut self, point: DVec3) {
		self.min = self.min.min(point);
		self.max = self.max.max(point);
	}

	/// True until the first point is added.
	#[inline]
	pub fn is_empty(&self) -> bool {
		self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
	}

	/// Check if this AABB overlaps with another.
	#[inline]
	pub fn overlaps(&self, other: &Aabb) -> bool {
		self.min.cmple(other.max).all() && self.max.cmpge(other.min).all()
	}

	/// Check if this AABB contains a point.
	#[inline]
	pub fn contains_point(&self, point: DVec3) -> bool {
		self.min.cmple(point).all() && self.max.cmpge(point).all()
	}

	/// Get the size of the AABB (max - min).
	#[inline]
	pub fn size(&self) -> DVec3 {
		self.max - self.min
	}

	/// Get the center of the AABB.
	#[inline]
	pub fn center(&self) -> DVec3 {
		(self.min + self.max) * 0.5
	}

	/// Radius of the sphere through the box corners.
	#[inline]
	pub fn radius(&self) -> f64 {
		self.size().length() * 0.5
	}
}

impl Default for Aabb {
	fn default() -> Self {
		Self::EMPTY
	}
}
