//! Procedural brush stamps that build the planet height field.
//!
//! A brush is a quad tangent to the unit sphere. Looking out from the planet
//! center, every direction that pierces the quad picks up the brush's carve
//! intensity weighted by a radial falloff, plus a little value noise. The
//! whole set is generated from the planet seed, so a seed always reproduces
//! the same planet.

use glam::{DVec2, DVec3};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::constants::{BRUSH_NOISE_INTENSITY, BRUSH_NOISE_SCALE};

/// One oriented brush stamp.
#[derive(Clone, Debug, PartialEq)]
pub struct Brush {
  /// Unit direction of the quad center.
  pub position: DVec3,
  /// Tangent axis scaled by `scale.x`.
  pub right: DVec3,
  /// Tangent axis scaled by `scale.y`.
  pub front: DVec3,
  /// Half extents of the quad along `right` and `front`.
  pub scale: DVec2,
  /// Height added at the brush center (negative carves).
  pub carve: f64,
  /// Amplitude of the noise riding on the falloff.
  pub noise_intensity: f64,
  /// Noise frequency scale.
  pub noise_scale: f64,
  /// Noise domain offset, decorrelates overlapping brushes.
  pub noise_offset: DVec2,
  /// Smallest `direction . position` that can still hit the quad.
  min_dot: f64,
}

impl Brush {
  /// Orient a brush at `position` with its front axis derived from `up`.
  pub fn new(position: DVec3, up: DVec3, scale: DVec2, carve: f64, noise_offset: DVec2) -> Self {
    let position = position.normalize();
    let mut right = position.cross(up);
    if right.length_squared() < 1e-12 {
      right = position.any_orthonormal_vector();
    }
    let right = right.normalize();
    let front = position.cross(right).normalize();
    let reach = scale.max_element();
    Self {
      position,
      right,
      front,
      scale,
      carve,
      noise_intensity: BRUSH_NOISE_INTENSITY,
      noise_scale: BRUSH_NOISE_SCALE,
      noise_offset,
      min_dot: 1.0 / (1.0 + reach * reach).sqrt(),
    }
  }

  /// Height contribution along a unit direction.
  #[inline]
  pub fn sample(&self, direction: DVec3, noise_seed: u32) -> f64 {
    let facing = direction.dot(self.position);
    if facing < self.min_dot {
      return 0.0;
    }
    // Ray from the planet center to the tangent plane at `position`.
    let offset = direction / facing - self.position;
    let a = offset.dot(self.right) / self.scale.x;
    let b = offset.dot(self.front) / self.scale.y;
    let r2 = a * a + b * b;
    if r2 >= 1.0 {
      return 0.0;
    }
    let falloff = (1.0 - r2) * (1.0 - r2);
    let uv = DVec2::new(a + 1.0, b + 1.0) * 0.5 / self.noise_scale + self.noise_offset;
    let noise = value_noise_2d(uv, noise_seed);
    falloff * (self.carve + self.noise_intensity * noise)
  }
}

/// Every brush of one planet.
#[derive(Clone, Debug)]
pub struct BrushSet {
  seed: u64,
  noise_seed: u32,
  brushes: Vec<Brush>,
}

impl BrushSet {
  /// Generate `count` brushes from `seed`.
  ///
  /// Per brush: a random unit position, a random up vector, scale
  /// `r * 0.95 + 0.05`, aspect `r + 0.5`, carve `r * 0.5 - 0.25` and a noise
  /// offset in `[-1, 1]^2`, drawn in that order.
  pub fn generate(seed: u64, count: u32) -> Self {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let signed = |rng: &mut ChaCha8Rng| rng.random::<f64>() * 2.0 - 1.0;

    let brushes = (0..count)
      .map(|_| {
        let mut position = DVec3::new(signed(&mut rng), signed(&mut rng), signed(&mut rng));
        if position.length_squared() < 1e-12 {
          position = DVec3::Z;
        }
        let up = DVec3::new(signed(&mut rng), signed(&mut rng), signed(&mut rng));
        let size = rng.random::<f64>() * 0.95 + 0.05;
        let aspect = rng.random::<f64>() + 0.5;
        let carve = rng.random::<f64>() * 0.5 - 0.25;
        let noise_offset = DVec2::new(signed(&mut rng), signed(&mut rng));
        Brush::new(position, up, DVec2::new(size, size * aspect), carve, noise_offset)
      })
      .collect();

    Self {
      seed,
      noise_seed: (seed ^ (seed >> 32)) as u32,
      brushes,
    }
  }

  pub fn seed(&self) -> u64 {
    self.seed
  }

  pub fn len(&self) -> usize {
    self.brushes.len()
  }

  pub fn is_empty(&self) -> bool {
    self.brushes.is_empty()
  }

  pub fn iter(&self) -> impl Iterator<Item = &Brush> {
    self.brushes.iter()
  }

  /// Summed contribution of every brush along a unit direction.
  #[inline]
  pub fn sample(&self, direction: DVec3) -> f64 {
    self
      .brushes
      .iter()
      .map(|brush| brush.sample(direction, self.noise_seed))
      .sum()
  }
}

/// 2D value noise in `[-1, 1]`.
fn value_noise_2d(p: DVec2, seed: u32) -> f64 {
  let ix = p.x.floor() as i32;
  let iy = p.y.floor() as i32;
  let ux = smoothstep(p.x - p.x.floor());
  let uy = smoothstep(p.y - p.y.floor());

  let c00 = hash_to_float(hash_2d(ix, iy, seed));
  let c10 = hash_to_float(hash_2d(ix + 1, iy, seed));
  let c01 = hash_to_float(hash_2d(ix, iy + 1, seed));
  let c11 = hash_to_float(hash_2d(ix + 1, iy + 1, seed));

  lerp(lerp(c00, c10, ux), lerp(c01, c11, ux), uy)
}

#[inline]
fn smoothstep(t: f64) -> f64 {
  t * t * (3.0 - 2.0 * t)
}

#[inline]
fn lerp(a: f64, b: f64, t: f64) -> f64 {
  a + (b - a) * t
}

/// Hash 2D integer coordinates to u32.
#[inline]
fn hash_2d(x: i32, y: i32, seed: u32) -> u32 {
  let mut h = seed;
  h ^= x as u32;
  h = h.wrapping_mul(0x85ebca6b);
  h ^= y as u32;
  h = h.wrapping_mul(0xc2b2ae35);
  h ^= h >> 15;
  h
}

/// Convert hash to float in [-1, 1].
#[inline]
fn hash_to_float(h: u32) -> f64 {
  (h as f64 / u32::MAX as f64) * 2.0 - 1.0
}

#[cfg(test)]
#[path = "brush_test.rs"]
mod brush_test;
