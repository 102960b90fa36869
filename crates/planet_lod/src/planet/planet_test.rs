use std::cell::Cell;
use std::rc::Rc;

use glam::{DAffine3, DVec3};

use super::*;
use crate::backend::SoftwareBackend;
use crate::config::DebugFlags;
use crate::constants::tile_memory_bytes;
use crate::metrics::MetricsSink;
use crate::scheduler::{QueueKind, RequestKind};

const FAR: f64 = 6000.0;
const NEAR: f64 = 64.5;

fn descriptor() -> PlanetDescriptor {
  PlanetDescriptor {
    seed: 7,
    brushes: 24,
    radius: 60.0,
    height: 4.0,
    lod_limit: 4,
  }
}

fn config() -> PlanetConfig {
  PlanetConfig {
    grid_size: 9,
    texture_size: 33,
    budget: SchedulerBudget::UNLIMITED,
    staleness_frames: 5,
    ..PlanetConfig::default()
  }
}

fn planet() -> Planet {
  Planet::new(descriptor(), config()).expect("valid planet")
}

/// Camera on the +Z axis looking at the planet center.
fn camera(distance: f64) -> Viewpoint {
  Viewpoint::look_at(
    DVec3::new(0.0, 0.0, distance),
    DVec3::ZERO,
    DVec3::Y,
    0.8,
    4.0 / 3.0,
    0.01,
    100_000.0,
  )
}

/// Run `frames` updates, returning the last frame's draws.
fn run(planet: &mut Planet, backend: &mut SoftwareBackend, viewpoint: &Viewpoint, frames: usize) -> Vec<DrawCall> {
  let mut draws = Vec::new();
  for _ in 0..frames {
    draws = planet.update(backend, viewpoint);
    backend.take_draws();
  }
  draws
}

/// Every tile's reference count equals the patches sampling it.
fn assert_tile_refs(planet: &Planet) {
  for (id, node) in planet.tree().iter() {
    let Some(tile) = node.tile.as_ref() else {
      continue;
    };
    let borrowers = planet
      .tree()
      .iter()
      .filter(|(_, other)| other.patch.as_ref().is_some_and(|p| p.tile_owner == id))
      .count();
    assert_eq!(tile.refs() as usize, borrowers, "tile {} reference count", node.key);
  }
}

/// Every patch's LOD distance covers its descendants'.
fn assert_lod_nesting(planet: &Planet) {
  let tree = planet.tree();
  for (id, node) in tree.iter() {
    let Some(patch) = node.patch.as_ref() else {
      continue;
    };
    for ancestor in tree.ancestors(id) {
      if let Some(outer) = tree.node(ancestor).patch.as_ref() {
        assert!(
          outer.lod_distance() >= patch.lod_distance(),
          "{} does not cover {}",
          outer.key,
          patch.key
        );
      }
    }
  }
}

/// Live backend resources match the tiles the tree holds.
fn assert_no_leaks(planet: &Planet, backend: &SoftwareBackend) {
  let tiles = planet.tree().iter().filter(|(_, node)| node.has_tile()).count();
  assert_eq!(backend.live_textures(), tiles * 2, "height and normal texture per tile");
  assert_eq!(backend.live_materials(), tiles);
}

// =========================================================================
// Batch 1: Distant camera
// =========================================================================

/// A distant camera sees one root patch per visible face and never splits.
#[test]
fn test_far_camera_draws_roots_only() {
  let mut planet = planet();
  let mut backend = SoftwareBackend::new();
  let draws = run(&mut planet, &mut backend, &camera(FAR), 6);

  assert_eq!(draws.len(), 5, "the back face is beyond the horizon");
  assert!(draws.iter().all(|d| d.key.lod == 0));
  assert!(draws.iter().all(|d| d.key.face != Face::Back));
  assert_eq!(planet.tree().len(), 6);
  for (_, node) in planet.tree().iter() {
    assert!(!node.requests.contains(RequestKind::Split));
  }
  assert_no_leaks(&planet, &backend);
}

/// Nothing is drawn before the first tiles exist, and patches follow as
/// soon as the scheduler has produced them.
#[test]
fn test_first_frames_fill_in() {
  let mut planet = planet();
  let mut backend = SoftwareBackend::new();
  let viewpoint = camera(FAR);

  assert!(planet.update(&mut backend, &viewpoint).is_empty());
  assert_eq!(planet.stats().inline_queue, 0, "patch requests turned into tile requests");
  assert_eq!(planet.stats().render_queue, 6);

  assert!(planet.update(&mut backend, &viewpoint).is_empty());
  assert_eq!(planet.stats().scheduler.tiles_completed, 6);
  assert_eq!(planet.stats().renderables, 6);

  assert_eq!(planet.update(&mut backend, &viewpoint).len(), 5);
}

#[test]
fn test_stats_snapshot() {
  let mut planet = planet();
  let mut backend = SoftwareBackend::new();
  let frames = Rc::new(Cell::new(0u64));

  struct Counting(Rc<Cell<u64>>);
  impl MetricsSink for Counting {
    fn record(&mut self, stats: &PlanetStats) {
      self.0.set(stats.frame);
    }
  }
  planet.set_metrics_sink(Box::new(Counting(frames.clone())));
  run(&mut planet, &mut backend, &camera(FAR), 4);

  let stats = planet.stats();
  assert_eq!(frames.get(), 4);
  assert_eq!(stats.frame, 4);
  assert_eq!(stats.total_nodes, 6);
  assert_eq!(stats.open_nodes, 0);
  assert_eq!(stats.tiles, 6);
  assert_eq!(stats.hot_tiles, 6);
  assert_eq!(stats.renderables, 6);
  assert_eq!(stats.rendered, 5);
  assert_eq!(stats.patches_per_level[0], 5);
  assert_eq!(stats.queued(), 0);
  assert_eq!(stats.gpu_memory, 6 * tile_memory_bytes(33));
}

/// Moving the planet moves its draws, not its detail.
#[test]
fn test_transform_applies_to_draws() {
  let offset = DVec3::new(1000.0, -250.0, 0.0);
  let mut planet = planet();
  planet.set_transform(DAffine3::from_translation(offset));
  let mut backend = SoftwareBackend::new();
  let viewpoint = Viewpoint::look_at(
    offset + DVec3::new(0.0, 0.0, FAR),
    offset,
    DVec3::Y,
    0.8,
    4.0 / 3.0,
    0.01,
    100_000.0,
  );
  let draws = run(&mut planet, &mut backend, &viewpoint, 6);

  assert_eq!(draws.len(), 5);
  for draw in &draws {
    let local = draw.origin;
    assert!((draw.world_origin() - (local + offset)).length() < 1e-9);
  }
}

// =========================================================================
// Batch 2: Approach and retreat
// =========================================================================

/// Flying down to the surface refines to the deepest level without ever
/// leaving the face blank.
#[test]
fn test_approach_reaches_lod_limit() {
  let mut planet = planet();
  let mut backend = SoftwareBackend::new();
  let viewpoint = camera(NEAR);

  let mut front_seen = false;
  let mut deepest = 0;
  for _ in 0..300 {
    let draws = planet.update(&mut backend, &viewpoint);
    backend.take_draws();
    let front = draws.iter().filter(|d| d.key.face == Face::Front).count();
    if front_seen {
      assert!(front > 0, "front face went blank at frame {}", planet.frame());
    }
    front_seen |= front > 0;
    deepest = draws.iter().map(|d| d.key.lod).max().unwrap_or(0).max(deepest);
    if deepest == 4 {
      break;
    }
  }

  assert_eq!(deepest, 4, "never refined to the lod limit");
  assert!(planet.tree().iter().all(|(_, node)| node.key.lod <= 4));
  assert_tile_refs(&planet);
  assert_lod_nesting(&planet);
  assert_no_leaks(&planet, &backend);
}

/// Split nodes always have four children.
#[test]
fn test_children_come_in_fours() {
  let mut planet = planet();
  let mut backend = SoftwareBackend::new();
  run(&mut planet, &mut backend, &camera(NEAR), 40);

  let tree = planet.tree();
  assert!(tree.len() > 6);
  for (id, node) in tree.iter() {
    if let Some(children) = node.children {
      for child in children {
        assert_eq!(tree.node(child).parent, Some(id));
      }
    }
  }
  assert_eq!((tree.len() - 6) % 4, 0);
}

/// Backing away collapses the subtree and frees the children's tiles.
#[test]
fn test_retreat_merges_back_to_roots() {
  let mut planet = planet();
  let mut backend = SoftwareBackend::new();
  run(&mut planet, &mut backend, &camera(NEAR), 40);
  assert!(planet.tree().len() > 6);

  let draws = run(&mut planet, &mut backend, &camera(FAR), 60);

  assert_eq!(planet.tree().len(), 6);
  assert_eq!(planet.tree().open_len(), 0);
  assert!(draws.iter().all(|d| d.key.lod == 0));
  assert_eq!(draws.len(), 5);
  assert_tile_refs(&planet);
  assert_no_leaks(&planet, &backend);
}

/// Frozen LOD keeps judging against the last viewpoint.
#[test]
fn test_lod_freeze_keeps_detail() {
  let mut planet = planet();
  let mut backend = SoftwareBackend::new();
  run(&mut planet, &mut backend, &camera(FAR), 6);

  planet.set_debug(DebugFlags {
    lod_freeze: true,
    ..DebugFlags::default()
  });
  run(&mut planet, &mut backend, &camera(NEAR), 20);
  assert_eq!(planet.tree().len(), 6, "frozen far viewpoint never splits");

  planet.set_debug(DebugFlags::default());
  run(&mut planet, &mut backend, &camera(NEAR), 20);
  assert!(planet.tree().len() > 6);
}

#[test]
fn test_split_freeze_stops_refinement() {
  let mut planet = Planet::new(
    descriptor(),
    PlanetConfig {
      debug: DebugFlags {
        split_freeze: true,
        ..DebugFlags::default()
      },
      ..config()
    },
  )
  .expect("valid planet");
  let mut backend = SoftwareBackend::new();
  let draws = run(&mut planet, &mut backend, &camera(NEAR), 20);

  assert_eq!(planet.tree().len(), 6);
  assert!(draws.iter().any(|d| d.key.face == Face::Front), "roots still drawn");
}

/// Under a tiny tile cache, cold leaf tiles are evicted and the tree stays
/// consistent.
#[test]
fn test_page_out_respects_cache_limit() {
  let mut planet = Planet::new(
    descriptor(),
    PlanetConfig {
      // Every patch samples its own tile, so leaves hold evictable tiles.
      tile_reuse_limit: 0,
      max_tiles: 8,
      page_frames: 2,
      staleness_frames: 1000,
      ..config()
    },
  )
  .expect("valid planet");
  let mut backend = SoftwareBackend::new();
  run(&mut planet, &mut backend, &camera(NEAR), 40);
  // Look the other way so the refined leaves go cold.
  let away = Viewpoint::look_at(
    DVec3::new(0.0, 0.0, NEAR),
    DVec3::new(0.0, 0.0, 1000.0),
    DVec3::Y,
    0.8,
    4.0 / 3.0,
    0.01,
    100_000.0,
  );
  run(&mut planet, &mut backend, &away, 10);

  let stats = planet.stats();
  assert!(stats.paged_out > 0, "no tile was paged out");
  assert_tile_refs(&planet);
  assert_no_leaks(&planet, &backend);
}

// =========================================================================
// Batch 3: Request lifetime
// =========================================================================

/// After a jump back out, the refinement tiles nobody asks for any more are
/// dropped unsynthesized and every visible face stays covered.
#[test]
fn test_retreat_drops_refinement_work() {
  let mut planet = Planet::new(
    descriptor(),
    PlanetConfig {
      // Every patch needs its own tile, at about one tile per frame.
      texture_size: 9,
      budget: SchedulerBudget::DEFAULT,
      ..config()
    },
  )
  .expect("valid planet");
  let mut backend = SoftwareBackend::new();
  run(&mut planet, &mut backend, &camera(NEAR), 15);

  let tree = planet.tree();
  for face in Face::ALL {
    assert!(tree.node(planet.root(face)).has_patch(), "{:?} root starved", face);
  }
  let pending = planet.scheduler().queue(QueueKind::Render).len();
  assert!(pending > 0, "approach left no refinement work queued");
  assert!(planet
    .scheduler()
    .queue(QueueKind::Render)
    .iter()
    .all(|r| tree.node(r.node).key.lod > 0));

  let far = camera(FAR);
  let draws = planet.update(&mut backend, &far);
  backend.take_draws();
  assert_eq!(draws.len(), 5, "every visible face drawn on the first far frame");
  let stats = planet.stats();
  assert_eq!(stats.scheduler.tile_steps, 0, "stale tiles were synthesized");
  assert_eq!(stats.scheduler.tiles_completed, 0);
  assert!(stats.scheduler.stale_jobs >= pending);
  assert_eq!(stats.render_queue, 0);
  assert!(planet.synthesizer().is_idle());
  for (_, node) in planet.tree().iter() {
    assert!(!node.requests.contains(RequestKind::BuildTile), "{} still wants a tile", node.key);
  }

  for _ in 0..5 {
    let draws = planet.update(&mut backend, &far);
    backend.take_draws();
    assert_eq!(draws.len(), 5);
    assert_eq!(planet.stats().scheduler.tiles_completed, 0);
  }
  assert_tile_refs(&planet);
  assert_no_leaks(&planet, &backend);
}

/// A node whose own tile arrived while its patch still samples an ancestor
/// asks for a rebuild from that tile, not for another tile.
#[test]
fn test_landed_tile_requests_rebuild() {
  let mut planet = planet();
  let mut backend = SoftwareBackend::new();
  run(&mut planet, &mut backend, &camera(FAR), 4);

  let root = planet.root(Face::Front);
  let children = planet.tree.split(root, planet.frame);
  for child in children {
    let key = planet.tree.node(child).key;
    let patch = match planet.tree.node(root).tile.as_ref() {
      Some(tile) => planet.builder.build(key, root, tile),
      None => panic!("root tile missing"),
    };
    planet.tree.attach_patch(child, patch);
    planet.tree.propagate_lod_distances(child);
  }
  let child = children[0];
  let key = planet.tree.node(child).key;
  let tile = planet.synthesizer.synthesize(&mut backend, child, key);
  planet.tree.node_mut(child).attach_tile(tile);

  planet.set_budget(SchedulerBudget::PAUSED);
  planet.update(&mut backend, &camera(NEAR));
  let node = planet.tree().node(child);
  assert!(node.patch.as_ref().is_some_and(|p| p.borrows_tile()));
  assert!(node.requests.contains(RequestKind::BuildRenderable));
  assert!(!node.requests.contains(RequestKind::BuildTile));

  planet.set_budget(SchedulerBudget::UNLIMITED);
  planet.update(&mut backend, &camera(NEAR));
  let node = planet.tree().node(child);
  assert!(node.patch.as_ref().is_some_and(|p| !p.borrows_tile()), "patch not rebuilt from own tile");
  assert_tile_refs(&planet);
}

// =========================================================================
// Batch 4: Budget and teardown
// =========================================================================

/// A zero budget defers every request.
#[test]
fn test_paused_budget_defers_everything() {
  let mut planet = Planet::new(
    descriptor(),
    PlanetConfig {
      budget: SchedulerBudget::PAUSED,
      ..config()
    },
  )
  .expect("valid planet");
  let mut backend = SoftwareBackend::new();
  let draws = run(&mut planet, &mut backend, &camera(FAR), 10);

  assert!(draws.is_empty());
  assert_eq!(planet.scheduler().pending(), 6, "one patch request per root");
  assert_eq!(backend.live_textures(), 0);
  assert_eq!(backend.live_targets(), 0);
}

/// Retracting a node mid-synthesis resets the pipeline without leaking.
#[test]
fn test_unrequest_mid_synthesis() {
  let mut planet = Planet::new(
    descriptor(),
    PlanetConfig {
      budget: SchedulerBudget {
        render_units: 2,
        ..SchedulerBudget::DEFAULT
      },
      ..config()
    },
  )
  .expect("valid planet");
  let mut backend = SoftwareBackend::new();
  let viewpoint = camera(FAR);

  let mut frames = 0;
  while backend.live_textures() == 0 || planet.synthesizer().is_idle() {
    planet.update(&mut backend, &viewpoint);
    frames += 1;
    assert!(frames < 10, "synthesis never produced a texture");
  }
  let active = planet.synthesizer().active_node().expect("job in flight");
  assert_eq!(planet.scheduler().in_flight(), Some(active));

  assert_eq!(planet.unrequest(&mut backend, active), 1);
  assert!(planet.synthesizer().is_idle());
  assert_eq!(planet.scheduler().in_flight(), None);
  assert!(planet.tree().node(active).requests.is_empty());
  assert_eq!(backend.live_textures(), 0);
  assert_eq!(backend.live_materials(), 0);

  // The planet recovers on its own.
  let draws = run(&mut planet, &mut backend, &viewpoint, 60);
  assert_eq!(draws.len(), 5);
  assert_no_leaks(&planet, &backend);
}

#[test]
fn test_destroy_frees_everything() {
  let mut planet = planet();
  let mut backend = SoftwareBackend::new();
  run(&mut planet, &mut backend, &camera(NEAR), 30);
  assert!(backend.live_textures() > 0);

  planet.destroy(&mut backend);
  assert_eq!(backend.live_targets(), 0);
  assert_eq!(backend.live_textures(), 0);
  assert_eq!(backend.live_materials(), 0);
}

/// A new seed rebuilds the planet from scratch with different terrain.
#[test]
fn test_refresh_rebuilds() {
  let mut planet = planet();
  let mut backend = SoftwareBackend::new();
  let viewpoint = camera(FAR);
  let before = run(&mut planet, &mut backend, &viewpoint, 6);

  planet
    .refresh(
      &mut backend,
      PlanetDescriptor {
        seed: 8,
        ..descriptor()
      },
    )
    .expect("valid descriptor");
  assert_eq!(planet.tree().len(), 6);
  assert_eq!(backend.live_textures(), 0);
  assert_eq!(planet.scheduler().pending(), 0);

  let after = run(&mut planet, &mut backend, &viewpoint, 6);
  assert_eq!(after.len(), before.len());
  let front = |draws: &[DrawCall]| {
    draws
      .iter()
      .find(|d| d.key.face == Face::Front)
      .map(|d| d.positions.clone())
      .expect("front drawn")
  };
  assert_ne!(front(&before)[..], front(&after)[..], "terrain follows the seed");
}

#[test]
fn test_invalid_config_rejected() {
  let result = Planet::new(
    descriptor(),
    PlanetConfig {
      grid_size: 10,
      ..config()
    },
  );
  assert!(matches!(result, Err(ConfigError::GridSize(10))));

  let result = Planet::new(
    PlanetDescriptor {
      radius: -1.0,
      ..descriptor()
    },
    config(),
  );
  assert!(matches!(result, Err(ConfigError::Radius(_))));
}
