//! Headless planet flight.
//!
//! Flies a camera from orbit down to the surface and back out again over the
//! software backend, logging what the LOD engine does along the way. Set
//! `RUST_LOG=planet_lod=debug` to see every split, merge and page-out.

mod config;

use anyhow::{bail, Context, Result};
use clap::Parser;
use glam::DVec3;
use planet_lod::metrics::RollingWindow;
use planet_lod::{Planet, SchedulerBudget, SoftwareBackend, Viewpoint};
use std::path::PathBuf;

use config::DemoConfig;

/// Headless fly-in/fly-out driver for the planet LOD engine.
#[derive(Parser, Debug)]
#[command(name = "planet_demo")]
#[command(about = "Flies a camera to a procedural planet and back, reporting LOD statistics")]
struct Args {
	/// Path to configuration TOML file (defaults apply when omitted).
	#[arg(short, long)]
	config: Option<PathBuf>,

	/// Override the planet seed.
	#[arg(long)]
	seed: Option<u64>,

	/// Override the planet's deepest level.
	#[arg(long)]
	lod_limit: Option<u32>,

	/// Override the number of frames flown.
	#[arg(long)]
	frames: Option<u32>,

	/// Remove the per-frame scheduler budget.
	#[arg(long)]
	unlimited: bool,
}

fn main() -> Result<()> {
	env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
	let args = Args::parse();

	let mut config = match &args.config {
		Some(path) => {
			log::info!("Loading config from: {}", path.display());
			DemoConfig::load(path)?
		}
		None => DemoConfig::default(),
	};
	if let Some(seed) = args.seed {
		config.planet.seed = seed;
	}
	if let Some(lod_limit) = args.lod_limit {
		config.planet.lod_limit = lod_limit;
	}
	if let Some(frames) = args.frames {
		config.flight.frames = frames;
	}
	if args.unlimited {
		config.engine.budget = SchedulerBudget::UNLIMITED;
	}
	config.validate().context("Invalid configuration after overrides")?;

	fly(&config)
}

/// Distance from the planet center at `frame`: geometric descent, then the
/// same path back out.
fn camera_distance(config: &DemoConfig, frame: u32) -> f64 {
	let flight = &config.flight;
	let half = (flight.frames / 2).max(1) as f64;
	let t = if (frame as f64) < half {
		frame as f64 / half
	} else {
		(flight.frames - 1 - frame) as f64 / half
	};
	let altitude = flight.start_altitude * (flight.closest_altitude / flight.start_altitude).powf(t.clamp(0.0, 1.0));
	config.planet.outer_radius() + altitude
}

fn fly(config: &DemoConfig) -> Result<()> {
	let mut planet = Planet::new(config.planet.clone(), config.engine.clone()).context("Failed to create planet")?;
	let mut backend = SoftwareBackend::new();
	let mut timings = RollingWindow::<u64>::default();

	let engine = &config.engine;
	let aspect = engine.screen_width as f64 / engine.screen_height as f64;
	let fov_y = config.flight.fov_y_degrees.to_radians();
	let heading = DVec3::new(0.3, 0.2, 1.0).normalize();

	log::info!(
		"Flying {} frames over planet seed {} (radius {}, height {}, lod limit {})",
		config.flight.frames,
		config.planet.seed,
		config.planet.radius,
		config.planet.height,
		planet.lod_limit()
	);

	let mut deepest = 0;
	for frame in 0..config.flight.frames {
		let distance = camera_distance(config, frame);
		let eye = heading * distance;
		let viewpoint = Viewpoint::look_at(eye, DVec3::ZERO, DVec3::Y, fov_y, aspect, 0.01, distance * 4.0);

		let draws = planet.update(&mut backend, &viewpoint);
		backend.take_draws();
		deepest = draws.iter().map(|d| d.key.lod).fold(deepest, u32::max);

		let stats = planet.stats();
		timings.push(stats.update_us);
		if frame % config.flight.report_every.max(1) == 0 {
			log::info!(
				"frame {:>4}  alt {:>9.2}  patches {:>4}  nodes {:>5}  open {:>4}  tiles {:>4} ({:>6.1} MB)  queued {:>4}  {:>6.0} us",
				frame,
				distance - config.planet.outer_radius(),
				stats.rendered,
				stats.total_nodes,
				stats.open_nodes,
				stats.tiles,
				stats.gpu_memory_mb(),
				stats.queued(),
				timings.average()
			);
		}
	}

	let stats = planet.stats().clone();
	log::info!(
		"Done: deepest level {}, {} nodes, {} paged out, update {:.0} us avg ({:?} us min/max)",
		deepest,
		stats.total_nodes,
		stats.paged_out,
		timings.average(),
		timings.min_max()
	);

	planet.destroy(&mut backend);
	let leaked = (backend.live_targets(), backend.live_textures(), backend.live_materials());
	if leaked != (0, 0, 0) {
		bail!(
			"Backend resources leaked: {} targets, {} textures, {} materials",
			leaked.0,
			leaked.1,
			leaked.2
		);
	}
	Ok(())
}
