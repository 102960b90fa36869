//! Demo configuration: planet, engine settings and the flight path.

use anyhow::{bail, Context, Result};
use planet_lod::{PlanetConfig, PlanetDescriptor};
use serde::Deserialize;
use std::path::Path;

/// Root of the demo TOML file. Every section is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct DemoConfig {
	/// Planet to generate.
	pub planet: PlanetDescriptor,
	/// Engine settings.
	pub engine: PlanetConfig,
	/// Camera path.
	pub flight: Flight,
}

/// Fly-in/fly-out camera path.
///
/// The camera descends from `start_altitude` to `closest_altitude` over the
/// first half of the frames, then climbs back out.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Flight {
	/// Altitude above the highest terrain at the first and last frame.
	pub start_altitude: f64,
	/// Lowest altitude reached mid-flight.
	pub closest_altitude: f64,
	/// Total frames flown.
	pub frames: u32,
	/// Vertical field of view in degrees.
	pub fov_y_degrees: f64,
	/// Frames between progress reports.
	pub report_every: u32,
}

impl Default for Flight {
	fn default() -> Self {
		Self {
			start_altitude: 2000.0,
			closest_altitude: 2.0,
			frames: 600,
			fov_y_degrees: 45.0,
			report_every: 30,
		}
	}
}

impl DemoConfig {
	/// Load and validate a config file.
	pub fn load(path: &Path) -> Result<Self> {
		let content = std::fs::read_to_string(path)
			.with_context(|| format!("Failed to read config: {}", path.display()))?;
		let config: DemoConfig = toml::from_str(&content)
			.with_context(|| format!("Failed to parse config: {}", path.display()))?;
		config.validate()?;
		Ok(config)
	}

	/// Check everything the engine does not check itself.
	pub fn validate(&self) -> Result<()> {
		self.planet.validate().context("Invalid [planet] section")?;
		self.engine.validate().context("Invalid [engine] section")?;

		let flight = &self.flight;
		if !(flight.closest_altitude > 0.0 && flight.closest_altitude <= flight.start_altitude) {
			bail!(
				"Flight altitudes must satisfy 0 < closest ({}) <= start ({})",
				flight.closest_altitude,
				flight.start_altitude
			);
		}
		if flight.frames < 2 {
			bail!("Flight needs at least 2 frames, got {}", flight.frames);
		}
		if !(flight.fov_y_degrees > 0.0 && flight.fov_y_degrees < 180.0) {
			bail!("Field of view must be in (0, 180) degrees, got {}", flight.fov_y_degrees);
		}
		Ok(())
	}
}
