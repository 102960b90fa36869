//! Per-frame work budget for the request scheduler.
//!
//! Each queue gets a fixed number of weighted units per frame. Tile synthesis
//! steps and structural changes cost more than rebuilding a patch, so a frame
//! that hits a burst of splits degrades to coarser detail instead of stalling.

use super::RequestKind;

/// Weighted per-frame budget for both scheduler queues.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SchedulerBudget {
	/// Units the render queue (tile synthesis) may spend per frame.
	pub render_units: u32,
	/// Units the inline queue (patches, splits, merges) may spend per frame.
	pub inline_units: u32,
	/// Cost of one tile synthesis step.
	pub tile_step_cost: u32,
	/// Cost of building one patch.
	pub renderable_cost: u32,
	/// Cost of splitting one node.
	pub split_cost: u32,
	/// Cost of merging one node.
	pub merge_cost: u32,
}

impl SchedulerBudget {
	/// Default budget: roughly one tile and a handful of structural changes per frame.
	pub const DEFAULT: Self = Self {
		render_units: 10,
		inline_units: 24,
		tile_step_cost: 2,
		renderable_cost: 1,
		split_cost: 4,
		merge_cost: 4,
	};

	/// Unlimited budget for testing or offline generation.
	pub const UNLIMITED: Self = Self {
		render_units: u32::MAX,
		inline_units: u32::MAX,
		..Self::DEFAULT
	};

	/// Zero budget: every request is deferred.
	pub const PAUSED: Self = Self {
		render_units: 0,
		inline_units: 0,
		..Self::DEFAULT
	};

	/// Weighted cost of one job of the given kind.
	#[inline]
	pub fn cost(&self, kind: RequestKind) -> u32 {
		match kind {
			RequestKind::BuildTile => self.tile_step_cost,
			RequestKind::BuildRenderable => self.renderable_cost,
			RequestKind::Split => self.split_cost,
			RequestKind::Merge => self.merge_cost,
		}
	}

	/// Check if the render queue can spend `cost` more units.
	#[inline]
	pub fn can_render(&self, spent: u32, cost: u32) -> bool {
		spent.saturating_add(cost) <= self.render_units
	}

	/// Check if the inline queue can spend `cost` more units.
	#[inline]
	pub fn can_inline(&self, spent: u32, cost: u32) -> bool {
		spent.saturating_add(cost) <= self.inline_units
	}
}

impl Default for SchedulerBudget {
	fn default() -> Self {
		Self::DEFAULT
	}
}

/// Work performed by the scheduler during one frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SchedulerStats {
	/// Tile synthesis steps executed.
	pub tile_steps: usize,
	/// Tiles that finished synthesis.
	pub tiles_completed: usize,
	/// Patches built.
	pub renderables_built: usize,
	/// Nodes split.
	pub splits: usize,
	/// Nodes merged.
	pub merges: usize,
	/// Jobs dropped because their node or condition went away.
	pub stale_jobs: usize,
	/// Units spent by the render queue.
	pub render_spent: u32,
	/// Units spent by the inline queue.
	pub inline_spent: u32,
}

impl SchedulerStats {
	/// Total jobs that changed the tree.
	#[inline]
	pub fn structural_changes(&self) -> usize {
		self.splits + self.merges
	}

	/// Total units spent across both queues.
	#[inline]
	pub fn total_spent(&self) -> u64 {
		self.render_spent as u64 + self.inline_spent as u64
	}
}
