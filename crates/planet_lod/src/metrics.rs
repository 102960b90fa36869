//! Planet statistics and the sinks they are reported to.
//!
//! The planet fills a [`PlanetStats`] snapshot at the end of every update and
//! hands it to its [`MetricsSink`]. Nothing is global: each planet owns its
//! sink, and the default [`NullSink`] discards everything.
//!
//! # Usage
//!
//! ```ignore
//! use planet_lod::metrics::RecordingSink;
//!
//! planet.set_metrics_sink(Box::new(RecordingSink::new(256)));
//! planet.update(&mut backend, &viewpoint);
//! println!("{} patches", planet.stats().rendered);
//! ```

use std::collections::VecDeque;

use crate::scheduler::SchedulerStats;

/// Levels tracked by the per-level patch histogram.
pub const HISTOGRAM_LEVELS: usize = 16;

/// Rolling window for storing recent values (e.g., timing history).
#[derive(Debug, Clone)]
pub struct RollingWindow<T> {
    buffer: VecDeque<T>,
    capacity: usize,
}

impl<T> RollingWindow<T> {
    /// Create a new rolling window with the given capacity.
    pub fn new(capacity: usize) -> Self {
        Self {
            buffer: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Push a new value, evicting the oldest if at capacity.
    pub fn push(&mut self, value: T) {
        if self.capacity == 0 {
            return;
        }
        if self.buffer.len() >= self.capacity {
            self.buffer.pop_front();
        }
        self.buffer.push_back(value);
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
    }

    /// Iterate over values (oldest to newest).
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.buffer.iter()
    }

    /// Most recent value.
    pub fn last(&self) -> Option<&T> {
        self.buffer.back()
    }
}

impl<T: Copy + Default + std::ops::Add<Output = T>> RollingWindow<T> {
    pub fn sum(&self) -> T {
        self.buffer.iter().copied().fold(T::default(), |acc, x| acc + x)
    }
}

impl RollingWindow<u64> {
    pub fn average(&self) -> f64 {
        if self.buffer.is_empty() {
            0.0
        } else {
            self.sum() as f64 / self.buffer.len() as f64
        }
    }

    pub fn min_max(&self) -> Option<(u64, u64)> {
        let min = *self.buffer.iter().min()?;
        let max = *self.buffer.iter().max()?;
        Some((min, max))
    }
}

impl Default for RollingWindow<u64> {
    fn default() -> Self {
        Self::new(128) // ~2 seconds at 60fps
    }
}

/// Snapshot of one planet after an update.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlanetStats {
    /// Frame this snapshot was taken at.
    pub frame: u64,

    // Tree
    /// Live quadtree nodes, roots included.
    pub total_nodes: usize,
    /// Split nodes whose children are all leaves.
    pub open_nodes: usize,
    /// Nodes whose tile was evicted.
    pub paged_out: usize,

    // Resources
    /// Resident tiles.
    pub tiles: usize,
    /// Tiles with no borrower besides their own node's patch.
    pub hot_tiles: usize,
    /// Patches alive in the tree.
    pub renderables: usize,
    /// Approximate GPU memory held by tiles.
    pub gpu_memory: u64,

    // Frame
    /// Patches submitted this frame.
    pub rendered: usize,
    /// Patches submitted this frame at each level (index = level).
    pub patches_per_level: [u32; HISTOGRAM_LEVELS],
    /// Requests waiting in the render queue.
    pub render_queue: usize,
    /// Requests waiting in the inline queue.
    pub inline_queue: usize,
    /// Work done by the scheduler this frame.
    pub scheduler: SchedulerStats,
    /// Wall time of the update in microseconds.
    pub update_us: u64,
}

impl PlanetStats {
    /// Count a patch submitted at `lod`. Deeper levels share the last bucket.
    pub fn record_patch(&mut self, lod: u32) {
        let level = (lod as usize).min(HISTOGRAM_LEVELS - 1);
        self.patches_per_level[level] += 1;
        self.rendered += 1;
    }

    /// Requests waiting in both queues.
    #[inline]
    pub fn queued(&self) -> usize {
        self.render_queue + self.inline_queue
    }

    /// GPU memory estimate in megabytes.
    pub fn gpu_memory_mb(&self) -> f64 {
        self.gpu_memory as f64 / 1_048_576.0
    }
}

/// Receiver of per-frame planet statistics.
pub trait MetricsSink {
    fn record(&mut self, stats: &PlanetStats);
}

/// Sink that drops every snapshot.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl MetricsSink for NullSink {
    fn record(&mut self, _stats: &PlanetStats) {}
}

/// Sink that keeps a bounded history of snapshots and update timings.
#[derive(Debug, Clone)]
pub struct RecordingSink {
    history: RollingWindow<PlanetStats>,
    update_timings: RollingWindow<u64>,
    /// Snapshots recorded since creation.
    pub total_frames: u64,
}

impl RecordingSink {
    pub fn new(capacity: usize) -> Self {
        Self {
            history: RollingWindow::new(capacity),
            update_timings: RollingWindow::new(capacity),
            total_frames: 0,
        }
    }

    /// Most recent snapshot.
    pub fn last(&self) -> Option<&PlanetStats> {
        self.history.last()
    }

    /// Snapshots, oldest to newest.
    pub fn history(&self) -> impl Iterator<Item = &PlanetStats> {
        self.history.iter()
    }

    pub fn update_timings(&self) -> &RollingWindow<u64> {
        &self.update_timings
    }

    /// Average update time in microseconds over the window.
    pub fn avg_update_us(&self) -> f64 {
        self.update_timings.average()
    }
}

impl Default for RecordingSink {
    fn default() -> Self {
        Self::new(128)
    }
}

impl MetricsSink for RecordingSink {
    fn record(&mut self, stats: &PlanetStats) {
        self.history.push(stats.clone());
        self.update_timings.push(stats.update_us);
        self.total_frames += 1;
    }
}

impl<S: MetricsSink + ?Sized> MetricsSink for Box<S> {
    fn record(&mut self, stats: &PlanetStats) {
        (**self).record(stats);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rolling_window() {
        let mut window = RollingWindow::new(3);
        assert!(window.is_empty());

        window.push(10u64);
        window.push(20);
        window.push(30);
        assert_eq!(window.len(), 3);
        assert_eq!(window.sum(), 60);
        assert_eq!(window.average(), 20.0);

        // Push one more, oldest should be evicted
        window.push(40);
        assert_eq!(window.len(), 3);
        assert_eq!(window.sum(), 90);
        assert_eq!(window.min_max(), Some((20, 40)));
        assert_eq!(window.last(), Some(&40));
    }

    #[test]
    fn test_zero_capacity_window_stays_empty() {
        let mut window = RollingWindow::new(0);
        window.push(1u64);
        assert!(window.is_empty());
        assert_eq!(window.min_max(), None);
        assert_eq!(window.average(), 0.0);
    }

    #[test]
    fn test_patch_histogram() {
        let mut stats = PlanetStats::default();
        stats.record_patch(0);
        stats.record_patch(3);
        stats.record_patch(3);
        stats.record_patch(40);

        assert_eq!(stats.rendered, 4);
        assert_eq!(stats.patches_per_level[0], 1);
        assert_eq!(stats.patches_per_level[3], 2);
        assert_eq!(stats.patches_per_level[HISTOGRAM_LEVELS - 1], 1, "deep levels clamp");
    }

    #[test]
    fn test_recording_sink_keeps_history() {
        let mut sink = RecordingSink::new(2);
        for frame in 1..=3 {
            sink.record(&PlanetStats {
                frame,
                update_us: frame * 100,
                ..Default::default()
            });
        }
        assert_eq!(sink.total_frames, 3);
        assert_eq!(sink.history().map(|s| s.frame).collect::<Vec<_>>(), vec![2, 3]);
        assert_eq!(sink.last().map(|s| s.frame), Some(3));
        assert_eq!(sink.avg_update_us(), 250.0);
    }
}
