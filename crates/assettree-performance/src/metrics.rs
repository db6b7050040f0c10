//! Performance metrics, sample histories and thresholds

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Render time samples kept for trend analysis
pub const RENDER_HISTORY_SIZE: usize = 100;
/// Frame rate windows kept for trend analysis
pub const FRAME_RATE_HISTORY_SIZE: usize = 60;
/// Memory samples kept for trend analysis
pub const MEMORY_HISTORY_SIZE: usize = 60;

/// Rolling snapshot of the latest measurements
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceMetrics {
    /// Last measured render time in milliseconds
    pub render_time_ms: f64,
    /// Last sampled process memory in bytes (0 when unavailable)
    pub memory_usage_bytes: u64,
    /// Cache hit rate as a fraction (0.0 to 1.0)
    pub cache_hit_rate: f64,
    /// Last measured search time in milliseconds
    pub search_time_ms: f64,
    /// Frames per second over the last completed window (0 until measured)
    pub frame_rate: f64,
    /// Time of the most recent update
    pub last_measurement: DateTime<Utc>,
}

impl Default for PerformanceMetrics {
    fn default() -> Self {
        Self {
            render_time_ms: 0.0,
            memory_usage_bytes: 0,
            cache_hit_rate: 0.0,
            search_time_ms: 0.0,
            frame_rate: 0.0,
            last_measurement: Utc::now(),
        }
    }
}

/// Bounded FIFO of samples
#[derive(Debug, Clone)]
pub struct SampleHistory {
    samples: VecDeque<f64>,
    max_samples: usize,
}

impl SampleHistory {
    pub fn new(max_samples: usize) -> Self {
        Self {
            samples: VecDeque::with_capacity(max_samples),
            max_samples,
        }
    }

    /// Record a sample, dropping the oldest beyond capacity
    pub fn record(&mut self, value: f64) {
        self.samples.push_back(value);

        // Maintain max samples
        while self.samples.len() > self.max_samples {
            self.samples.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.max_samples
    }

    pub fn latest(&self) -> Option<f64> {
        self.samples.back().copied()
    }

    pub fn mean(&self) -> Option<f64> {
        if self.samples.is_empty() {
            None
        } else {
            Some(self.samples.iter().sum::<f64>() / self.samples.len() as f64)
        }
    }

    /// Oldest-first copy of the samples
    pub fn to_vec(&self) -> Vec<f64> {
        self.samples.iter().copied().collect()
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }
}

/// Static thresholds behind recommendations and reports
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PerformanceThresholds {
    /// Per-frame render budget (60fps)
    pub render_budget_ms: f64,
    /// Memory cap before a memory recommendation is raised
    pub memory_budget_bytes: u64,
    /// Frame rate below which rendering is considered janky
    pub min_frame_rate: f64,
    /// Tree size above which virtualization is recommended
    pub virtualization_threshold: usize,
    /// Tree size at which virtualization becomes critical
    pub critical_tree_size: usize,
    /// Depth above which lazy loading is recommended
    pub lazy_loading_depth: usize,
    /// Tree size above which search debouncing is recommended
    pub debounce_threshold: usize,
    /// Relative change treated as noise by trend analysis
    pub trend_band: f64,
    /// Samples per side compared by trend analysis
    pub trend_window: usize,
    /// Cadence of the frame sampling loop
    pub frame_interval_ms: u64,
    /// Cadence of the memory sampling task
    pub memory_sample_interval_ms: u64,
}

impl Default for PerformanceThresholds {
    fn default() -> Self {
        Self {
            render_budget_ms: 16.0,
            memory_budget_bytes: 50 * 1024 * 1024,
            min_frame_rate: 30.0,
            virtualization_threshold: 100,
            critical_tree_size: 5_000,
            lazy_loading_depth: 10,
            debounce_threshold: 500,
            trend_band: 0.10,
            trend_window: 3,
            frame_interval_ms: 16,
            memory_sample_interval_ms: 5_000,
        }
    }
}
