//! Trend classification and performance reports

use serde::{Deserialize, Serialize};

use crate::metrics::{PerformanceMetrics, PerformanceThresholds};

/// Direction of a signal over its recent samples
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Improving,
    Stable,
    Degrading,
}

/// Whether larger samples are better for a signal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Polarity {
    LowerIsBetter,
    HigherIsBetter,
}

/// Compare the mean of the last `window` samples with the `window` before.
///
/// Relative changes inside `±band` are stable. With fewer than `2 * window`
/// samples, or a zero baseline, the signal is stable.
pub fn classify_trend(samples: &[f64], window: usize, band: f64, polarity: Polarity) -> Trend {
    if window == 0 || samples.len() < window * 2 {
        return Trend::Stable;
    }

    let recent = &samples[samples.len() - window..];
    let previous = &samples[samples.len() - window * 2..samples.len() - window];

    let recent_mean = recent.iter().sum::<f64>() / window as f64;
    let previous_mean = previous.iter().sum::<f64>() / window as f64;
    if previous_mean == 0.0 {
        return Trend::Stable;
    }

    let change = (recent_mean - previous_mean) / previous_mean;
    if change.abs() <= band {
        return Trend::Stable;
    }

    let increased = change > 0.0;
    match (polarity, increased) {
        (Polarity::LowerIsBetter, true) | (Polarity::HigherIsBetter, false) => Trend::Degrading,
        _ => Trend::Improving,
    }
}

/// Per-signal trends
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceTrends {
    pub render_time: Trend,
    pub frame_rate: Trend,
    pub memory_usage: Trend,
}

/// Current metrics with trends and an overall verdict
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceReport {
    pub metrics: PerformanceMetrics,
    pub trends: PerformanceTrends,
    pub is_optimal: bool,
    pub render_samples: usize,
    pub frame_rate_samples: usize,
}

impl PerformanceReport {
    pub(crate) fn build(
        metrics: PerformanceMetrics,
        thresholds: &PerformanceThresholds,
        render_history: &[f64],
        frame_history: &[f64],
        memory_history: &[f64],
    ) -> Self {
        let window = thresholds.trend_window;
        let band = thresholds.trend_band;
        let trends = PerformanceTrends {
            render_time: classify_trend(render_history, window, band, Polarity::LowerIsBetter),
            frame_rate: classify_trend(frame_history, window, band, Polarity::HigherIsBetter),
            memory_usage: classify_trend(memory_history, window, band, Polarity::LowerIsBetter),
        };

        let is_optimal = is_optimal(&metrics, thresholds);

        Self {
            metrics,
            trends,
            is_optimal,
            render_samples: render_history.len(),
            frame_rate_samples: frame_history.len(),
        }
    }

    /// Get a formatted summary of the report
    pub fn summary(&self) -> String {
        format!(
            "Performance Report:\n  Render: {:.2}ms ({:?})\n  Frame Rate: {:.1}fps ({:?})\n  Memory: {:.1}MB ({:?})\n  Cache Hit Rate: {:.2}%\n  Search: {:.2}ms\n  Optimal: {}",
            self.metrics.render_time_ms,
            self.trends.render_time,
            self.metrics.frame_rate,
            self.trends.frame_rate,
            self.metrics.memory_usage_bytes as f64 / (1024.0 * 1024.0),
            self.trends.memory_usage,
            self.metrics.cache_hit_rate * 100.0,
            self.metrics.search_time_ms,
            self.is_optimal
        )
    }
}

/// Render inside budget, memory under cap, and frame rate unmeasured or healthy
pub fn is_optimal(metrics: &PerformanceMetrics, thresholds: &PerformanceThresholds) -> bool {
    let render_ok = metrics.render_time_ms <= thresholds.render_budget_ms;
    let memory_ok = metrics.memory_usage_bytes <= thresholds.memory_budget_bytes;
    let frames_ok = metrics.frame_rate == 0.0 || metrics.frame_rate >= thresholds.min_frame_rate;
    render_ok && memory_ok && frames_ok
}
