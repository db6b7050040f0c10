//! Rendering recommendations derived from tree shape and live metrics

use serde::{Deserialize, Serialize};

use crate::metrics::{PerformanceMetrics, PerformanceThresholds};

/// What a recommendation asks the rendering layer to do
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RecommendationKind {
    Virtualization,
    LazyLoading,
    Debouncing,
    Memoization,
    Memory,
    FrameRate,
}

impl RecommendationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecommendationKind::Virtualization => "virtualization",
            RecommendationKind::LazyLoading => "lazy-loading",
            RecommendationKind::Debouncing => "debouncing",
            RecommendationKind::Memoization => "memoization",
            RecommendationKind::Memory => "memory",
            RecommendationKind::FrameRate => "frame-rate",
        }
    }
}

/// Recommendation priority, most urgent first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecommendationPriority {
    Critical,
    High,
    Medium,
    Low,
}

/// Advisory record consumed by the rendering layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceRecommendation {
    #[serde(rename = "type")]
    pub kind: RecommendationKind,
    pub priority: RecommendationPriority,
    pub description: String,
    pub impact: String,
    pub implementation: String,
}

impl PerformanceRecommendation {
    fn new(
        kind: RecommendationKind,
        priority: RecommendationPriority,
        description: impl Into<String>,
        impact: impl Into<String>,
        implementation: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            priority,
            description: description.into(),
            impact: impact.into(),
            implementation: implementation.into(),
        }
    }
}

/// Build the ranked recommendation list.
///
/// Pure over its inputs: identical metrics, thresholds and tree shape always
/// produce the same list in the same order.
pub fn recommend(
    metrics: &PerformanceMetrics,
    thresholds: &PerformanceThresholds,
    tree_size: usize,
    max_depth: usize,
) -> Vec<PerformanceRecommendation> {
    use RecommendationKind as Kind;
    use RecommendationPriority as Priority;

    let mut recommendations = Vec::new();

    if tree_size > thresholds.virtualization_threshold {
        let priority = if tree_size > thresholds.critical_tree_size {
            Priority::Critical
        } else {
            Priority::High
        };
        recommendations.push(PerformanceRecommendation::new(
            Kind::Virtualization,
            priority,
            format!(
                "Tree has {} items; rendering every row exceeds what stays responsive",
                tree_size
            ),
            "Bounds render cost to the visible rows regardless of tree size",
            "Switch the view to virtualized mode and keep overscan small",
        ));
    }

    if max_depth > thresholds.lazy_loading_depth {
        recommendations.push(PerformanceRecommendation::new(
            Kind::LazyLoading,
            Priority::Medium,
            format!("Tree is {} levels deep", max_depth),
            "Avoids fetching and laying out collapsed subtrees",
            "Load children on first expansion instead of with the parent",
        ));
    }

    if tree_size > thresholds.debounce_threshold {
        recommendations.push(PerformanceRecommendation::new(
            Kind::Debouncing,
            Priority::Medium,
            format!("Filtering {} items on every keystroke", tree_size),
            "Cuts redundant filter passes while the user is typing",
            "Debounce search input by around 300ms before filtering",
        ));
    }

    if metrics.render_time_ms > thresholds.render_budget_ms {
        let priority = if metrics.render_time_ms > thresholds.render_budget_ms * 2.0 {
            Priority::Critical
        } else {
            Priority::High
        };
        recommendations.push(PerformanceRecommendation::new(
            Kind::Memoization,
            priority,
            format!(
                "Render took {:.1}ms against a {:.0}ms frame budget",
                metrics.render_time_ms, thresholds.render_budget_ms
            ),
            "Keeps updates inside a single frame",
            "Memoize row rendering and skip rows whose inputs did not change",
        ));
    }

    if metrics.memory_usage_bytes > thresholds.memory_budget_bytes {
        recommendations.push(PerformanceRecommendation::new(
            Kind::Memory,
            Priority::High,
            format!(
                "Memory at {:.1}MB exceeds the {:.1}MB budget",
                to_megabytes(metrics.memory_usage_bytes),
                to_megabytes(thresholds.memory_budget_bytes)
            ),
            "Reduces allocator churn and swap pressure",
            "Trim caches and release collapsed subtrees",
        ));
    }

    if metrics.frame_rate > 0.0 && metrics.frame_rate < thresholds.min_frame_rate {
        recommendations.push(PerformanceRecommendation::new(
            Kind::FrameRate,
            Priority::High,
            format!(
                "Frame rate at {:.0}fps is below {:.0}fps",
                metrics.frame_rate, thresholds.min_frame_rate
            ),
            "Restores smooth scrolling and expansion animations",
            "Move heavy work off the render path and enable virtualization",
        ));
    }

    // Stable sort keeps insertion order within a priority.
    recommendations.sort_by_key(|r| r.priority);
    recommendations
}

fn to_megabytes(bytes: u64) -> f64 {
    bytes as f64 / (1024.0 * 1024.0)
}
