//! Performance monitoring for the asset tree view
//!
//! This crate measures and advises on UI performance:
//! - Render time of tree operations against a 16ms (60fps) budget
//! - Frame rate sampled over rolling one-second windows
//! - Process memory sampled every five seconds
//! - Deterministic recommendations (virtualization, lazy loading, debouncing)
//! - Trend reports comparing recent samples against earlier ones

pub mod error;
pub mod frame_rate;
pub mod memory;
pub mod metrics;
pub mod monitor;
pub mod recommendations;
pub mod report;

pub use error::PerformanceError;
pub use frame_rate::FrameRateTracker;
pub use memory::MemoryProbe;
pub use metrics::{PerformanceMetrics, PerformanceThresholds, SampleHistory};
pub use monitor::{PerformanceMonitor, Subscription};
pub use recommendations::{
    PerformanceRecommendation, RecommendationKind, RecommendationPriority,
};
pub use report::{PerformanceReport, PerformanceTrends, Trend};
