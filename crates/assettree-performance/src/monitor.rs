//! Performance monitoring and metrics collection

use std::any::Any;
use std::future::Future;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use chrono::Utc;
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, trace};

use crate::error::PerformanceError;
use crate::frame_rate::FrameRateTracker;
use crate::memory::MemoryProbe;
use crate::metrics::{
    PerformanceMetrics, PerformanceThresholds, SampleHistory, FRAME_RATE_HISTORY_SIZE,
    MEMORY_HISTORY_SIZE, RENDER_HISTORY_SIZE,
};
use crate::recommendations::{recommend, PerformanceRecommendation};
use crate::report::PerformanceReport;

type MetricsCallback = dyn Fn(&PerformanceMetrics) + Send + Sync;

struct MonitorState {
    metrics: PerformanceMetrics,
    render_history: SampleHistory,
    frame_history: SampleHistory,
    memory_history: SampleHistory,
}

pub(crate) struct MonitorInner {
    thresholds: PerformanceThresholds,
    state: Mutex<MonitorState>,
    subscribers: Mutex<Vec<(u64, Arc<MetricsCallback>)>>,
    next_subscriber_id: AtomicU64,
    memory_probe: Mutex<MemoryProbe>,
    memory_task: Mutex<Option<JoinHandle<()>>>,
    destroyed: AtomicBool,
}

impl Drop for MonitorInner {
    fn drop(&mut self) {
        if let Some(task) = self.memory_task.get_mut().take() {
            task.abort();
        }
    }
}

/// Collects render, frame and memory measurements and notifies subscribers.
///
/// Cloning shares the same underlying monitor.
#[derive(Clone)]
pub struct PerformanceMonitor {
    inner: Arc<MonitorInner>,
}

impl PerformanceMonitor {
    /// Create a monitor with default thresholds
    pub fn new() -> Self {
        Self::with_thresholds(PerformanceThresholds::default())
    }

    pub fn with_thresholds(thresholds: PerformanceThresholds) -> Self {
        Self {
            inner: Arc::new(MonitorInner {
                thresholds,
                state: Mutex::new(MonitorState {
                    metrics: PerformanceMetrics::default(),
                    render_history: SampleHistory::new(RENDER_HISTORY_SIZE),
                    frame_history: SampleHistory::new(FRAME_RATE_HISTORY_SIZE),
                    memory_history: SampleHistory::new(MEMORY_HISTORY_SIZE),
                }),
                subscribers: Mutex::new(Vec::new()),
                next_subscriber_id: AtomicU64::new(1),
                memory_probe: Mutex::new(MemoryProbe::new()),
                memory_task: Mutex::new(None),
                destroyed: AtomicBool::new(false),
            }),
        }
    }

    pub(crate) fn from_inner(inner: Arc<MonitorInner>) -> Self {
        Self { inner }
    }

    pub fn thresholds(&self) -> &PerformanceThresholds {
        &self.inner.thresholds
    }

    /// Time a synchronous unit of render work
    pub fn measure_render_time<F, R>(&self, operation: F) -> R
    where
        F: FnOnce() -> R,
    {
        let start = Instant::now();
        let result = operation();
        self.record_render_time(elapsed_ms(start));
        result
    }

    /// Time an asynchronous unit of render work
    pub async fn measure_async_render_time<Fut, R>(&self, operation: Fut) -> R
    where
        Fut: Future<Output = R>,
    {
        let start = Instant::now();
        let result = operation.await;
        self.record_render_time(elapsed_ms(start));
        result
    }

    /// Record an externally measured render time
    pub fn record_render_time(&self, render_time_ms: f64) {
        trace!(render_time_ms, "Recorded render time");
        self.update(|state| {
            state.render_history.record(render_time_ms);
            state.metrics.render_time_ms = render_time_ms;
        });
    }

    pub fn record_search_time(&self, search_time_ms: f64) {
        self.update(|state| state.metrics.search_time_ms = search_time_ms);
    }

    /// Publish the hit rate (0.0 to 1.0) of the cache backing the view
    pub fn update_cache_hit_rate(&self, hit_rate: f64) {
        let hit_rate = hit_rate.clamp(0.0, 1.0);
        self.update(|state| state.metrics.cache_hit_rate = hit_rate);
    }

    pub(crate) fn record_frame_rate(&self, frame_rate: f64) {
        trace!(frame_rate, "Recorded frame rate window");
        self.update(|state| {
            state.frame_history.record(frame_rate);
            state.metrics.frame_rate = frame_rate;
        });
    }

    /// Sample process memory now. Returns 0 where the host does not expose it.
    pub fn measure_memory_usage(&self) -> u64 {
        let usage = self.inner.memory_probe.lock().current_usage();
        self.update(|state| {
            state.memory_history.record(usage as f64);
            state.metrics.memory_usage_bytes = usage;
        });
        usage
    }

    /// Start the periodic memory sampling task; a no-op when already running
    pub fn start_memory_sampling(&self) -> Result<(), PerformanceError> {
        self.ensure_alive()?;
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| PerformanceError::NoRuntime {
            task: "memory sampling",
        })?;

        let mut slot = self.inner.memory_task.lock();
        if slot.as_ref().is_some_and(|task| !task.is_finished()) {
            return Ok(());
        }

        let interval = Duration::from_millis(self.inner.thresholds.memory_sample_interval_ms);
        let monitor = Arc::downgrade(&self.inner);
        *slot = Some(runtime.spawn(sample_memory(monitor, interval)));
        debug!(interval_ms = interval.as_millis() as u64, "Started memory sampling");
        Ok(())
    }

    pub fn is_sampling_memory(&self) -> bool {
        self.inner
            .memory_task
            .lock()
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }

    /// Start sampling the frame rate over rolling one-second windows
    pub fn track_frame_rate(&self) -> Result<FrameRateTracker, PerformanceError> {
        self.ensure_alive()?;
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| PerformanceError::NoRuntime {
            task: "frame sampling",
        })?;
        let interval = Duration::from_millis(self.inner.thresholds.frame_interval_ms.max(1));
        Ok(FrameRateTracker::spawn(&runtime, Arc::downgrade(&self.inner), interval))
    }

    pub fn current_metrics(&self) -> PerformanceMetrics {
        self.inner.state.lock().metrics.clone()
    }

    pub fn render_history(&self) -> Vec<f64> {
        self.inner.state.lock().render_history.to_vec()
    }

    pub fn frame_rate_history(&self) -> Vec<f64> {
        self.inner.state.lock().frame_history.to_vec()
    }

    /// Ranked recommendations for a tree of the given shape
    pub fn get_recommendations(&self, tree_size: usize, max_depth: usize) -> Vec<PerformanceRecommendation> {
        let metrics = self.current_metrics();
        recommend(&metrics, &self.inner.thresholds, tree_size, max_depth)
    }

    pub fn get_performance_report(&self) -> PerformanceReport {
        let state = self.inner.state.lock();
        PerformanceReport::build(
            state.metrics.clone(),
            &self.inner.thresholds,
            &state.render_history.to_vec(),
            &state.frame_history.to_vec(),
            &state.memory_history.to_vec(),
        )
    }

    /// Register an observer called synchronously after every metric update.
    ///
    /// A panicking observer is logged and skipped; it never reaches the code
    /// that triggered the measurement.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&PerformanceMetrics) + Send + Sync + 'static,
    {
        let id = self.inner.next_subscriber_id.fetch_add(1, Ordering::Relaxed);
        let callback: Arc<MetricsCallback> = Arc::new(callback);
        self.inner.subscribers.lock().push((id, callback));
        Subscription {
            id,
            monitor: Arc::downgrade(&self.inner),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.lock().len()
    }

    /// Stop memory sampling and drop all subscribers.
    ///
    /// Timers cannot be restarted afterwards.
    pub fn destroy(&self) {
        self.inner.destroyed.store(true, Ordering::SeqCst);
        if let Some(task) = self.inner.memory_task.lock().take() {
            task.abort();
        }
        self.inner.subscribers.lock().clear();
        debug!("Performance monitor destroyed");
    }

    pub fn is_destroyed(&self) -> bool {
        self.inner.destroyed.load(Ordering::SeqCst)
    }

    fn ensure_alive(&self) -> Result<(), PerformanceError> {
        if self.is_destroyed() {
            Err(PerformanceError::MonitorDestroyed)
        } else {
            Ok(())
        }
    }

    fn update<F>(&self, apply: F)
    where
        F: FnOnce(&mut MonitorState),
    {
        let snapshot = {
            let mut state = self.inner.state.lock();
            apply(&mut *state);
            state.metrics.last_measurement = Utc::now();
            state.metrics.clone()
        };
        self.notify(&snapshot);
    }

    fn notify(&self, metrics: &PerformanceMetrics) {
        let subscribers: Vec<(u64, Arc<MetricsCallback>)> = self
            .inner
            .subscribers
            .lock()
            .iter()
            .map(|(id, callback)| (*id, Arc::clone(callback)))
            .collect();

        for (id, callback) in subscribers {
            if let Err(payload) = catch_unwind(AssertUnwindSafe(|| callback(metrics))) {
                error!(
                    subscriber = id,
                    "Performance subscriber panicked: {}",
                    panic_message(payload.as_ref())
                );
            }
        }
    }
}

impl Default for PerformanceMonitor {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for PerformanceMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PerformanceMonitor")
            .field("metrics", &self.current_metrics())
            .field("subscribers", &self.subscriber_count())
            .field("destroyed", &self.is_destroyed())
            .finish()
    }
}

/// Registration returned by [`PerformanceMonitor::subscribe`]
#[derive(Debug)]
pub struct Subscription {
    id: u64,
    monitor: Weak<MonitorInner>,
}

impl Subscription {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Remove the observer; returns false if it was already gone
    pub fn unsubscribe(self) -> bool {
        let Some(inner) = self.monitor.upgrade() else {
            return false;
        };
        let mut subscribers = inner.subscribers.lock();
        let before = subscribers.len();
        subscribers.retain(|(id, _)| *id != self.id);
        subscribers.len() != before
    }
}

async fn sample_memory(monitor: Weak<MonitorInner>, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        let Some(inner) = monitor.upgrade() else {
            break;
        };
        PerformanceMonitor::from_inner(inner).measure_memory_usage();
    }
}

fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recommendations::RecommendationKind;
    use crate::report::Trend;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_measure_render_time_returns_result_and_records_sample() {
        let monitor = PerformanceMonitor::new();
        let value = monitor.measure_render_time(|| 21 * 2);

        assert_eq!(value, 42);
        assert_eq!(monitor.render_history().len(), 1);
    }

    #[test]
    fn test_render_history_is_capped() {
        let monitor = PerformanceMonitor::new();
        for i in 0..150 {
            monitor.record_render_time(i as f64);
        }

        let history = monitor.render_history();
        assert_eq!(history.len(), RENDER_HISTORY_SIZE);
        assert_eq!(history[0], 50.0);
        assert_eq!(monitor.current_metrics().render_time_ms, 149.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_measure_async_render_time() {
        let monitor = PerformanceMonitor::new();
        let value = monitor
            .measure_async_render_time(async {
                tokio::time::sleep(Duration::from_millis(20)).await;
                "rendered"
            })
            .await;

        assert_eq!(value, "rendered");
        let render_time = monitor.current_metrics().render_time_ms;
        assert!(render_time >= 20.0 && render_time < 25.0, "got {}", render_time);
    }

    #[test]
    fn test_subscribers_are_notified_and_can_unsubscribe() {
        let monitor = PerformanceMonitor::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let subscription = monitor.subscribe(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        monitor.record_render_time(3.0);
        monitor.record_search_time(1.0);
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        assert!(subscription.unsubscribe());
        monitor.record_render_time(4.0);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_panicking_subscriber_does_not_reach_caller() {
        let monitor = PerformanceMonitor::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let _bad = monitor.subscribe(|_| panic!("observer failure"));
        let _good = monitor.subscribe(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        let result = monitor.measure_render_time(|| "ok");

        assert_eq!(result, "ok");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_cache_hit_rate_is_clamped() {
        let monitor = PerformanceMonitor::new();
        monitor.update_cache_hit_rate(1.7);
        assert_eq!(monitor.current_metrics().cache_hit_rate, 1.0);
    }

    #[test]
    fn test_recommendations_use_live_metrics() {
        let monitor = PerformanceMonitor::new();
        assert!(monitor.get_recommendations(50, 5).is_empty());

        monitor.record_render_time(20.0);
        let recs = monitor.get_recommendations(50, 5);
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].kind, RecommendationKind::Memoization);
    }

    #[test]
    fn test_report_detects_degrading_render_time() {
        let monitor = PerformanceMonitor::new();
        for sample in [5.0, 5.0, 5.0, 9.0, 9.0, 9.0] {
            monitor.record_render_time(sample);
        }

        let report = monitor.get_performance_report();
        assert_eq!(report.trends.render_time, Trend::Degrading);
        assert_eq!(report.trends.frame_rate, Trend::Stable);
        assert_eq!(report.render_samples, 6);
        assert!(report.summary().contains("Render: 9.00ms"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_frame_rate_tracking_and_cancel() {
        let monitor = PerformanceMonitor::new();
        let tracker = monitor.track_frame_rate().unwrap();

        tokio::time::sleep(Duration::from_millis(1100)).await;
        let fps = monitor.current_metrics().frame_rate;
        assert!(fps > 55.0 && fps < 70.0, "got {}", fps);
        assert_eq!(monitor.frame_rate_history().len(), 1);

        tracker.cancel();
        tokio::time::sleep(Duration::from_secs(3)).await;
        assert_eq!(monitor.frame_rate_history().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_every_frame_window_reports_the_same_rate() {
        let monitor = PerformanceMonitor::new();
        let _tracker = monitor.track_frame_rate().unwrap();

        tokio::time::sleep(Duration::from_millis(2100)).await;

        // 63 frames of 16ms per 1008ms window
        let history = monitor.frame_rate_history();
        assert_eq!(history.len(), 2);
        for fps in history {
            assert!((fps - 62.5).abs() < 0.01, "got {}", fps);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_memory_sampling_runs_periodically_until_destroy() {
        let monitor = PerformanceMonitor::new();
        monitor.start_memory_sampling().unwrap();
        monitor.start_memory_sampling().unwrap();
        assert!(monitor.is_sampling_memory());

        tokio::time::sleep(Duration::from_millis(10_500)).await;
        let samples = monitor.inner.state.lock().memory_history.len();
        assert_eq!(samples, 3);

        monitor.destroy();
        assert!(!monitor.is_sampling_memory());
        assert_eq!(monitor.subscriber_count(), 0);
        tokio::time::sleep(Duration::from_secs(20)).await;
        assert_eq!(monitor.inner.state.lock().memory_history.len(), 3);
    }

    #[tokio::test]
    async fn test_destroyed_monitor_refuses_new_timers() {
        let monitor = PerformanceMonitor::new();
        let _subscription = monitor.subscribe(|_| {});
        monitor.destroy();

        assert_eq!(monitor.start_memory_sampling(), Err(PerformanceError::MonitorDestroyed));
        assert!(matches!(monitor.track_frame_rate(), Err(PerformanceError::MonitorDestroyed)));
        assert_eq!(monitor.subscriber_count(), 0);
    }

    #[test]
    fn test_timers_require_runtime() {
        let monitor = PerformanceMonitor::new();
        assert!(matches!(
            monitor.start_memory_sampling(),
            Err(PerformanceError::NoRuntime { .. })
        ));
    }
}
