//! Frame rate sampling

use std::sync::Weak;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::debug;

use crate::monitor::{MonitorInner, PerformanceMonitor};

const WINDOW: Duration = Duration::from_secs(1);

/// Handle to a running frame sampling loop.
///
/// Sampling stops on [`cancel`](Self::cancel) or when the handle is dropped.
#[must_use = "frame sampling stops as soon as the tracker is dropped"]
#[derive(Debug)]
pub struct FrameRateTracker {
    task: JoinHandle<()>,
}

impl FrameRateTracker {
    pub(crate) fn spawn(
        runtime: &tokio::runtime::Handle,
        monitor: Weak<MonitorInner>,
        frame_interval: Duration,
    ) -> Self {
        let task = runtime.spawn(async move {
            let mut ticker = tokio::time::interval(frame_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // The first tick completes immediately and marks the window start.
            ticker.tick().await;

            let mut window_start = Instant::now();
            let mut frames: u32 = 0;

            loop {
                ticker.tick().await;
                frames += 1;

                let elapsed = window_start.elapsed();
                if elapsed < WINDOW {
                    continue;
                }

                let Some(inner) = monitor.upgrade() else {
                    debug!("Performance monitor dropped; stopping frame sampling");
                    break;
                };
                let fps = f64::from(frames) / elapsed.as_secs_f64();
                PerformanceMonitor::from_inner(inner).record_frame_rate(fps);

                frames = 0;
                window_start = Instant::now();
            }
        });

        Self { task }
    }

    /// Stop sampling
    pub fn cancel(self) {
        // Drop aborts the task.
    }

    pub fn is_active(&self) -> bool {
        !self.task.is_finished()
    }
}

impl Drop for FrameRateTracker {
    fn drop(&mut self) {
        self.task.abort();
    }
}
