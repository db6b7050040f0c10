//! Rate-limiting wrappers for callbacks
//!
//! [`Debouncer`] coalesces a burst of calls into one trailing invocation a
//! fixed delay after the last call. [`Throttler`] runs at most one invocation
//! per window and keeps exactly one trailing invocation for calls suppressed
//! inside the window, so the final call of a burst is never lost.
//!
//! Timers run on the Tokio clock: `call` must happen inside a runtime, and
//! tests can drive them with paused time.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio::time::Instant;

type Callback<A> = Arc<dyn Fn(A) + Send + Sync>;

struct DebounceState<A> {
    pending: Option<A>,
    generation: u64,
    timer: Option<JoinHandle<()>>,
}

struct DebounceInner<A> {
    delay: Duration,
    callback: Callback<A>,
    state: Mutex<DebounceState<A>>,
}

/// Trailing-edge debounce
pub struct Debouncer<A> {
    inner: Arc<DebounceInner<A>>,
}

impl<A> Clone for Debouncer<A> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<A: Send + 'static> Debouncer<A> {
    pub fn new<F>(delay: Duration, callback: F) -> Self
    where
        F: Fn(A) + Send + Sync + 'static,
    {
        Self {
            inner: Arc::new(DebounceInner {
                delay,
                callback: Arc::new(callback),
                state: Mutex::new(DebounceState {
                    pending: None,
                    generation: 0,
                    timer: None,
                }),
            }),
        }
    }

    pub fn delay(&self) -> Duration {
        self.inner.delay
    }

    /// Record a call; any earlier pending call is replaced and its timer restarted
    pub fn call(&self, args: A) {
        let mut state = self.inner.state.lock();
        if let Some(timer) = state.timer.take() {
            timer.abort();
        }
        state.generation = state.generation.wrapping_add(1);
        state.pending = Some(args);

        let generation = state.generation;
        let inner = Arc::clone(&self.inner);
        state.timer = Some(tokio::spawn(async move {
            tokio::time::sleep(inner.delay).await;
            let args = {
                let mut state = inner.state.lock();
                if state.generation != generation {
                    return;
                }
                state.timer = None;
                state.pending.take()
            };
            if let Some(args) = args {
                (inner.callback)(args);
            }
        }));
    }

    /// Invoke the pending call now instead of waiting for the delay
    pub fn flush(&self) -> bool {
        let args = {
            let mut state = self.inner.state.lock();
            if let Some(timer) = state.timer.take() {
                timer.abort();
            }
            state.generation = state.generation.wrapping_add(1);
            state.pending.take()
        };
        match args {
            Some(args) => {
                (self.inner.callback)(args);
                true
            }
            None => false,
        }
    }

    /// Drop the pending call without invoking it
    pub fn cancel(&self) -> bool {
        let mut state = self.inner.state.lock();
        if let Some(timer) = state.timer.take() {
            timer.abort();
        }
        state.generation = state.generation.wrapping_add(1);
        state.pending.take().is_some()
    }

    pub fn is_pending(&self) -> bool {
        self.inner.state.lock().pending.is_some()
    }
}

struct ThrottleState<A> {
    last_invoked: Option<Instant>,
    trailing: Option<A>,
    timer: Option<JoinHandle<()>>,
}

struct ThrottleInner<A> {
    window: Duration,
    callback: Callback<A>,
    state: Mutex<ThrottleState<A>>,
}

/// Leading-edge throttle with a single trailing call
pub struct Throttler<A> {
    inner: Arc<ThrottleInner<A>>,
}

impl<A> Clone for Throttler<A> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<A: Send + 'static> Throttler<A> {
    pub fn new<F>(window: Duration, callback: F) -> Self
    where
        F: Fn(A) + Send + Sync + 'static,
    {
        Self {
            inner: Arc::new(ThrottleInner {
                window,
                callback: Arc::new(callback),
                state: Mutex::new(ThrottleState {
                    last_invoked: None,
                    trailing: None,
                    timer: None,
                }),
            }),
        }
    }

    pub fn window(&self) -> Duration {
        self.inner.window
    }

    pub fn call(&self, args: A) {
        let now = Instant::now();
        let mut state = self.inner.state.lock();

        let window_open = state
            .last_invoked
            .map_or(true, |last| now.duration_since(last) >= self.inner.window);

        if window_open {
            if let Some(timer) = state.timer.take() {
                timer.abort();
            }
            state.trailing = None;
            state.last_invoked = Some(now);
            drop(state);
            (self.inner.callback)(args);
            return;
        }

        state.trailing = Some(args);
        if state.timer.is_some() {
            return;
        }

        // Suppressed inside the window: fire once when it closes.
        let fire_at = state
            .last_invoked
            .map_or(now, |last| last + self.inner.window);
        let inner = Arc::clone(&self.inner);
        state.timer = Some(tokio::spawn(async move {
            tokio::time::sleep_until(fire_at).await;
            let args = {
                let mut state = inner.state.lock();
                state.timer = None;
                let args = state.trailing.take();
                if args.is_some() {
                    state.last_invoked = Some(Instant::now());
                }
                args
            };
            if let Some(args) = args {
                (inner.callback)(args);
            }
        }));
    }

    /// Drop a scheduled trailing call
    pub fn cancel(&self) -> bool {
        let mut state = self.inner.state.lock();
        if let Some(timer) = state.timer.take() {
            timer.abort();
        }
        state.trailing.take().is_some()
    }
}
