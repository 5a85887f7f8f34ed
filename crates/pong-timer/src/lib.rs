//! Interruptible deadline timer for the game loops.
//!
//! A pong match does not need a fixed tick rate: nothing interesting
//! happens between the moment the ball leaves one paddle and the moment it
//! reaches the other side. Each game loop therefore sleeps until the next
//! predicted event and lets state changes (a player getting ready, a player
//! leaving) cut that sleep short.
//!
//! [`DeadlineTimer::wait_until`] resolves when the deadline passes, when
//! [`DeadlineTimer::signal`] is called, or when the timer is stopped. The
//! caller must re-check its own state after every wake; the returned
//! [`Wake`] says why the wait ended, not what changed.
//!
//! # Integration
//!
//! ```ignore
//! loop {
//!     let deadline = game.poll().await;      // lock, advance, unlock
//!     match timer.wait_until(deadline).await {
//!         Wake::Stopped => break,
//!         Wake::Deadline | Wake::Signaled => continue,
//!     }
//! }
//! ```

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::Notify;
use tokio::time::{self, Instant};
use tracing::{debug, trace, warn};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Configuration for a [`DeadlineTimer`].
#[derive(Debug, Clone)]
pub struct TimerConfig {
    /// How long to sleep when the caller has no deadline.
    /// Default: 10 seconds.
    pub idle_interval: Duration,
    /// A deadline wake later than this is logged and counted as late.
    /// Default: 20 ms.
    pub late_warn_threshold: Duration,
    /// Enable wake metrics collection.
    pub metrics_enabled: bool,
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            idle_interval: Duration::from_secs(10),
            late_warn_threshold: Duration::from_millis(20),
            metrics_enabled: true,
        }
    }
}

impl TimerConfig {
    /// Shortest accepted idle interval.
    pub const MIN_IDLE_INTERVAL: Duration = Duration::from_millis(10);

    /// Create a config with a specific idle interval and default settings.
    pub fn with_idle_interval(idle_interval: Duration) -> Self {
        Self {
            idle_interval,
            ..Default::default()
        }
    }

    /// Fix out-of-range values so the config is safe to use.
    ///
    /// Called automatically by [`DeadlineTimer::new`]. An idle interval
    /// below [`Self::MIN_IDLE_INTERVAL`] would turn an idle game into a
    /// busy loop, so it is raised to the minimum.
    pub fn validated(mut self) -> Self {
        if self.idle_interval < Self::MIN_IDLE_INTERVAL {
            warn!(
                idle_ms = self.idle_interval.as_millis() as u64,
                min_ms = Self::MIN_IDLE_INTERVAL.as_millis() as u64,
                "idle_interval below minimum, raising"
            );
            self.idle_interval = Self::MIN_IDLE_INTERVAL;
        }
        self
    }
}

// ---------------------------------------------------------------------------
// Wake reason
// ---------------------------------------------------------------------------

/// Why a [`DeadlineTimer::wait_until`] call returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wake {
    /// The deadline (or the idle interval) elapsed.
    Deadline,
    /// Someone called [`DeadlineTimer::signal`].
    Signaled,
    /// The timer has been stopped; the caller should exit its loop.
    Stopped,
}

// ---------------------------------------------------------------------------
// Metrics
// ---------------------------------------------------------------------------

/// Snapshot of the timer's wake counters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WakeMetrics {
    /// Total waits that returned.
    pub total_waits: u64,
    /// Waits ended by the deadline.
    pub deadline_wakes: u64,
    /// Waits ended by a signal.
    pub signaled_wakes: u64,
    /// Deadline wakes later than the warning threshold.
    pub late_wakes: u64,
    /// Largest lateness observed on a deadline wake.
    pub max_lateness: Duration,
}

#[derive(Debug, Default)]
struct Counters {
    total_waits: AtomicU64,
    deadline_wakes: AtomicU64,
    signaled_wakes: AtomicU64,
    late_wakes: AtomicU64,
    max_lateness_us: AtomicU64,
}

// ---------------------------------------------------------------------------
// Timer
// ---------------------------------------------------------------------------

/// A stoppable, signalable deadline wait.
///
/// Shared between one waiting loop and any number of signaling callers
/// (typically behind an `Arc`). Signals raised while nobody waits are
/// kept: the next wait returns [`Wake::Signaled`] immediately, so a state
/// change can never be missed between a poll and the following wait.
pub struct DeadlineTimer {
    config: TimerConfig,
    notify: Notify,
    stopped: AtomicBool,
    counters: Counters,
}

impl DeadlineTimer {
    /// Create a new timer from config.
    pub fn new(config: TimerConfig) -> Self {
        let config = config.validated();
        debug!(
            idle_ms = config.idle_interval.as_millis() as u64,
            "deadline timer created"
        );
        Self {
            config,
            notify: Notify::new(),
            stopped: AtomicBool::new(false),
            counters: Counters::default(),
        }
    }

    /// Wake the waiting loop so it re-evaluates its deadline.
    pub fn signal(&self) {
        self.notify.notify_one();
    }

    /// Stop the timer. Every current and future wait returns
    /// [`Wake::Stopped`].
    ///
    /// Idempotent: returns `true` only for the call that actually
    /// stopped the timer.
    pub fn stop(&self) -> bool {
        let first = !self.stopped.swap(true, Ordering::AcqRel);
        if first {
            debug!("deadline timer stopped");
        }
        self.notify.notify_one();
        first
    }

    /// Whether [`stop`](Self::stop) has been called.
    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }

    /// Wait until `deadline`, a signal, or a stop.
    ///
    /// `None` means "no deadline": the wait lasts for the configured idle
    /// interval, so an idle loop still wakes up once in a while.
    pub async fn wait_until(&self, deadline: Option<Instant>) -> Wake {
        if self.is_stopped() {
            return Wake::Stopped;
        }

        let deadline =
            deadline.unwrap_or_else(|| Instant::now() + self.config.idle_interval);

        let wake = tokio::select! {
            () = self.notify.notified() => {
                if self.is_stopped() { Wake::Stopped } else { Wake::Signaled }
            }
            () = time::sleep_until(deadline) => Wake::Deadline,
        };

        if self.config.metrics_enabled {
            self.record(wake, deadline);
        }
        trace!(?wake, "deadline timer woke");
        wake
    }

    /// Wait for at most `timeout` (or the idle interval for `None`).
    pub async fn wait_for(&self, timeout: Option<Duration>) -> Wake {
        self.wait_until(timeout.map(|t| Instant::now() + t)).await
    }

    /// The configured idle interval.
    pub fn idle_interval(&self) -> Duration {
        self.config.idle_interval
    }

    /// Snapshot of current metrics.
    pub fn metrics(&self) -> WakeMetrics {
        let c = &self.counters;
        WakeMetrics {
            total_waits: c.total_waits.load(Ordering::Relaxed),
            deadline_wakes: c.deadline_wakes.load(Ordering::Relaxed),
            signaled_wakes: c.signaled_wakes.load(Ordering::Relaxed),
            late_wakes: c.late_wakes.load(Ordering::Relaxed),
            max_lateness: Duration::from_micros(c.max_lateness_us.load(Ordering::Relaxed)),
        }
    }

    fn record(&self, wake: Wake, deadline: Instant) {
        let c = &self.counters;
        c.total_waits.fetch_add(1, Ordering::Relaxed);
        match wake {
            Wake::Deadline => {
                c.deadline_wakes.fetch_add(1, Ordering::Relaxed);
                let late_by = Instant::now().saturating_duration_since(deadline);
                c.max_lateness_us
                    .fetch_max(late_by.as_micros() as u64, Ordering::Relaxed);
                if late_by > self.config.late_warn_threshold {
                    c.late_wakes.fetch_add(1, Ordering::Relaxed);
                    warn!(
                        late_ms = late_by.as_secs_f64() * 1000.0,
                        "deadline wake fired late"
                    );
                }
            }
            Wake::Signaled => {
                c.signaled_wakes.fetch_add(1, Ordering::Relaxed);
            }
            Wake::Stopped => {}
        }
    }
}

impl Default for DeadlineTimer {
    fn default() -> Self {
        Self::new(TimerConfig::default())
    }
}
