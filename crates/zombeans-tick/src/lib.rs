//! Fixed-interval tick clock for zombeans rooms.
//!
//! Every running room owns one [`TickScheduler`] and one [`StopSignal`].
//! The scheduler decides *when* the next tick is due; the stop signal
//! decides *whether* it still should run.
//!
//! # Cadence
//!
//! The next deadline is always the previous deadline plus the interval,
//! never "now plus the interval". A tick that wakes up late is followed
//! by zero-wait ticks until the schedule is caught up. No tick is ever
//! skipped, so `tick` numbers and simulated time stay in lockstep.
//!
//! # Integration
//!
//! ```ignore
//! loop {
//!     tokio::select! {
//!         _ = stop.stopped() => break,
//!         info = scheduler.wait_for_tick() => {
//!             let mut room = room.lock().await;
//!             if stop.is_stopped() { break; }
//!             room.advance(info.dt);
//!             scheduler.record_tick_end();
//!         }
//!     }
//! }
//! ```

mod stop;

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tokio::time::{self, Instant as TokioInstant};
use tracing::{debug, trace, warn};

pub use stop::StopSignal;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Configuration for a room's tick clock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TickConfig {
    /// Time between two ticks. Default: 10 ms.
    pub interval: Duration,
    /// Budget warning threshold (0.0–1.0). Default: 0.80 (80%).
    /// A tracing warning is emitted when tick work exceeds this
    /// fraction of the interval.
    pub budget_warn_threshold: f64,
    /// Budget critical threshold (0.0–1.0). Default: 1.0 (100%).
    pub budget_critical_threshold: f64,
    /// Track average and maximum tick work time.
    pub metrics_enabled: bool,
}

impl Default for TickConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(10),
            budget_warn_threshold: 0.80,
            budget_critical_threshold: 1.0,
            metrics_enabled: true,
        }
    }
}

impl TickConfig {
    /// Shortest interval the scheduler accepts.
    pub const MIN_INTERVAL: Duration = Duration::from_millis(1);
    /// Longest interval the scheduler accepts.
    pub const MAX_INTERVAL: Duration = Duration::from_secs(1);

    /// Create a config for a specific interval with default thresholds.
    pub fn with_interval(interval: Duration) -> Self {
        Self {
            interval,
            ..Default::default()
        }
    }

    /// Clamp and fix any out-of-range values so the config is safe to use.
    ///
    /// Called automatically by [`TickScheduler::new`]. Rules:
    /// - `interval` clamped to [`Self::MIN_INTERVAL`]..=[`Self::MAX_INTERVAL`].
    /// - Thresholds clamped to `0.0..=1.0`.
    /// - `budget_warn_threshold` forced ≤ `budget_critical_threshold`.
    pub fn validated(mut self) -> Self {
        let clamped = self.interval.clamp(Self::MIN_INTERVAL, Self::MAX_INTERVAL);
        if clamped != self.interval {
            warn!(
                interval_ms = self.interval.as_secs_f64() * 1000.0,
                clamped_ms = clamped.as_secs_f64() * 1000.0,
                "tick interval out of range, clamping"
            );
            self.interval = clamped;
        }
        self.budget_warn_threshold = self.budget_warn_threshold.clamp(0.0, 1.0);
        self.budget_critical_threshold = self.budget_critical_threshold.clamp(0.0, 1.0);
        if self.budget_warn_threshold > self.budget_critical_threshold {
            self.budget_warn_threshold = self.budget_critical_threshold;
        }
        self
    }
}

// ---------------------------------------------------------------------------
// Tick info (returned to caller each tick)
// ---------------------------------------------------------------------------

/// Information about a due tick, returned by [`TickScheduler::wait_for_tick`].
#[derive(Debug, Clone)]
pub struct TickInfo {
    /// Monotonically increasing tick number (starts at 1).
    pub tick: u64,
    /// Fixed delta time for this tick (always the configured interval).
    pub dt: Duration,
    /// `true` if the scheduler woke up more than 10% of an interval late.
    pub overrun: bool,
    /// How far past its deadline this tick started.
    pub late_by: Duration,
}

// ---------------------------------------------------------------------------
// Metrics
// ---------------------------------------------------------------------------

/// Runtime metrics for the tick scheduler.
///
/// All timing values refer to the work reported via
/// [`TickScheduler::record_tick_end`].
#[derive(Debug, Clone, Default)]
pub struct TickMetrics {
    /// Total ticks fired.
    pub total_ticks: u64,
    /// Total late wake-ups.
    pub total_overruns: u64,
    /// Exponential moving average of tick work time (α = 0.1).
    pub avg_tick_time: Duration,
    /// Maximum tick work time observed.
    pub max_tick_time: Duration,
    /// Last tick's work time as a fraction of the interval. >1.0 means overrun.
    pub budget_utilization: f64,
}

// ---------------------------------------------------------------------------
// Scheduler
// ---------------------------------------------------------------------------

/// Fixed-interval tick clock for a single room.
pub struct TickScheduler {
    config: TickConfig,
    tick_count: u64,
    /// Deadline of the next tick (Tokio instant for `sleep_until`).
    next_tick: TokioInstant,
    /// Wall-clock instant when the current tick's work started.
    /// Set by `wait_for_tick`, consumed by `record_tick_end`.
    tick_start: Option<Instant>,
    metrics: TickMetrics,
}

impl TickScheduler {
    /// Create a new scheduler. The first tick is due one interval from now.
    pub fn new(config: TickConfig) -> Self {
        let config = config.validated();

        debug!(
            interval_ms = config.interval.as_secs_f64() * 1000.0,
            "tick scheduler created"
        );

        Self {
            next_tick: TokioInstant::now() + config.interval,
            config,
            tick_count: 0,
            tick_start: None,
            metrics: TickMetrics::default(),
        }
    }

    /// Create a scheduler for a specific interval with default settings.
    pub fn with_interval(interval: Duration) -> Self {
        Self::new(TickConfig::with_interval(interval))
    }

    /// Wait until the next tick is due and return its [`TickInfo`].
    ///
    /// If the deadline already passed this returns without sleeping.
    /// Cancel-safe: dropping the future before it resolves leaves the
    /// schedule untouched.
    pub async fn wait_for_tick(&mut self) -> TickInfo {
        let target = self.next_tick;
        let interval = self.config.interval;

        time::sleep_until(target).await;

        let now = TokioInstant::now();
        self.tick_count += 1;
        self.tick_start = Some(Instant::now());

        let late_by = now.saturating_duration_since(target);
        let overrun = late_by > interval / 10;
        if overrun {
            self.metrics.total_overruns += 1;
            warn!(
                tick = self.tick_count,
                late_ms = late_by.as_secs_f64() * 1000.0,
                "tick overrun, next tick runs without waiting"
            );
        }

        // Anchor on the missed deadline, not on `now`.
        self.next_tick = target + interval;
        self.metrics.total_ticks += 1;

        trace!(tick = self.tick_count, overrun, "tick fired");

        TickInfo {
            tick: self.tick_count,
            dt: interval,
            overrun,
            late_by,
        }
    }

    /// Record that the work for the current tick has finished.
    ///
    /// If not called, budget warnings won't fire.
    pub fn record_tick_end(&mut self) {
        let Some(start) = self.tick_start.take() else {
            return;
        };
        let elapsed = start.elapsed();
        let budget = self.config.interval;

        let utilization = elapsed.as_secs_f64() / budget.as_secs_f64();
        self.metrics.budget_utilization = utilization;

        if utilization >= self.config.budget_critical_threshold {
            warn!(
                tick = self.tick_count,
                elapsed_ms = elapsed.as_secs_f64() * 1000.0,
                budget_ms = budget.as_secs_f64() * 1000.0,
                utilization_pct = format!("{:.1}", utilization * 100.0),
                "CRITICAL: tick exceeded budget"
            );
        } else if utilization >= self.config.budget_warn_threshold {
            warn!(
                tick = self.tick_count,
                elapsed_ms = elapsed.as_secs_f64() * 1000.0,
                budget_ms = budget.as_secs_f64() * 1000.0,
                utilization_pct = format!("{:.1}", utilization * 100.0),
                "tick approaching budget limit"
            );
        }

        if self.config.metrics_enabled {
            if elapsed > self.metrics.max_tick_time {
                self.metrics.max_tick_time = elapsed;
            }
            let alpha = 0.1;
            let prev = self.metrics.avg_tick_time.as_secs_f64();
            let curr = elapsed.as_secs_f64();
            self.metrics.avg_tick_time =
                Duration::from_secs_f64(prev * (1.0 - alpha) + curr * alpha);
        }
    }

    /// Number of ticks fired so far.
    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    /// Snapshot of current metrics.
    pub fn metrics(&self) -> &TickMetrics {
        &self.metrics
    }

    /// The validated tick interval.
    pub fn interval(&self) -> Duration {
        self.config.interval
    }

    /// Deadline of the next tick.
    pub fn next_deadline(&self) -> TokioInstant {
        self.next_tick
    }
}
