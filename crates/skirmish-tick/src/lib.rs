//! Fixed-timestep tick scheduler for Skirmish.
//!
//! Paces the authoritative simulation loop at a configurable rate with
//! sub-millisecond precision and budget monitoring.
//!
//! # Timing discipline
//!
//! Tick `n` is due exactly `n / rate` seconds after the scheduler was
//! created, computed in integer nanoseconds from that one instant. The
//! schedule is never re-anchored to "now": when a tick fires late, the
//! following ticks fire early until the schedule is caught up. Ticks are
//! never skipped, and rounding never accumulates, so the long-run average
//! period is exactly `1 / rate`.
//!
//! # Hybrid pacing
//!
//! Waiting happens in two phases. A coarse `sleep_until` covers most of the
//! interval, then a fine phase spins (yielding to the runtime, never
//! sleeping) for the final [`TickConfig::spin_threshold`]. A threshold of
//! zero disables the spin phase, which is what tests running on paused
//! Tokio time need.
//!
//! # Integration
//!
//! ```ignore
//! while running {
//!     let info = scheduler.wait_for_tick().await;
//!     world.step();
//!     scheduler.record_tick_end();
//! }
//! ```

use std::time::{Duration, Instant};

use tokio::time::{self, Instant as TokioInstant};
use tracing::{debug, trace, warn};

/// Scheduler settings. Pass through [`TickConfig::validated`] (or
/// [`TickScheduler::new`], which does it) before relying on the values.
#[derive(Debug, Clone)]
pub struct TickConfig {
    /// Tick rate in Hz. Clamped to `1..=MAX_TICK_RATE_HZ`.
    pub tick_rate_hz: u32,
    /// Length of the final, spinning part of each wait. Zero = sleep only.
    pub spin_threshold: Duration,
    /// Share of a step the work may use before a warning is logged.
    pub budget_warn_threshold: f64,
    /// Share of a step at which the work counts as over budget.
    pub budget_critical_threshold: f64,
    /// Track work time in [`TickMetrics`].
    pub metrics_enabled: bool,
}

impl Default for TickConfig {
    fn default() -> Self {
        Self {
            tick_rate_hz: 60,
            spin_threshold: Duration::from_millis(1),
            budget_warn_threshold: 0.80,
            budget_critical_threshold: 1.0,
            metrics_enabled: true,
        }
    }
}

impl TickConfig {
    pub const MAX_TICK_RATE_HZ: u32 = 240;

    /// Defaults, at `tick_rate_hz`.
    pub fn with_rate(tick_rate_hz: u32) -> Self {
        Self {
            tick_rate_hz,
            ..Default::default()
        }
    }

    /// Pulls every field into range: the rate into `1..=MAX_TICK_RATE_HZ`,
    /// the spin phase to at most one step, both thresholds into `0.0..=1.0`
    /// with warn not above critical.
    pub fn validated(mut self) -> Self {
        if self.tick_rate_hz == 0 || self.tick_rate_hz > Self::MAX_TICK_RATE_HZ {
            let clamped = self.tick_rate_hz.clamp(1, Self::MAX_TICK_RATE_HZ);
            warn!(
                rate = self.tick_rate_hz,
                clamped,
                "tick_rate_hz out of range, clamping"
            );
            self.tick_rate_hz = clamped;
        }
        self.spin_threshold = self.spin_threshold.min(self.tick_duration());
        self.budget_warn_threshold = self.budget_warn_threshold.clamp(0.0, 1.0);
        self.budget_critical_threshold = self.budget_critical_threshold.clamp(0.0, 1.0);
        if self.budget_warn_threshold > self.budget_critical_threshold {
            self.budget_warn_threshold = self.budget_critical_threshold;
        }
        self
    }

    /// One step.
    pub fn tick_duration(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.tick_rate_hz.max(1) as f64)
    }
}

/// Information about a fired tick, returned by [`TickScheduler::wait_for_tick`].
#[derive(Debug, Clone)]
pub struct TickInfo {
    /// 1 for the first tick, then +1 per tick.
    pub tick: u64,
    /// Always one step, `1 / tick_rate`.
    pub dt: Duration,
    /// `true` if this tick fired a full step or more behind schedule.
    pub overrun: bool,
    /// Whole steps the schedule is behind as this tick fires. These are
    /// made up by the following ticks, not dropped.
    pub backlog: u64,
}

/// Counters kept by the scheduler.
///
/// Timing values refer to the simulation work reported through
/// [`TickScheduler::record_tick_end`], not to the time spent waiting.
#[derive(Debug, Clone, Default)]
pub struct TickMetrics {
    /// Total ticks fired.
    pub total_ticks: u64,
    /// Ticks that fired at least one full step late.
    pub total_overruns: u64,
    /// Largest backlog observed, in steps.
    pub max_backlog: u64,
    /// Smoothed work time per tick.
    pub avg_tick_time: Duration,
    /// Longest work time seen.
    pub max_tick_time: Duration,
    /// Work time of the last tick as a share of one step. Above 1.0 the
    /// work alone is enough to put the schedule behind.
    pub budget_utilization: f64,
}

impl TickMetrics {
    /// Smoothing factor of `avg_tick_time`.
    const AVG_WEIGHT: f64 = 0.1;

    fn record_work(&mut self, elapsed: Duration) {
        self.max_tick_time = self.max_tick_time.max(elapsed);
        let avg = self.avg_tick_time.as_secs_f64();
        self.avg_tick_time = Duration::from_secs_f64(
            avg + (elapsed.as_secs_f64() - avg) * Self::AVG_WEIGHT,
        );
    }
}

/// Fixed-timestep tick scheduler. One per simulation loop.
pub struct TickScheduler {
    config: TickConfig,
    step: Duration,
    tick_count: u64,
    /// Tick `n` is due at `epoch + n / rate`, computed in whole nanoseconds
    /// from here so rounding never accumulates.
    epoch: TokioInstant,
    /// When the next tick is due.
    next_tick: TokioInstant,
    /// Start of the current tick's work, taken by `record_tick_end`.
    tick_start: Option<Instant>,
    /// Whether the previous tick was already behind schedule.
    behind: bool,
    metrics: TickMetrics,
}

impl TickScheduler {
    /// Create a new scheduler from config. The first tick is due one step
    /// from now.
    pub fn new(config: TickConfig) -> Self {
        let config = config.validated();
        let step = config.tick_duration();

        debug!(
            rate_hz = config.tick_rate_hz,
            budget_ms = step.as_secs_f64() * 1000.0,
            spin_us = config.spin_threshold.as_micros() as u64,
            "tick scheduler created"
        );

        let epoch = TokioInstant::now();
        Self {
            step,
            tick_count: 0,
            epoch,
            next_tick: epoch + offset_of(1, config.tick_rate_hz),
            config,
            tick_start: None,
            behind: false,
            metrics: TickMetrics::default(),
        }
    }

    /// Scheduler at `tick_rate_hz` with every other setting at its default.
    pub fn with_rate(tick_rate_hz: u32) -> Self {
        Self::new(TickConfig::with_rate(tick_rate_hz))
    }

    /// Wait until the next tick is due. Returns [`TickInfo`] for the tick.
    ///
    /// Resolves immediately while the schedule is behind.
    pub async fn wait_for_tick(&mut self) -> TickInfo {
        let deadline = self.next_tick;

        let coarse = deadline
            .checked_sub(self.config.spin_threshold)
            .unwrap_or(deadline);
        time::sleep_until(coarse).await;
        while TokioInstant::now() < deadline {
            tokio::task::yield_now().await;
        }

        let now = TokioInstant::now();
        self.tick_count += 1;
        self.tick_start = Some(Instant::now());

        let late_by = now.saturating_duration_since(deadline);
        let backlog = (late_by.as_nanos() / self.step.as_nanos().max(1)) as u64;
        let overrun = backlog > 0;

        if overrun && !self.behind {
            warn!(
                tick = self.tick_count,
                backlog,
                late_ms = late_by.as_secs_f64() * 1000.0,
                "tick overrun, catching up"
            );
        } else if !overrun && self.behind {
            debug!(tick = self.tick_count, "tick schedule caught up");
        }
        self.behind = overrun;

        // Anchored to the schedule, never to now.
        self.next_tick = self.epoch + offset_of(self.tick_count + 1, self.config.tick_rate_hz);

        if overrun {
            self.metrics.total_overruns += 1;
        }
        self.metrics.max_backlog = self.metrics.max_backlog.max(backlog);
        self.metrics.total_ticks += 1;

        trace!(tick = self.tick_count, overrun, "tick fired");

        TickInfo {
            tick: self.tick_count,
            dt: self.step,
            overrun,
            backlog,
        }
    }

    /// Marks the end of the simulation work started by the last
    /// [`wait_for_tick`](Self::wait_for_tick).
    ///
    /// Logs when the work used more than the warn or critical share of one
    /// step and feeds the execution-time metrics. Without this call the
    /// scheduler still paces ticks but knows nothing about the work.
    pub fn record_tick_end(&mut self) {
        let Some(start) = self.tick_start.take() else {
            return;
        };
        let elapsed = start.elapsed();
        let share = elapsed.as_secs_f64() / self.step.as_secs_f64();
        self.metrics.budget_utilization = share;

        let level = if share >= self.config.budget_critical_threshold {
            Some("tick work exceeded its step")
        } else if share >= self.config.budget_warn_threshold {
            Some("tick work close to its step")
        } else {
            None
        };
        if let Some(message) = level {
            warn!(
                tick = self.tick_count,
                work_ms = elapsed.as_secs_f64() * 1000.0,
                step_ms = self.step.as_secs_f64() * 1000.0,
                share = format!("{:.0}%", share * 100.0),
                "{message}"
            );
        }

        if self.config.metrics_enabled {
            self.metrics.record_work(elapsed);
        }
    }

    /// Number of ticks fired so far.
    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub fn metrics(&self) -> &TickMetrics {
        &self.metrics
    }

    pub fn tick_rate_hz(&self) -> u32 {
        self.config.tick_rate_hz
    }

    /// The fixed tick duration.
    pub fn tick_duration(&self) -> Duration {
        self.step
    }

    /// When the next tick is due.
    pub fn next_deadline(&self) -> TokioInstant {
        self.next_tick
    }
}

/// Time from the epoch to tick `n` at `rate_hz`, truncated to the nanosecond.
fn offset_of(n: u64, rate_hz: u32) -> Duration {
    let nanos = u128::from(n) * 1_000_000_000 / u128::from(rate_hz.max(1));
    Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX))
}
