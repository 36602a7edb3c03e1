//! Integration tests for the fixed-timestep tick scheduler.
//!
//! Uses paused Tokio time to control the clock deterministically. Every
//! scheduler under paused time is built with a zero spin threshold: the
//! spin phase keeps the runtime busy, so auto-advance would never fire.

use std::time::Duration;

use skirmish_tick::{TickConfig, TickScheduler};
use tokio::time::Instant;

// =========================================================================
// Helpers
// =========================================================================

fn config_20hz() -> TickConfig {
    TickConfig {
        tick_rate_hz: 20,
        spin_threshold: Duration::ZERO,
        ..Default::default()
    }
}

const STEP_20HZ: Duration = Duration::from_millis(50);

// =========================================================================
// TickConfig
// =========================================================================

#[test]
fn test_default_config_is_60hz() {
    let cfg = TickConfig::default();
    assert_eq!(cfg.tick_rate_hz, 60);
    assert_eq!(cfg.tick_duration(), Duration::from_secs_f64(1.0 / 60.0));
}

#[test]
fn test_with_rate_sets_duration() {
    let cfg = TickConfig::with_rate(20);
    assert_eq!(cfg.tick_duration(), STEP_20HZ);
}

#[test]
fn test_validated_clamps_zero_rate_to_one() {
    let cfg = TickConfig::with_rate(0).validated();
    assert_eq!(cfg.tick_rate_hz, 1);
    assert_eq!(cfg.tick_duration(), Duration::from_secs(1));
}

#[test]
fn test_validated_clamps_rate_above_max() {
    let cfg = TickConfig::with_rate(10_000).validated();
    assert_eq!(cfg.tick_rate_hz, TickConfig::MAX_TICK_RATE_HZ);
}

#[test]
fn test_validated_caps_spin_threshold_at_one_tick() {
    let cfg = TickConfig {
        tick_rate_hz: 20,
        spin_threshold: Duration::from_secs(5),
        ..Default::default()
    }
    .validated();
    assert_eq!(cfg.spin_threshold, STEP_20HZ);
}

#[test]
fn test_validated_orders_budget_thresholds() {
    let cfg = TickConfig {
        budget_warn_threshold: 1.5,
        budget_critical_threshold: 0.5,
        ..Default::default()
    }
    .validated();
    assert_eq!(cfg.budget_critical_threshold, 0.5);
    assert_eq!(cfg.budget_warn_threshold, 0.5);
}

// =========================================================================
// Scheduler creation and accessors
// =========================================================================

#[test]
fn test_scheduler_initial_state() {
    let s = TickScheduler::new(config_20hz());
    assert_eq!(s.tick_count(), 0);
    assert_eq!(s.tick_rate_hz(), 20);
    assert_eq!(s.tick_duration(), STEP_20HZ);
    assert_eq!(s.metrics().total_ticks, 0);
}

#[test]
fn test_with_rate_convenience() {
    let s = TickScheduler::with_rate(30);
    assert_eq!(s.tick_rate_hz(), 30);
}

// =========================================================================
// Pacing
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_first_tick_fires_one_step_after_creation() {
    let start = Instant::now();
    let mut s = TickScheduler::new(config_20hz());

    let info = s.wait_for_tick().await;

    assert_eq!(info.tick, 1);
    assert_eq!(info.dt, STEP_20HZ);
    assert!(!info.overrun);
    assert_eq!(info.backlog, 0);
    assert_eq!(Instant::now() - start, STEP_20HZ);
}

#[tokio::test(start_paused = true)]
async fn test_ticks_are_evenly_spaced() {
    let start = Instant::now();
    let mut s = TickScheduler::new(config_20hz());

    for n in 1..=10u32 {
        let info = s.wait_for_tick().await;
        assert_eq!(info.tick, u64::from(n));
        assert_eq!(Instant::now() - start, STEP_20HZ * n);
    }
}

#[tokio::test(start_paused = true)]
async fn test_slow_work_does_not_shift_the_schedule() {
    let start = Instant::now();
    let mut s = TickScheduler::new(config_20hz());

    s.wait_for_tick().await;
    // Work that eats most of the budget.
    tokio::time::advance(Duration::from_millis(40)).await;
    s.record_tick_end();

    s.wait_for_tick().await;
    assert_eq!(Instant::now() - start, STEP_20HZ * 2);
}

#[tokio::test(start_paused = true)]
async fn test_late_ticks_catch_up_without_skipping() {
    let start = Instant::now();
    let mut s = TickScheduler::new(config_20hz());

    // Stall for three and a half steps.
    tokio::time::advance(Duration::from_millis(175)).await;

    let first = s.wait_for_tick().await;
    assert_eq!(first.tick, 1);
    assert!(first.overrun);
    assert_eq!(first.backlog, 2);

    // The backlog drains immediately, one tick per call.
    let second = s.wait_for_tick().await;
    let third = s.wait_for_tick().await;
    assert_eq!(second.tick, 2);
    assert_eq!(third.tick, 3);
    assert_eq!(Instant::now() - start, Duration::from_millis(175));

    // Caught up: the fourth tick waits for its own deadline.
    let fourth = s.wait_for_tick().await;
    assert_eq!(fourth.tick, 4);
    assert!(!fourth.overrun);
    assert_eq!(Instant::now() - start, STEP_20HZ * 4);
}

#[tokio::test(start_paused = true)]
async fn test_next_deadline_advances_by_exactly_one_step() {
    let mut s = TickScheduler::new(config_20hz());
    let first_deadline = s.next_deadline();

    tokio::time::advance(Duration::from_millis(500)).await;
    s.wait_for_tick().await;

    assert_eq!(s.next_deadline(), first_deadline + STEP_20HZ);
}

#[tokio::test(start_paused = true)]
async fn test_deadlines_at_60hz_land_on_whole_seconds() {
    let start = Instant::now();
    let mut s = TickScheduler::new(TickConfig {
        tick_rate_hz: 60,
        spin_threshold: Duration::ZERO,
        ..Default::default()
    });

    for _ in 0..59 {
        s.wait_for_tick().await;
    }
    // A rounded 16_666_667 ns step would put tick 60 at 1.00000002 s.
    assert_eq!(s.next_deadline() - start, Duration::from_secs(1));

    for _ in 0..120 {
        s.wait_for_tick().await;
    }
    assert_eq!(s.next_deadline() - start, Duration::from_secs(3));
}

#[tokio::test(start_paused = true)]
async fn test_overruns_are_counted_in_metrics() {
    let mut s = TickScheduler::new(config_20hz());

    tokio::time::advance(Duration::from_millis(260)).await;
    for _ in 0..6 {
        s.wait_for_tick().await;
    }

    let m = s.metrics();
    assert_eq!(m.total_ticks, 6);
    // Ticks 1..=4 are at least a full step late; tick 5 is 10ms late.
    assert_eq!(m.total_overruns, 4);
    assert_eq!(m.max_backlog, 4);
}

// =========================================================================
// Metrics
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_record_tick_end_updates_metrics() {
    let mut s = TickScheduler::new(config_20hz());

    s.wait_for_tick().await;
    // Real wall-clock time for the execution measurement.
    std::thread::sleep(Duration::from_micros(50));
    s.record_tick_end();

    let m = s.metrics();
    assert_eq!(m.total_ticks, 1);
    assert!(m.max_tick_time >= Duration::from_micros(50));
    assert!(m.avg_tick_time > Duration::ZERO);
    assert!(m.budget_utilization > 0.0);
}

#[tokio::test(start_paused = true)]
async fn test_record_tick_end_without_tick_is_noop() {
    let mut s = TickScheduler::new(config_20hz());

    s.record_tick_end();

    assert_eq!(s.metrics().max_tick_time, Duration::ZERO);
    assert_eq!(s.metrics().budget_utilization, 0.0);
}

#[tokio::test(start_paused = true)]
async fn test_metrics_disabled_skips_timing() {
    let mut s = TickScheduler::new(TickConfig {
        metrics_enabled: false,
        ..config_20hz()
    });

    s.wait_for_tick().await;
    std::thread::sleep(Duration::from_micros(50));
    s.record_tick_end();

    assert_eq!(s.metrics().total_ticks, 1);
    assert_eq!(s.metrics().max_tick_time, Duration::ZERO);
    assert_eq!(s.metrics().avg_tick_time, Duration::ZERO);
}

// =========================================================================
// Integration pattern
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_select_loop_pattern() {
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<u32>();
    let mut s = TickScheduler::new(config_20hz());

    tx.send(7).unwrap();
    tx.send(9).unwrap();

    let mut drained = Vec::new();
    let mut ticks = 0;
    while ticks < 3 {
        tokio::select! {
            info = s.wait_for_tick() => {
                ticks = info.tick;
                while let Ok(v) = rx.try_recv() {
                    drained.push(v);
                }
                s.record_tick_end();
            }
        }
    }

    assert_eq!(drained, vec![7, 9]);
    assert_eq!(s.tick_count(), 3);
}
