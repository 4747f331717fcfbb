//! Integration tests for the fixed-interval tick scheduler.
//!
//! Uses paused Tokio time so `sleep_until` resolves as soon as the
//! runtime auto-advances the clock.

use std::time::Duration;

use tokio::time::Instant;
use zombeans_tick::{StopSignal, TickConfig, TickScheduler};

// =========================================================================
// Helpers
// =========================================================================

fn config_10ms() -> TickConfig {
    TickConfig::with_interval(Duration::from_millis(10))
}

// =========================================================================
// TickConfig
// =========================================================================

#[test]
fn test_default_config_ticks_every_10ms() {
    let cfg = TickConfig::default();
    assert_eq!(cfg.interval, Duration::from_millis(10));
    assert!(cfg.metrics_enabled);
}

#[test]
fn test_validated_clamps_interval() {
    let cfg = TickConfig::with_interval(Duration::ZERO).validated();
    assert_eq!(cfg.interval, TickConfig::MIN_INTERVAL);

    let cfg = TickConfig::with_interval(Duration::from_secs(30)).validated();
    assert_eq!(cfg.interval, TickConfig::MAX_INTERVAL);
}

#[test]
fn test_validated_orders_thresholds() {
    let cfg = TickConfig {
        budget_warn_threshold: 1.5,
        budget_critical_threshold: 0.5,
        ..config_10ms()
    }
    .validated();
    assert_eq!(cfg.budget_critical_threshold, 0.5);
    assert_eq!(cfg.budget_warn_threshold, 0.5);
}

#[test]
fn test_config_deserializes_with_defaults() {
    let cfg: TickConfig = serde_json::from_str(r#"{"metrics_enabled":false}"#).unwrap();
    assert_eq!(cfg.interval, Duration::from_millis(10));
    assert!(!cfg.metrics_enabled);
}

// =========================================================================
// Tick firing
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_wait_for_tick_fires_and_increments() {
    let mut s = TickScheduler::new(config_10ms());

    let info = s.wait_for_tick().await;
    assert_eq!(info.tick, 1);
    assert_eq!(info.dt, Duration::from_millis(10));
    assert!(!info.overrun);
    assert_eq!(s.tick_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_ticks_follow_fixed_cadence() {
    let start = Instant::now();
    let mut s = TickScheduler::new(config_10ms());

    for expected in 1..=5u64 {
        let info = s.wait_for_tick().await;
        assert_eq!(info.tick, expected);
        assert_eq!(
            Instant::now() - start,
            Duration::from_millis(10 * expected),
            "tick {expected} fired off schedule"
        );
    }
}

#[tokio::test(start_paused = true)]
async fn test_next_deadline_is_previous_target_plus_interval() {
    let mut s = TickScheduler::new(config_10ms());
    let first = s.next_deadline();

    s.wait_for_tick().await;
    assert_eq!(s.next_deadline(), first + Duration::from_millis(10));
}

// =========================================================================
// Overruns
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_overrun_is_absorbed_by_zero_wait_ticks() {
    let start = Instant::now();
    let mut s = TickScheduler::new(config_10ms());

    s.wait_for_tick().await;
    // Simulate 35 ms of slow work after tick 1.
    tokio::time::advance(Duration::from_millis(35)).await;

    // Ticks 2, 3 and 4 were due at 20, 30 and 40 ms: all fire at once.
    for expected in 2..=4u64 {
        let info = s.wait_for_tick().await;
        assert_eq!(info.tick, expected);
        assert_eq!(Instant::now() - start, Duration::from_millis(45));
    }

    // Tick 5 is back on the original grid.
    let info = s.wait_for_tick().await;
    assert_eq!(info.tick, 5);
    assert!(!info.overrun);
    assert_eq!(Instant::now() - start, Duration::from_millis(50));
}

#[tokio::test(start_paused = true)]
async fn test_overrun_is_reported_and_counted() {
    let mut s = TickScheduler::new(config_10ms());

    s.wait_for_tick().await;
    tokio::time::advance(Duration::from_millis(25)).await;

    let info = s.wait_for_tick().await;
    assert!(info.overrun);
    assert_eq!(info.late_by, Duration::from_millis(15));
    assert_eq!(s.metrics().total_overruns, 1);
    assert_eq!(s.metrics().total_ticks, 2);
}

#[tokio::test(start_paused = true)]
async fn test_no_tick_is_ever_skipped() {
    let mut s = TickScheduler::new(config_10ms());

    s.wait_for_tick().await;
    tokio::time::advance(Duration::from_millis(500)).await;

    let mut last = 1;
    for _ in 0..60 {
        let info = s.wait_for_tick().await;
        assert_eq!(info.tick, last + 1);
        last = info.tick;
    }
}

// =========================================================================
// Metrics
// =========================================================================

#[test]
fn test_initial_metrics_are_zero() {
    let s = TickScheduler::with_interval(Duration::from_millis(10));
    let m = s.metrics();
    assert_eq!(m.total_ticks, 0);
    assert_eq!(m.total_overruns, 0);
    assert_eq!(m.avg_tick_time, Duration::ZERO);
    assert_eq!(m.max_tick_time, Duration::ZERO);
}

#[tokio::test(start_paused = true)]
async fn test_record_tick_end_without_wait_is_noop() {
    let mut s = TickScheduler::new(config_10ms());
    s.record_tick_end();
    assert_eq!(s.metrics().total_ticks, 0);
    assert_eq!(s.metrics().budget_utilization, 0.0);
}

#[tokio::test(start_paused = true)]
async fn test_metrics_max_tick_time_tracked() {
    let mut s = TickScheduler::new(config_10ms());

    // record_tick_end measures wall-clock time, not Tokio time.
    s.wait_for_tick().await;
    std::thread::sleep(Duration::from_micros(50));
    s.record_tick_end();

    assert!(s.metrics().max_tick_time > Duration::ZERO);
    assert!(s.metrics().budget_utilization > 0.0);
}

#[tokio::test(start_paused = true)]
async fn test_metrics_disabled_skips_avg_update() {
    let mut s = TickScheduler::new(TickConfig {
        metrics_enabled: false,
        ..config_10ms()
    });

    s.wait_for_tick().await;
    std::thread::sleep(Duration::from_micros(50));
    s.record_tick_end();

    assert_eq!(s.metrics().avg_tick_time, Duration::ZERO);
    assert_eq!(s.metrics().max_tick_time, Duration::ZERO);
}

// =========================================================================
// Integration: select! loop with a stop signal (mirrors the room driver)
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_select_loop_stops_on_signal() {
    let mut s = TickScheduler::new(config_10ms());
    let stop = StopSignal::new();

    {
        let stop = stop.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(55)).await;
            stop.stop();
        });
    }

    let mut ticks_fired = 0u64;
    loop {
        tokio::select! {
            _ = stop.stopped() => break,
            info = s.wait_for_tick() => {
                if stop.is_stopped() {
                    break;
                }
                ticks_fired += 1;
                s.record_tick_end();
                assert_eq!(info.tick, ticks_fired);
            }
        }
    }

    assert_eq!(ticks_fired, 5);
}
