//! The per-room tick driver task.
//!
//! One task per running room. It only ever takes its own room's lock,
//! and only after the inter-tick wait, so it never holds a lock while
//! sleeping and never waits on another room.

use tokio::task::JoinHandle;
use tracing::{debug, info};
use zombeans_protocol::RoomCode;
use zombeans_tick::{StopSignal, TickConfig, TickScheduler};

use crate::{SharedRoom, TickProgress};

pub(crate) fn spawn(
    room: SharedRoom,
    code: RoomCode,
    config: TickConfig,
    stop: StopSignal,
) -> JoinHandle<()> {
    tokio::spawn(run(room, code, config, stop))
}

async fn run(room: SharedRoom, code: RoomCode, config: TickConfig, stop: StopSignal) {
    let mut scheduler = TickScheduler::new(config);
    info!(%code, interval_ms = scheduler.interval().as_millis() as u64, "tick driver started");

    loop {
        let info = tokio::select! {
            biased;
            _ = stop.stopped() => break,
            info = scheduler.wait_for_tick() => info,
        };

        let mut guard = room.lock().await;
        // Teardown raises the flag under this same lock.
        if stop.is_stopped() {
            break;
        }
        let progress = guard.tick(info.dt);
        drop(guard);
        scheduler.record_tick_end();

        if progress == TickProgress::Finished || stop.is_stopped() {
            break;
        }
    }

    let metrics = scheduler.metrics();
    debug!(
        %code,
        overruns = metrics.total_overruns,
        avg_tick_us = metrics.avg_tick_time.as_micros() as u64,
        max_tick_us = metrics.max_tick_time.as_micros() as u64,
        "tick metrics"
    );
    info!(%code, ticks = scheduler.tick_count(), "tick driver stopped");
}
