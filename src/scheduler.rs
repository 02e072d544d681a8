// Scheduler - runs the collection cycle on a drift-compensated cadence
//
// Cycle starts lock to multiples of the interval from the first tick,
// regardless of how long each cycle takes. A cycle that overruns the
// interval is followed immediately by the next one, and the one after
// that realigns to the original boundaries (missed ticks are skipped,
// never replayed in a burst).
//
// Cycles are never cancelled mid-flight; the stop signal is observed
// between cycles.

use std::future::Future;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{interval, Instant, MissedTickBehavior};
use tracing::{info, warn};

/// Repeatedly invokes a unit of work on a fixed cadence.
///
/// The work is an async closure supplied by the caller; the scheduler
/// itself knows nothing about pipelines. A `watch` receiver acts as the
/// stop signal so tests (and Ctrl+C) can bound the loop.
pub struct CycleScheduler {
    interval: Duration,
}

impl CycleScheduler {
    pub fn new(interval: Duration) -> Self {
        CycleScheduler { interval }
    }

    /// Runs `cycle` forever, once per interval, until `shutdown` fires.
    pub async fn run<F, Fut>(&self, mut cycle: F, mut shutdown: watch::Receiver<bool>)
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = ()>,
    {
        info!(
            interval_secs = self.interval.as_secs(),
            "starting collection scheduler"
        );

        // The first tick completes immediately; later ticks land on
        // multiples of the interval from that reference point. Skip means
        // an overrunning cycle triggers one immediate follow-up and then
        // realigns, instead of replaying every missed boundary.
        let mut timer = interval(self.interval);
        timer.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let mut cycles: u64 = 0;

        loop {
            tokio::select! {
                // Checked first so a signal sent during a cycle always
                // wins over an already-due tick.
                biased;
                _ = shutdown.changed() => {
                    info!("shutdown signal received, stopping scheduler");
                    break;
                }
                _ = timer.tick() => {
                    cycles += 1;
                    let started = Instant::now();

                    cycle().await;

                    let elapsed = started.elapsed();
                    info!(
                        cycle = cycles,
                        elapsed_ms = elapsed.as_millis() as u64,
                        "collection cycle finished"
                    );
                    if elapsed >= self.interval {
                        warn!(
                            cycle = cycles,
                            elapsed_ms = elapsed.as_millis() as u64,
                            interval_secs = self.interval.as_secs(),
                            "cycle overran the interval, next cycle starts immediately"
                        );
                    }
                }
            }
        }

        info!(cycles, "collection scheduler stopped");
    }
}
