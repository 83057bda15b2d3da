// # Scheduler
//
// Drives an Orchestrator from a single background task.
//
// ## Lifecycle
//
// ```text
// Scheduler ──start()──▶ SchedulerHandle ──stop()──▶ Orchestrator
//  (Stopped)              (Running)        (Stopping)   (Stopped)
// ```
//
// - One cycle runs immediately on start, then one per interval
// - Cycles never overlap; a tick missed by an overrunning cycle is delayed
// - Stop takes effect between cycles; a cycle in flight runs to completion

use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::{JoinError, JoinHandle};
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use super::Orchestrator;
use crate::config::MAX_INTERVAL_MINUTES;

/// Longest period between two cycles
pub const MAX_INTERVAL: Duration = Duration::from_secs(MAX_INTERVAL_MINUTES * 60);

/// A scheduler that has not been started
#[derive(Debug)]
pub struct Scheduler {
    orchestrator: Orchestrator,
    interval: Duration,
}

impl Scheduler {
    /// Create a scheduler running `orchestrator` every `interval`
    ///
    /// A zero interval is raised to one second and anything above
    /// [`MAX_INTERVAL`] is lowered to it.
    pub fn new(orchestrator: Orchestrator, interval: Duration) -> Self {
        let interval = if interval.is_zero() {
            warn!("zero scheduler interval, using 1s");
            Duration::from_secs(1)
        } else if interval > MAX_INTERVAL {
            warn!("scheduler interval {:?} too long, using {:?}", interval, MAX_INTERVAL);
            MAX_INTERVAL
        } else {
            interval
        };

        Self {
            orchestrator,
            interval,
        }
    }

    /// Interval between periodic cycles
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Spawn the scheduling task
    ///
    /// Must be called within a tokio runtime.
    pub fn start(self) -> SchedulerHandle {
        let (stop_tx, stop_rx) = oneshot::channel();
        let task = tokio::spawn(run(self.orchestrator, self.interval, stop_rx));
        SchedulerHandle { stop_tx, task }
    }
}

/// A running scheduler
#[derive(Debug)]
pub struct SchedulerHandle {
    stop_tx: oneshot::Sender<()>,
    task: JoinHandle<Orchestrator>,
}

impl SchedulerHandle {
    /// Request a stop and wait for the loop to exit
    ///
    /// Returns the orchestrator so its state can be inspected or the
    /// scheduler restarted.
    pub async fn stop(self) -> Result<Orchestrator, JoinError> {
        // The loop may already have exited
        let _ = self.stop_tx.send(());
        self.task.await
    }

    /// Whether the scheduling task has exited
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

async fn run(
    orchestrator: Orchestrator,
    period: Duration,
    mut stop_rx: oneshot::Receiver<()>,
) -> Orchestrator {
    info!("starting scheduler, updates every {:?}", period);

    run_timed(&orchestrator, period).await;

    let now = Instant::now();
    let first = now.checked_add(period).unwrap_or(now + MAX_INTERVAL);
    let mut ticker = tokio::time::interval_at(first, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;

            _ = &mut stop_rx => {
                info!("stop requested, scheduler exiting");
                break;
            }

            _ = ticker.tick() => {
                run_timed(&orchestrator, period).await;
            }
        }
    }

    orchestrator
}

async fn run_timed(orchestrator: &Orchestrator, period: Duration) {
    let start = Instant::now();
    let outcome = orchestrator.run_cycle().await;
    let elapsed = start.elapsed();

    debug!("cycle finished in {:?}: {:?}", elapsed, outcome);
    if elapsed > period {
        warn!(
            "cycle took {:?}, longer than the {:?} interval; next cycle delayed",
            elapsed, period
        );
    }
}
