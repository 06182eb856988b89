// src/supervisor/ticker.rs

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::trace;

use super::{RunId, SupervisorEvent};

/// Background task that sends `SupervisorEvent::Tick` every `period`.
///
/// The task is aborted when the `Ticker` is dropped.
#[derive(Debug)]
pub struct Ticker {
    run_id: RunId,
    handle: JoinHandle<()>,
}

impl Ticker {
    pub fn spawn(run_id: RunId, period: Duration, events: mpsc::Sender<SupervisorEvent>) -> Self {
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // The first tick completes immediately.
            interval.tick().await;

            loop {
                interval.tick().await;
                trace!(run_id, "tick");
                if events.send(SupervisorEvent::Tick { run_id }).await.is_err() {
                    break;
                }
            }
        });

        Self { run_id, handle }
    }

    pub fn run_id(&self) -> RunId {
        self.run_id
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
