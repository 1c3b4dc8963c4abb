//! Job that runs a task on intervals to reap stale swarm data.
//!
//! It removes peers that have not announced for more than `peer_ttl` seconds
//! and deletes swarms that have been empty and untouched for the grace
//! window.
//!
//! The period is the configured `reap_interval`, defaulting to half the
//! peer TTL.
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::oneshot;
use tracing::info;

use super::Job;
use crate::config::Core;
use crate::core;
use crate::servers::signals::Halted;

/// It starts a job for cleaning up the swarm data in the tracker.
#[must_use]
pub fn start_job(config: &Core, tracker: &Arc<core::Tracker>) -> Job {
    let weak_tracker = std::sync::Arc::downgrade(tracker);
    let interval = config.effective_reap_interval();

    let (tx_halt, rx_halt) = oneshot::channel::<Halted>();

    let handle = tokio::spawn(async move {
        let interval = std::time::Duration::from_secs(interval);
        let mut interval = tokio::time::interval(interval);
        interval.tick().await;

        let mut rx_halt = rx_halt;

        loop {
            tokio::select! {
                _ = &mut rx_halt => {
                    info!("Stopping swarm cleanup job..");
                    break;
                }
                _ = interval.tick() => {
                    if let Some(tracker) = weak_tracker.upgrade() {
                        let start_time = Utc::now().time();
                        info!("Cleaning up swarms..");
                        tracker.cleanup_swarms();
                        info!("Cleaned up swarms in: {}ms", (Utc::now().time() - start_time).num_milliseconds());
                    } else {
                        break;
                    }
                }
            }
        }
    });

    Job {
        name: "swarm_cleanup",
        handle,
        tx_halt,
    }
}
