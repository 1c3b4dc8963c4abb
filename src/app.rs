//! The tracker application.
//!
//! It's a container for the configured services. The application is
//! responsible for starting the jobs depending on the configuration:
//!
//! - UDP tracker: can be enabled/disabled and bound to any address.
//! - HTTP tracker: can be enabled/disabled; the same port serves HTTP and,
//!   when a certificate is configured, HTTPS.
//! - Swarm cleanup: the reaper that expires peers and empty swarms.
use std::sync::Arc;

use log::info;

use crate::bootstrap::jobs::{http_tracker, swarm_cleanup, udp_tracker, Job};
use crate::config::Configuration;
use crate::core;

/// It starts all the configured services as concurrent jobs.
///
/// # Panics
///
/// Will panic if a service has an invalid configuration or cannot bind to
/// its configured address.
pub async fn start(config: &Configuration, tracker: Arc<core::Tracker>) -> Vec<Job> {
    let mut jobs: Vec<Job> = Vec::new();

    // Start the UDP tracker
    if config.udp_tracker.enabled {
        jobs.push(udp_tracker::start_job(&config.udp_tracker, tracker.clone()).await);
    } else {
        info!("Not loading the UDP tracker service, not enabled in the configuration.");
    }

    // Start the HTTP tracker
    if config.http_tracker.enabled {
        jobs.extend(http_tracker::start_job(&config.http_tracker, tracker.clone()).await);
    } else {
        info!("Not loading the HTTP tracker service, not enabled in the configuration.");
    }

    // Start the reaper that removes expired peers and empty swarms
    jobs.push(swarm_cleanup::start_job(&config.core, &tracker));

    jobs
}
