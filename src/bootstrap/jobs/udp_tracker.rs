//! UDP tracker job starter.
//!
//! The [`start_job`] function spawns the UDP tracker server task and waits
//! until the server reports it is bound and listening.
use std::sync::Arc;

use log::info;
use tokio::sync::oneshot;

use super::Job;
use crate::config::UdpTracker;
use crate::core;
use crate::servers::udp::server::Launcher;
use crate::servers::udp::UDP_TRACKER_LOG_TARGET;

/// It starts a new UDP tracker server with the provided configuration.
///
/// # Panics
///
/// It will panic if the UDP tracker binding address is not a valid socket
/// address, or if the service cannot be started.
pub async fn start_job(config: &UdpTracker, tracker: Arc<core::Tracker>) -> Job {
    let bind_to = config
        .bind_address
        .parse::<std::net::SocketAddr>()
        .expect("it should have a valid udp tracker bind address");

    let read_buffer_size = config.read_buffer_size;

    let (tx_start, rx_start) = oneshot::channel();
    let (tx_halt, rx_halt) = oneshot::channel();

    let handle = tokio::spawn(async move {
        Launcher::run_with_graceful_shutdown(tracker, bind_to, read_buffer_size, tx_start, rx_halt).await;
    });

    let started = rx_start.await.expect("it should be able to start the udp tracker");

    info!(target: UDP_TRACKER_LOG_TARGET, "Started on: udp://{}", started.address);

    Job {
        name: "udp_tracker",
        handle,
        tx_halt,
    }
}
