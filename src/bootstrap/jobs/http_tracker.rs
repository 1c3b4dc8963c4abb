//! HTTP tracker job starter.
//!
//! The [`start_job`] function spawns the HTTP tracker server task and waits
//! until the server reports it is bound and listening. When TLS is
//! configured it also starts the certificate reload job.
use std::sync::Arc;

use log::info;
use tokio::sync::oneshot;

use super::Job;
use crate::config::HttpTracker;
use crate::core;
use crate::servers::http::server::Launcher;
use crate::servers::http::{tls, HTTP_TRACKER_LOG_TARGET};

/// It starts a new HTTP tracker server with the provided configuration.
///
/// It returns the server job and, when TLS is enabled, the certificate
/// reload job.
///
/// # Panics
///
/// It will panic if the HTTP tracker binding address is not a valid socket
/// address, if the TLS configuration is invalid, or if the service cannot be
/// started.
pub async fn start_job(config: &HttpTracker, tracker: Arc<core::Tracker>) -> Vec<Job> {
    let bind_to = config
        .bind_address
        .parse::<std::net::SocketAddr>()
        .expect("it should have a valid http tracker bind address");

    let mut jobs = Vec::new();

    let tls_config = if config.tls_enabled() {
        let tls_config = tls::make_rustls_config(&config.ssl_cert_path, &config.ssl_key_path)
            .await
            .expect("it should have a valid http tracker tls configuration");

        let (tx_halt, rx_halt) = oneshot::channel();

        jobs.push(Job {
            name: "tls_cert_reload",
            handle: tls::start_reload_job(
                tls_config.clone(),
                config.ssl_cert_path.clone(),
                config.ssl_key_path.clone(),
                rx_halt,
            ),
            tx_halt,
        });

        Some(tls_config)
    } else {
        None
    };

    let (tx_start, rx_start) = oneshot::channel();
    let (tx_halt, rx_halt) = oneshot::channel();

    let server_config = config.clone();

    let handle = tokio::spawn(async move {
        Launcher::run_with_graceful_shutdown(tracker, bind_to, server_config, tls_config, tx_start, rx_halt).await;
    });

    let started = rx_start.await.expect("it should be able to start the http tracker");

    let scheme = if config.tls_enabled() { "https" } else { "http" };
    info!(target: HTTP_TRACKER_LOG_TARGET, "Started on: {scheme}://{}", started.address);

    jobs.push(Job {
        name: "http_tracker",
        handle,
        tx_halt,
    });

    jobs
}
