//! TLS support for the HTTP tracker, with live keypair reload.
//!
//! The certificate/key pair is loaded into a [`RustlsConfig`] whose inner
//! config is swapped atomically: handshakes in flight during a swap continue
//! with the old pair, subsequent handshakes pick up the new one.
//!
//! A background task sleeps until shortly before the certificate expires,
//! reloads the pair from disk and rearms itself. A reload failure is logged
//! and the old pair is retained.
use std::time::Duration;

use axum_server::tls_rustls::RustlsConfig;
use camino::Utf8PathBuf;
use log::{error, info};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use super::HTTP_TRACKER_LOG_TARGET;
use crate::servers::signals::Halted;
use crate::shared::clock::Time;
use crate::CurrentClock;

/// The margin before `not_after` at which the certificate is reloaded.
const RELOAD_MARGIN: Duration = Duration::from_secs(3600);

/// The reload period used when the certificate cannot be parsed.
const DEFAULT_RELOAD_INTERVAL: Duration = Duration::from_secs(6 * 3600);

/// It loads the certificate and key files into a reloadable TLS config.
///
/// # Errors
///
/// Will return an error when the files cannot be read or do not contain a
/// valid PEM certificate/key pair.
pub async fn make_rustls_config(cert_path: &Utf8PathBuf, key_path: &Utf8PathBuf) -> std::io::Result<RustlsConfig> {
    RustlsConfig::from_pem_file(cert_path.clone(), key_path.clone()).await
}

/// It computes how long to sleep until the next certificate reload:
/// `max(0, not_after - now - 1h)`, falling back to a fixed period when the
/// certificate cannot be read or parsed.
#[must_use]
pub fn next_reload_delay(cert_path: &Utf8PathBuf) -> Duration {
    match not_after_timestamp(cert_path) {
        Some(not_after) => {
            let now = i64::try_from(CurrentClock::now().as_secs()).expect("the clock should fit an i64");

            #[allow(clippy::cast_sign_loss)]
            let until_expiry = Duration::from_secs(not_after.saturating_sub(now).max(0) as u64);

            if until_expiry > RELOAD_MARGIN {
                until_expiry - RELOAD_MARGIN
            } else if !until_expiry.is_zero() {
                // Less than the margin left, reload right at expiry.
                until_expiry
            } else {
                // The certificate is already expired, there is nothing better
                // on disk to pick up right now.
                DEFAULT_RELOAD_INTERVAL
            }
        }
        None => DEFAULT_RELOAD_INTERVAL,
    }
}

/// The `not_after` validity bound of the first certificate in the PEM file,
/// as a Unix timestamp.
fn not_after_timestamp(cert_path: &Utf8PathBuf) -> Option<i64> {
    let bytes = std::fs::read(cert_path).ok()?;

    let (_rest, pem) = x509_parser::pem::parse_x509_pem(&bytes).ok()?;
    let cert = pem.parse_x509().ok()?;

    Some(cert.validity().not_after.timestamp())
}

/// It starts the certificate reload job: a cooperative task that loops
/// sleep, reload, repeat, cancellable on shutdown.
#[must_use]
pub fn start_reload_job(
    tls_config: RustlsConfig,
    cert_path: Utf8PathBuf,
    key_path: Utf8PathBuf,
    mut rx_halt: oneshot::Receiver<Halted>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let delay = next_reload_delay(&cert_path);

            info!(target: HTTP_TRACKER_LOG_TARGET, "Time until certificate reload: {delay:?}");

            tokio::select! {
                _ = &mut rx_halt => {
                    break;
                }
                () = tokio::time::sleep(delay) => {
                    match tls_config.reload_from_pem_file(cert_path.clone(), key_path.clone()).await {
                        Ok(()) => info!(target: HTTP_TRACKER_LOG_TARGET, "TLS certificate successfully reloaded"),
                        Err(e) => {
                            error!(target: HTTP_TRACKER_LOG_TARGET, "Keeping old TLS certificate because the new one could not be loaded: {e}");
                        }
                    }
                }
            }
        }
    })
}
