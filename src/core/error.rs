//! Errors returned by the core `Tracker`.
//!
//! The core never panics on client input. Every rejection is one of the
//! explicit kinds below, and each delivery protocol re-encodes them in its
//! own wire format: the HTTP tracker as a bencoded `failure reason`
//! dictionary, the UDP tracker as an `action = 3` error packet.
use std::panic::Location;

use thiserror::Error;

use crate::shared::bit_torrent::info_hash::InfoHash;

/// Errors surfaced uniformly from the announce and scrape engines.
#[derive(Error, Debug, Clone)]
pub enum Error {
    /// The whitelist hook is configured and refused the infohash.
    #[error("The torrent: {info_hash}, is not whitelisted, {location}")]
    TorrentNotWhitelisted {
        info_hash: InfoHash,
        location: &'static Location<'static>,
    },

    /// The rate limiter hook is configured and refused the caller.
    #[error("The caller exceeded the announce rate limit, {location}")]
    RateLimited { location: &'static Location<'static> },

    /// Unexpected failure while serving the request. It is fatal to this
    /// request only and does not corrupt sibling state.
    #[error("internal server error: {message}, {location}")]
    Internal {
        message: String,
        location: &'static Location<'static>,
    },
}
