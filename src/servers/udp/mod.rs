//! UDP tracker, per [BEP 15. UDP Tracker Protocol for `BitTorrent`](https://www.bittorrent.org/beps/bep_0015.html).
//!
//! The service is connectionless at the transport layer. A two-round-trip
//! handshake produces a short-lived connection ID that subsequent announce
//! and scrape messages must present, thwarting off-path spoofers:
//!
//! 1. **Connect**: the client sends a magic protocol identifier and receives
//!    a `connection_id` bound to its source address (see
//!    [`connection_cookie`]).
//! 2. **Announce / scrape**: accepted only when the presented
//!    `connection_id` still validates for that source address.
//!
//! All integers on the wire are big-endian; the codec lives in [`protocol`].
//! Undersized or malformed packets are dropped silently to avoid becoming an
//! amplification vector.
use std::net::SocketAddr;

pub mod connection_cookie;
pub mod error;
pub mod handlers;
pub mod peer_builder;
pub mod protocol;
pub mod server;

pub const UDP_TRACKER_LOG_TARGET: &str = "UDP TRACKER";

/// The maximum size of a datagram the receive loop accepts. Buffers of this
/// size are drawn from a reusable pool.
pub const MAX_PACKET_SIZE: usize = 2048;

/// A UDP request that has been received from the socket but not parsed yet.
#[derive(Debug)]
pub struct RawRequest {
    pub payload: Vec<u8>,
    pub from: SocketAddr,
}
