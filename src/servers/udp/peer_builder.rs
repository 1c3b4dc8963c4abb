//! Logic to extract the peer info from the announce request.
use std::net::{IpAddr, SocketAddr};

use super::protocol::AnnounceRequest;
use crate::core::peer::{Id, Peer};
use crate::shared::clock::Time;
use crate::CurrentClock;

/// Extracts the [`Peer`] info from the announce request.
///
/// # Arguments
///
/// * `announce_request` - The announce request to extract the peer info from.
/// * `peer_ip` - The resolved IP address of the peer, not necessarily the one
///   in the announce request.
#[must_use]
pub fn from_request(announce_request: &AnnounceRequest, peer_ip: &IpAddr) -> Peer {
    Peer {
        peer_id: Id(announce_request.peer_id.0),
        peer_addr: SocketAddr::new(*peer_ip, announce_request.port.0),
        updated: CurrentClock::now(),
        uploaded: announce_request.bytes_uploaded,
        downloaded: announce_request.bytes_downloaded,
        left: announce_request.bytes_left,
        event: announce_request.event,
    }
}
