//! The binary codec for the UDP tracker protocol.
//!
//! Wire formats, per [BEP 15](https://www.bittorrent.org/beps/bep_0015.html).
//! All integers are big-endian.
//!
//! ```text
//! Connect request (16 bytes):
//!   magic=0x41727101980 (u64) | action=0 (u32) | transaction_id (u32)
//! Connect response (16 bytes):
//!   action=0 | transaction_id | connection_id (u64)
//! Announce request (98 bytes):
//!   connection_id | action=1 | transaction_id | info_hash[20] | peer_id[20]
//!   | downloaded (u64) | left (u64) | uploaded (u64) | event (u32)
//!   | ip (u32, 0=use source) | key (u32) | num_want (i32, -1=default)
//!   | port (u16)
//! Announce response (variable):
//!   action=1 | transaction_id | interval (u32) | leechers (u32)
//!   | seeders (u32) | [peer_ip peer_port]*
//! Scrape request:
//!   connection_id | action=2 | transaction_id | info_hash[20] x K
//! Scrape response:
//!   action=2 | transaction_id | [seeders (u32) completed (u32) leechers (u32)] x K
//! Error response:
//!   action=3 | transaction_id | message (UTF-8, to end of packet)
//! ```
pub mod request;
pub mod response;

use std::net::{Ipv4Addr, Ipv6Addr};

use crate::core::peer::{AnnounceEvent, NumberOfBytes};
use crate::core::peer::Id as PeerId;
use crate::shared::bit_torrent::info_hash::InfoHash;

/// The magic constant that identifies the protocol in connect requests.
pub const PROTOCOL_IDENTIFIER: i64 = 0x0000_0417_2710_1980;

#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub struct ConnectionId(pub i64);

#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub struct TransactionId(pub i32);

#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub struct AnnounceInterval(pub i32);

#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub struct NumberOfPeers(pub i32);

#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub struct NumberOfDownloads(pub i32);

#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub struct Port(pub u16);

#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub struct PeerKey(pub u32);

#[derive(PartialEq, Eq, Clone, Debug)]
pub struct ConnectRequest {
    pub transaction_id: TransactionId,
}

#[derive(PartialEq, Eq, Clone, Debug)]
pub struct AnnounceRequest {
    pub connection_id: ConnectionId,
    pub transaction_id: TransactionId,
    pub info_hash: InfoHash,
    pub peer_id: PeerId,
    pub bytes_downloaded: NumberOfBytes,
    pub bytes_left: NumberOfBytes,
    pub bytes_uploaded: NumberOfBytes,
    pub event: AnnounceEvent,
    /// The IP the client asks to be registered with. `None` means "use the
    /// source address of the packet"; honoring it is subject to the
    /// `allow_ip_spoofing` tracker option.
    pub ip_address: Option<Ipv4Addr>,
    pub key: PeerKey,
    pub peers_wanted: NumberOfPeers,
    pub port: Port,
}

#[derive(PartialEq, Eq, Clone, Debug)]
pub struct ScrapeRequest {
    pub connection_id: ConnectionId,
    pub transaction_id: TransactionId,
    pub info_hashes: Vec<InfoHash>,
}

/// A request in the UDP tracker protocol.
#[derive(PartialEq, Eq, Clone, Debug)]
pub enum Request {
    Connect(ConnectRequest),
    Announce(AnnounceRequest),
    Scrape(ScrapeRequest),
}

#[derive(PartialEq, Eq, Clone, Debug)]
pub struct ConnectResponse {
    pub connection_id: ConnectionId,
    pub transaction_id: TransactionId,
}

/// One peer entry in an announce response: 6 bytes for IPv4, 18 bytes for
/// IPv6.
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub struct ResponsePeer<I> {
    pub ip_address: I,
    pub port: Port,
}

#[derive(PartialEq, Eq, Clone, Debug)]
pub struct AnnounceResponse<I> {
    pub transaction_id: TransactionId,
    pub announce_interval: AnnounceInterval,
    pub leechers: NumberOfPeers,
    pub seeders: NumberOfPeers,
    pub peers: Vec<ResponsePeer<I>>,
}

#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub struct TorrentScrapeStatistics {
    pub seeders: NumberOfPeers,
    pub completed: NumberOfDownloads,
    pub leechers: NumberOfPeers,
}

#[derive(PartialEq, Eq, Clone, Debug)]
pub struct ScrapeResponse {
    pub transaction_id: TransactionId,
    pub torrent_stats: Vec<TorrentScrapeStatistics>,
}

#[derive(PartialEq, Eq, Clone, Debug)]
pub struct ErrorResponse {
    pub transaction_id: TransactionId,
    pub message: std::borrow::Cow<'static, str>,
}

/// A response in the UDP tracker protocol.
#[derive(PartialEq, Eq, Clone, Debug)]
pub enum Response {
    Connect(ConnectResponse),
    AnnounceIpv4(AnnounceResponse<Ipv4Addr>),
    AnnounceIpv6(AnnounceResponse<Ipv6Addr>),
    Scrape(ScrapeResponse),
    Error(ErrorResponse),
}

impl From<ConnectResponse> for Response {
    fn from(r: ConnectResponse) -> Self {
        Self::Connect(r)
    }
}

impl From<AnnounceResponse<Ipv4Addr>> for Response {
    fn from(r: AnnounceResponse<Ipv4Addr>) -> Self {
        Self::AnnounceIpv4(r)
    }
}

impl From<AnnounceResponse<Ipv6Addr>> for Response {
    fn from(r: AnnounceResponse<Ipv6Addr>) -> Self {
        Self::AnnounceIpv6(r)
    }
}

impl From<ScrapeResponse> for Response {
    fn from(r: ScrapeResponse) -> Self {
        Self::Scrape(r)
    }
}

impl From<ErrorResponse> for Response {
    fn from(r: ErrorResponse) -> Self {
        Self::Error(r)
    }
}

impl From<ConnectRequest> for Request {
    fn from(r: ConnectRequest) -> Self {
        Self::Connect(r)
    }
}

impl From<AnnounceRequest> for Request {
    fn from(r: AnnounceRequest) -> Self {
        Self::Announce(r)
    }
}

impl From<ScrapeRequest> for Request {
    fn from(r: ScrapeRequest) -> Self {
        Self::Scrape(r)
    }
}
