//! Peer struct used by the core `Tracker`.
//!
//! A sample peer:
//!
//! ```rust
//! use std::net::{IpAddr, Ipv4Addr, SocketAddr};
//! use vortex_tracker::core::peer::{self, AnnounceEvent, NumberOfBytes};
//! use vortex_tracker::shared::clock::DurationSinceUnixEpoch;
//!
//! peer::Peer {
//!     peer_id: peer::Id(*b"-qB00000000000000000"),
//!     peer_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::new(126, 0, 0, 1)), 8080),
//!     updated: DurationSinceUnixEpoch::new(1_669_397_478_934, 0),
//!     uploaded: NumberOfBytes(0),
//!     downloaded: NumberOfBytes(0),
//!     left: NumberOfBytes(0),
//!     event: AnnounceEvent::Started,
//! };
//! ```
use std::net::{IpAddr, SocketAddr};
use std::panic::Location;

use serde::Serialize;
use thiserror::Error;

use crate::shared::clock::DurationSinceUnixEpoch;

pub const PEER_ID_BYTES_LEN: usize = 20;

/// The ID the downloader client generates for itself. 20 raw bytes, opaque
/// and not authenticated.
#[derive(PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy, Debug)]
pub struct Id(pub [u8; PEER_ID_BYTES_LEN]);

/// Error returned when trying to convert an invalid peer id from another type.
///
/// Usually because the source format does not contain 20 bytes.
#[derive(Error, Debug)]
pub enum IdConversionError {
    #[error("not enough bytes for peer id: {message} {location}")]
    NotEnoughBytes {
        location: &'static Location<'static>,
        message: String,
    },
    #[error("too many bytes for peer id: {message} {location}")]
    TooManyBytes {
        location: &'static Location<'static>,
        message: String,
    },
}

impl Id {
    /// Converts to a hex string.
    ///
    /// For the `Id` `-qB00000000000000000` it returns
    /// `0x2d71423030303030303030303030303030303030`.
    ///
    /// Returns `None` if the id cannot be represented as hex.
    #[must_use]
    pub fn to_hex_string(&self) -> Option<String> {
        let mut tmp = [0u8; PEER_ID_BYTES_LEN * 2];

        binascii::bin2hex(&self.0, &mut tmp).unwrap();

        std::str::from_utf8(&tmp).ok().map(|hex| format!("0x{hex}"))
    }
}

impl From<[u8; PEER_ID_BYTES_LEN]> for Id {
    fn from(bytes: [u8; PEER_ID_BYTES_LEN]) -> Self {
        Id(bytes)
    }
}

impl TryFrom<Vec<u8>> for Id {
    type Error = IdConversionError;

    fn try_from(bytes: Vec<u8>) -> Result<Self, Self::Error> {
        if bytes.len() < PEER_ID_BYTES_LEN {
            return Err(IdConversionError::NotEnoughBytes {
                location: Location::caller(),
                message: format! {"got {} bytes, expected {}", bytes.len(), PEER_ID_BYTES_LEN},
            });
        }
        if bytes.len() > PEER_ID_BYTES_LEN {
            return Err(IdConversionError::TooManyBytes {
                location: Location::caller(),
                message: format! {"got {} bytes, expected {}", bytes.len(), PEER_ID_BYTES_LEN},
            });
        }

        let mut data = [0u8; PEER_ID_BYTES_LEN];
        data.copy_from_slice(&bytes);
        Ok(Id(data))
    }
}

impl std::str::FromStr for Id {
    type Err = IdConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::try_from(s.as_bytes().to_vec())
    }
}

impl std::fmt::Display for Id {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.to_hex_string() {
            Some(hex) => write!(f, "{hex}"),
            None => write!(f, ""),
        }
    }
}

impl Serialize for Id {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_some(&self.to_hex_string())
    }
}

/// A number of bytes reported in an announce request. The wire carries
/// unsigned values but the stored counters are `i64`, matching the 64-bit
/// fields of the UDP protocol.
#[derive(PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy, Debug, Serialize)]
pub struct NumberOfBytes(pub i64);

/// The event that the peer has announced: `started`, `completed`, `stopped`,
/// or none of them.
///
/// If the event is not present or empty that means that the peer is just
/// updating its status. It's one of the announcements done at regular
/// intervals.
#[derive(PartialEq, Eq, Hash, Clone, Copy, Debug, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AnnounceEvent {
    None,
    Completed,
    Started,
    Stopped,
}

impl AnnounceEvent {
    /// Decodes the event field of a UDP announce request.
    ///
    /// `0=none, 1=completed, 2=started, 3=stopped`. Any other value is not a
    /// valid event.
    #[must_use]
    pub fn from_i32(i: i32) -> Option<Self> {
        match i {
            0 => Some(Self::None),
            1 => Some(Self::Completed),
            2 => Some(Self::Started),
            3 => Some(Self::Stopped),
            _ => None,
        }
    }

    #[must_use]
    pub fn to_i32(self) -> i32 {
        match self {
            Self::None => 0,
            Self::Completed => 1,
            Self::Started => 2,
            Self::Stopped => 3,
        }
    }
}

/// The IP version used by the peer: IPv4 or IPv6. The two faces of a
/// dual-stack client are tracked separately.
#[derive(PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy, Debug, Serialize)]
pub enum IpVersion {
    V4,
    V6,
}

impl From<&IpAddr> for IpVersion {
    fn from(ip: &IpAddr) -> Self {
        match ip {
            IpAddr::V4(_) => IpVersion::V4,
            IpAddr::V6(_) => IpVersion::V6,
        }
    }
}

/// The identity of a peer within a swarm: `(peer id, address family)`.
#[derive(PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy, Debug)]
pub struct Key {
    pub id: Id,
    pub family: IpVersion,
}

/// Peer struct used by the core `Tracker`.
#[derive(Debug, Clone, Serialize, Copy, PartialEq, Eq, Hash)]
pub struct Peer {
    /// ID used by the downloader peer
    pub peer_id: Id,
    /// The IP and port this peer is listening on
    pub peer_addr: SocketAddr,
    /// The last time the tracker received an announce request from this peer (timestamp)
    #[serde(serialize_with = "ser_unix_time_value")]
    pub updated: DurationSinceUnixEpoch,
    /// The total amount of bytes uploaded by this peer so far
    pub uploaded: NumberOfBytes,
    /// The total amount of bytes downloaded by this peer so far
    pub downloaded: NumberOfBytes,
    /// The number of bytes this peer still has to download
    pub left: NumberOfBytes,
    /// This is an optional key which maps to started, completed, or stopped (or empty, which is the same as not being present).
    pub event: AnnounceEvent,
}

/// Serializes a `DurationSinceUnixEpoch` as a Unix timestamp in milliseconds.
///
/// # Errors
///
/// Will return `serde::Serializer::Error` if unable to serialize the `unix_time_value`.
pub fn ser_unix_time_value<S: serde::Serializer>(unix_time_value: &DurationSinceUnixEpoch, ser: S) -> Result<S::Ok, S::Error> {
    #[allow(clippy::cast_possible_truncation)]
    ser.serialize_u64(unix_time_value.as_millis() as u64)
}

impl Ord for Peer {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.key().cmp(&other.key())
    }
}

impl PartialOrd for Peer {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Peer {
    /// A peer with a complete copy. Seeders are peers with `left == 0`.
    #[must_use]
    pub fn is_seeder(&self) -> bool {
        self.left.0 <= 0
    }

    #[must_use]
    pub fn ip(&self) -> IpAddr {
        self.peer_addr.ip()
    }

    pub fn change_ip(&mut self, new_ip: &IpAddr) {
        self.peer_addr = SocketAddr::new(*new_ip, self.peer_addr.port());
    }

    /// The IP version used by the peer: IPv4 or IPv6
    #[must_use]
    pub fn ip_version(&self) -> IpVersion {
        IpVersion::from(&self.peer_addr.ip())
    }

    /// The identity of this peer within a swarm.
    #[must_use]
    pub fn key(&self) -> Key {
        Key {
            id: self.peer_id,
            family: self.ip_version(),
        }
    }
}

pub mod fixture {
    use std::net::{IpAddr, Ipv4Addr, SocketAddr};

    use super::{AnnounceEvent, Id, NumberOfBytes, Peer};
    use crate::shared::clock::DurationSinceUnixEpoch;

    #[derive(PartialEq, Debug)]
    pub struct PeerBuilder {
        peer: Peer,
    }

    #[allow(clippy::derivable_impls)]
    impl Default for PeerBuilder {
        fn default() -> Self {
            Self { peer: Peer::default() }
        }
    }

    impl PeerBuilder {
        #[must_use]
        pub fn seeder() -> Self {
            let peer = Peer {
                peer_id: Id(*b"-qB00000000000000001"),
                peer_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)), 8080),
                updated: DurationSinceUnixEpoch::new(1_669_397_478_934, 0),
                uploaded: NumberOfBytes(0),
                downloaded: NumberOfBytes(0),
                left: NumberOfBytes(0),
                event: AnnounceEvent::Completed,
            };

            Self { peer }
        }

        #[must_use]
        pub fn leecher() -> Self {
            let peer = Peer {
                peer_id: Id(*b"-qB00000000000000002"),
                peer_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::new(127, 0, 0, 2)), 8080),
                updated: DurationSinceUnixEpoch::new(1_669_397_478_934, 0),
                uploaded: NumberOfBytes(0),
                downloaded: NumberOfBytes(0),
                left: NumberOfBytes(10),
                event: AnnounceEvent::Started,
            };

            Self { peer }
        }

        #[must_use]
        pub fn with_peer_id(mut self, peer_id: &Id) -> Self {
            self.peer.peer_id = *peer_id;
            self
        }

        #[must_use]
        pub fn with_peer_addr(mut self, peer_addr: &SocketAddr) -> Self {
            self.peer.peer_addr = *peer_addr;
            self
        }

        #[must_use]
        pub fn with_event(mut self, event: AnnounceEvent) -> Self {
            self.peer.event = event;
            self
        }

        #[must_use]
        pub fn with_bytes_pending_to_download(mut self, left: i64) -> Self {
            self.peer.left = NumberOfBytes(left);
            self
        }

        #[must_use]
        pub fn with_no_bytes_pending_to_download(mut self) -> Self {
            self.peer.left = NumberOfBytes(0);
            self
        }

        #[must_use]
        pub fn last_updated_on(mut self, updated: DurationSinceUnixEpoch) -> Self {
            self.peer.updated = updated;
            self
        }

        #[must_use]
        pub fn build(self) -> Peer {
            self.peer
        }
    }

    impl Default for Peer {
        fn default() -> Self {
            Self {
                peer_id: Id(*b"-qB00000000000000000"),
                peer_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)), 8080),
                updated: DurationSinceUnixEpoch::new(1_669_397_478_934, 0),
                uploaded: NumberOfBytes(0),
                downloaded: NumberOfBytes(0),
                left: NumberOfBytes(0),
                event: AnnounceEvent::Started,
            }
        }
    }
}

#[cfg(test)]
pub mod test {
    mod torrent_peer_id {
        use crate::core::peer;

        #[test]
        #[should_panic = "NotEnoughBytes"]
        fn should_fail_trying_to_convert_from_a_byte_vector_with_less_than_20_bytes() {
            let _ = peer::Id::try_from([0; 19].to_vec()).unwrap();
        }

        #[test]
        #[should_panic = "TooManyBytes"]
        fn should_fail_trying_to_convert_from_a_byte_vector_with_more_than_20_bytes() {
            let _ = peer::Id::try_from([0; 21].to_vec()).unwrap();
        }

        #[test]
        fn should_be_converted_to_hex_string() {
            let id = peer::Id(*b"-qB00000000000000000");
            assert_eq!(id.to_hex_string().unwrap(), "0x2d71423030303030303030303030303030303030");
        }
    }

    mod announce_event {
        use crate::core::peer::AnnounceEvent;

        #[test]
        fn it_should_decode_the_wire_event_codes() {
            assert_eq!(AnnounceEvent::from_i32(0), Some(AnnounceEvent::None));
            assert_eq!(AnnounceEvent::from_i32(1), Some(AnnounceEvent::Completed));
            assert_eq!(AnnounceEvent::from_i32(2), Some(AnnounceEvent::Started));
            assert_eq!(AnnounceEvent::from_i32(3), Some(AnnounceEvent::Stopped));
        }

        #[test]
        fn it_should_reject_unknown_wire_event_codes() {
            assert_eq!(AnnounceEvent::from_i32(4), None);
            assert_eq!(AnnounceEvent::from_i32(-1), None);
        }

        #[test]
        fn it_should_round_trip_the_wire_event_codes() {
            for code in 0..=3 {
                assert_eq!(AnnounceEvent::from_i32(code).unwrap().to_i32(), code);
            }
        }
    }

    mod torrent_peer {
        use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

        use crate::core::peer::fixture::PeerBuilder;
        use crate::core::peer::IpVersion;

        #[test]
        fn it_should_classify_seeders_by_left_bytes() {
            assert!(PeerBuilder::seeder().build().is_seeder());
            assert!(!PeerBuilder::leecher().build().is_seeder());
        }

        #[test]
        fn the_ipv4_and_ipv6_faces_of_a_client_should_have_different_swarm_keys() {
            let v4 = PeerBuilder::seeder()
                .with_peer_addr(&SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 8080))
                .build();
            let v6 = PeerBuilder::seeder()
                .with_peer_addr(&SocketAddr::new(IpAddr::V6(Ipv6Addr::LOCALHOST), 8080))
                .build();

            assert_eq!(v4.peer_id, v6.peer_id);
            assert_ne!(v4.key(), v6.key());
            assert_eq!(v4.key().family, IpVersion::V4);
            assert_eq!(v6.key().family, IpVersion::V6);
        }
    }
}
