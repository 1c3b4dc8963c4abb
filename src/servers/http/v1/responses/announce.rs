//! `Announce` response for the HTTP tracker [`announce`](crate::servers::http::v1::requests::announce::Announce) request.
//!
//! Data structures and logic to build the `announce` response.
use std::io::Write;
use std::net::IpAddr;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use bip_bencode::{ben_bytes, ben_int, ben_list, ben_map, BMutAccess, BencodeMut};

use crate::config::AnnouncePolicy;
use crate::core::torrent::SwarmMetadata;
use crate::core::{peer, AnnounceData};
use crate::servers::http::v1::responses;

/// Normal (non compact) `announce` response.
///
/// It's a bencoded dictionary.
///
/// ```rust
/// use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
/// use vortex_tracker::config::AnnouncePolicy;
/// use vortex_tracker::core::torrent::SwarmMetadata;
/// use vortex_tracker::servers::http::v1::responses::announce::{NonCompact, NonCompactPeer};
///
/// let response = NonCompact {
///     policy: AnnouncePolicy {
///         interval: 111,
///         interval_min: 222,
///     },
///     stats: SwarmMetadata {
///         downloaded: 0,
///         complete: 333,
///         incomplete: 444,
///     },
///     peers: vec![
///         // IPV4
///         NonCompactPeer {
///             peer_id: *b"-qB00000000000000001",
///             ip: IpAddr::V4(Ipv4Addr::new(0x69, 0x69, 0x69, 0x69)), // 105.105.105.105
///             port: 0x7070,                                          // 28784
///         },
///         // IPV6
///         NonCompactPeer {
///             peer_id: *b"-qB00000000000000002",
///             ip: IpAddr::V6(Ipv6Addr::new(0x6969, 0x6969, 0x6969, 0x6969, 0x6969, 0x6969, 0x6969, 0x6969)),
///             port: 0x7070, // 28784
///         },
///     ],
/// };
///
/// let bytes = response.body();
///
/// // The expected bencoded response.
/// let expected_bytes = b"d8:completei333e10:incompletei444e8:intervali111e12:min intervali222e5:peersld2:ip15:105.105.105.1057:peer id20:-qB000000000000000014:porti28784eed2:ip39:6969:6969:6969:6969:6969:6969:6969:69697:peer id20:-qB000000000000000024:porti28784eeee";
///
/// assert_eq!(
///     String::from_utf8(bytes).unwrap(),
///     String::from_utf8(expected_bytes.to_vec()).unwrap()
/// );
/// ```
///
/// Refer to [BEP 03: The `BitTorrent` Protocol Specification](https://www.bittorrent.org/beps/bep_0003.html)
/// for more information.
#[derive(Debug, PartialEq)]
pub struct NonCompact {
    pub policy: AnnouncePolicy,
    pub stats: SwarmMetadata,
    pub peers: Vec<NonCompactPeer>,
}

/// Peer information in the [`NonCompact`] response.
#[derive(Debug, PartialEq)]
pub struct NonCompactPeer {
    /// The peer's ID.
    pub peer_id: [u8; 20],
    /// The peer's IP address.
    pub ip: IpAddr,
    /// The peer's port number.
    pub port: u16,
}

impl NonCompactPeer {
    #[must_use]
    pub fn ben_map(&self) -> BencodeMut<'_> {
        ben_map! {
            "peer id" => ben_bytes!(self.peer_id.to_vec()),
            "ip" => ben_bytes!(self.ip.to_string()),
            "port" => ben_int!(i64::from(self.port))
        }
    }
}

impl From<peer::Peer> for NonCompactPeer {
    fn from(peer: peer::Peer) -> Self {
        NonCompactPeer {
            peer_id: peer.peer_id.0,
            ip: peer.peer_addr.ip(),
            port: peer.peer_addr.port(),
        }
    }
}

impl NonCompact {
    /// Returns the bencoded body of the non-compact response.
    ///
    /// # Panics
    ///
    /// Will panic if it can't access the bencode as a mutable `BListAccess`.
    #[must_use]
    pub fn body(&self) -> Vec<u8> {
        let mut peers_list = ben_list!();
        let peers_list_mut = peers_list.list_mut().unwrap();
        for peer in &self.peers {
            peers_list_mut.push(peer.ben_map());
        }

        (ben_map! {
            "complete" => ben_int!(i64::from(self.stats.complete)),
            "incomplete" => ben_int!(i64::from(self.stats.incomplete)),
            "interval" => ben_int!(i64::from(self.policy.interval)),
            "min interval" => ben_int!(i64::from(self.policy.interval_min)),
            "peers" => peers_list.clone()
        })
        .encode()
    }
}

impl IntoResponse for NonCompact {
    fn into_response(self) -> Response {
        (StatusCode::OK, self.body()).into_response()
    }
}

impl From<AnnounceData> for NonCompact {
    fn from(domain_announce_response: AnnounceData) -> Self {
        let peers: Vec<NonCompactPeer> = domain_announce_response
            .peers
            .iter()
            .map(|peer| NonCompactPeer::from(**peer))
            .collect();

        Self {
            policy: domain_announce_response.policy,
            stats: domain_announce_response.stats,
            peers,
        }
    }
}

/// Compact `announce` response.
///
/// _"To reduce the size of tracker responses and to reduce memory and
/// computational requirements in trackers, trackers may return peers as a
/// packed string rather than as a bencoded list."_
///
/// IPv4 peers are packed in the `peers` string, 6 bytes per peer; IPv6
/// peers go in a separate `peers6` string, 18 bytes per peer.
///
/// ```rust
/// use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
/// use vortex_tracker::config::AnnouncePolicy;
/// use vortex_tracker::core::torrent::SwarmMetadata;
/// use vortex_tracker::servers::http::v1::responses::announce::{Compact, CompactPeer};
///
/// let response = Compact {
///     policy: AnnouncePolicy {
///         interval: 111,
///         interval_min: 222,
///     },
///     stats: SwarmMetadata {
///         downloaded: 0,
///         complete: 333,
///         incomplete: 444,
///     },
///     peers: vec![
///         // IPV4
///         CompactPeer {
///             ip: IpAddr::V4(Ipv4Addr::new(0x69, 0x69, 0x69, 0x69)), // 105.105.105.105
///             port: 0x7070,                                          // 28784
///         },
///         // IPV6
///         CompactPeer {
///             ip: IpAddr::V6(Ipv6Addr::new(0x6969, 0x6969, 0x6969, 0x6969, 0x6969, 0x6969, 0x6969, 0x6969)),
///             port: 0x7070, // 28784
///         },
///     ],
/// };
///
/// let bytes = response.body().unwrap();
///
/// // The expected bencoded response.
/// let expected_bytes =
///     // cspell:disable-next-line
///     b"d8:completei333e10:incompletei444e8:intervali111e12:min intervali222e5:peers6:iiiipp6:peers618:iiiiiiiiiiiiiiiippe";
///
/// assert_eq!(
///     String::from_utf8(bytes).unwrap(),
///     String::from_utf8(expected_bytes.to_vec()).unwrap()
/// );
/// ```
///
/// Refer to the official BEPs for more information:
///
/// - [BEP 23: Tracker Returns Compact Peer Lists](https://www.bittorrent.org/beps/bep_0023.html)
/// - [BEP 07: IPv6 Tracker Extension](https://www.bittorrent.org/beps/bep_0007.html)
#[derive(Debug, PartialEq)]
pub struct Compact {
    pub policy: AnnouncePolicy,
    pub stats: SwarmMetadata,
    pub peers: Vec<CompactPeer>,
}

/// Compact peer. It's used in the [`Compact`] response. Aside from reducing
/// the size of the response, this format does not contain the peer's ID.
#[derive(Debug, PartialEq)]
pub struct CompactPeer {
    /// The peer's IP address.
    pub ip: IpAddr,
    /// The peer's port number.
    pub port: u16,
}

impl CompactPeer {
    /// Returns the compact peer as a byte vector: the address in network
    /// byte order followed by the port.
    ///
    /// # Errors
    ///
    /// Will return `Err` if internally interrupted.
    pub fn bytes(&self) -> Result<Vec<u8>, Box<dyn std::error::Error>> {
        let mut bytes: Vec<u8> = Vec::new();
        match self.ip {
            IpAddr::V4(ip) => {
                bytes.write_all(&u32::from(ip).to_be_bytes())?;
            }
            IpAddr::V6(ip) => {
                bytes.write_all(&u128::from(ip).to_be_bytes())?;
            }
        }
        bytes.write_all(&self.port.to_be_bytes())?;
        Ok(bytes)
    }
}

impl From<peer::Peer> for CompactPeer {
    fn from(peer: peer::Peer) -> Self {
        CompactPeer {
            ip: peer.peer_addr.ip(),
            port: peer.peer_addr.port(),
        }
    }
}

impl Compact {
    /// Returns the bencoded compact response as a byte vector.
    ///
    /// # Errors
    ///
    /// Will return `Err` if internally interrupted.
    pub fn body(&self) -> Result<Vec<u8>, Box<dyn std::error::Error>> {
        let bytes = (ben_map! {
            "complete" => ben_int!(i64::from(self.stats.complete)),
            "incomplete" => ben_int!(i64::from(self.stats.incomplete)),
            "interval" => ben_int!(i64::from(self.policy.interval)),
            "min interval" => ben_int!(i64::from(self.policy.interval_min)),
            "peers" => ben_bytes!(self.peers_v4_bytes()?),
            "peers6" => ben_bytes!(self.peers_v6_bytes()?)
        })
        .encode();

        Ok(bytes)
    }

    fn peers_v4_bytes(&self) -> Result<Vec<u8>, Box<dyn std::error::Error>> {
        let mut bytes: Vec<u8> = Vec::new();
        for compact_peer in &self.peers {
            if compact_peer.ip.is_ipv4() {
                let peer_bytes = compact_peer.bytes()?;
                bytes.write_all(&peer_bytes)?;
            }
        }
        Ok(bytes)
    }

    fn peers_v6_bytes(&self) -> Result<Vec<u8>, Box<dyn std::error::Error>> {
        let mut bytes: Vec<u8> = Vec::new();
        for compact_peer in &self.peers {
            if compact_peer.ip.is_ipv6() {
                let peer_bytes = compact_peer.bytes()?;
                bytes.write_all(&peer_bytes)?;
            }
        }
        Ok(bytes)
    }
}

impl IntoResponse for Compact {
    fn into_response(self) -> Response {
        match self.body() {
            Ok(bytes) => (StatusCode::OK, bytes).into_response(),
            Err(err) => responses::error::Error {
                failure_reason: format!("cannot write compact response: {err}"),
            }
            .into_response(),
        }
    }
}

impl From<AnnounceData> for Compact {
    fn from(domain_announce_response: AnnounceData) -> Self {
        let peers: Vec<CompactPeer> = domain_announce_response
            .peers
            .iter()
            .map(|peer| CompactPeer::from(**peer))
            .collect();

        Self {
            policy: domain_announce_response.policy,
            stats: domain_announce_response.stats,
            peers,
        }
    }
}

#[cfg(test)]
mod tests {

    use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

    use super::{Compact, CompactPeer, NonCompact, NonCompactPeer};
    use crate::config::AnnouncePolicy;
    use crate::core::torrent::SwarmMetadata;

    // Some ascii values used in tests:
    //
    // +-----------------+
    // | Dec | Hex | Chr |
    // +-----------------+
    // | 105 | 69  | i   |
    // | 112 | 70  | p   |
    // +-----------------+
    //
    // IP addresses and port numbers used in tests are chosen so that their
    // bencoded representation is also a valid string which makes asserts
    // more readable.

    fn sample_policy() -> AnnouncePolicy {
        AnnouncePolicy {
            interval: 111,
            interval_min: 222,
        }
    }

    fn sample_stats() -> SwarmMetadata {
        SwarmMetadata {
            downloaded: 0,
            complete: 333,
            incomplete: 444,
        }
    }

    #[test]
    fn non_compact_announce_response_can_be_bencoded() {
        let response = NonCompact {
            policy: sample_policy(),
            stats: sample_stats(),
            peers: vec![
                // IPV4
                NonCompactPeer {
                    peer_id: *b"-qB00000000000000001",
                    ip: IpAddr::V4(Ipv4Addr::new(0x69, 0x69, 0x69, 0x69)), // 105.105.105.105
                    port: 0x7070,                                          // 28784
                },
                // IPV6
                NonCompactPeer {
                    peer_id: *b"-qB00000000000000002",
                    ip: IpAddr::V6(Ipv6Addr::new(0x6969, 0x6969, 0x6969, 0x6969, 0x6969, 0x6969, 0x6969, 0x6969)),
                    port: 0x7070, // 28784
                },
            ],
        };

        let bytes = response.body();

        // cspell:disable-next-line
        let expected_bytes = b"d8:completei333e10:incompletei444e8:intervali111e12:min intervali222e5:peersld2:ip15:105.105.105.1057:peer id20:-qB000000000000000014:porti28784eed2:ip39:6969:6969:6969:6969:6969:6969:6969:69697:peer id20:-qB000000000000000024:porti28784eeee";

        assert_eq!(
            String::from_utf8(bytes).unwrap(),
            String::from_utf8(expected_bytes.to_vec()).unwrap()
        );
    }

    #[test]
    fn compact_announce_response_can_be_bencoded() {
        let response = Compact {
            policy: sample_policy(),
            stats: sample_stats(),
            peers: vec![
                // IPV4
                CompactPeer {
                    ip: IpAddr::V4(Ipv4Addr::new(0x69, 0x69, 0x69, 0x69)), // 105.105.105.105
                    port: 0x7070,                                          // 28784
                },
                // IPV6
                CompactPeer {
                    ip: IpAddr::V6(Ipv6Addr::new(0x6969, 0x6969, 0x6969, 0x6969, 0x6969, 0x6969, 0x6969, 0x6969)),
                    port: 0x7070, // 28784
                },
            ],
        };

        let bytes = response.body().unwrap();

        let expected_bytes =
            // cspell:disable-next-line
            b"d8:completei333e10:incompletei444e8:intervali111e12:min intervali222e5:peers6:iiiipp6:peers618:iiiiiiiiiiiiiiiippe";

        assert_eq!(
            String::from_utf8(bytes).unwrap(),
            String::from_utf8(expected_bytes.to_vec()).unwrap()
        );
    }

    #[test]
    fn compact_peers_should_decode_back_to_exactly_the_peers_that_were_encoded() {
        use bip_bencode::{BDecodeOpt, BRefAccess, BencodeRef};

        let peers = vec![
            CompactPeer {
                ip: IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1)),
                port: 6881,
            },
            CompactPeer {
                ip: IpAddr::V4(Ipv4Addr::new(10, 0, 0, 2)),
                port: 6882,
            },
        ];

        let response = Compact {
            policy: sample_policy(),
            stats: sample_stats(),
            peers,
        };

        let bytes = response.body().unwrap();

        let bencode = BencodeRef::decode(&bytes, BDecodeOpt::default()).unwrap();
        let packed = bencode.dict().unwrap().lookup(b"peers").unwrap().bytes().unwrap();

        let decoded: Vec<(Ipv4Addr, u16)> = packed
            .chunks_exact(6)
            .map(|chunk| {
                let ip: [u8; 4] = chunk[..4].try_into().unwrap();
                (Ipv4Addr::from(ip), u16::from_be_bytes([chunk[4], chunk[5]]))
            })
            .collect();

        assert_eq!(
            decoded,
            vec![(Ipv4Addr::new(10, 0, 0, 1), 6881), (Ipv4Addr::new(10, 0, 0, 2), 6882)]
        );
    }

    #[test]
    fn compact_announce_response_with_no_peers_should_have_empty_packed_strings() {
        let response = Compact {
            policy: sample_policy(),
            stats: sample_stats(),
            peers: vec![],
        };

        let bytes = response.body().unwrap();

        let expected_bytes = b"d8:completei333e10:incompletei444e8:intervali111e12:min intervali222e5:peers0:6:peers60:e";

        assert_eq!(
            String::from_utf8(bytes).unwrap(),
            String::from_utf8(expected_bytes.to_vec()).unwrap()
        );
    }
}
