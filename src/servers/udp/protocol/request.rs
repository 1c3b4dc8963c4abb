//! Parsing and writing of UDP tracker requests.
use std::io::{self, Cursor, Read, Write};
use std::net::Ipv4Addr;

use byteorder::{NetworkEndian, ReadBytesExt, WriteBytesExt};

use super::{
    AnnounceRequest, ConnectRequest, ConnectionId, NumberOfPeers, PeerKey, Port, Request, ScrapeRequest, TransactionId,
    PROTOCOL_IDENTIFIER,
};
use crate::core::peer::{AnnounceEvent, Id as PeerId, NumberOfBytes};
use crate::shared::bit_torrent::common::MAX_SCRAPE_TORRENTS;
use crate::shared::bit_torrent::info_hash::InfoHash;

/// An error that occurred while parsing a request packet.
///
/// `Sendable` errors carry the transaction id of the offending packet, so an
/// error response can be sent back. `Unsendable` errors come from packets
/// too mangled to even extract a transaction id from; those are dropped
/// silently to avoid turning the tracker into an amplification vector.
#[derive(Debug)]
pub enum RequestParseError {
    Sendable {
        connection_id: ConnectionId,
        transaction_id: TransactionId,
        message: &'static str,
    },
    Unsendable {
        message: &'static str,
    },
}

impl RequestParseError {
    #[must_use]
    pub fn sendable_text(message: &'static str, connection_id: i64, transaction_id: i32) -> Self {
        Self::Sendable {
            connection_id: ConnectionId(connection_id),
            transaction_id: TransactionId(transaction_id),
            message,
        }
    }

    #[must_use]
    pub fn unsendable_text(message: &'static str) -> Self {
        Self::Unsendable { message }
    }
}

impl Request {
    /// Writes the request in its wire format.
    ///
    /// # Errors
    ///
    /// Will return an `io::Error` when the writer refuses bytes.
    pub fn write_bytes(&self, bytes: &mut impl Write) -> Result<(), io::Error> {
        match self {
            Request::Connect(r) => {
                bytes.write_i64::<NetworkEndian>(PROTOCOL_IDENTIFIER)?;
                bytes.write_i32::<NetworkEndian>(0)?;
                bytes.write_i32::<NetworkEndian>(r.transaction_id.0)?;
            }

            Request::Announce(r) => {
                bytes.write_i64::<NetworkEndian>(r.connection_id.0)?;
                bytes.write_i32::<NetworkEndian>(1)?;
                bytes.write_i32::<NetworkEndian>(r.transaction_id.0)?;

                bytes.write_all(&r.info_hash.0)?;
                bytes.write_all(&r.peer_id.0)?;

                bytes.write_i64::<NetworkEndian>(r.bytes_downloaded.0)?;
                bytes.write_i64::<NetworkEndian>(r.bytes_left.0)?;
                bytes.write_i64::<NetworkEndian>(r.bytes_uploaded.0)?;

                bytes.write_i32::<NetworkEndian>(r.event.to_i32())?;

                bytes.write_all(&r.ip_address.map_or([0; 4], |ip| ip.octets()))?;

                bytes.write_u32::<NetworkEndian>(r.key.0)?;
                bytes.write_i32::<NetworkEndian>(r.peers_wanted.0)?;
                bytes.write_u16::<NetworkEndian>(r.port.0)?;
            }

            Request::Scrape(r) => {
                bytes.write_i64::<NetworkEndian>(r.connection_id.0)?;
                bytes.write_i32::<NetworkEndian>(2)?;
                bytes.write_i32::<NetworkEndian>(r.transaction_id.0)?;

                for info_hash in &r.info_hashes {
                    bytes.write_all(&info_hash.0)?;
                }
            }
        }

        Ok(())
    }

    /// Parses a request from its wire format.
    ///
    /// # Errors
    ///
    /// Will return a [`RequestParseError`] when the packet is not a valid
    /// request. Truncated packets are unsendable; packets carrying a bad
    /// action, an unknown event or an empty scrape produce sendable errors.
    pub fn parse_bytes(bytes: &[u8]) -> Result<Self, RequestParseError> {
        if bytes.len() < 16 {
            return Err(RequestParseError::unsendable_text("packet too short"));
        }

        let connection_id = i64::from_be_bytes(bytes[0..8].try_into().expect("it should be 8 bytes"));
        let action = i32::from_be_bytes(bytes[8..12].try_into().expect("it should be 4 bytes"));
        let transaction_id = i32::from_be_bytes(bytes[12..16].try_into().expect("it should be 4 bytes"));

        let mut cursor = Cursor::new(bytes);
        cursor.set_position(16);

        match action {
            // Connect
            0 => {
                if connection_id == PROTOCOL_IDENTIFIER {
                    Ok(ConnectRequest {
                        transaction_id: TransactionId(transaction_id),
                    }
                    .into())
                } else {
                    Err(RequestParseError::unsendable_text("protocol identifier missing"))
                }
            }

            // Announce
            1 => {
                let mut info_hash = [0; 20];
                let mut peer_id = [0; 20];
                let mut ip = [0; 4];

                let truncated = |_: io::Error| RequestParseError::unsendable_text("announce packet too short");

                cursor.read_exact(&mut info_hash).map_err(truncated)?;
                cursor.read_exact(&mut peer_id).map_err(truncated)?;

                let bytes_downloaded = cursor.read_i64::<NetworkEndian>().map_err(truncated)?;
                let bytes_left = cursor.read_i64::<NetworkEndian>().map_err(truncated)?;
                let bytes_uploaded = cursor.read_i64::<NetworkEndian>().map_err(truncated)?;
                let event = cursor.read_i32::<NetworkEndian>().map_err(truncated)?;

                cursor.read_exact(&mut ip).map_err(truncated)?;

                let key = cursor.read_u32::<NetworkEndian>().map_err(truncated)?;
                let peers_wanted = cursor.read_i32::<NetworkEndian>().map_err(truncated)?;
                let port = cursor.read_u16::<NetworkEndian>().map_err(truncated)?;

                let Some(event) = AnnounceEvent::from_i32(event) else {
                    return Err(RequestParseError::sendable_text("invalid event", connection_id, transaction_id));
                };

                let opt_ip = if ip == [0; 4] { None } else { Some(Ipv4Addr::from(ip)) };

                Ok(AnnounceRequest {
                    connection_id: ConnectionId(connection_id),
                    transaction_id: TransactionId(transaction_id),
                    info_hash: InfoHash(info_hash),
                    peer_id: PeerId(peer_id),
                    bytes_downloaded: NumberOfBytes(bytes_downloaded),
                    bytes_uploaded: NumberOfBytes(bytes_uploaded),
                    bytes_left: NumberOfBytes(bytes_left),
                    event,
                    ip_address: opt_ip,
                    key: PeerKey(key),
                    peers_wanted: NumberOfPeers(peers_wanted),
                    port: Port(port),
                }
                .into())
            }

            // Scrape
            2 => {
                let position = cursor.position() as usize;
                let remaining_bytes = &bytes[position..];

                // K is derived from the packet length.
                let available_hashes = remaining_bytes.len() / 20;
                let actual_hashes = available_hashes.min(MAX_SCRAPE_TORRENTS);

                if actual_hashes == 0 {
                    return Err(RequestParseError::sendable_text(
                        "full scrapes are not allowed",
                        connection_id,
                        transaction_id,
                    ));
                }

                let mut info_hashes = Vec::with_capacity(actual_hashes);

                for chunk in remaining_bytes.chunks_exact(20).take(actual_hashes) {
                    let hash_array: [u8; 20] = chunk.try_into().expect("it should be a 20 byte chunk");
                    info_hashes.push(InfoHash(hash_array));
                }

                Ok(ScrapeRequest {
                    connection_id: ConnectionId(connection_id),
                    transaction_id: TransactionId(transaction_id),
                    info_hashes,
                }
                .into())
            }

            _ => Err(RequestParseError::sendable_text("invalid action", connection_id, transaction_id)),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::net::Ipv4Addr;

    use super::{Request, RequestParseError};
    use crate::core::peer::{self, AnnounceEvent, NumberOfBytes};
    use crate::servers::udp::protocol::{
        AnnounceRequest, ConnectRequest, ConnectionId, NumberOfPeers, PeerKey, Port, ScrapeRequest, TransactionId,
    };
    use crate::shared::bit_torrent::common::MAX_SCRAPE_TORRENTS;
    use crate::shared::bit_torrent::info_hash::InfoHash;

    fn round_trip(request: Request) {
        let mut bytes = Vec::new();
        request.write_bytes(&mut bytes).unwrap();

        let parsed = Request::parse_bytes(&bytes).unwrap();

        assert_eq!(parsed, request);
    }

    fn sample_announce_request() -> AnnounceRequest {
        AnnounceRequest {
            connection_id: ConnectionId(0x1234_5678_9abc_def0),
            transaction_id: TransactionId(42),
            info_hash: InfoHash([0x69; 20]),
            peer_id: peer::Id(*b"-qB00000000000000001"),
            bytes_downloaded: NumberOfBytes(1),
            bytes_left: NumberOfBytes(2),
            bytes_uploaded: NumberOfBytes(3),
            event: AnnounceEvent::Started,
            ip_address: Some(Ipv4Addr::new(10, 0, 0, 1)),
            key: PeerKey(0xCAFE),
            peers_wanted: NumberOfPeers(-1),
            port: Port(6881),
        }
    }

    #[test]
    fn a_connect_request_should_survive_a_write_parse_round_trip() {
        round_trip(Request::Connect(ConnectRequest {
            transaction_id: TransactionId(42),
        }));
    }

    #[test]
    fn an_announce_request_should_survive_a_write_parse_round_trip() {
        round_trip(Request::Announce(sample_announce_request()));
    }

    #[test]
    fn a_scrape_request_should_survive_a_write_parse_round_trip() {
        round_trip(Request::Scrape(ScrapeRequest {
            connection_id: ConnectionId(7),
            transaction_id: TransactionId(42),
            info_hashes: vec![InfoHash([1; 20]), InfoHash([2; 20])],
        }));
    }

    #[test]
    fn a_connect_request_should_be_exactly_16_bytes() {
        let mut bytes = Vec::new();
        Request::Connect(ConnectRequest {
            transaction_id: TransactionId(1),
        })
        .write_bytes(&mut bytes)
        .unwrap();

        assert_eq!(bytes.len(), 16);
    }

    #[test]
    fn an_announce_request_should_be_exactly_98_bytes() {
        let mut bytes = Vec::new();
        Request::Announce(sample_announce_request()).write_bytes(&mut bytes).unwrap();

        assert_eq!(bytes.len(), 98);
    }

    #[test]
    fn a_packet_shorter_than_16_bytes_should_be_unsendable() {
        let result = Request::parse_bytes(&[0u8; 15]);

        assert!(matches!(result, Err(RequestParseError::Unsendable { .. })));
    }

    #[test]
    fn a_connect_request_without_the_magic_protocol_identifier_should_be_unsendable() {
        let mut bytes = Vec::new();
        Request::Connect(ConnectRequest {
            transaction_id: TransactionId(1),
        })
        .write_bytes(&mut bytes)
        .unwrap();

        bytes[0] ^= 0xFF;

        assert!(matches!(Request::parse_bytes(&bytes), Err(RequestParseError::Unsendable { .. })));
    }

    #[test]
    fn a_truncated_announce_request_should_be_unsendable() {
        let mut bytes = Vec::new();
        Request::Announce(sample_announce_request()).write_bytes(&mut bytes).unwrap();

        let result = Request::parse_bytes(&bytes[..50]);

        assert!(matches!(result, Err(RequestParseError::Unsendable { .. })));
    }

    #[test]
    fn an_unknown_event_code_should_produce_a_sendable_invalid_event_error() {
        let mut bytes = Vec::new();
        Request::Announce(sample_announce_request()).write_bytes(&mut bytes).unwrap();

        // The event field is right after connection_id (8), action (4),
        // transaction_id (4), info_hash (20), peer_id (20) and the three
        // 64-bit counters (24).
        let event_offset = 8 + 4 + 4 + 20 + 20 + 24;
        bytes[event_offset..event_offset + 4].copy_from_slice(&9i32.to_be_bytes());

        match Request::parse_bytes(&bytes) {
            Err(RequestParseError::Sendable {
                transaction_id, message, ..
            }) => {
                assert_eq!(transaction_id, TransactionId(42));
                assert_eq!(message, "invalid event");
            }
            other => panic!("expected a sendable error, got: {other:?}"),
        }
    }

    #[test]
    fn an_unknown_action_should_produce_a_sendable_invalid_action_error() {
        let mut bytes = vec![0u8; 16];
        bytes[8..12].copy_from_slice(&9i32.to_be_bytes());
        bytes[12..16].copy_from_slice(&42i32.to_be_bytes());

        match Request::parse_bytes(&bytes) {
            Err(RequestParseError::Sendable { message, .. }) => assert_eq!(message, "invalid action"),
            other => panic!("expected a sendable error, got: {other:?}"),
        }
    }

    #[test]
    fn a_scrape_request_without_info_hashes_should_be_rejected() {
        let request = Request::Scrape(ScrapeRequest {
            connection_id: ConnectionId(7),
            transaction_id: TransactionId(42),
            info_hashes: vec![],
        });

        let mut bytes = Vec::new();
        request.write_bytes(&mut bytes).unwrap();

        assert!(matches!(Request::parse_bytes(&bytes), Err(RequestParseError::Sendable { .. })));
    }

    #[test]
    fn a_scrape_request_should_be_capped_to_the_maximum_scrape_torrents() {
        let request = Request::Scrape(ScrapeRequest {
            connection_id: ConnectionId(7),
            transaction_id: TransactionId(42),
            info_hashes: (0..=u8::try_from(MAX_SCRAPE_TORRENTS).unwrap()).map(|n| InfoHash([n; 20])).collect(),
        });

        let mut bytes = Vec::new();
        request.write_bytes(&mut bytes).unwrap();

        match Request::parse_bytes(&bytes).unwrap() {
            Request::Scrape(parsed) => assert_eq!(parsed.info_hashes.len(), MAX_SCRAPE_TORRENTS),
            other => panic!("expected a scrape request, got: {other:?}"),
        }
    }

    #[test]
    fn an_announce_request_with_a_zero_ip_field_should_mean_use_the_source_address() {
        let mut request = sample_announce_request();
        request.ip_address = None;

        let mut bytes = Vec::new();
        Request::Announce(request.clone()).write_bytes(&mut bytes).unwrap();

        match Request::parse_bytes(&bytes).unwrap() {
            Request::Announce(parsed) => assert_eq!(parsed.ip_address, None),
            other => panic!("expected an announce request, got: {other:?}"),
        }
    }
}
