//! Writing and parsing of UDP tracker responses.
use std::io::{self, Cursor, Write};
use std::net::{Ipv4Addr, Ipv6Addr};

use byteorder::{NetworkEndian, ReadBytesExt, WriteBytesExt};

use super::{
    AnnounceInterval, AnnounceResponse, ConnectResponse, ConnectionId, ErrorResponse, NumberOfDownloads, NumberOfPeers, Port,
    Response, ResponsePeer, ScrapeResponse, TorrentScrapeStatistics, TransactionId,
};

impl Response {
    /// Writes the response in its wire format.
    ///
    /// # Errors
    ///
    /// Will return an `io::Error` when the writer refuses bytes.
    pub fn write_bytes(&self, bytes: &mut impl Write) -> Result<(), io::Error> {
        match self {
            Response::Connect(r) => {
                bytes.write_i32::<NetworkEndian>(0)?;
                bytes.write_i32::<NetworkEndian>(r.transaction_id.0)?;
                bytes.write_i64::<NetworkEndian>(r.connection_id.0)?;
            }
            Response::AnnounceIpv4(r) => {
                bytes.write_i32::<NetworkEndian>(1)?;
                bytes.write_i32::<NetworkEndian>(r.transaction_id.0)?;
                bytes.write_i32::<NetworkEndian>(r.announce_interval.0)?;
                bytes.write_i32::<NetworkEndian>(r.leechers.0)?;
                bytes.write_i32::<NetworkEndian>(r.seeders.0)?;

                for peer in &r.peers {
                    bytes.write_all(&peer.ip_address.octets())?;
                    bytes.write_u16::<NetworkEndian>(peer.port.0)?;
                }
            }
            Response::AnnounceIpv6(r) => {
                bytes.write_i32::<NetworkEndian>(1)?;
                bytes.write_i32::<NetworkEndian>(r.transaction_id.0)?;
                bytes.write_i32::<NetworkEndian>(r.announce_interval.0)?;
                bytes.write_i32::<NetworkEndian>(r.leechers.0)?;
                bytes.write_i32::<NetworkEndian>(r.seeders.0)?;

                for peer in &r.peers {
                    bytes.write_all(&peer.ip_address.octets())?;
                    bytes.write_u16::<NetworkEndian>(peer.port.0)?;
                }
            }
            Response::Scrape(r) => {
                bytes.write_i32::<NetworkEndian>(2)?;
                bytes.write_i32::<NetworkEndian>(r.transaction_id.0)?;

                for torrent_stat in &r.torrent_stats {
                    bytes.write_i32::<NetworkEndian>(torrent_stat.seeders.0)?;
                    bytes.write_i32::<NetworkEndian>(torrent_stat.completed.0)?;
                    bytes.write_i32::<NetworkEndian>(torrent_stat.leechers.0)?;
                }
            }
            Response::Error(r) => {
                bytes.write_i32::<NetworkEndian>(3)?;
                bytes.write_i32::<NetworkEndian>(r.transaction_id.0)?;

                bytes.write_all(r.message.as_bytes())?;
            }
        }

        Ok(())
    }

    /// Parses a response from its wire format.
    ///
    /// The packet does not say whether announce peers are 6-byte IPv4 or
    /// 18-byte IPv6 entries, so the caller passes the address family of the
    /// socket the response arrived on.
    ///
    /// # Errors
    ///
    /// Will return an `io::Error` when the packet is too short for its
    /// action.
    pub fn parse_bytes(bytes: &[u8], ipv4: bool) -> Result<Self, io::Error> {
        let mut cursor = Cursor::new(bytes);

        let action = cursor.read_i32::<NetworkEndian>()?;
        let transaction_id = cursor.read_i32::<NetworkEndian>()?;

        match action {
            // Connect
            0 => {
                let connection_id = cursor.read_i64::<NetworkEndian>()?;

                Ok(ConnectResponse {
                    connection_id: ConnectionId(connection_id),
                    transaction_id: TransactionId(transaction_id),
                }
                .into())
            }
            // Announce
            1 if ipv4 => {
                let announce_interval = cursor.read_i32::<NetworkEndian>()?;
                let leechers = cursor.read_i32::<NetworkEndian>()?;
                let seeders = cursor.read_i32::<NetworkEndian>()?;

                let position = cursor.position() as usize;
                let inner = cursor.into_inner();

                let peers = inner[position..]
                    .chunks_exact(6)
                    .map(|chunk| {
                        let ip_bytes: [u8; 4] = chunk[..4].try_into().expect("it should be 4 bytes");
                        let port = u16::from_be_bytes(chunk[4..].try_into().expect("it should be 2 bytes"));

                        ResponsePeer {
                            ip_address: Ipv4Addr::from(ip_bytes),
                            port: Port(port),
                        }
                    })
                    .collect();

                Ok(AnnounceResponse {
                    transaction_id: TransactionId(transaction_id),
                    announce_interval: AnnounceInterval(announce_interval),
                    leechers: NumberOfPeers(leechers),
                    seeders: NumberOfPeers(seeders),
                    peers,
                }
                .into())
            }
            1 => {
                let announce_interval = cursor.read_i32::<NetworkEndian>()?;
                let leechers = cursor.read_i32::<NetworkEndian>()?;
                let seeders = cursor.read_i32::<NetworkEndian>()?;

                let position = cursor.position() as usize;
                let inner = cursor.into_inner();

                let peers = inner[position..]
                    .chunks_exact(18)
                    .map(|chunk| {
                        let ip_bytes: [u8; 16] = chunk[..16].try_into().expect("it should be 16 bytes");
                        let port = u16::from_be_bytes(chunk[16..].try_into().expect("it should be 2 bytes"));

                        ResponsePeer {
                            ip_address: Ipv6Addr::from(ip_bytes),
                            port: Port(port),
                        }
                    })
                    .collect();

                Ok(AnnounceResponse {
                    transaction_id: TransactionId(transaction_id),
                    announce_interval: AnnounceInterval(announce_interval),
                    leechers: NumberOfPeers(leechers),
                    seeders: NumberOfPeers(seeders),
                    peers,
                }
                .into())
            }
            // Scrape
            2 => {
                let position = cursor.position() as usize;
                let inner = cursor.into_inner();

                let torrent_stats = inner[position..]
                    .chunks_exact(12)
                    .map(|chunk| {
                        let mut cursor: Cursor<&[u8]> = Cursor::new(chunk);

                        let seeders = cursor.read_i32::<NetworkEndian>().expect("it should be a 12 byte chunk");
                        let completed = cursor.read_i32::<NetworkEndian>().expect("it should be a 12 byte chunk");
                        let leechers = cursor.read_i32::<NetworkEndian>().expect("it should be a 12 byte chunk");

                        TorrentScrapeStatistics {
                            seeders: NumberOfPeers(seeders),
                            completed: NumberOfDownloads(completed),
                            leechers: NumberOfPeers(leechers),
                        }
                    })
                    .collect();

                Ok(ScrapeResponse {
                    transaction_id: TransactionId(transaction_id),
                    torrent_stats,
                }
                .into())
            }
            // Error
            3 => {
                let position = cursor.position() as usize;
                let inner = cursor.into_inner();

                Ok(ErrorResponse {
                    transaction_id: TransactionId(transaction_id),
                    message: String::from_utf8_lossy(&inner[position..]).into_owned().into(),
                }
                .into())
            }
            _ => Err(io::Error::new(io::ErrorKind::InvalidData, "invalid action")),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::net::{Ipv4Addr, Ipv6Addr};

    use super::Response;
    use crate::servers::udp::protocol::{
        AnnounceInterval, AnnounceResponse, ConnectResponse, ConnectionId, ErrorResponse, NumberOfDownloads, NumberOfPeers,
        Port, ResponsePeer, ScrapeResponse, TorrentScrapeStatistics, TransactionId,
    };

    fn round_trip(response: Response, ipv4: bool) {
        let mut bytes = Vec::new();
        response.write_bytes(&mut bytes).unwrap();

        let parsed = Response::parse_bytes(&bytes, ipv4).unwrap();

        assert_eq!(parsed, response);
    }

    #[test]
    fn a_connect_response_should_survive_a_write_parse_round_trip() {
        round_trip(
            Response::Connect(ConnectResponse {
                connection_id: ConnectionId(0x1234_5678_9abc_def0),
                transaction_id: TransactionId(42),
            }),
            true,
        );
    }

    #[test]
    fn a_connect_response_should_be_exactly_16_bytes() {
        let mut bytes = Vec::new();
        Response::Connect(ConnectResponse {
            connection_id: ConnectionId(1),
            transaction_id: TransactionId(1),
        })
        .write_bytes(&mut bytes)
        .unwrap();

        assert_eq!(bytes.len(), 16);
    }

    #[test]
    fn an_ipv4_announce_response_should_survive_a_write_parse_round_trip() {
        round_trip(
            Response::AnnounceIpv4(AnnounceResponse {
                transaction_id: TransactionId(42),
                announce_interval: AnnounceInterval(120),
                leechers: NumberOfPeers(2),
                seeders: NumberOfPeers(1),
                peers: vec![
                    ResponsePeer {
                        ip_address: Ipv4Addr::new(10, 0, 0, 1),
                        port: Port(6881),
                    },
                    ResponsePeer {
                        ip_address: Ipv4Addr::new(10, 0, 0, 2),
                        port: Port(6882),
                    },
                ],
            }),
            true,
        );
    }

    #[test]
    fn an_ipv6_announce_response_should_survive_a_write_parse_round_trip() {
        round_trip(
            Response::AnnounceIpv6(AnnounceResponse {
                transaction_id: TransactionId(42),
                announce_interval: AnnounceInterval(120),
                leechers: NumberOfPeers(0),
                seeders: NumberOfPeers(1),
                peers: vec![ResponsePeer {
                    ip_address: Ipv6Addr::LOCALHOST,
                    port: Port(6881),
                }],
            }),
            false,
        );
    }

    #[test]
    fn an_ipv4_announce_response_should_use_6_bytes_per_peer() {
        let mut bytes = Vec::new();
        Response::AnnounceIpv4(AnnounceResponse {
            transaction_id: TransactionId(42),
            announce_interval: AnnounceInterval(120),
            leechers: NumberOfPeers(0),
            seeders: NumberOfPeers(1),
            peers: vec![ResponsePeer {
                ip_address: Ipv4Addr::new(10, 0, 0, 1),
                port: Port(6881),
            }],
        })
        .write_bytes(&mut bytes)
        .unwrap();

        assert_eq!(bytes.len(), 20 + 6);
    }

    #[test]
    fn a_scrape_response_should_survive_a_write_parse_round_trip() {
        round_trip(
            Response::Scrape(ScrapeResponse {
                transaction_id: TransactionId(42),
                torrent_stats: vec![
                    TorrentScrapeStatistics {
                        seeders: NumberOfPeers(1),
                        completed: NumberOfDownloads(2),
                        leechers: NumberOfPeers(3),
                    },
                    TorrentScrapeStatistics {
                        seeders: NumberOfPeers(0),
                        completed: NumberOfDownloads(0),
                        leechers: NumberOfPeers(0),
                    },
                ],
            }),
            true,
        );
    }

    #[test]
    fn an_error_response_should_survive_a_write_parse_round_trip() {
        round_trip(
            Response::Error(ErrorResponse {
                transaction_id: TransactionId(42),
                message: "bad connection".into(),
            }),
            true,
        );
    }
}
