//! Handlers for the UDP server.
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::sync::Arc;

use tracing::debug;

use super::connection_cookie::{from_connection_id, into_connection_id, Keyring};
use super::error::Error;
use super::peer_builder;
use super::protocol::request::RequestParseError;
use super::protocol::{
    AnnounceInterval, AnnounceRequest, AnnounceResponse, ConnectRequest, ConnectResponse, ErrorResponse, NumberOfDownloads,
    NumberOfPeers, Port, Request, Response, ResponsePeer, ScrapeRequest, ScrapeResponse, TorrentScrapeStatistics,
    TransactionId,
};
use super::{RawRequest, UDP_TRACKER_LOG_TARGET};
use crate::core::{assign_ip_address_to_peer, statistics, Tracker};

/// It handles an incoming UDP packet.
///
/// It's responsible for parsing the packet and delegating the request to the
/// correct handler depending on the request type.
///
/// It returns `None` when the packet is too mangled to answer: undersized
/// and unparseable packets are dropped silently so the tracker cannot be
/// used for traffic amplification.
pub async fn handle_packet(udp_request: &RawRequest, tracker: &Arc<Tracker>, keyring: &Keyring) -> Option<Response> {
    debug!("Handling Packet: {udp_request:?}");

    match Request::parse_bytes(&udp_request.payload) {
        Ok(request) => {
            let transaction_id = match &request {
                Request::Connect(connect_request) => connect_request.transaction_id,
                Request::Announce(announce_request) => announce_request.transaction_id,
                Request::Scrape(scrape_request) => scrape_request.transaction_id,
            };

            let response = match handle_request(request, udp_request.from, tracker, keyring).await {
                Ok(response) => response,
                Err(e) => handle_error(&e, transaction_id),
            };

            Some(response)
        }
        Err(RequestParseError::Sendable {
            transaction_id,
            message,
            ..
        }) => Some(Response::from(ErrorResponse {
            transaction_id,
            message: message.into(),
        })),
        Err(RequestParseError::Unsendable { message }) => {
            debug!(target: UDP_TRACKER_LOG_TARGET, from = %udp_request.from, message, "dropping unparseable packet");
            None
        }
    }
}

/// It dispatches the request to the correct handler.
///
/// # Errors
///
/// If an error happens in one of the handlers it will just return the
/// [`Error`] and the caller encodes it as an error response.
pub async fn handle_request(
    request: Request,
    remote_addr: SocketAddr,
    tracker: &Arc<Tracker>,
    keyring: &Keyring,
) -> Result<Response, Error> {
    debug!("Handling Request: {request:?} to: {remote_addr:?}");

    match request {
        Request::Connect(connect_request) => handle_connect(remote_addr, &connect_request, tracker, keyring).await,
        Request::Announce(announce_request) => handle_announce(remote_addr, &announce_request, tracker, keyring).await,
        Request::Scrape(scrape_request) => handle_scrape(remote_addr, &scrape_request, tracker).await,
    }
}

/// It handles the `Connect` request.
///
/// The returned connection ID is derived from the client's source address,
/// see [`Keyring`].
///
/// # Errors
///
/// This function does not ever return an error.
pub async fn handle_connect(
    remote_addr: SocketAddr,
    request: &ConnectRequest,
    tracker: &Arc<Tracker>,
    keyring: &Keyring,
) -> Result<Response, Error> {
    debug!("udp connect request: {:#?}", request);

    let connection_cookie = keyring.make(&remote_addr);
    let connection_id = into_connection_id(&connection_cookie);

    let response = ConnectResponse {
        transaction_id: request.transaction_id,
        connection_id,
    };

    match remote_addr {
        SocketAddr::V4(_) => {
            tracker.send_stats_event(statistics::Event::Udp4Connect).await;
        }
        SocketAddr::V6(_) => {
            tracker.send_stats_event(statistics::Event::Udp6Connect).await;
        }
    }

    Ok(Response::from(response))
}

/// It handles the `Announce` request.
///
/// # Errors
///
/// Will return an [`Error`] when the connection ID does not validate for the
/// source address, or when the core tracker rejects the announce.
pub async fn handle_announce(
    remote_addr: SocketAddr,
    announce_request: &AnnounceRequest,
    tracker: &Arc<Tracker>,
    keyring: &Keyring,
) -> Result<Response, Error> {
    debug!("udp announce request: {:#?}", announce_request);

    keyring.check(&remote_addr, &from_connection_id(&announce_request.connection_id))?;

    if announce_request.port.0 == 0 {
        return Err(Error::InvalidPort {
            location: std::panic::Location::caller(),
        });
    }

    let info_hash = announce_request.info_hash;
    let remote_client_ip = remote_addr.ip();

    tracker.authorize(&info_hash)?;
    tracker.check_rate_limit(&remote_client_ip)?;

    // The `ip` field of the announce request is IPv4 only.
    let announced_ip = announce_request.ip_address.map(IpAddr::V4);
    let peer_ip = assign_ip_address_to_peer(announced_ip, &remote_client_ip, tracker.allows_ip_spoofing());

    let peer = peer_builder::from_request(announce_request, &peer_ip);

    let peers_wanted = u32::try_from(announce_request.peers_wanted.0).ok();

    let response = tracker.announce(&info_hash, &peer, peers_wanted, false);

    match remote_client_ip {
        IpAddr::V4(_) => {
            tracker.send_stats_event(statistics::Event::Udp4Announce).await;
        }
        IpAddr::V6(_) => {
            tracker.send_stats_event(statistics::Event::Udp6Announce).await;
        }
    }

    #[allow(clippy::cast_possible_truncation)]
    if remote_addr.is_ipv4() {
        let announce_response = AnnounceResponse {
            transaction_id: announce_request.transaction_id,
            announce_interval: AnnounceInterval(i64::from(response.policy.interval) as i32),
            leechers: NumberOfPeers(i64::from(response.stats.incomplete) as i32),
            seeders: NumberOfPeers(i64::from(response.stats.complete) as i32),
            peers: response
                .peers
                .iter()
                .filter_map(|peer| {
                    if let IpAddr::V4(ip) = peer.peer_addr.ip() {
                        Some(ResponsePeer::<Ipv4Addr> {
                            ip_address: ip,
                            port: Port(peer.peer_addr.port()),
                        })
                    } else {
                        None
                    }
                })
                .collect(),
        };

        debug!("udp announce response: {:#?}", announce_response);

        Ok(Response::from(announce_response))
    } else {
        let announce_response = AnnounceResponse {
            transaction_id: announce_request.transaction_id,
            announce_interval: AnnounceInterval(i64::from(response.policy.interval) as i32),
            leechers: NumberOfPeers(i64::from(response.stats.incomplete) as i32),
            seeders: NumberOfPeers(i64::from(response.stats.complete) as i32),
            peers: response
                .peers
                .iter()
                .filter_map(|peer| {
                    if let IpAddr::V6(ip) = peer.peer_addr.ip() {
                        Some(ResponsePeer::<Ipv6Addr> {
                            ip_address: ip,
                            port: Port(peer.peer_addr.port()),
                        })
                    } else {
                        None
                    }
                })
                .collect(),
        };

        debug!("udp announce response: {:#?}", announce_response);

        Ok(Response::from(announce_response))
    }
}

/// It handles the `Scrape` request.
///
/// Unknown infohashes produce zeroed entries; the response preserves the
/// request order.
///
/// # Errors
///
/// This function does not ever return an error.
pub async fn handle_scrape(remote_addr: SocketAddr, request: &ScrapeRequest, tracker: &Arc<Tracker>) -> Result<Response, Error> {
    debug!("udp scrape request: {:#?}", request);

    let scrape_data = tracker.scrape(&request.info_hashes);

    let mut torrent_stats: Vec<TorrentScrapeStatistics> = Vec::with_capacity(scrape_data.files.len());

    for (_info_hash, swarm_metadata) in &scrape_data.files {
        #[allow(clippy::cast_possible_truncation)]
        let scrape_entry = TorrentScrapeStatistics {
            seeders: NumberOfPeers(i64::from(swarm_metadata.complete) as i32),
            completed: NumberOfDownloads(i64::from(swarm_metadata.downloaded) as i32),
            leechers: NumberOfPeers(i64::from(swarm_metadata.incomplete) as i32),
        };

        torrent_stats.push(scrape_entry);
    }

    match remote_addr {
        SocketAddr::V4(_) => {
            tracker.send_stats_event(statistics::Event::Udp4Scrape).await;
        }
        SocketAddr::V6(_) => {
            tracker.send_stats_event(statistics::Event::Udp6Scrape).await;
        }
    }

    let response = ScrapeResponse {
        transaction_id: request.transaction_id,
        torrent_stats,
    };

    debug!("udp scrape response: {:#?}", response);

    Ok(Response::from(response))
}

fn handle_error(e: &Error, transaction_id: TransactionId) -> Response {
    let message = e.to_string();
    Response::from(ErrorResponse {
        transaction_id,
        message: message.into(),
    })
}
