//! The handler for the `announce` request.
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use axum::extract::{ConnectInfo, State};
use axum::response::{IntoResponse, Response};
use log::debug;

use crate::core::peer::{AnnounceEvent, NumberOfBytes, Peer};
use crate::core::{assign_ip_address_to_peer, statistics, AnnounceData, Tracker};
use crate::servers::http::v1::extractors::announce_request::ExtractRequest;
use crate::servers::http::v1::requests::announce::{Announce, Compact, Event};
use crate::servers::http::v1::responses::{self, announce};
use crate::shared::clock::Time;
use crate::CurrentClock;

/// It handles the `announce` request.
pub async fn handle(
    State(tracker): State<Arc<Tracker>>,
    ExtractRequest(announce_request): ExtractRequest,
    ConnectInfo(remote_client_addr): ConnectInfo<SocketAddr>,
) -> Response {
    debug!("http announce request: {:#?}", announce_request);

    let announce_data = match handle_announce(&tracker, &announce_request, remote_client_addr.ip()).await {
        Ok(announce_data) => announce_data,
        Err(error) => return error.into_response(),
    };

    build_response(&announce_request, announce_data)
}

async fn handle_announce(
    tracker: &Arc<Tracker>,
    announce_request: &Announce,
    remote_client_ip: IpAddr,
) -> Result<AnnounceData, responses::error::Error> {
    // Authorization
    tracker.authorize(&announce_request.info_hash).map_err(responses::error::Error::from)?;

    tracker.check_rate_limit(&remote_client_ip).map_err(responses::error::Error::from)?;

    let peer_ip = assign_ip_address_to_peer(announce_request.ip, &remote_client_ip, tracker.allows_ip_spoofing());

    let peer = peer_from_request(announce_request, &peer_ip);

    // HTTP responses carry both address families: IPv4 peers in `peers` and
    // IPv6 peers in `peers6`, per BEP 7.
    let announce_data = tracker.announce(&announce_request.info_hash, &peer, announce_request.numwant, true);

    match peer_ip {
        IpAddr::V4(_) => {
            tracker.send_stats_event(statistics::Event::Tcp4Announce).await;
        }
        IpAddr::V6(_) => {
            tracker.send_stats_event(statistics::Event::Tcp6Announce).await;
        }
    }

    Ok(announce_data)
}

/// The compact peer encoding is used when the request has `compact=1` or
/// omits the field, per BEP 23.
fn build_response(announce_request: &Announce, announce_data: AnnounceData) -> Response {
    match &announce_request.compact {
        Some(Compact::NotAccepted) => announce::NonCompact::from(announce_data).into_response(),
        Some(Compact::Accepted) | None => announce::Compact::from(announce_data).into_response(),
    }
}

/// It builds the [`Peer`] that is stored in the swarm. The peer address is
/// the resolved IP, not necessarily the one in the announce request params.
#[must_use]
fn peer_from_request(announce_request: &Announce, peer_ip: &IpAddr) -> Peer {
    Peer {
        peer_id: announce_request.peer_id,
        peer_addr: SocketAddr::new(*peer_ip, announce_request.port),
        updated: CurrentClock::now(),
        uploaded: NumberOfBytes(announce_request.uploaded.unwrap_or(0)),
        downloaded: NumberOfBytes(announce_request.downloaded.unwrap_or(0)),
        left: NumberOfBytes(announce_request.left.unwrap_or(0)),
        event: map_to_announce_event(announce_request.event.as_ref()),
    }
}

fn map_to_announce_event(event: Option<&Event>) -> AnnounceEvent {
    match event {
        Some(Event::Started) => AnnounceEvent::Started,
        Some(Event::Stopped) => AnnounceEvent::Stopped,
        Some(Event::Completed) => AnnounceEvent::Completed,
        None => AnnounceEvent::None,
    }
}

#[cfg(test)]
mod tests {
    use std::net::IpAddr;
    use std::sync::Arc;

    use super::handle_announce;
    use crate::config::Configuration;
    use crate::core::peer;
    use crate::core::Tracker;
    use crate::servers::http::v1::requests::announce::Announce;
    use crate::shared::bit_torrent::info_hash::InfoHash;

    fn public_tracker() -> Arc<Tracker> {
        Arc::new(Tracker::new(&Configuration::default(), None))
    }

    fn whitelisted_tracker() -> Arc<Tracker> {
        let mut configuration = Configuration::default();
        configuration.core.listed = true;

        Arc::new(Tracker::new(&configuration, None))
    }

    fn sample_announce_request() -> Announce {
        Announce {
            info_hash: "3b245504cf5f11bbdbe1201cea6a6bf45aee1bc0".parse::<InfoHash>().unwrap(),
            peer_id: "-qB00000000000000001".parse::<peer::Id>().unwrap(),
            port: 17548,
            downloaded: None,
            uploaded: None,
            left: None,
            event: None,
            compact: None,
            numwant: None,
            ip: None,
        }
    }

    fn remote_client_ip() -> IpAddr {
        "126.0.0.1".parse().unwrap()
    }

    #[tokio::test]
    async fn it_should_answer_the_first_announce_with_the_swarm_counters() {
        let tracker = public_tracker();

        let announce_data = handle_announce(&tracker, &sample_announce_request(), remote_client_ip())
            .await
            .unwrap();

        assert_eq!(announce_data.stats.complete, 1);
        assert_eq!(announce_data.stats.incomplete, 0);
        assert!(announce_data.peers.is_empty());
    }

    #[tokio::test]
    async fn it_should_register_the_peer_with_the_observed_source_address() {
        let tracker = public_tracker();

        let mut announce_request = sample_announce_request();
        announce_request.ip = Some("2.137.87.41".parse().unwrap());

        handle_announce(&tracker, &announce_request, remote_client_ip()).await.unwrap();

        // A second peer asks for the swarm.
        let mut other = sample_announce_request();
        other.peer_id = "-qB00000000000000002".parse::<peer::Id>().unwrap();
        other.left = Some(100);

        let announce_data = handle_announce(&tracker, &other, "126.0.0.2".parse().unwrap()).await.unwrap();

        assert_eq!(announce_data.peers.len(), 1);
        // `allow_ip_spoofing` is disabled, the `ip` param was ignored.
        assert_eq!(announce_data.peers[0].peer_addr.ip(), remote_client_ip());
    }

    #[tokio::test]
    async fn it_should_fail_when_the_announced_torrent_is_not_whitelisted() {
        let tracker = whitelisted_tracker();

        let announce_request = sample_announce_request();

        let response = handle_announce(&tracker, &announce_request, remote_client_ip()).await.unwrap_err();

        assert!(
            response
                .failure_reason
                .contains(&format!("The torrent: {}, is not whitelisted", announce_request.info_hash)),
            "unexpected failure reason: {}",
            response.failure_reason
        );
    }
}
