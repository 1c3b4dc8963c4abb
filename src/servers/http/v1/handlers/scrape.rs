//! The handler for the `scrape` request.
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use axum::extract::{ConnectInfo, State};
use axum::response::{IntoResponse, Response};
use log::debug;

use crate::core::{statistics, ScrapeData, Tracker};
use crate::servers::http::v1::extractors::scrape_request::ExtractRequest;
use crate::servers::http::v1::requests::scrape::Scrape;
use crate::servers::http::v1::responses;

/// It handles the `scrape` request.
pub async fn handle(
    State(tracker): State<Arc<Tracker>>,
    ExtractRequest(scrape_request): ExtractRequest,
    ConnectInfo(remote_client_addr): ConnectInfo<SocketAddr>,
) -> Response {
    debug!("http scrape request: {:#?}", scrape_request);

    let scrape_data = handle_scrape(&tracker, &scrape_request, remote_client_addr.ip()).await;

    build_response(scrape_data)
}

async fn handle_scrape(tracker: &Arc<Tracker>, scrape_request: &Scrape, remote_client_ip: IpAddr) -> ScrapeData {
    let scrape_data = tracker.scrape(&scrape_request.info_hashes);

    match remote_client_ip {
        IpAddr::V4(_) => {
            tracker.send_stats_event(statistics::Event::Tcp4Scrape).await;
        }
        IpAddr::V6(_) => {
            tracker.send_stats_event(statistics::Event::Tcp6Scrape).await;
        }
    }

    scrape_data
}

fn build_response(scrape_data: ScrapeData) -> Response {
    responses::scrape::Bencoded::from(scrape_data).into_response()
}

#[cfg(test)]
mod tests {
    use std::net::IpAddr;
    use std::sync::Arc;

    use super::handle_scrape;
    use crate::config::Configuration;
    use crate::core::torrent::SwarmMetadata;
    use crate::core::Tracker;
    use crate::servers::http::v1::requests::scrape::Scrape;
    use crate::shared::bit_torrent::info_hash::InfoHash;

    fn public_tracker() -> Arc<Tracker> {
        Arc::new(Tracker::new(&Configuration::default(), None))
    }

    fn remote_client_ip() -> IpAddr {
        "126.0.0.1".parse().unwrap()
    }

    #[tokio::test]
    async fn it_should_zero_fill_the_files_for_unknown_torrents() {
        let tracker = public_tracker();

        let info_hash = "3b245504cf5f11bbdbe1201cea6a6bf45aee1bc0".parse::<InfoHash>().unwrap();

        let scrape_data = handle_scrape(
            &tracker,
            &Scrape {
                info_hashes: vec![info_hash],
            },
            remote_client_ip(),
        )
        .await;

        assert_eq!(scrape_data.files, vec![(info_hash, SwarmMetadata::zeroed())]);
    }

    #[tokio::test]
    async fn it_should_return_zeroed_metadata_for_non_whitelisted_torrents() {
        let mut configuration = Configuration::default();
        configuration.core.listed = true;
        let tracker = Arc::new(Tracker::new(&configuration, None));

        let info_hash = "3b245504cf5f11bbdbe1201cea6a6bf45aee1bc0".parse::<InfoHash>().unwrap();

        let scrape_data = handle_scrape(
            &tracker,
            &Scrape {
                info_hashes: vec![info_hash],
            },
            remote_client_ip(),
        )
        .await;

        assert_eq!(scrape_data.files, vec![(info_hash, SwarmMetadata::zeroed())]);
    }
}
