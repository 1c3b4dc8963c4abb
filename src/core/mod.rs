//! The core `tracker` module contains the generic `BitTorrent` tracker logic
//! which is independent of the delivery layer.
//!
//! It's a domain layer which does not specify how the end user connects to
//! the tracker. It is intended to be used by higher modules like:
//!
//! - A UDP tracker
//! - A HTTP tracker
//!
//! ```text
//! Delivery layer     Domain layer
//!
//!      UDP tracker |
//!     HTTP tracker |> Core tracker
//! ```
//!
//! # Announce request
//!
//! Handling `announce` requests is the most important task for a
//! `BitTorrent` tracker.
//!
//! A `BitTorrent` swarm is a network of peers that are all trying to
//! download the same torrent. When a peer wants to find other peers it
//! announces itself to the swarm via the tracker. The peer sends its data to
//! the tracker so that the tracker can add it to the swarm. The tracker
//! responds to the peer with the list of other peers in the swarm so that
//! the peer can contact them to start downloading pieces of the file from
//! them.
//!
//! The `peer_ip` is always resolved by the delivery layer: it's a common
//! practice that trackers ignore the peer IP in the announce request params
//! and resolve it from the connection, unless `allow_ip_spoofing` lets the
//! request parameter win. See [`assign_ip_address_to_peer`].
//!
//! # Scrape request
//!
//! The `scrape` request allows clients to query metadata about the swarm in
//! bulk. A `scrape` request includes a list of infohashes whose swarm
//! metadata you want to collect, and no state is mutated.
//!
//! The returned struct is:
//!
//! ```rust,no_run
//! use vortex_tracker::core::torrent::SwarmMetadata;
//! use vortex_tracker::shared::bit_torrent::info_hash::InfoHash;
//!
//! pub struct ScrapeData {
//!     pub files: Vec<(InfoHash, SwarmMetadata)>,
//!     pub truncated: bool,
//! }
//! ```
//!
//! Refer to the `BitTorrent` BEPs for more information:
//!
//! - [BEP 3. The `BitTorrent` Protocol Specification](https://www.bittorrent.org/beps/bep_0003.html)
//! - [BEP 23. Tracker Returns Compact Peer Lists](https://www.bittorrent.org/beps/bep_0023.html)
//! - [BEP 48. Tracker Protocol Extension: Scrape](https://www.bittorrent.org/beps/bep_0048.html)
pub mod error;
pub mod peer;
pub mod statistics;
pub mod torrent;

use std::collections::HashSet;
use std::net::IpAddr;
use std::panic::Location;
use std::time::Duration;

use derive_more::Constructor;
use tracing::debug;

use self::error::Error;
use self::peer::Peer;
use self::torrent::repository::Repository;
use self::torrent::SwarmMetadata;
use crate::config::{AnnouncePolicy, Configuration};
use crate::shared::bit_torrent::common::MAX_SCRAPE_TORRENTS;
use crate::shared::bit_torrent::info_hash::InfoHash;
use crate::shared::clock::Time;
use crate::CurrentClock;

/// A hook consulted before serving an announce. External limiters (per IP,
/// per subnet) can be plugged in; when none is configured every caller is
/// allowed.
pub trait RateLimiter: Sync + Send {
    fn allows(&self, remote_client_ip: &IpAddr) -> bool;
}

/// The domain layer tracker service.
///
/// Its main responsibility is to handle the `announce` and `scrape`
/// requests. But it's also a container for the tracker configuration and the
/// optional whitelist and rate-limiter hooks.
///
/// > **NOTICE**: the `Tracker` is not responsible for handling the network
/// > layer. Typically, the `Tracker` is used by a higher application service
/// > that handles the network layer.
pub struct Tracker {
    announce_policy: AnnouncePolicy,
    default_num_want: u32,
    max_num_want: u32,
    peer_ttl: Duration,
    allow_ip_spoofing: bool,
    whitelist: Option<HashSet<InfoHash>>,
    rate_limiter: Option<Box<dyn RateLimiter>>,
    stats_event_sender: Option<Box<dyn statistics::EventSender>>,
    swarms: Repository,
}

/// Structure that holds the data returned by the `announce` request.
#[derive(Clone, Debug, Constructor)]
pub struct AnnounceData {
    /// The list of peers that are downloading the same torrent.
    /// It excludes the peer that made the request.
    pub peers: Vec<std::sync::Arc<Peer>>,
    /// Swarm statistics
    pub stats: SwarmMetadata,
    pub policy: AnnouncePolicy,
}

/// Structure that holds the data returned by the `scrape` request.
#[derive(Debug, PartialEq, Eq, Default)]
pub struct ScrapeData {
    /// The swarm metadata for each requested torrent, in request order.
    /// Unknown torrents yield zeroed metadata.
    pub files: Vec<(InfoHash, SwarmMetadata)>,
    /// True when the request carried more infohashes than the scrape cap and
    /// the excess was dropped.
    pub truncated: bool,
}

impl ScrapeData {
    /// Creates a new empty `ScrapeData` with no files (torrents).
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Creates a new `ScrapeData` with zeroed metadata for each torrent.
    #[must_use]
    pub fn zeroed(info_hashes: &[InfoHash]) -> Self {
        let mut scrape_data = Self::empty();

        for info_hash in info_hashes {
            scrape_data.add_file_with_zeroed_metadata(info_hash);
        }

        scrape_data
    }

    /// Adds a torrent to the `ScrapeData`.
    pub fn add_file(&mut self, info_hash: &InfoHash, swarm_metadata: SwarmMetadata) {
        self.files.push((*info_hash, swarm_metadata));
    }

    /// Adds a torrent to the `ScrapeData` with zeroed metadata.
    pub fn add_file_with_zeroed_metadata(&mut self, info_hash: &InfoHash) {
        self.files.push((*info_hash, SwarmMetadata::zeroed()));
    }
}

impl Tracker {
    /// `Tracker` constructor.
    #[must_use]
    pub fn new(config: &Configuration, stats_event_sender: Option<Box<dyn statistics::EventSender>>) -> Tracker {
        let whitelist: Option<HashSet<InfoHash>> = config
            .core
            .listed
            .then(|| config.core.whitelist.iter().copied().collect());

        Tracker {
            announce_policy: config.core.announce_policy(),
            default_num_want: config.core.default_num_want,
            max_num_want: config.core.max_num_want,
            peer_ttl: Duration::from_secs(config.core.peer_ttl),
            allow_ip_spoofing: config.core.allow_ip_spoofing,
            whitelist,
            rate_limiter: None,
            stats_event_sender,
            swarms: Repository::default(),
        }
    }

    /// Installs a rate-limiter hook. Announces from callers the limiter
    /// refuses are rejected with [`Error::RateLimited`].
    pub fn set_rate_limiter(&mut self, rate_limiter: Box<dyn RateLimiter>) {
        self.rate_limiter = Some(rate_limiter);
    }

    #[must_use]
    pub fn get_announce_policy(&self) -> AnnouncePolicy {
        self.announce_policy
    }

    /// Returns `true` when the `ip` announce parameter is trusted.
    #[must_use]
    pub fn allows_ip_spoofing(&self) -> bool {
        self.allow_ip_spoofing
    }

    /// Returns `true` when the tracker only serves whitelisted torrents.
    #[must_use]
    pub fn is_listed(&self) -> bool {
        self.whitelist.is_some()
    }

    /// It checks the whitelist hook.
    ///
    /// # Errors
    ///
    /// Will return [`Error::TorrentNotWhitelisted`] when the tracker runs in
    /// `listed` mode and the infohash is not in the whitelist.
    pub fn authorize(&self, info_hash: &InfoHash) -> Result<(), Error> {
        match &self.whitelist {
            Some(whitelist) if !whitelist.contains(info_hash) => Err(Error::TorrentNotWhitelisted {
                info_hash: *info_hash,
                location: Location::caller(),
            }),
            _ => Ok(()),
        }
    }

    /// It checks the rate-limiter hook.
    ///
    /// # Errors
    ///
    /// Will return [`Error::RateLimited`] when a limiter is configured and
    /// refuses the caller.
    pub fn check_rate_limit(&self, remote_client_ip: &IpAddr) -> Result<(), Error> {
        match &self.rate_limiter {
            Some(rate_limiter) if !rate_limiter.allows(remote_client_ip) => Err(Error::RateLimited {
                location: Location::caller(),
            }),
            _ => Ok(()),
        }
    }

    /// It handles an announce request.
    ///
    /// The peer must carry its resolved address; use
    /// [`assign_ip_address_to_peer`] to pick between the announced and the
    /// observed IP. A `stopped` announce removes the peer and the returned
    /// data is computed after the removal.
    ///
    /// BEP 03: [The `BitTorrent` Protocol Specification](https://www.bittorrent.org/beps/bep_0003.html).
    pub fn announce(&self, info_hash: &InfoHash, peer: &Peer, peers_wanted: Option<u32>, include_both_families: bool) -> AnnounceData {
        debug!("announce: {peer:?}");

        let want = self.clamp_peers_wanted(peers_wanted);

        let update = self
            .swarms
            .upsert_peer_and_get_update(info_hash, peer, want, include_both_families);

        AnnounceData {
            peers: update.peers,
            stats: update.stats,
            policy: self.announce_policy,
        }
    }

    /// It handles a scrape request.
    ///
    /// Unknown infohashes yield zeroed entries. At most
    /// [`MAX_SCRAPE_TORRENTS`] infohashes are served; the excess is dropped
    /// and flagged in the returned data.
    ///
    /// BEP 48: [Tracker Protocol Extension: Scrape](https://www.bittorrent.org/beps/bep_0048.html).
    #[must_use]
    pub fn scrape(&self, info_hashes: &[InfoHash]) -> ScrapeData {
        let mut scrape_data = ScrapeData::empty();
        scrape_data.truncated = info_hashes.len() > MAX_SCRAPE_TORRENTS;

        for info_hash in info_hashes.iter().take(MAX_SCRAPE_TORRENTS) {
            let swarm_metadata = match self.authorize(info_hash) {
                Ok(()) => self.swarms.get_swarm_metadata(info_hash),
                Err(_) => SwarmMetadata::zeroed(),
            };
            scrape_data.add_file(info_hash, swarm_metadata);
        }

        scrape_data
    }

    /// One reaper pass: it removes peers that have not announced for more
    /// than `peer_ttl` seconds and deletes swarms that have been empty and
    /// untouched for the same grace window.
    pub fn cleanup_swarms(&self) {
        let now = CurrentClock::now();
        let cutoff = now.saturating_sub(self.peer_ttl);

        self.swarms.remove_inactive_peers_and_swarms(cutoff, cutoff);
    }

    /// Aggregate metrics for all the torrents in the tracker.
    #[must_use]
    pub fn get_torrents_metrics(&self) -> torrent::TorrentsMetrics {
        self.swarms.get_metrics()
    }

    /// It sends a statistics event, when statistics are enabled.
    pub async fn send_stats_event(&self, event: statistics::Event) {
        if let Some(stats_event_sender) = &self.stats_event_sender {
            stats_event_sender.send_event(event).await;
        }
    }

    fn clamp_peers_wanted(&self, peers_wanted: Option<u32>) -> usize {
        let wanted = peers_wanted.unwrap_or(self.default_num_want);
        wanted.min(self.max_num_want) as usize
    }
}

/// It assigns the IP address to store for an announcing peer.
///
/// The `ip` announce parameter is only trusted when the tracker is
/// configured with `allow_ip_spoofing`; otherwise the observed source
/// address of the request wins.
#[must_use]
pub fn assign_ip_address_to_peer(announced_ip: Option<IpAddr>, remote_client_ip: &IpAddr, allow_ip_spoofing: bool) -> IpAddr {
    match announced_ip {
        Some(ip) if allow_ip_spoofing => ip,
        _ => *remote_client_ip,
    }
}
