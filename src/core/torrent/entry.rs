//! A swarm: all the information about a torrent that the tracker stores.
//!
//! The entry keeps the peers of the swarm split in two sets, seeders and
//! leechers, and a `completed` counter with the number of times any peer has
//! finished downloading during the lifetime of the swarm.
use std::collections::BTreeMap;
use std::sync::Arc;

use rand::seq::IteratorRandom;

use super::SwarmMetadata;
use crate::core::peer::{self, AnnounceEvent, Peer};
use crate::shared::clock::DurationSinceUnixEpoch;

/// A data structure containing all the information about a torrent in the
/// tracker.
///
/// This is the tracker entry for a given torrent and contains the swarm data,
/// that's the list of all the peers trying to download the same torrent.
/// The tracker keeps one entry like this for every torrent.
///
/// A peer is in exactly one of the two sets: `left == 0` puts it with the
/// seeders, anything else with the leechers. Peers are keyed by
/// `(peer id, address family)` so the IPv4 and IPv6 faces of a dual-stack
/// client are tracked separately.
#[derive(Clone, Debug, Default)]
pub struct Entry {
    seeders: BTreeMap<peer::Key, Arc<Peer>>,
    leechers: BTreeMap<peer::Key, Arc<Peer>>,
    /// The number of peers that have ever completed downloading the torrent
    /// associated to this entry. It never decreases.
    completed: u32,
    /// The last time any announce touched this swarm.
    last_touched: DurationSinceUnixEpoch,
}

impl Entry {
    /// It returns the swarm metadata (statistics) as a struct:
    ///
    /// `(seeders, completed, leechers)`
    #[allow(clippy::cast_possible_truncation)]
    #[must_use]
    pub fn get_swarm_metadata(&self) -> SwarmMetadata {
        SwarmMetadata {
            downloaded: self.completed,
            complete: self.seeders.len() as u32,
            incomplete: self.leechers.len() as u32,
        }
    }

    /// Returns true if the swarm has no peers at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.seeders.is_empty() && self.leechers.is_empty()
    }

    #[must_use]
    pub fn peers_len(&self) -> usize {
        self.seeders.len() + self.leechers.len()
    }

    #[must_use]
    pub fn last_touched(&self) -> DurationSinceUnixEpoch {
        self.last_touched
    }

    /// It updates a peer and returns true if the number of complete downloads
    /// has increased.
    ///
    /// The announce state machine:
    ///
    /// - A `stopped` event removes the peer, whatever its prior state.
    /// - Any other announce (re)files the peer by its reported `left` value.
    /// - Moving from the leechers to the seeders counts as one completed
    ///   download, also when the `completed` event itself was lost and the
    ///   transition is only visible through `left` reaching zero.
    ///
    /// The tracker is the source of truth: a `completed` event from a peer
    /// that still has bytes left, or from a peer this swarm has never seen as
    /// a leecher, grants no completion credit. A seeder that announces again
    /// with `left > 0` is moved back to the leechers without touching the
    /// counter.
    pub fn upsert_peer(&mut self, peer: &Peer) -> bool {
        self.last_touched = peer.updated;

        let key = peer.key();

        if peer.event == AnnounceEvent::Stopped {
            self.seeders.remove(&key);
            self.leechers.remove(&key);
            return false;
        }

        let was_leecher = self.leechers.remove(&key).is_some();
        self.seeders.remove(&key);

        if peer.is_seeder() {
            self.seeders.insert(key, Arc::new(*peer));

            if was_leecher {
                self.completed += 1;
                return true;
            }
        } else {
            self.leechers.insert(key, Arc::new(*peer));
        }

        false
    }

    /// It returns the list of peers to hand back to an announcing client.
    ///
    /// - The client itself is never included (matched by peer id).
    /// - Leechers are given seeders first and other leechers only to fill up
    ///   the requested amount. Seeders are given leechers only, since
    ///   seeder-to-seeder contact has no value.
    /// - Peers are restricted to the client's address family unless
    ///   `include_both_families` is set.
    /// - The result is a uniform random sample without replacement; no
    ///   ordering is guaranteed.
    #[must_use]
    pub fn get_peers_for_client(&self, client: &Peer, want: usize, include_both_families: bool) -> Vec<Arc<Peer>> {
        let mut rng = rand::thread_rng();

        let family = client.ip_version();
        let eligible = |peer: &&Arc<Peer>| {
            peer.peer_id != client.peer_id && (include_both_families || peer.ip_version() == family)
        };

        if client.is_seeder() {
            return self
                .leechers
                .values()
                .filter(eligible)
                .choose_multiple(&mut rng, want)
                .into_iter()
                .cloned()
                .collect();
        }

        let mut peers: Vec<Arc<Peer>> = self
            .seeders
            .values()
            .filter(eligible)
            .choose_multiple(&mut rng, want)
            .into_iter()
            .cloned()
            .collect();

        if peers.len() < want {
            peers.extend(
                self.leechers
                    .values()
                    .filter(eligible)
                    .choose_multiple(&mut rng, want - peers.len())
                    .into_iter()
                    .cloned(),
            );
        }

        peers
    }

    /// It removes the peers that have not been updated since `current_cutoff`.
    pub fn remove_inactive_peers(&mut self, current_cutoff: DurationSinceUnixEpoch) {
        self.seeders.retain(|_, peer| peer.updated > current_cutoff);
        self.leechers.retain(|_, peer| peer.updated > current_cutoff);
    }
}
