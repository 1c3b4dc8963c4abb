//! The container for all the swarms the tracker is coordinating.
//!
//! The repository is a map from infohash to [`Entry`] partitioned into a
//! fixed number of independent shards, each behind its own mutex, so that
//! announces for different torrents rarely contend on the same lock. A single
//! announce acquires exactly one shard lock for its whole critical section:
//! classify, update, snapshot the counters and sample the response peers.
//!
//! Operations that span the whole repository (scrape over several infohashes,
//! the reaper sweep, metrics) take shard locks one at a time and promise no
//! cross-shard atomicity.
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use super::entry::Entry;
use super::{SwarmMetadata, TorrentsMetrics};
use crate::core::peer::Peer;
use crate::shared::bit_torrent::info_hash::InfoHash;
use crate::shared::clock::DurationSinceUnixEpoch;

/// The number of shards the swarm map is partitioned into. Must be a power
/// of two.
pub const SHARD_COUNT: usize = 1024;

/// The result of applying one announce to a swarm, produced under a single
/// shard lock so the peer list and the counters are a consistent snapshot.
#[derive(Debug)]
pub struct AnnounceUpdate {
    /// True when this announce moved the peer from the leechers to the
    /// seeders, i.e. the swarm `completed` counter was incremented.
    pub peer_completed: bool,
    /// Swarm counters right after the update.
    pub stats: SwarmMetadata,
    /// The sampled response peers, excluding the announcing client.
    pub peers: Vec<Arc<Peer>>,
}

#[derive(Default, Debug)]
struct Shard {
    swarms: Mutex<HashMap<InfoHash, Entry>>,
}

/// Sharded map of infohash to swarm.
#[derive(Debug)]
pub struct Repository {
    shards: Box<[Shard]>,
}

impl Default for Repository {
    fn default() -> Self {
        Self {
            shards: (0..SHARD_COUNT).map(|_| Shard::default()).collect(),
        }
    }
}

impl Repository {
    /// Infohashes are SHA-1 output, so their leading bytes are already
    /// uniformly distributed and can be used directly as the shard index.
    fn shard_for(&self, info_hash: &InfoHash) -> &Shard {
        let index = usize::from(u16::from_be_bytes([info_hash.0[0], info_hash.0[1]])) & (SHARD_COUNT - 1);
        &self.shards[index]
    }

    /// It applies an announce to the swarm for `info_hash`, creating the
    /// swarm if this is the first announce referencing it, and samples up to
    /// `want` response peers. The whole operation runs under one shard lock.
    pub fn upsert_peer_and_get_update(
        &self,
        info_hash: &InfoHash,
        peer: &Peer,
        want: usize,
        include_both_families: bool,
    ) -> AnnounceUpdate {
        let mut swarms = self.shard_for(info_hash).swarms.lock().expect("the shard lock should not be poisoned");

        let entry = swarms.entry(*info_hash).or_default();

        let peer_completed = entry.upsert_peer(peer);
        let stats = entry.get_swarm_metadata();
        let peers = entry.get_peers_for_client(peer, want, include_both_families);

        AnnounceUpdate {
            peer_completed,
            stats,
            peers,
        }
    }

    /// It returns the swarm metadata for one torrent, zeroed when the torrent
    /// is unknown. No state is mutated.
    #[must_use]
    pub fn get_swarm_metadata(&self, info_hash: &InfoHash) -> SwarmMetadata {
        let swarms = self.shard_for(info_hash).swarms.lock().expect("the shard lock should not be poisoned");

        swarms
            .get(info_hash)
            .map_or_else(SwarmMetadata::zeroed, Entry::get_swarm_metadata)
    }

    /// One reaper sweep.
    ///
    /// It walks the shards one at a time, removing peers whose last announce
    /// is older than `peer_cutoff` and deleting swarms that are empty and
    /// untouched since `swarm_cutoff`. Announce traffic is never blocked for
    /// more than a single shard lock.
    pub fn remove_inactive_peers_and_swarms(
        &self,
        peer_cutoff: DurationSinceUnixEpoch,
        swarm_cutoff: DurationSinceUnixEpoch,
    ) {
        for shard in &*self.shards {
            let mut swarms = shard.swarms.lock().expect("the shard lock should not be poisoned");

            swarms.retain(|_, entry| {
                entry.remove_inactive_peers(peer_cutoff);
                !(entry.is_empty() && entry.last_touched() < swarm_cutoff)
            });
        }
    }

    /// It removes one torrent entry entirely.
    pub fn remove(&self, info_hash: &InfoHash) {
        let mut swarms = self.shard_for(info_hash).swarms.lock().expect("the shard lock should not be poisoned");
        swarms.remove(info_hash);
    }

    /// Aggregate metrics for all torrents. Shards are visited one at a time,
    /// so the totals are not a consistent cross-shard snapshot.
    #[must_use]
    pub fn get_metrics(&self) -> TorrentsMetrics {
        let mut metrics = TorrentsMetrics::default();

        for shard in &*self.shards {
            let swarms = shard.swarms.lock().expect("the shard lock should not be poisoned");

            for entry in swarms.values() {
                let stats = entry.get_swarm_metadata();
                metrics.seeders += u64::from(stats.complete);
                metrics.completed += u64::from(stats.downloaded);
                metrics.leechers += u64::from(stats.incomplete);
                metrics.torrents += 1;
            }
        }

        metrics
    }
}
