//! Vortex Tracker: a `BitTorrent` tracker.
//!
//! The tracker coordinates peer discovery for swarms of participants
//! exchanging content identified by a 20-byte infohash. Peers periodically
//! announce their presence and progress and receive a list of other peers to
//! contact. A companion `scrape` endpoint returns swarm statistics.
//!
//! The crate is split in two layers:
//!
//! - [`core`]: the domain layer. The swarm state engine and the announce and
//!   scrape services, independent of any delivery protocol.
//! - [`servers`]: the delivery layer. The UDP ([BEP 15]) and HTTP ([BEP 3])
//!   frontends that parse wire requests, call into the core and encode the
//!   responses.
//!
//! ```text
//! Delivery layer     Domain layer
//!
//!      UDP tracker |
//!     HTTP tracker |> Core tracker
//! ```
//!
//! [BEP 3]: https://www.bittorrent.org/beps/bep_0003.html
//! [BEP 15]: https://www.bittorrent.org/beps/bep_0015.html
#[macro_use]
extern crate lazy_static;

pub mod app;
pub mod bootstrap;
pub mod config;
pub mod core;
pub mod servers;
pub mod shared;

/// This code needs to be copied into each crate.
/// Working version, for production.
#[cfg(not(test))]
pub(crate) type CurrentClock = shared::clock::Working;

/// Stopped version, for testing.
#[cfg(test)]
pub(crate) type CurrentClock = shared::clock::Stopped;
