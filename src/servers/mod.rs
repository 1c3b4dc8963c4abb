//! Servers: the delivery layer of the tracker.
//!
//! It contains the network frontends that translate wire requests into core
//! tracker calls:
//!
//! - [`udp`]: the UDP tracker, per [BEP 15](https://www.bittorrent.org/beps/bep_0015.html).
//! - [`http`]: the HTTP tracker, per [BEP 3](https://www.bittorrent.org/beps/bep_0003.html).
pub mod http;
pub mod signals;
pub mod udp;
