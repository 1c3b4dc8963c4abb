//! HTTP tracker, per [BEP 3. The `BitTorrent` Protocol Specification](https://www.bittorrent.org/beps/bep_0003.html).
//!
//! Two routes: `GET /announce` and `GET /scrape`. Responses are bencoded
//! dictionaries. The same TCP listener serves plain HTTP and, when a
//! certificate is configured, TLS: the first received bytes decide where the
//! connection goes (see [`server`]).
pub mod percent_encoding;
pub mod server;
pub mod tls;
pub mod v1;

pub const HTTP_TRACKER_LOG_TARGET: &str = "HTTP TRACKER";
