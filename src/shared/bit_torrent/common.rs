//! Constants used by the `BitTorrent` protocols.

/// The maximum number of infohashes that can be scraped in a single request.
///
/// Requests carrying more infohashes are truncated to this amount, see
/// [BEP 48](https://www.bittorrent.org/beps/bep_0048.html).
pub const MAX_SCRAPE_TORRENTS: usize = 64;

/// The size in bytes of a compact IPv4 peer entry: 4 address bytes plus a
/// network byte order port. See [BEP 23](https://www.bittorrent.org/beps/bep_0023.html).
pub const COMPACT_PEER_V4_LEN: usize = 6;

/// The size in bytes of a compact IPv6 peer entry. See
/// [BEP 7](https://www.bittorrent.org/beps/bep_0007.html).
pub const COMPACT_PEER_V6_LEN: usize = 18;
