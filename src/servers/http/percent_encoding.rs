//! This module contains functions for percent decoding infohashes and peer
//! ids.
//!
//! Percent encoding is an encoding format used to encode arbitrary data in a
//! format that is safe to use in URLs. It is used by the HTTP tracker
//! protocol to encode infohashes and peer ids in the URLs of requests.
//!
//! `BitTorrent` infohashes and peer ids are percent encoded like any other
//! arbitrary URL parameter. But they are encoded from binary data (byte
//! arrays) which may not be valid UTF-8. That makes it hard to use the
//! `percent_encoding` crate helpers that expect a well-formed UTF-8 string.
//! However, percent encoding is not limited to UTF-8 strings, and the
//! decoder accepts both uppercase and lowercase `%xx` escapes.
//!
//! More information about "Percent Encoding":
//!
//! - <https://datatracker.ietf.org/doc/html/rfc3986#section-2.1>
use crate::core::peer;
use crate::shared::bit_torrent::info_hash::{self, InfoHash};

/// Percent decodes a percent encoded infohash. Internally an [`InfoHash`] is
/// a 20-byte array.
///
/// For example, given the infohash `3b245504cf5f11bbdbe1201cea6a6bf45aee1bc0`,
/// its percent encoded representation is
/// `%3B%24U%04%CF%5F%11%BB%DB%E1%20%1C%EAjk%F4Z%EE%1B%C0`.
///
/// # Errors
///
/// Will return `Err` if the decoded bytes do not represent a valid
/// [`InfoHash`].
pub fn percent_decode_info_hash(raw_info_hash: &str) -> Result<InfoHash, info_hash::ConversionError> {
    let bytes = percent_encoding::percent_decode_str(raw_info_hash).collect::<Vec<u8>>();
    InfoHash::try_from(bytes)
}

/// Percent decodes a percent encoded peer id. Internally a peer
/// [`Id`](peer::Id) is a 20-byte array.
///
/// For example, given the peer id `*b"-qB00000000000000000"`, its percent
/// encoded representation is `%2DqB00000000000000000`.
///
/// # Errors
///
/// Will return `Err` if the decoded bytes do not represent a valid
/// [`peer::Id`].
pub fn percent_decode_peer_id(raw_peer_id: &str) -> Result<peer::Id, peer::IdConversionError> {
    let bytes = percent_encoding::percent_decode_str(raw_peer_id).collect::<Vec<u8>>();
    peer::Id::try_from(bytes)
}
