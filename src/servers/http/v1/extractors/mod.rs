//! Axum extractors for the HTTP tracker requests.
//!
//! The query params are parsed with the custom [`Query`](crate::servers::http::v1::query::Query)
//! parser because the binary params (`info_hash`, `peer_id`) are percent
//! encoded raw bytes a standard deserializer would reject. When parsing
//! fails the rejection is already the final bencoded error response.
pub mod announce_request;
pub mod scrape_request;
