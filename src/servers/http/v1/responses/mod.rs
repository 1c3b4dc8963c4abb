//! HTTP responses for the HTTP tracker.
//!
//! Responses are bencoded dictionaries, including errors.
pub mod announce;
pub mod error;
pub mod scrape;
