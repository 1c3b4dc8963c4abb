//! HTTP request handlers for the HTTP tracker.
pub mod announce;
pub mod scrape;
