//! HTTP tracker routes.
//!
//! Only two routes, per [BEP 3](https://www.bittorrent.org/beps/bep_0003.html):
//!
//! - `GET /announce`
//! - `GET /scrape`
use std::sync::Arc;

use axum::routing::get;
use axum::Router;

use super::handlers::{announce, scrape};
use crate::core::Tracker;

/// It adds the routes to the router.
#[must_use]
pub fn router(tracker: Arc<Tracker>) -> Router {
    Router::new()
        // Announce request
        .route("/announce", get(announce::handle))
        // Scrape request
        .route("/scrape", get(scrape::handle))
        .with_state(tracker)
}
