//! Axum [`extractor`](axum::extract) for the [`Announce`] request.
//!
//! It parses the query params of the URL and returns the [`Announce`]
//! request or a bencoded error response.
use std::panic::Location;

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::response::{IntoResponse, Response};

use crate::servers::http::v1::query::Query;
use crate::servers::http::v1::requests::announce::{Announce, ParseAnnounceQueryError};
use crate::servers::http::v1::responses;

/// Extractor for the [`Announce`] request.
pub struct ExtractRequest(pub Announce);

#[async_trait]
impl<S> FromRequestParts<S> for ExtractRequest
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        match extract_announce_from(parts.uri.query()) {
            Ok(announce_request) => Ok(ExtractRequest(announce_request)),
            Err(error) => Err(error.into_response()),
        }
    }
}

fn extract_announce_from(maybe_raw_query: Option<&str>) -> Result<Announce, responses::error::Error> {
    let Some(raw_query) = maybe_raw_query else {
        return Err(responses::error::Error::from(ParseAnnounceQueryError::MissingParam {
            location: Location::caller(),
            param_name: "info_hash".to_owned(),
        }));
    };

    let query = raw_query.parse::<Query>()?;

    let announce_request = Announce::try_from(query)?;

    Ok(announce_request)
}

#[cfg(test)]
mod tests {
    use super::extract_announce_from;

    #[test]
    fn it_should_extract_the_announce_request_from_the_url_query() {
        let raw_query = "info_hash=%3B%24U%04%CF%5F%11%BB%DB%E1%20%1C%EAjk%F4Z%EE%1B%C0&peer_id=-qB00000000000000001&port=17548";

        let announce = extract_announce_from(Some(raw_query)).unwrap();

        assert_eq!(announce.port, 17548);
    }

    #[test]
    fn it_should_reject_an_url_without_a_query() {
        assert!(extract_announce_from(None).is_err());
    }

    #[test]
    fn it_should_reject_an_invalid_query() {
        assert!(extract_announce_from(Some("info_hash=INVALID")).is_err());
    }
}
