//! Axum [`extractor`](axum::extract) for the [`Scrape`] request.
//!
//! It parses the query params of the URL and returns the [`Scrape`] request
//! or a bencoded error response.
use std::panic::Location;

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::response::{IntoResponse, Response};

use crate::servers::http::v1::query::Query;
use crate::servers::http::v1::requests::scrape::{ParseScrapeQueryError, Scrape};
use crate::servers::http::v1::responses;

/// Extractor for the [`Scrape`] request.
pub struct ExtractRequest(pub Scrape);

#[async_trait]
impl<S> FromRequestParts<S> for ExtractRequest
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        match extract_scrape_from(parts.uri.query()) {
            Ok(scrape_request) => Ok(ExtractRequest(scrape_request)),
            Err(error) => Err(error.into_response()),
        }
    }
}

fn extract_scrape_from(maybe_raw_query: Option<&str>) -> Result<Scrape, responses::error::Error> {
    let Some(raw_query) = maybe_raw_query else {
        return Err(responses::error::Error::from(ParseScrapeQueryError::MissingParam {
            location: Location::caller(),
            param_name: "info_hash".to_owned(),
        }));
    };

    let query = raw_query.parse::<Query>()?;

    let scrape_request = Scrape::try_from(query)?;

    Ok(scrape_request)
}

#[cfg(test)]
mod tests {
    use super::extract_scrape_from;

    #[test]
    fn it_should_extract_the_scrape_request_from_the_url_query() {
        let raw_query = "info_hash=%3B%24U%04%CF%5F%11%BB%DB%E1%20%1C%EAjk%F4Z%EE%1B%C0";

        let scrape = extract_scrape_from(Some(raw_query)).unwrap();

        assert_eq!(scrape.info_hashes.len(), 1);
    }

    #[test]
    fn it_should_reject_an_url_without_a_query() {
        assert!(extract_scrape_from(None).is_err());
    }
}
