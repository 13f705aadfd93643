//! HTTP client for warning feeds.
//!
//! This module provides the [`HttpFeed`] struct, fetching feeds with conditional
//! requests so an unchanged feed costs a `304 Not Modified`.

use log::{debug, info};
use reqwest::{
    Client, StatusCode,
    header::{ETAG, HeaderMap, IF_MODIFIED_SINCE, IF_NONE_MATCH, LAST_MODIFIED},
};

use crate::{
    errors::FetchError,
    feed::{FeedResponse, FeedSource, parse_snapshot},
    storage::FeedState,
};

/// Fetches feeds over HTTP.
///
/// # Examples
///
/// ```no_run
/// let feed = HttpFeed::new();
/// let response = feed.fetch("https://warnung.bund.de/bbk.mowas/gefahrendurchsagen.json", &FeedState::default()).await?;
/// ```
pub struct HttpFeed {
    client: Client,
}

impl HttpFeed {
    pub fn new() -> Self {
        HttpFeed {
            client: Client::new(),
        }
    }
}

impl FeedSource for HttpFeed {
    /// Requests `url` with `If-None-Match` and `If-Modified-Since` taken from `state`.
    ///
    /// A `304` becomes [`FeedResponse::NotModified`]. A `200` is decoded with
    /// [`parse_snapshot`] and returned with the new validators. Any other status is a
    /// [`FetchError::Status`].
    async fn fetch(&self, url: &str, state: &FeedState) -> Result<FeedResponse, FetchError> {
        info!("request feed {}", url);

        let mut request = self.client.get(url);
        if let Some(etag) = &state.etag {
            request = request.header(IF_NONE_MATCH, etag);
        }
        if let Some(last_modified) = &state.last_modified {
            request = request.header(IF_MODIFIED_SINCE, last_modified);
        }

        let response = request.send().await?;
        let status = response.status();
        debug!("response from {} -> {}", url, status);

        if status == StatusCode::NOT_MODIFIED {
            return Ok(FeedResponse::NotModified);
        }
        if status != StatusCode::OK {
            return Err(FetchError::Status(status.as_u16()));
        }

        let etag = header_value(response.headers(), ETAG);
        let last_modified = header_value(response.headers(), LAST_MODIFIED);
        let body = response.text().await?;
        let warnings = parse_snapshot(url, &body)?;

        debug!("feed {} contains {} warnings", url, warnings.len());

        Ok(FeedResponse::Modified {
            warnings,
            etag,
            last_modified,
        })
    }
}

fn header_value(headers: &HeaderMap, name: reqwest::header::HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned)
}
