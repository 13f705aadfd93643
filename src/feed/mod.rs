//! Upstream warning feeds.
//!
//! A feed is polled over HTTP and returns the complete list of current warnings.
//! The [`FeedSource`] trait abstracts the fetch so poll cycles can be tested with
//! mocks; [`HttpFeed`] is the production implementation.
//!
//! Decoding is strict at the record level and lenient at the polygon level: a
//! record that does not match the expected structure makes the whole snapshot a
//! [`FetchError`], because a snapshot missing a record would expire it. A single
//! unreadable polygon only drops that polygon.

mod requester;
mod response_structs;

use log::{debug, warn};
use mockall::automock;

use crate::{
    errors::FetchError,
    feed::response_structs::{AlertRecord, AreaRecord},
    geo::{Area, GeoPoint, Geometry, Shape},
    storage::FeedState,
    warnings::{Payload, Warning},
};

pub use crate::feed::requester::HttpFeed;

// Placeholder vertex some feeds use for areas without coordinates
const NULL_VERTEX: &str = "-1.0,-1.0";

/// Outcome of a successful fetch.
#[derive(Debug)]
pub enum FeedResponse {
    /// A fresh snapshot with the validators to send on the next request.
    Modified {
        warnings: Vec<Warning>,
        etag: Option<String>,
        last_modified: Option<String>,
    },
    /// The feed did not change since the validators in the [`FeedState`].
    NotModified,
}

/// Trait for fetching a warning feed.
#[automock]
pub trait FeedSource {
    /// Fetches `url`, sending the conditional request validators of `state`.
    async fn fetch(&self, url: &str, state: &FeedState) -> Result<FeedResponse, FetchError>;
}

/// Decodes a feed body into warnings attributed to `source`.
///
/// The revision of each warning is the BLAKE3 hash of its record's JSON, so any
/// upstream change to a record yields a new revision.
pub fn parse_snapshot(source: &str, body: &str) -> Result<Vec<Warning>, FetchError> {
    let records: Vec<serde_json::Value> = serde_json::from_str(body)?;

    records
        .into_iter()
        .map(|value| -> Result<Warning, FetchError> {
            let revision = blake3::hash(value.to_string().as_bytes())
                .to_hex()
                .to_string();
            let record: AlertRecord = serde_json::from_value(value)?;
            debug!("decoded record {}", record);
            Ok(convert_record(source, record, revision))
        })
        .collect()
}

fn convert_record(source: &str, record: AlertRecord, revision: String) -> Warning {
    let info = record.info.into_iter().next().unwrap_or_default();

    let geometry = Geometry {
        areas: info
            .area
            .into_iter()
            .map(|area| convert_area(&record.identifier, area))
            .collect(),
    };
    if geometry.is_empty() {
        debug!("warning {} has no geometry and cannot match", record.identifier);
    }

    Warning {
        identity: record.identifier,
        revision,
        source: source.to_owned(),
        geometry,
        payload: Payload {
            headline: info.headline,
            description: info.description,
            instruction: info.instruction,
            severity: info.severity,
            effective: info.effective,
            expires: info.expires,
        },
    }
}

fn convert_area(identifier: &str, area: AreaRecord) -> Area {
    let shapes = area
        .polygon
        .iter()
        .filter_map(|polygon| match parse_vertices(polygon) {
            Ok(vertices) => Shape::from_vertices(vertices),
            Err(vertex) => {
                warn!(
                    "warning {} has invalid polygon in area {}: bad vertex '{}'",
                    identifier, area.area_desc, vertex
                );
                None
            }
        })
        .collect();

    Area {
        description: area.area_desc,
        shapes,
    }
}

/// Parses space separated `lon,lat` pairs. Returns the offending pair on error.
fn parse_vertices(polygon: &str) -> Result<Vec<GeoPoint>, String> {
    polygon
        .split_whitespace()
        .filter(|vertex| *vertex != NULL_VERTEX)
        .map(|vertex| {
            let (lon, lat) = vertex.split_once(',').ok_or_else(|| vertex.to_owned())?;
            let lon: f64 = lon.trim().parse().map_err(|_| vertex.to_owned())?;
            let lat: f64 = lat.trim().parse().map_err(|_| vertex.to_owned())?;
            GeoPoint::new(lat, lon).map_err(|_| vertex.to_owned())
        })
        .collect()
}
