use serde::{Deserialize, Serialize};

use crate::geo::Geometry;

/// Human readable content of a warning. Never inspected by matching.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Payload {
    pub headline: Option<String>,
    pub description: Option<String>,
    pub instruction: Option<String>,
    pub severity: Option<String>,
    /// RFC 3339 timestamp the warning takes effect.
    pub effective: Option<String>,
    /// RFC 3339 timestamp the warning ends.
    pub expires: Option<String>,
}

/// One emergency warning as published by a feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Warning {
    /// Identifier assigned by the feed, stable across updates.
    pub identity: String,
    /// Changes whenever the upstream record changes.
    pub revision: String,
    /// URL of the feed the warning was last seen in.
    pub source: String,
    pub geometry: Geometry,
    pub payload: Payload,
}
