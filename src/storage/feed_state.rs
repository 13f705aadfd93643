//! Conditional request validators and last update time of each feed.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{errors::StoreError, storage::JsonFile};

/// What the bot remembers about one feed between polls.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeedState {
    /// `ETag` of the last successful response, sent back as `If-None-Match`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,
    /// `Last-Modified` of the last successful response, sent back as
    /// `If-Modified-Since`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<String>,
    /// When a fresh snapshot of the feed was last processed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<DateTime<Utc>>,
}

/// Feed states keyed by feed URL, backed by a JSON file.
pub struct FeedStateStore {
    states: BTreeMap<String, FeedState>,
    file: JsonFile<BTreeMap<String, FeedState>>,
}

impl FeedStateStore {
    pub async fn load(file: JsonFile<BTreeMap<String, FeedState>>) -> Result<Self, StoreError> {
        let states = file.load().await?;
        Ok(FeedStateStore { states, file })
    }

    /// Returns the state of `url`, or an empty state for a feed never fetched.
    pub fn get(&self, url: &str) -> FeedState {
        self.states.get(url).cloned().unwrap_or_default()
    }

    /// Records a fresh snapshot of `url` and persists the store.
    pub async fn record_update(
        &mut self,
        url: &str,
        etag: Option<String>,
        last_modified: Option<String>,
        updated_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        self.states.insert(
            url.to_owned(),
            FeedState {
                etag,
                last_modified,
                last_updated: Some(updated_at),
            },
        );
        self.file.persist(&self.states).await
    }
}
