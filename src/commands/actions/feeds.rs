//! Feed listing command handler.

use chrono::{DateTime, Utc};
use log::debug;

use crate::{commands::markdown_response::format_feeds, storage::FeedStateStore};

/// Lists the configured feeds with the time a fresh snapshot was last processed.
pub fn handle_feeds(urls: &[String], states: &FeedStateStore, now: DateTime<Utc>) -> String {
    debug!("handling feeds command");

    let feeds: Vec<_> = urls.iter().map(|url| (url.clone(), states.get(url))).collect();
    format_feeds(&feeds, now)
}
