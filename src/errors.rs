//! Error taxonomy shared by the polling, dispatch and persistence layers.
//!
//! Errors are split by where they can be recovered:
//!
//! - [`FetchError`] is local to one feed and one poll cycle. The cycle skips the
//!   diff for that feed and tries again on the next interval.
//! - [`SendError`] is local to one notification. The obligation stays pending and is
//!   retried on the next cycle.
//! - [`StoreError`] aborts the running cycle and is escalated to the admin room.
//!
//! Malformed user input is reported through [`crate::geo::CoordinateError`] and never
//! leaves the command handlers.

use std::time::Duration;

use thiserror::Error;

/// Errors raised while fetching or decoding an upstream feed.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The HTTP request could not be performed.
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a status other than 200 or 304.
    #[error("unexpected status {0}")]
    Status(u16),

    /// The payload is not a JSON array of warning records.
    #[error("malformed feed payload: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Errors raised while delivering an outbound message.
#[derive(Debug, Error)]
pub enum SendError {
    #[error("transport failure: {0}")]
    Transport(String),

    /// The recipient is not a room the bot can post to, and never will be.
    #[error("unknown recipient {0}")]
    UnknownRecipient(String),

    #[error("send timed out after {0:?}")]
    Timeout(Duration),
}

/// Errors raised by the JSON state files.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("i/o error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize state: {0}")]
    Serialize(#[from] serde_json::Error),

    /// The state file exists but cannot be decoded.
    #[error("corrupted state file {path}: {source}")]
    Corrupted {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}
