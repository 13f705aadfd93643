//! From changed warnings to delivered notifications.
//!
//! # Overview
//!
//! ```text
//! new / updated warning
//!      │
//!      ▼
//! match_warning()  ← SubscriptionStore::points_within
//!      │  one Match per subscriber
//!      ▼
//! DispatchTracker::enqueue()  ← skipped if that revision was already sent
//!      │  pending obligations, persisted
//!      ▼
//! begin() → Messenger::send() → record_sent() / abandon()
//! ```
//!
//! Pending obligations are the retry queue: an obligation whose send failed stays
//! pending and is attempted again on the next poll cycle. Once a revision has been
//! delivered to a subscriber it is never sent to them again.
//!
//! # Module Organization
//!
//! - [`tracker`] - at-most-once bookkeeping and the pending queue
//! - [`matcher`] - subscribers concerned by a warning
//! - [`messenger`] - the outbound transport abstraction
//! - [`message`] - notification texts

mod matcher;
mod message;
mod messenger;
mod tracker;

pub use crate::dispatch::{
    matcher::{Match, match_warning},
    message::{format_expiry, format_fetch_failures, format_store_failure, format_warning},
    messenger::Messenger,
    tracker::{DispatchKey, DispatchTracker, Obligation},
};

#[cfg(test)]
pub use crate::dispatch::messenger::MockMessenger;
