//! Warnings and change detection across polls.
//!
//! A [`Warning`] is one upstream record: its identity, the areas it covers, a
//! payload opaque to matching and a revision marker that changes whenever the
//! record's content changes.
//!
//! Each poll cycle compares the fresh snapshot with the persisted one through
//! [`diff`], then folds the result back into the [`WarningStore`]:
//!
//! ```text
//! previous (WarningStore) ─┐
//!                          ├─ diff() ─→ new / updated / expired
//! current (feeds) ─────────┘
//! ```
//!
//! Expired warnings are kept for a grace period before being pruned, so an
//! identity that briefly disappears from a feed is not lost.

mod diff;
mod warning;
mod warning_store;

pub use crate::warnings::{
    diff::{WarningDiff, diff},
    warning::{Payload, Warning},
    warning_store::WarningStore,
};
