//! Bot command parsing and response formatting.
//!
//! Every message received in a room is a command addressed to the bot. The room is
//! the subscriber: registrations made in a room are notified in that room.
//!
//! # Architecture
//!
//! ```text
//! Matrix Message
//!      │
//!      ▼
//! ┌─────────────┐
//! │  Commander  │  ← Entry point: execute()
//! └─────────────┘
//!      │
//!      ├── Command::parse() ──→ Help | Register | Unregister | UnregisterAll
//!      │                        | List | Feeds | Unknown
//!      │
//!      └── action handler ────→ SubscriptionStore / FeedStateStore
//!                 │
//!                 ▼
//!          Markdown reply
//! ```
//!
//! ## Available Commands
//!
//! | Command | Arguments | Description |
//! |---------|-----------|-------------|
//! | `help` | None | Display help information |
//! | `register` | `<latitude>, <longitude>` | Receive warnings covering a point |
//! | `unregister` | `<latitude>, <longitude>` or `all` | Remove one or all registrations |
//! | `list` | None | List the room's registrations |
//! | `feeds` | None | List the warning feeds |
//!
//! Keywords are case-insensitive. Any other message is answered with the help text.
//!
//! # Module Organization
//!
//! - [`commander`] - Parses and routes commands
//! - [`command`] - Command enum and parsing
//! - [`actions`] - Individual command handlers
//! - [`markdown_response`] - Response formatting

mod actions;
mod command;
mod commander;
mod markdown_response;

pub use crate::commands::{command::Command, commander::Commander};
use crate::subscriptions::SubscriptionStore;

/// What a handler needs to act on behalf of a subscriber.
pub struct CommandContext<'a> {
    /// Matrix room id the command was sent in
    pub subscriber: &'a str,
    pub subscriptions: &'a SubscriptionStore,
}
