//! Command action handlers.
//!
//! One handler per [`Command`](crate::commands::command::Command) variant. Handlers
//! receive a [`CommandContext`](crate::commands::CommandContext) when they touch
//! the subscriptions, apply the change to the store and return the Markdown reply.
//! Failures are part of the reply: a handler never returns an error.
//!
//! # Available Handlers
//!
//! - [`handle_help`] / [`handle_unknown`] - Display help information
//! - [`handle_register`] - Register a point
//! - [`handle_unregister`] / [`handle_unregister_all`] - Remove registrations
//! - [`handle_list`] - List the subscriber's points
//! - [`handle_feeds`] - List the configured feeds

mod feeds;
mod help;
mod list;
mod register;
mod unregister;

pub use crate::commands::actions::{
    feeds::handle_feeds,
    help::{handle_help, handle_unknown},
    list::handle_list,
    register::handle_register,
    unregister::{handle_unregister, handle_unregister_all},
};
