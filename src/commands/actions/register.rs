//! Point registration command handler.
//!
//! Parses the coordinates typed by the user and stores them for the room the
//! command was sent in. The reply echoes the coordinates as stored, after rounding.

use log::{debug, error};

use crate::{
    commands::{
        CommandContext,
        markdown_response::{
            format_already_registered, format_coordinate_error, format_storage_error,
            format_successful_register,
        },
    },
    geo::GeoPoint,
    subscriptions::Registration,
};

/// Registers the point described by `input` for the subscriber of `context`.
///
/// # Arguments
///
/// * `context` - The subscriber and the subscription store
/// * `input` - Raw coordinates, e.g. `52.51704, 13.38792`
/// * `welcome_message` - Appended to the confirmation of a subscriber's first
///   registration
///
/// # Returns
///
/// The Markdown reply: a confirmation, a duplicate notice, or the reason the
/// coordinates were rejected.
pub async fn handle_register(
    context: &CommandContext<'_>,
    input: &str,
    welcome_message: Option<&str>,
) -> String {
    debug!("handling register command: {:?}", input);

    let point = match GeoPoint::parse(input) {
        Ok(point) => point,
        Err(e) => {
            debug!("rejected coordinates from {}: {}", context.subscriber, e);
            return format_coordinate_error(&e);
        }
    };
    let normalized = context.subscriptions.normalize(&point);

    match context.subscriptions.add(context.subscriber, &point).await {
        Ok(Registration::Added { first }) => {
            format_successful_register(&normalized, welcome_message.filter(|_| first))
        }
        Ok(Registration::AlreadyRegistered) => format_already_registered(&normalized),
        Err(e) => {
            error!("failed to register {} for {}: {}", normalized, context.subscriber, e);
            format_storage_error()
        }
    }
}
