//! Unregistration command handlers.
//!
//! Registrations are scoped to the room the command is sent in: a room can only
//! remove its own points.

use log::{debug, error};

use crate::{
    commands::{
        CommandContext,
        markdown_response::{
            format_coordinate_error, format_registration_not_found, format_storage_error,
            format_successful_unregister, format_unregister_all,
        },
    },
    geo::GeoPoint,
};

/// Removes the registration of the point described by `input`.
///
/// The coordinates are rounded like at registration, so the user does not need to
/// type them exactly as they were stored.
pub async fn handle_unregister(context: &CommandContext<'_>, input: &str) -> String {
    debug!("handling unregister command: {:?}", input);

    let point = match GeoPoint::parse(input) {
        Ok(point) => point,
        Err(e) => return format_coordinate_error(&e),
    };
    let normalized = context.subscriptions.normalize(&point);

    match context.subscriptions.remove(context.subscriber, &point).await {
        Ok(true) => format_successful_unregister(&normalized),
        Ok(false) => format_registration_not_found(&normalized),
        Err(e) => {
            error!("failed to unregister {} for {}: {}", normalized, context.subscriber, e);
            format_storage_error()
        }
    }
}

/// Removes every registration of the subscriber.
pub async fn handle_unregister_all(context: &CommandContext<'_>) -> String {
    debug!("handling unregister all command");

    match context.subscriptions.remove_all(context.subscriber).await {
        Ok(count) => format_unregister_all(count),
        Err(e) => {
            error!("failed to unregister all points of {}: {}", context.subscriber, e);
            format_storage_error()
        }
    }
}
