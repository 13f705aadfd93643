//! Registration listing command handler.

use log::debug;

use crate::commands::{CommandContext, markdown_response::format_registrations};

/// Lists the points of the subscriber in registration order.
pub async fn handle_list(context: &CommandContext<'_>) -> String {
    debug!("handling list command for {}", context.subscriber);
    format_registrations(&context.subscriptions.list(context.subscriber).await)
}
