//! Help command handler.
//!
//! Also answers unknown commands, prefixed with a short notice.

use log::debug;

use crate::commands::markdown_response::{format_help, format_unknown_command};

/// Returns the list of commands, with the operator contact when configured.
pub fn handle_help(contact: Option<&str>) -> String {
    debug!("handling help command");
    format_help(contact)
}

/// Answers a message that is not a command.
pub fn handle_unknown(body: &str, contact: Option<&str>) -> String {
    debug!("unknown command: {:?}", body);
    format_unknown_command(&format_help(contact))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handle_help() {
        let response = handle_help(Some("@owner:example.com"));

        assert!(response.starts_with("Commands:"));
        assert!(response.contains("@owner:example.com"));
    }

    #[test]
    fn test_handle_unknown_includes_help() {
        let response = handle_unknown("hello", None);

        assert!(response.starts_with("I did not understand your request."));
        assert!(response.ends_with(&handle_help(None)));
    }
}
