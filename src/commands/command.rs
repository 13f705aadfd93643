//! Command parsing.
//!
//! This module converts the text of a Matrix message into a [`Command`]. Parsing
//! never fails: a message that is not a known command becomes
//! [`Command::Unknown`] and is answered with the help text.

use log::debug;

/// Represents a parsed bot command.
///
/// The keyword is the first word of the message, matched case-insensitively.
/// Arguments are kept as raw text and validated by the handlers, so error replies
/// can quote what the user typed.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub enum Command {
    /// Display help information
    Help,
    /// Register a point
    ///
    /// # Fields
    ///
    /// * `String` - Coordinates as typed, e.g. `52.51704, 13.38792`
    Register(String),
    /// Remove the registration of a point
    ///
    /// # Fields
    ///
    /// * `String` - Coordinates as typed
    Unregister(String),
    /// Remove every registration of the subscriber
    UnregisterAll,
    /// List the subscriber's registrations
    List,
    /// List the configured feeds
    Feeds,
    /// Anything else, with the raw message
    Unknown(String),
}

impl Command {
    /// Parses a message body into a Command.
    ///
    /// # Examples
    ///
    /// ```
    /// assert_eq!(
    ///     Command::parse("Register 52.51704, 13.38792"),
    ///     Command::Register("52.51704, 13.38792".to_string())
    /// );
    /// assert_eq!(Command::parse("unregister ALL"), Command::UnregisterAll);
    /// assert_eq!(Command::parse("hello"), Command::Unknown("hello".to_string()));
    /// ```
    pub fn parse(body: &str) -> Self {
        let body = body.trim();
        let (keyword, arguments) = match body.split_once(char::is_whitespace) {
            Some((keyword, arguments)) => (keyword, arguments.trim()),
            None => (body, ""),
        };

        let command = match keyword.to_lowercase().as_str() {
            "help" => Command::Help,
            "register" => Command::Register(arguments.to_owned()),
            "unregister" if arguments.eq_ignore_ascii_case("all") => Command::UnregisterAll,
            "unregister" => Command::Unregister(arguments.to_owned()),
            "list" => Command::List,
            "feeds" => Command::Feeds,
            _ => Command::Unknown(body.to_owned()),
        };

        debug!("parsed command {:?}", command);
        command
    }
}
