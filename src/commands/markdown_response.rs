//! Markdown response formatters for bot commands.
//!
//! Every reply the bot sends in answer to a command is built here, so the wording
//! stays consistent across handlers.

use chrono::{DateTime, Utc};

use crate::{geo::CoordinateError, geo::GeoPoint, storage::FeedState, utils::reformat_date};

const USAGE: &str = "Usage: `register <latitude>, <longitude>`, e.g. `register 52.51704, 13.38792`";

pub fn format_help(contact: Option<&str>) -> String {
    let body = "Commands:\n\
        - `register <latitude>, <longitude>`: receive the warnings covering these coordinates\n\
        - `unregister <latitude>, <longitude>`: stop receiving warnings for these coordinates\n\
        - `unregister all`: remove all your registrations\n\
        - `list`: list your registrations\n\
        - `feeds`: list the warning feeds and when they were last updated\n\
        - `help`: show this help message\n\n\
        Each registered point receives the warnings issued for an area containing it, \
        once per warning and again whenever the warning is updated.";

    match contact {
        Some(contact) => format!("{}\n\n> Questions or problems? Contact {}.", body, contact),
        None => body.to_owned(),
    }
}

pub fn format_unknown_command(help: &str) -> String {
    format!("I did not understand your request.\n\n{}", help)
}

pub fn format_coordinate_error(error: &CoordinateError) -> String {
    match error {
        CoordinateError::Missing => format!("No coordinates given. {}", USAGE),
        CoordinateError::Invalid(input) => format!("Invalid coordinates: {}. {}", input, USAGE),
        CoordinateError::OutOfRange(input) => format!(
            "Coordinates out of range: {}. Latitude must be between -90 and 90, longitude between -180 and 180.",
            input
        ),
    }
}

pub fn format_successful_register(point: &GeoPoint, welcome_message: Option<&str>) -> String {
    let confirmation = format!("Successfully registered to coordinates {}.", point);
    match welcome_message {
        Some(welcome_message) => format!("{}\n\n{}", confirmation, welcome_message),
        None => confirmation,
    }
}

pub fn format_already_registered(point: &GeoPoint) -> String {
    format!("Already registered to coordinates {}.", point)
}

pub fn format_successful_unregister(point: &GeoPoint) -> String {
    format!("Successfully unregistered from coordinates {}.", point)
}

pub fn format_registration_not_found(point: &GeoPoint) -> String {
    format!("No such registration: {}.", point)
}

pub fn format_unregister_all(count: usize) -> String {
    match count {
        0 => "No active registrations.".to_owned(),
        1 => "Successfully removed 1 registration.".to_owned(),
        count => format!("Successfully removed {} registrations.", count),
    }
}

pub fn format_registrations(points: &[GeoPoint]) -> String {
    if points.is_empty() {
        return "No active registrations.".to_owned();
    }

    let points_md = points
        .iter()
        .enumerate()
        .map(|(index, point)| format!("{}. {}", index + 1, point))
        .collect::<Vec<String>>()
        .join("\n");

    format!("Active registrations:\n\n{}", points_md)
}

pub fn format_feeds(feeds: &[(String, FeedState)], now: DateTime<Utc>) -> String {
    if feeds.is_empty() {
        return "No feeds configured.".to_owned();
    }

    let feeds_md = feeds
        .iter()
        .map(|(url, state)| {
            let last_updated = state
                .last_updated
                .map(|date| reformat_date(&date.to_rfc3339(), now))
                .unwrap_or_else(|| "never".to_owned());
            format!("- {} (last updated: {})", url, last_updated)
        })
        .collect::<Vec<String>>()
        .join("\n");

    format!("Feeds:\n\n{}", feeds_md)
}

pub fn format_storage_error() -> String {
    "Your request could not be saved, please try again later.".to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point() -> GeoPoint {
        GeoPoint {
            lat: 52.517,
            lon: 13.3879,
        }
    }

    #[test]
    fn test_format_help() {
        let help = format_help(None);
        assert!(help.starts_with("Commands:"));
        for command in ["register", "unregister", "unregister all", "list", "feeds", "help"] {
            assert!(help.contains(&format!("`{}", command)));
        }
        assert!(!help.contains("Contact"));
    }

    #[test]
    fn test_format_help_with_contact() {
        assert!(
            format_help(Some("@owner:example.com"))
                .ends_with("> Questions or problems? Contact @owner:example.com.")
        );
    }

    #[test]
    fn test_format_unknown_command() {
        assert_eq!(
            format_unknown_command("Commands: ..."),
            "I did not understand your request.\n\nCommands: ..."
        );
    }

    #[test]
    fn test_format_coordinate_error() {
        assert!(format_coordinate_error(&CoordinateError::Missing).starts_with("No coordinates given."));
        assert!(
            format_coordinate_error(&CoordinateError::Invalid("abc, xyz".to_owned()))
                .starts_with("Invalid coordinates: abc, xyz.")
        );
        assert!(
            format_coordinate_error(&CoordinateError::OutOfRange("91, 0".to_owned()))
                .starts_with("Coordinates out of range: 91, 0.")
        );
    }

    #[test]
    fn test_format_successful_register() {
        assert_eq!(
            format_successful_register(&point(), None),
            "Successfully registered to coordinates 52.517, 13.3879."
        );
        assert_eq!(
            format_successful_register(&point(), Some("Welcome!")),
            "Successfully registered to coordinates 52.517, 13.3879.\n\nWelcome!"
        );
    }

    #[test]
    fn test_format_unregister_all() {
        assert_eq!(format_unregister_all(0), "No active registrations.");
        assert_eq!(format_unregister_all(1), "Successfully removed 1 registration.");
        assert_eq!(format_unregister_all(3), "Successfully removed 3 registrations.");
    }

    #[test]
    fn test_format_registrations() {
        assert_eq!(format_registrations(&[]), "No active registrations.");
        assert_eq!(
            format_registrations(&[point(), GeoPoint { lat: 48.1372, lon: 11.5756 }]),
            "Active registrations:\n\n1. 52.517, 13.3879\n2. 48.1372, 11.5756"
        );
    }

    #[test]
    fn test_format_feeds() {
        let now = DateTime::parse_from_rfc3339("2024-03-11T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let updated = FeedState {
            last_updated: Some(
                DateTime::parse_from_rfc3339("2024-03-11T10:30:00Z")
                    .unwrap()
                    .with_timezone(&Utc),
            ),
            ..Default::default()
        };

        assert_eq!(
            format_feeds(
                &[
                    ("https://example.com/a.json".to_owned(), updated),
                    ("https://example.com/b.json".to_owned(), FeedState::default()),
                ],
                now
            ),
            "Feeds:\n\n- https://example.com/a.json (last updated: 10:30)\n- https://example.com/b.json (last updated: never)"
        );
    }
}
