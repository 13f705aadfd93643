//! Notification texts sent to subscribers and to the admin room.
//!
//! Messages are Markdown, rendered by Matrix clients. Feed texts may contain HTML,
//! which is reduced to plain text first.

use chrono::{DateTime, Utc};

use crate::{
    errors::{FetchError, StoreError},
    utils::{reformat_date, strip_html},
    warnings::Warning,
};

/// Formats the notification for a new or updated warning.
///
/// # Arguments
///
/// * `warning` - The warning to announce
/// * `areas` - Descriptions of the areas covering the subscriber's points. Leave
///   empty when the subscriber has a single registration: the area is then obvious.
/// * `now` - Reference time deciding whether dates show their day
///
/// # Examples
///
/// ```text
/// Berlin, Potsdam
///
/// **Unwetterwarnung**
///
/// Schwere Gewitter mit Hagel.
///
/// Gebäude nicht verlassen.
///
/// Effective: 14:00
///
/// Expires: 12.03.2024 02:00
/// ```
pub fn format_warning(warning: &Warning, areas: &[String], now: DateTime<Utc>) -> String {
    let payload = &warning.payload;
    let text = |value: &Option<String>| {
        value
            .as_deref()
            .map(|value| strip_html(value).trim().to_owned())
            .unwrap_or_default()
    };

    let mut lines = vec![areas.join(", ")];
    let headline = text(&payload.headline);
    if !headline.is_empty() {
        lines.push(format!("**{}**", headline));
    }
    lines.push(text(&payload.description));
    lines.push(text(&payload.instruction));
    if let Some(effective) = &payload.effective {
        lines.push(format!("Effective: {}", reformat_date(effective, now)));
    }
    if let Some(expires) = &payload.expires {
        lines.push(format!("Expires: {}", reformat_date(expires, now)));
    }

    lines
        .into_iter()
        .filter(|line| !line.is_empty())
        .collect::<Vec<String>>()
        .join("\n\n")
}

/// Formats the notice sent when a warning a subscriber was told about is lifted.
pub fn format_expiry(warning: &Warning) -> String {
    match warning
        .payload
        .headline
        .as_deref()
        .map(|headline| strip_html(headline).trim().to_owned())
        .filter(|headline| !headline.is_empty())
    {
        Some(headline) => format!("Lifted: **{}** is no longer in effect.", headline),
        None => "Lifted: a warning for your area is no longer in effect.".to_owned(),
    }
}

/// Formats the admin alert for an aborted poll cycle.
pub fn format_store_failure(error: &StoreError) -> String {
    format!(
        "⚠️ Poll cycle aborted, state could not be saved: `{}`. Pending notifications will be retried.",
        error
    )
}

/// Formats the admin alert for a feed failing repeatedly.
pub fn format_fetch_failures(url: &str, failures: u32, error: &FetchError) -> String {
    format!(
        "⚠️ Feed {} failed {} times in a row, last error: `{}`",
        url, failures, error
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{geo::Geometry, warnings::Payload};

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-03-11T10:00:00+01:00")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn warning(payload: Payload) -> Warning {
        Warning {
            identity: "W1".to_string(),
            revision: "r1".to_string(),
            source: "https://example.com/feed.json".to_string(),
            geometry: Geometry::default(),
            payload,
        }
    }

    #[test]
    fn test_format_warning_full() {
        let warning = warning(Payload {
            headline: Some("Unwetterwarnung".to_string()),
            description: Some("Schwere Gewitter<br/>mit Hagel.".to_string()),
            instruction: Some("<b>Gebäude</b> nicht verlassen.".to_string()),
            severity: Some("Severe".to_string()),
            effective: Some("2024-03-11T14:00:00+01:00".to_string()),
            expires: Some("2024-03-12T02:00:00+01:00".to_string()),
        });

        let message = format_warning(
            &warning,
            &["Berlin".to_string(), "Potsdam".to_string()],
            now(),
        );

        assert_eq!(
            message,
            "Berlin, Potsdam\n\n\
            **Unwetterwarnung**\n\n\
            Schwere Gewitter\nmit Hagel.\n\n\
            Gebäude nicht verlassen.\n\n\
            Effective: 14:00\n\n\
            Expires: 12.03.2024 02:00"
        );
    }

    #[test]
    fn test_format_warning_skips_empty_lines() {
        let warning = warning(Payload {
            headline: Some("Hochwasser".to_string()),
            description: Some("   ".to_string()),
            ..Default::default()
        });

        assert_eq!(format_warning(&warning, &[], now()), "**Hochwasser**");
    }

    #[test]
    fn test_format_expiry() {
        let with_headline = warning(Payload {
            headline: Some("Hochwasser".to_string()),
            ..Default::default()
        });
        assert_eq!(
            format_expiry(&with_headline),
            "Lifted: **Hochwasser** is no longer in effect."
        );
        assert_eq!(
            format_expiry(&warning(Payload::default())),
            "Lifted: a warning for your area is no longer in effect."
        );
    }

    #[test]
    fn test_format_fetch_failures() {
        let message = format_fetch_failures(
            "https://example.com/feed.json",
            3,
            &FetchError::Status(502),
        );
        assert_eq!(
            message,
            "⚠️ Feed https://example.com/feed.json failed 3 times in a row, last error: `unexpected status 502`"
        );
    }
}
