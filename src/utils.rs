//! Utility functions for paths and feed text cleanup.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

/// Joins a file name onto the data directory.
///
/// # Examples
///
/// ```
/// let path = get_path("/var/lib/nina", "subscriptions.json");
/// assert_eq!(path, PathBuf::from("/var/lib/nina/subscriptions.json"));
/// ```
pub fn get_path(dir_path: impl AsRef<Path>, file_name: &str) -> PathBuf {
    dir_path.as_ref().join(file_name)
}

/// Converts the HTML fragments found in feed texts to plain text.
///
/// `<br>` tags become line breaks, every other tag is removed and the common
/// character entities are decoded.
///
/// # Examples
///
/// ```
/// assert_eq!(strip_html("Stay <b>inside</b>.<br/>Close windows"), "Stay inside.\nClose windows");
/// ```
pub fn strip_html(text: &str) -> String {
    let mut output = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(start) = rest.find('<') {
        output.push_str(&rest[..start]);
        let Some(end) = rest[start..].find('>') else {
            // unterminated tag, keep the text as is
            output.push_str(&rest[start..]);
            rest = "";
            break;
        };

        let tag = rest[start + 1..start + end]
            .trim_start_matches('/')
            .trim()
            .to_ascii_lowercase();
        if tag == "br" || tag.starts_with("br ") || tag.starts_with("br/") {
            output.push('\n');
        }
        rest = &rest[start + end + 1..];
    }
    output.push_str(rest);

    decode_entities(&output)
}

fn decode_entities(text: &str) -> String {
    const ENTITIES: [(&str, &str); 7] = [
        ("&lt;", "<"),
        ("&gt;", ">"),
        ("&quot;", "\""),
        ("&#39;", "'"),
        ("&apos;", "'"),
        ("&nbsp;", " "),
        // last so "&amp;lt;" decodes to "&lt;"
        ("&amp;", "&"),
    ];

    ENTITIES
        .iter()
        .fold(text.to_owned(), |acc, (entity, plain)| acc.replace(entity, plain))
}

/// Formats an RFC 3339 timestamp from the feed for display.
///
/// Dates on the same day as `now` only show the time, other dates show
/// `dd.mm.yyyy HH:MM`. Both are expressed in the offset of the original timestamp.
/// Unparseable values are returned unchanged.
pub fn reformat_date(value: &str, now: DateTime<Utc>) -> String {
    let Ok(date) = DateTime::parse_from_rfc3339(value) else {
        return value.to_owned();
    };

    let today = now.with_timezone(date.offset()).date_naive();
    if date.date_naive() == today {
        date.format("%H:%M").to_string()
    } else {
        date.format("%d.%m.%Y %H:%M").to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_path_simple() {
        let path = get_path("/home/user", "subscriptions.json");
        #[cfg(unix)]
        assert_eq!(path, PathBuf::from("/home/user/subscriptions.json"));
    }

    #[test]
    fn test_get_path_relative() {
        let path = get_path(".", "session");
        #[cfg(unix)]
        assert_eq!(path.to_str(), Some("./session"));
    }

    #[test]
    fn test_strip_html_line_breaks() {
        assert_eq!(strip_html("a<br>b<BR/>c<br />d"), "a\nb\nc\nd");
    }

    #[test]
    fn test_strip_html_removes_tags() {
        assert_eq!(
            strip_html("<p>Stay <b>inside</b>.</p><a href=\"x\">link</a>"),
            "Stay inside.link"
        );
    }

    #[test]
    fn test_strip_html_entities() {
        assert_eq!(
            strip_html("Tom &amp; Jerry &lt;3 &quot;quoted&quot;&nbsp;!"),
            "Tom & Jerry <3 \"quoted\" !"
        );
        assert_eq!(strip_html("&amp;lt;"), "&lt;");
    }

    #[test]
    fn test_strip_html_unterminated_tag() {
        assert_eq!(strip_html("a < b"), "a < b");
    }

    #[test]
    fn test_strip_html_plain_text() {
        assert_eq!(strip_html("nothing to do"), "nothing to do");
    }

    #[test]
    fn test_reformat_date_today() {
        let now = DateTime::parse_from_rfc3339("2024-03-11T10:00:00+01:00")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(reformat_date("2024-03-11T08:37:36+01:00", now), "08:37");
    }

    #[test]
    fn test_reformat_date_other_day() {
        let now = DateTime::parse_from_rfc3339("2024-03-11T10:00:00+01:00")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(
            reformat_date("2024-03-12T18:05:00+01:00", now),
            "12.03.2024 18:05"
        );
    }

    #[test]
    fn test_reformat_date_uses_original_offset() {
        // 23:30 UTC on the 10th is already the 11th in +01:00
        let now = DateTime::parse_from_rfc3339("2024-03-10T23:30:00Z")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(reformat_date("2024-03-11T06:00:00+01:00", now), "06:00");
    }

    #[test]
    fn test_reformat_date_invalid() {
        assert_eq!(reformat_date("tomorrow", Utc::now()), "tomorrow");
    }
}
