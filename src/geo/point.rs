//! Latitude/longitude pairs and their parsing from chat input.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while reading coordinates typed by a user.
///
/// Each variant carries the raw input so the reply can name it.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoordinateError {
    #[error("no coordinates given")]
    Missing,

    #[error("invalid coordinates: {0}")]
    Invalid(String),

    #[error("coordinates out of range: {0}")]
    OutOfRange(String),
}

/// A point on the earth in WGS84 degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    /// Creates a point, rejecting latitudes outside [-90, 90] and longitudes
    /// outside [-180, 180].
    pub fn new(lat: f64, lon: f64) -> Result<Self, CoordinateError> {
        if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
            return Err(CoordinateError::OutOfRange(format!("{}, {}", lat, lon)));
        }

        Ok(GeoPoint { lat, lon })
    }

    /// Parses `"<lat>, <lon>"` as typed in a chat message.
    ///
    /// The two numbers may be separated by a comma, whitespace or both.
    ///
    /// # Errors
    ///
    /// - [`CoordinateError::Missing`] if the input is blank
    /// - [`CoordinateError::Invalid`] if it is not exactly two finite numbers
    /// - [`CoordinateError::OutOfRange`] if a number is outside the valid range
    ///
    /// # Examples
    ///
    /// ```
    /// let point = GeoPoint::parse("52.51704, 13.38792").unwrap();
    /// assert_eq!(point.lat, 52.51704);
    /// ```
    pub fn parse(input: &str) -> Result<Self, CoordinateError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(CoordinateError::Missing);
        }

        let invalid = || CoordinateError::Invalid(input.to_owned());

        let parts: Vec<&str> = input
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|part| !part.is_empty())
            .collect();
        let [lat, lon] = parts.as_slice() else {
            return Err(invalid());
        };

        let lat: f64 = lat.parse().map_err(|_| invalid())?;
        let lon: f64 = lon.parse().map_err(|_| invalid())?;
        // "nan" and "inf" parse as floats but are not coordinates
        if !lat.is_finite() || !lon.is_finite() {
            return Err(invalid());
        }

        GeoPoint::new(lat, lon).map_err(|_| CoordinateError::OutOfRange(input.to_owned()))
    }

    /// Returns the point rounded to `digits` decimals.
    pub fn rounded(&self, digits: u32) -> Self {
        let factor = 10f64.powi(digits as i32);
        GeoPoint {
            lat: (self.lat * factor).round() / factor,
            lon: (self.lon * factor).round() / factor,
        }
    }
}

impl fmt::Display for GeoPoint {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}, {}", self.lat, self.lon)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_comma_separated() {
        let point = GeoPoint::parse("52.51704, 13.38792").unwrap();
        assert_eq!(point.lat, 52.51704);
        assert_eq!(point.lon, 13.38792);
    }

    #[test]
    fn test_parse_space_or_comma_only() {
        assert_eq!(
            GeoPoint::parse("52.5 13.4").unwrap(),
            GeoPoint::parse("52.5,13.4").unwrap()
        );
        assert_eq!(
            GeoPoint::parse("  -33.9 ,  151.2 ").unwrap(),
            GeoPoint { lat: -33.9, lon: 151.2 }
        );
    }

    #[test]
    fn test_parse_empty_input() {
        assert_eq!(GeoPoint::parse("   "), Err(CoordinateError::Missing));
    }

    #[test]
    fn test_parse_letters() {
        assert_eq!(
            GeoPoint::parse("abc, xyz"),
            Err(CoordinateError::Invalid("abc, xyz".to_string()))
        );
    }

    #[test]
    fn test_parse_wrong_number_of_values() {
        assert!(matches!(
            GeoPoint::parse("52.5"),
            Err(CoordinateError::Invalid(_))
        ));
        assert!(matches!(
            GeoPoint::parse("52.5, 13.4, 7"),
            Err(CoordinateError::Invalid(_))
        ));
    }

    #[test]
    fn test_parse_non_finite() {
        assert!(matches!(
            GeoPoint::parse("nan, 13.4"),
            Err(CoordinateError::Invalid(_))
        ));
        assert!(matches!(
            GeoPoint::parse("52.5, inf"),
            Err(CoordinateError::Invalid(_))
        ));
    }

    #[test]
    fn test_parse_out_of_range() {
        assert_eq!(
            GeoPoint::parse("91, 13"),
            Err(CoordinateError::OutOfRange("91, 13".to_string()))
        );
        assert!(matches!(
            GeoPoint::parse("52, -180.5"),
            Err(CoordinateError::OutOfRange(_))
        ));
    }

    #[test]
    fn test_range_bounds_are_inclusive() {
        assert!(GeoPoint::new(90.0, 180.0).is_ok());
        assert!(GeoPoint::new(-90.0, -180.0).is_ok());
    }

    #[test]
    fn test_rounded() {
        let point = GeoPoint { lat: 52.51704, lon: 13.38792 }.rounded(4);
        assert_eq!(point.to_string(), "52.517, 13.3879");
    }

    #[test]
    fn test_display() {
        let point = GeoPoint { lat: -33.9, lon: 151.25 };
        assert_eq!(point.to_string(), "-33.9, 151.25");
    }
}
