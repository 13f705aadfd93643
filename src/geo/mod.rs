//! Geodetic primitives used to match subscriptions against warning areas.
//!
//! Coordinates are WGS84 degrees. Containment is evaluated in the plane spanned by
//! longitude (x) and latitude (y), which is how the upstream feed describes its
//! polygons.
//!
//! - [`GeoPoint`] - a validated latitude/longitude pair, parsed from user input
//! - [`Shape`] - a polygon, line or single point taken from a warning area
//! - [`Area`] and [`Geometry`] - the described areas a warning covers

mod point;
mod shape;

pub use crate::geo::{
    point::{CoordinateError, GeoPoint},
    shape::{Area, Geometry, Shape},
};

/// Maximum distance in degrees between a point and a shape for the point to still
/// count as inside it.
///
/// Registered points are rounded to `digits` decimals, which moves them by at most
/// `√2 · 10^-digits` degrees. Matching within that distance means rounding never
/// hides a warning from a subscriber.
pub fn match_tolerance(digits: u32) -> f64 {
    std::f64::consts::SQRT_2 * 10f64.powi(-(digits as i32))
}
