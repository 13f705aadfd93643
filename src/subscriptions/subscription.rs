use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::geo::GeoPoint;

/// A point registered by a subscriber.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subscription {
    /// Matrix room id of the subscriber.
    pub subscriber: String,
    /// Registered point, rounded to the configured number of digits.
    pub point: GeoPoint,
    pub created_at: DateTime<Utc>,
}

impl fmt::Display for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "subscriber={}, point=({})", self.subscriber, self.point)
    }
}
