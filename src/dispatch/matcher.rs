use log::debug;

use crate::{geo::GeoPoint, subscriptions::SubscriptionStore, warnings::Warning};

/// A subscriber concerned by a warning.
#[derive(Debug, Clone, PartialEq)]
pub struct Match {
    pub subscriber: String,
    /// The subscriber's points covered by the warning.
    pub points: Vec<GeoPoint>,
    /// Descriptions of the areas covering those points, without duplicates.
    pub areas: Vec<String>,
}

/// Resolves the subscribers whose points fall inside `warning`.
///
/// A subscriber with several matching points gets a single [`Match`], in the order
/// their first point was registered.
pub async fn match_warning(store: &SubscriptionStore, warning: &Warning) -> Vec<Match> {
    let tolerance = store.tolerance();
    let mut matches: Vec<Match> = Vec::new();

    for (subscriber, point) in store.points_within(&warning.geometry).await {
        debug!("warning {} matched {} at {}", warning.identity, subscriber, point);

        let index = match matches.iter().position(|m| m.subscriber == subscriber) {
            Some(index) => index,
            None => {
                matches.push(Match {
                    subscriber,
                    points: Vec::new(),
                    areas: Vec::new(),
                });
                matches.len() - 1
            }
        };

        let entry = &mut matches[index];
        entry.points.push(point);
        for area in warning.geometry.matching_areas(&point, tolerance) {
            if !entry.areas.contains(&area.description) {
                entry.areas.push(area.description.clone());
            }
        }
    }

    matches
}
