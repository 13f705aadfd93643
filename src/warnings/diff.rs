use std::collections::{HashMap, HashSet};

use crate::warnings::Warning;

/// Changes between two snapshots, each identity in at most one bucket.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct WarningDiff {
    /// Identities absent from the previous snapshot.
    pub new: Vec<Warning>,
    /// Known identities whose revision changed. Holds the current version.
    pub updated: Vec<Warning>,
    /// Identities absent from the current snapshot. Holds the previous version.
    pub expired: Vec<Warning>,
}

impl WarningDiff {
    pub fn is_empty(&self) -> bool {
        self.new.is_empty() && self.updated.is_empty() && self.expired.is_empty()
    }

    /// New and updated warnings, the ones that can create notification obligations.
    pub fn changed(&self) -> impl Iterator<Item = &Warning> {
        self.new.iter().chain(self.updated.iter())
    }
}

/// Compares the `previous` snapshot with the `current` one.
///
/// `current` must come from a successfully parsed feed: an identity missing from
/// it is reported as expired. When `current` lists an identity twice only the
/// first occurrence is considered.
pub fn diff(previous: &[Warning], current: &[Warning]) -> WarningDiff {
    let previous_by_identity: HashMap<&str, &Warning> = previous
        .iter()
        .map(|warning| (warning.identity.as_str(), warning))
        .collect();

    let mut result = WarningDiff::default();
    let mut seen: HashSet<&str> = HashSet::new();

    for warning in current {
        if !seen.insert(warning.identity.as_str()) {
            continue;
        }

        match previous_by_identity.get(warning.identity.as_str()) {
            None => result.new.push(warning.clone()),
            Some(known) if known.revision != warning.revision => {
                result.updated.push(warning.clone())
            }
            Some(_) => {}
        }
    }

    result.expired = previous
        .iter()
        .filter(|warning| !seen.contains(warning.identity.as_str()))
        .cloned()
        .collect();

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{geo::Geometry, warnings::Payload};

    fn warning(identity: &str, revision: &str) -> Warning {
        Warning {
            identity: identity.to_string(),
            revision: revision.to_string(),
            source: "https://example.com/feed.json".to_string(),
            geometry: Geometry::default(),
            payload: Payload::default(),
        }
    }

    fn identities(warnings: &[Warning]) -> Vec<&str> {
        warnings.iter().map(|w| w.identity.as_str()).collect()
    }

    #[test]
    fn test_first_run_everything_is_new() {
        let current = vec![warning("W1", "r1"), warning("W2", "r1")];

        let result = diff(&[], &current);

        assert_eq!(identities(&result.new), vec!["W1", "W2"]);
        assert!(result.updated.is_empty());
        assert!(result.expired.is_empty());
    }

    #[test]
    fn test_unchanged_snapshot_is_empty() {
        let snapshot = vec![warning("W1", "r1"), warning("W2", "r7")];

        assert!(diff(&snapshot, &snapshot).is_empty());
    }

    #[test]
    fn test_revision_change_is_update() {
        let result = diff(&[warning("W1", "r1")], &[warning("W1", "r2")]);

        assert!(result.new.is_empty());
        assert_eq!(result.updated, vec![warning("W1", "r2")]);
        assert!(result.expired.is_empty());
    }

    #[test]
    fn test_missing_identity_is_expired() {
        let result = diff(&[warning("W1", "r1"), warning("W2", "r1")], &[warning("W2", "r1")]);

        assert_eq!(result.expired, vec![warning("W1", "r1")]);
        assert!(result.new.is_empty());
        assert!(result.updated.is_empty());
    }

    #[test]
    fn test_genuinely_empty_feed_expires_everything() {
        let result = diff(&[warning("W1", "r1")], &[]);

        assert_eq!(identities(&result.expired), vec!["W1"]);
    }

    #[test]
    fn test_buckets_are_disjoint() {
        let previous = vec![warning("A", "1"), warning("B", "1"), warning("C", "1")];
        let current = vec![
            warning("B", "2"),
            warning("C", "1"),
            warning("D", "1"),
            warning("D", "2"),
        ];

        let result = diff(&previous, &current);

        let mut all: Vec<&str> = identities(&result.new);
        all.extend(identities(&result.updated));
        all.extend(identities(&result.expired));
        let unique: HashSet<&str> = all.iter().copied().collect();
        assert_eq!(all.len(), unique.len());

        assert_eq!(identities(&result.new), vec!["D"]);
        assert_eq!(result.new[0].revision, "1");
        assert_eq!(identities(&result.updated), vec!["B"]);
        assert_eq!(identities(&result.expired), vec!["A"]);
    }

    #[test]
    fn test_changed_chains_new_and_updated() {
        let result = diff(&[warning("W1", "r1")], &[warning("W1", "r2"), warning("W2", "r1")]);

        let changed: Vec<&str> = result.changed().map(|w| w.identity.as_str()).collect();
        assert_eq!(changed, vec!["W2", "W1"]);
    }
}
