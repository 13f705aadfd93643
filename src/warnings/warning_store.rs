use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, TimeDelta, Utc};
use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::{
    errors::StoreError,
    storage::JsonFile,
    warnings::{Warning, WarningDiff},
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredWarning {
    pub warning: Warning,
    /// Set once the warning disappeared from its feed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expired_at: Option<DateTime<Utc>>,
}

/// Persisted snapshot of the warnings known to the bot.
///
/// Holds the active warnings the next [`diff`](crate::warnings::diff) compares
/// against, and the expired ones until their retention period elapses.
pub struct WarningStore {
    warnings: BTreeMap<String, StoredWarning>,
    file: JsonFile<BTreeMap<String, StoredWarning>>,
}

impl WarningStore {
    pub async fn load(file: JsonFile<BTreeMap<String, StoredWarning>>) -> Result<Self, StoreError> {
        let warnings = file.load().await?;
        info!("loaded {} known warnings", warnings.len());
        Ok(WarningStore { warnings, file })
    }

    /// Warnings that have not expired.
    pub fn active(&self) -> Vec<Warning> {
        self.warnings
            .values()
            .filter(|stored| stored.expired_at.is_none())
            .map(|stored| stored.warning.clone())
            .collect()
    }

    #[cfg(test)]
    pub fn get(&self, identity: &str) -> Option<&StoredWarning> {
        self.warnings.get(identity)
    }

    /// Folds the result of a diff into the snapshot.
    ///
    /// New and updated warnings replace whatever was stored under their identity,
    /// which also revives an identity that had expired. Expired warnings keep their
    /// content and are stamped with `now`.
    pub fn apply(&mut self, diff: &WarningDiff, now: DateTime<Utc>) {
        for warning in diff.changed() {
            self.warnings.insert(
                warning.identity.clone(),
                StoredWarning {
                    warning: warning.clone(),
                    expired_at: None,
                },
            );
        }

        for warning in &diff.expired {
            if let Some(stored) = self.warnings.get_mut(&warning.identity)
                && stored.expired_at.is_none()
            {
                debug!("warning {} expired", warning.identity);
                stored.expired_at = Some(now);
            }
        }
    }

    /// Removes warnings expired for longer than `retention`.
    ///
    /// Identities listed in `pending` are kept whatever their age.
    ///
    /// # Returns
    ///
    /// The identities removed.
    pub fn prune(
        &mut self,
        now: DateTime<Utc>,
        retention: TimeDelta,
        pending: &HashSet<String>,
    ) -> Vec<String> {
        let removed: Vec<String> = self
            .warnings
            .iter()
            .filter(|(identity, stored)| {
                stored
                    .expired_at
                    .is_some_and(|expired_at| now - expired_at >= retention)
                    && !pending.contains(*identity)
            })
            .map(|(identity, _)| identity.clone())
            .collect();

        for identity in &removed {
            self.warnings.remove(identity);
        }
        if !removed.is_empty() {
            info!("pruned {} expired warnings", removed.len());
        }

        removed
    }

    pub async fn persist(&self) -> Result<(), StoreError> {
        self.file.persist(&self.warnings).await
    }
}
