use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::{errors::StoreError, storage::JsonFile};

/// Identifies one notification: a revision of a warning for a subscriber.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DispatchKey {
    pub subscriber: String,
    pub identity: String,
    pub revision: String,
}

impl DispatchKey {
    pub fn new(subscriber: &str, identity: &str, revision: &str) -> Self {
        DispatchKey {
            subscriber: subscriber.to_owned(),
            identity: identity.to_owned(),
            revision: revision.to_owned(),
        }
    }
}

/// A notification waiting to be delivered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Obligation {
    #[serde(flatten)]
    pub key: DispatchKey,
    /// Rendered message, so a retry does not depend on the warning still being
    /// stored in the same revision.
    pub body: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct NotificationRecord {
    #[serde(flatten)]
    key: DispatchKey,
    sent_at: DateTime<Utc>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct DispatchState {
    #[serde(default)]
    sent: Vec<NotificationRecord>,
    #[serde(default)]
    pending: Vec<Obligation>,
}

/// Remembers delivered notifications and holds the pending ones.
///
/// Sending goes through a claim:
///
/// 1. [`begin`](Self::begin) claims a key, failing if it was already sent or is
///    being sent
/// 2. the caller sends without holding any lock on the tracker
/// 3. [`record_sent`](Self::record_sent) or [`abandon`](Self::abandon) releases the
///    claim
///
/// so two cycles racing on the same key cannot both send it.
pub struct DispatchTracker {
    sent: HashMap<DispatchKey, DateTime<Utc>>,
    pending: Vec<Obligation>,
    in_flight: HashSet<DispatchKey>,
    file: JsonFile<DispatchState>,
}

impl DispatchTracker {
    pub async fn load(file: JsonFile<DispatchState>) -> Result<Self, StoreError> {
        let state = file.load().await?;
        info!(
            "loaded {} notification records and {} pending notifications",
            state.sent.len(),
            state.pending.len()
        );

        Ok(DispatchTracker {
            sent: state
                .sent
                .into_iter()
                .map(|record| (record.key, record.sent_at))
                .collect(),
            pending: state.pending,
            in_flight: HashSet::new(),
            file,
        })
    }

    /// True iff `key` was never delivered.
    pub fn should_send(&self, key: &DispatchKey) -> bool {
        !self.sent.contains_key(key)
    }

    /// Marks `key` as delivered and drops the matching pending obligation.
    pub fn record_sent(&mut self, key: &DispatchKey, sent_at: DateTime<Utc>) {
        self.in_flight.remove(key);
        self.pending.retain(|obligation| &obligation.key != key);
        self.sent.insert(key.clone(), sent_at);
    }

    /// Queues an obligation unless its key was already delivered.
    ///
    /// A pending obligation for the same subscriber and warning is replaced, so a
    /// subscriber who missed several revisions only receives the latest one.
    ///
    /// # Returns
    ///
    /// `false` if the key was already delivered and nothing was queued.
    pub fn enqueue(&mut self, obligation: Obligation) -> bool {
        if !self.should_send(&obligation.key) {
            debug!("notification {:?} already sent", obligation.key);
            return false;
        }

        match self.pending.iter_mut().find(|pending| {
            pending.key.subscriber == obligation.key.subscriber
                && pending.key.identity == obligation.key.identity
        }) {
            Some(pending) => *pending = obligation,
            None => self.pending.push(obligation),
        }

        true
    }

    /// Snapshot of the pending obligations, oldest first.
    pub fn pending(&self) -> Vec<Obligation> {
        self.pending.clone()
    }

    /// Claims `key` for sending.
    ///
    /// Returns `false` when the key was already delivered or another caller holds
    /// the claim.
    pub fn begin(&mut self, key: &DispatchKey) -> bool {
        self.should_send(key) && self.in_flight.insert(key.clone())
    }

    /// Releases a claim after a failed send. The obligation stays pending.
    pub fn abandon(&mut self, key: &DispatchKey) {
        self.in_flight.remove(key);
    }

    /// Drops an obligation that can never be delivered and releases its claim.
    pub fn discard(&mut self, key: &DispatchKey) {
        self.in_flight.remove(key);
        self.pending.retain(|obligation| &obligation.key != key);
    }

    /// Drops the obligations queued before `cutoff` that are not being sent.
    ///
    /// # Returns
    ///
    /// The number of obligations dropped.
    pub fn expire_pending(&mut self, cutoff: DateTime<Utc>) -> usize {
        let before = self.pending.len();
        let in_flight = &self.in_flight;
        self.pending.retain(|obligation| {
            obligation.created_at >= cutoff || in_flight.contains(&obligation.key)
        });
        before - self.pending.len()
    }

    /// Subscribers who received at least one revision of `identity`.
    pub fn notified_subscribers(&self, identity: &str) -> Vec<String> {
        let mut subscribers: Vec<String> = self
            .sent
            .keys()
            .filter(|key| key.identity == identity)
            .map(|key| key.subscriber.clone())
            .collect();
        subscribers.sort();
        subscribers.dedup();
        subscribers
    }

    /// Identities of warnings with at least one pending obligation.
    pub fn pending_identities(&self) -> HashSet<String> {
        self.pending
            .iter()
            .map(|obligation| obligation.key.identity.clone())
            .collect()
    }

    /// Forgets the records of pruned warnings.
    pub fn prune(&mut self, identities: &[String]) {
        if identities.is_empty() {
            return;
        }
        self.sent.retain(|key, _| !identities.contains(&key.identity));
    }

    pub async fn persist(&self) -> Result<(), StoreError> {
        let state = DispatchState {
            sent: self
                .sent
                .iter()
                .map(|(key, sent_at)| NotificationRecord {
                    key: key.clone(),
                    sent_at: *sent_at,
                })
                .collect(),
            pending: self.pending.clone(),
        };
        self.file.persist(&state).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;
    use tempfile::TempDir;

    const ROOM: &str = "!room:example.com";

    fn obligation(identity: &str, revision: &str) -> Obligation {
        Obligation {
            key: DispatchKey::new(ROOM, identity, revision),
            body: format!("{} {}", identity, revision),
            created_at: Utc::now(),
        }
    }

    async fn create_tracker(temp_dir: &TempDir) -> DispatchTracker {
        DispatchTracker::load(JsonFile::new(temp_dir.path().join("dispatch.json")))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_record_sent_then_should_send() {
        let temp_dir = TempDir::new().unwrap();
        let mut tracker = create_tracker(&temp_dir).await;
        let key = DispatchKey::new(ROOM, "W1", "r1");

        assert!(tracker.should_send(&key));
        tracker.record_sent(&key, Utc::now());

        assert!(!tracker.should_send(&key));
        assert!(tracker.should_send(&DispatchKey::new(ROOM, "W1", "r2")));
        assert!(tracker.should_send(&DispatchKey::new("!other:example.com", "W1", "r1")));
    }

    #[tokio::test]
    async fn test_begin_is_exclusive() {
        let temp_dir = TempDir::new().unwrap();
        let mut tracker = create_tracker(&temp_dir).await;
        let key = DispatchKey::new(ROOM, "W1", "r1");

        assert!(tracker.begin(&key));
        assert!(!tracker.begin(&key));

        tracker.abandon(&key);
        assert!(tracker.begin(&key));

        tracker.record_sent(&key, Utc::now());
        assert!(!tracker.begin(&key));
    }

    #[tokio::test]
    async fn test_enqueue_skips_sent_revision() {
        let temp_dir = TempDir::new().unwrap();
        let mut tracker = create_tracker(&temp_dir).await;
        tracker.record_sent(&DispatchKey::new(ROOM, "W1", "r1"), Utc::now());

        assert!(!tracker.enqueue(obligation("W1", "r1")));
        assert!(tracker.pending().is_empty());
        assert!(tracker.enqueue(obligation("W1", "r2")));
    }

    #[tokio::test]
    async fn test_enqueue_replaces_older_revision() {
        let temp_dir = TempDir::new().unwrap();
        let mut tracker = create_tracker(&temp_dir).await;

        tracker.enqueue(obligation("W1", "r1"));
        tracker.enqueue(obligation("W2", "r1"));
        tracker.enqueue(obligation("W1", "r2"));

        let pending = tracker.pending();
        assert_eq!(pending.len(), 2);
        assert_eq!(pending[0].key, DispatchKey::new(ROOM, "W1", "r2"));
        assert_eq!(pending[1].key, DispatchKey::new(ROOM, "W2", "r1"));
    }

    #[tokio::test]
    async fn test_failed_send_keeps_obligation_pending() {
        let temp_dir = TempDir::new().unwrap();
        let mut tracker = create_tracker(&temp_dir).await;
        tracker.enqueue(obligation("W1", "r1"));
        let key = DispatchKey::new(ROOM, "W1", "r1");

        assert!(tracker.begin(&key));
        tracker.abandon(&key);

        assert_eq!(tracker.pending().len(), 1);
        assert!(tracker.should_send(&key));

        assert!(tracker.begin(&key));
        tracker.record_sent(&key, Utc::now());
        assert!(tracker.pending().is_empty());
    }

    #[tokio::test]
    async fn test_state_survives_reload() {
        let temp_dir = TempDir::new().unwrap();
        {
            let mut tracker = create_tracker(&temp_dir).await;
            tracker.record_sent(&DispatchKey::new(ROOM, "W1", "r1"), Utc::now());
            tracker.enqueue(obligation("W2", "r1"));
            tracker.persist().await.unwrap();
        }

        let tracker = create_tracker(&temp_dir).await;
        assert!(!tracker.should_send(&DispatchKey::new(ROOM, "W1", "r1")));
        let pending = tracker.pending();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].key, DispatchKey::new(ROOM, "W2", "r1"));
        assert_eq!(pending[0].body, "W2 r1");
    }

    #[tokio::test]
    async fn test_notified_subscribers_and_prune() {
        let temp_dir = TempDir::new().unwrap();
        let mut tracker = create_tracker(&temp_dir).await;
        tracker.record_sent(&DispatchKey::new("!b:example.com", "W1", "r1"), Utc::now());
        tracker.record_sent(&DispatchKey::new("!a:example.com", "W1", "r1"), Utc::now());
        tracker.record_sent(&DispatchKey::new("!a:example.com", "W1", "r2"), Utc::now());
        tracker.record_sent(&DispatchKey::new("!a:example.com", "W2", "r1"), Utc::now());

        assert_eq!(
            tracker.notified_subscribers("W1"),
            vec!["!a:example.com", "!b:example.com"]
        );

        tracker.prune(&["W1".to_string()]);
        assert!(tracker.notified_subscribers("W1").is_empty());
        assert_eq!(tracker.notified_subscribers("W2"), vec!["!a:example.com"]);
    }

    #[tokio::test]
    async fn test_discard_drops_obligation() {
        let temp_dir = TempDir::new().unwrap();
        let mut tracker = create_tracker(&temp_dir).await;
        tracker.enqueue(obligation("W1", "r1"));
        let key = DispatchKey::new(ROOM, "W1", "r1");

        assert!(tracker.begin(&key));
        tracker.discard(&key);

        assert!(tracker.pending().is_empty());
        assert!(tracker.pending_identities().is_empty());
        // Never delivered, a later revision can still be queued
        assert!(tracker.should_send(&key));
    }

    #[tokio::test]
    async fn test_expire_pending_drops_old_obligations() {
        let temp_dir = TempDir::new().unwrap();
        let mut tracker = create_tracker(&temp_dir).await;
        let now = Utc::now();
        tracker.enqueue(Obligation {
            created_at: now - TimeDelta::days(8),
            ..obligation("W1", "r1")
        });
        tracker.enqueue(Obligation {
            created_at: now - TimeDelta::days(9),
            ..obligation("W2", "r1")
        });
        tracker.enqueue(obligation("W3", "r1"));
        assert!(tracker.begin(&DispatchKey::new(ROOM, "W2", "r1")));

        let dropped = tracker.expire_pending(now - TimeDelta::days(7));

        assert_eq!(dropped, 1);
        let pending = tracker.pending();
        assert_eq!(pending.len(), 2);
        assert_eq!(pending[0].key, DispatchKey::new(ROOM, "W2", "r1"));
        assert_eq!(pending[1].key, DispatchKey::new(ROOM, "W3", "r1"));
    }

    #[tokio::test]
    async fn test_pending_identities() {
        let temp_dir = TempDir::new().unwrap();
        let mut tracker = create_tracker(&temp_dir).await;
        tracker.enqueue(obligation("W1", "r1"));
        tracker.enqueue(obligation("W2", "r1"));

        let identities = tracker.pending_identities();
        assert!(identities.contains("W1"));
        assert!(identities.contains("W2"));
        assert_eq!(identities.len(), 2);
    }
}
