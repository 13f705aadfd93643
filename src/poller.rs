//! The poll cycle: fetch feeds, detect changes, notify subscribers.
//!
//! One cycle runs the whole pipeline:
//!
//! ```text
//! FeedSource::fetch() for every feed (concurrently)
//!      │  failed or not modified feeds are left out
//!      ▼
//! diff(active stored warnings, fresh snapshots)
//!      │
//!      ▼
//! match_warning() per new / updated warning → DispatchTracker::enqueue()
//!      │  obligations persisted, then WarningStore::apply()
//!      ▼
//! send every pending obligation, each under a timeout
//!      │
//!      ▼
//! prune expired warnings past retention
//! ```
//!
//! Cycles are serialized: a cycle started while another one runs waits for it.

use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
    time::Duration,
};

use chrono::{TimeDelta, Utc};
use futures::future::join_all;
use log::{debug, error, info, warn};
use tokio::{
    sync::{Mutex, RwLock},
    time::timeout,
};

use crate::{
    dispatch::{
        DispatchKey, DispatchTracker, Messenger, Obligation, format_expiry,
        format_fetch_failures, format_store_failure, format_warning, match_warning,
    },
    errors::{FetchError, SendError, StoreError},
    feed::{FeedResponse, FeedSource},
    storage::FeedStateStore,
    subscriptions::SubscriptionStore,
    warnings::{Warning, WarningDiff, WarningStore, diff},
};

/// Settings of the poll cycle taken from the configuration.
#[derive(Debug, Clone)]
pub struct PollSettings {
    pub urls: Vec<String>,
    pub send_timeout: Duration,
    pub notify_on_expiry: bool,
    /// How long an expired warning is kept before being pruned.
    pub retention: TimeDelta,
    /// Consecutive failures of one feed before the admin is alerted.
    pub fetch_failure_threshold: u32,
    pub admin_room: Option<String>,
}

/// Counters of one completed cycle.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CycleReport {
    pub new: usize,
    pub updated: usize,
    pub expired: usize,
    pub sent: usize,
    pub failed: usize,
}

struct FreshFeed {
    url: String,
    etag: Option<String>,
    last_modified: Option<String>,
}

/// Runs poll cycles against a [`FeedSource`], delivering through a [`Messenger`].
pub struct Poller<F: FeedSource, M: Messenger> {
    feed_source: F,
    messenger: Arc<M>,
    settings: PollSettings,
    subscriptions: Arc<SubscriptionStore>,
    warnings: Mutex<WarningStore>,
    tracker: Mutex<DispatchTracker>,
    feed_states: Arc<RwLock<FeedStateStore>>,
    failures: Mutex<HashMap<String, u32>>,
    cycle: Mutex<()>,
}

impl<F: FeedSource, M: Messenger> Poller<F, M> {
    pub fn new(
        feed_source: F,
        messenger: Arc<M>,
        settings: PollSettings,
        subscriptions: Arc<SubscriptionStore>,
        warnings: WarningStore,
        tracker: DispatchTracker,
        feed_states: Arc<RwLock<FeedStateStore>>,
    ) -> Self {
        Poller {
            feed_source,
            messenger,
            settings,
            subscriptions,
            warnings: Mutex::new(warnings),
            tracker: Mutex::new(tracker),
            feed_states,
            failures: Mutex::new(HashMap::new()),
            cycle: Mutex::new(()),
        }
    }

    /// Runs one poll cycle.
    ///
    /// Waits for a cycle already in progress to finish first.
    ///
    /// # Errors
    ///
    /// A [`StoreError`] aborts the cycle. It is logged and reported to the admin
    /// room before being returned. Notifications not yet delivered stay pending
    /// and are attempted again by the next cycle.
    pub async fn run_cycle(&self) -> Result<CycleReport, StoreError> {
        let _cycle = self.cycle.lock().await;
        debug!("poll cycle started");

        match self.poll().await {
            Ok(report) => {
                info!(
                    "poll cycle done: {} new, {} updated, {} expired, {} sent, {} failed",
                    report.new, report.updated, report.expired, report.sent, report.failed
                );
                Ok(report)
            }
            Err(e) => {
                error!("poll cycle aborted: {}", e);
                self.alert_admin(&format_store_failure(&e)).await;
                Err(e)
            }
        }
    }

    async fn poll(&self) -> Result<CycleReport, StoreError> {
        let (fresh, current) = self.fetch_feeds().await;
        let fresh_sources: HashSet<&str> = fresh.iter().map(|feed| feed.url.as_str()).collect();
        let mut report = CycleReport::default();

        let changes = {
            let warnings = self.warnings.lock().await;
            let mut changes = diff(&warnings.active(), &current);
            // A warning of a feed without a fresh snapshot is unknown, not gone
            changes
                .expired
                .retain(|warning| fresh_sources.contains(warning.source.as_str()));
            changes
        };

        // Obligations are persisted before the warnings they come from: a cycle
        // interrupted in between diffs the same changes again next time
        self.enqueue_notifications(&changes).await?;

        if !changes.is_empty() {
            let mut warnings = self.warnings.lock().await;
            warnings.apply(&changes, Utc::now());
            warnings.persist().await?;
        }
        // Validators are only stored once the snapshot they describe is persisted
        {
            let mut feed_states = self.feed_states.write().await;
            for feed in fresh {
                feed_states
                    .record_update(&feed.url, feed.etag, feed.last_modified, Utc::now())
                    .await?;
            }
        }

        report.new = changes.new.len();
        report.updated = changes.updated.len();
        report.expired = changes.expired.len();

        let (sent, failed) = self.dispatch_pending().await?;
        report.sent = sent;
        report.failed = failed;

        self.prune().await?;

        Ok(report)
    }

    /// Fetches all feeds concurrently.
    ///
    /// # Returns
    ///
    /// The feeds that returned a fresh snapshot and the union of their warnings.
    async fn fetch_feeds(&self) -> (Vec<FreshFeed>, Vec<Warning>) {
        let states = {
            let feed_states = self.feed_states.read().await;
            self.settings
                .urls
                .iter()
                .map(|url| feed_states.get(url))
                .collect::<Vec<_>>()
        };

        let responses = join_all(
            self.settings
                .urls
                .iter()
                .zip(states.iter())
                .map(|(url, state)| self.feed_source.fetch(url, state)),
        )
        .await;

        let mut fresh = Vec::new();
        let mut current = Vec::new();

        for (url, response) in self.settings.urls.iter().zip(responses) {
            match response {
                Ok(FeedResponse::Modified {
                    warnings,
                    etag,
                    last_modified,
                }) => {
                    self.reset_failures(url).await;
                    debug!("feed {} returned {} warnings", url, warnings.len());
                    fresh.push(FreshFeed {
                        url: url.clone(),
                        etag,
                        last_modified,
                    });
                    current.extend(warnings);
                }
                Ok(FeedResponse::NotModified) => {
                    self.reset_failures(url).await;
                    debug!("feed {} not modified", url);
                }
                Err(e) => self.record_failure(url, &e).await,
            }
        }

        (fresh, current)
    }

    async fn reset_failures(&self, url: &str) {
        if let Some(count) = self.failures.lock().await.remove(url)
            && count >= self.settings.fetch_failure_threshold
        {
            info!("feed {} recovered after {} failures", url, count);
        }
    }

    async fn record_failure(&self, url: &str, error: &FetchError) {
        let count = {
            let mut failures = self.failures.lock().await;
            let count = failures.entry(url.to_owned()).or_insert(0);
            *count += 1;
            *count
        };
        warn!("failed to fetch feed {} ({} in a row): {}", url, count, error);

        if count == self.settings.fetch_failure_threshold {
            self.alert_admin(&format_fetch_failures(url, count, error))
                .await;
        }
    }

    /// Turns the changes of this cycle into pending obligations and persists them.
    async fn enqueue_notifications(&self, changes: &WarningDiff) -> Result<(), StoreError> {
        let now = Utc::now();
        let mut obligations = Vec::new();

        for warning in changes.changed() {
            for matched in match_warning(&self.subscriptions, warning).await {
                debug!(
                    "warning {} covers {} points of {}",
                    warning.identity,
                    matched.points.len(),
                    matched.subscriber
                );
                let areas = if self.subscriptions.count(&matched.subscriber).await > 1 {
                    matched.areas
                } else {
                    Vec::new()
                };

                obligations.push(Obligation {
                    key: DispatchKey::new(&matched.subscriber, &warning.identity, &warning.revision),
                    body: format_warning(warning, &areas, now),
                    created_at: now,
                });
            }
        }

        let mut tracker = self.tracker.lock().await;

        if self.settings.notify_on_expiry {
            for warning in &changes.expired {
                let revision = format!("{}+expired", warning.revision);
                for subscriber in tracker.notified_subscribers(&warning.identity) {
                    obligations.push(Obligation {
                        key: DispatchKey::new(&subscriber, &warning.identity, &revision),
                        body: format_expiry(warning),
                        created_at: now,
                    });
                }
            }
        }

        if obligations.is_empty() {
            return Ok(());
        }

        let mut queued = 0;
        for obligation in obligations {
            if tracker.enqueue(obligation) {
                queued += 1;
            }
        }
        debug!("queued {} notifications", queued);

        tracker.persist().await
    }

    /// Attempts every pending obligation once.
    ///
    /// # Returns
    ///
    /// The number of notifications delivered and the number of failed attempts.
    async fn dispatch_pending(&self) -> Result<(usize, usize), StoreError> {
        let pending = self.tracker.lock().await.pending();
        let mut sent = 0;
        let mut failed = 0;

        for obligation in pending {
            let key = &obligation.key;
            if !self.tracker.lock().await.begin(key) {
                debug!("notification {:?} already sent or in flight", key);
                continue;
            }

            match self.send(&key.subscriber, &obligation.body).await {
                Ok(()) => {
                    let mut tracker = self.tracker.lock().await;
                    tracker.record_sent(key, Utc::now());
                    tracker.persist().await?;
                    sent += 1;
                }
                Err(SendError::UnknownRecipient(recipient)) => {
                    warn!(
                        "dropping notification about {}, {} is not reachable anymore",
                        key.identity, recipient
                    );
                    {
                        let mut tracker = self.tracker.lock().await;
                        tracker.discard(key);
                        tracker.persist().await?;
                    }
                    self.forget_subscriber(&recipient).await;
                    failed += 1;
                }
                Err(e) => {
                    warn!(
                        "failed to notify {} about {}, will retry: {}",
                        key.subscriber, key.identity, e
                    );
                    self.tracker.lock().await.abandon(key);
                    failed += 1;
                }
            }
        }

        Ok((sent, failed))
    }

    /// Removes the registrations of a subscriber that can no longer be reached,
    /// so later warnings do not queue notifications for it.
    async fn forget_subscriber(&self, subscriber: &str) {
        match self.subscriptions.remove_all(subscriber).await {
            Ok(0) => {}
            Ok(count) => info!("removed {} registrations of unreachable {}", count, subscriber),
            Err(e) => error!("failed to remove registrations of {}: {}", subscriber, e),
        }
    }

    async fn prune(&self) -> Result<(), StoreError> {
        let now = Utc::now();
        let mut tracker = self.tracker.lock().await;

        let stale = tracker.expire_pending(now - self.settings.retention);
        if stale > 0 {
            warn!("gave up on {} notifications pending for too long", stale);
        }

        let removed = {
            let mut warnings = self.warnings.lock().await;
            let removed = warnings.prune(now, self.settings.retention, &tracker.pending_identities());
            if !removed.is_empty() {
                warnings.persist().await?;
            }
            removed
        };

        if !removed.is_empty() {
            tracker.prune(&removed);
        }
        if stale > 0 || !removed.is_empty() {
            tracker.persist().await?;
        }
        Ok(())
    }

    async fn send(&self, recipient: &str, body: &str) -> Result<(), SendError> {
        match timeout(self.settings.send_timeout, self.messenger.send(recipient, body)).await {
            Ok(result) => result,
            Err(_) => Err(SendError::Timeout(self.settings.send_timeout)),
        }
    }

    async fn alert_admin(&self, body: &str) {
        let Some(room) = &self.settings.admin_room else {
            return;
        };
        if let Err(e) = self.send(room, body).await {
            error!("failed to alert admin room {}: {}", room, e);
        }
    }
}
