use chrono::Utc;
use log::{debug, error, info};
use tokio::sync::RwLock;

use crate::{
    errors::StoreError,
    geo::{GeoPoint, Geometry, match_tolerance},
    storage::JsonFile,
    subscriptions::Subscription,
};

/// Outcome of [`SubscriptionStore::add`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    /// The point was stored. `first` is true when it is the subscriber's only one.
    Added { first: bool },
    /// The subscriber already holds this point; nothing changed.
    AlreadyRegistered,
}

/// Registrations of all subscribers, backed by a JSON file.
///
/// Poll cycles read the store while command handlers write to it, so the list sits
/// behind a [`RwLock`]. Every mutation is persisted before the write lock is
/// released; if persisting fails the mutation is rolled back and the error is
/// returned.
///
/// Points are rounded to `digits` decimals when stored and when compared, so
/// `register 52.517041, 13.38792` and `unregister 52.51704, 13.38792` address the
/// same registration with the default 4 digits.
pub struct SubscriptionStore {
    subscriptions: RwLock<Vec<Subscription>>,
    file: JsonFile<Vec<Subscription>>,
    digits: u32,
}

impl SubscriptionStore {
    pub async fn load(file: JsonFile<Vec<Subscription>>, digits: u32) -> Result<Self, StoreError> {
        let subscriptions = file.load().await?;
        info!("loaded {} subscriptions", subscriptions.len());

        Ok(SubscriptionStore {
            subscriptions: RwLock::new(subscriptions),
            file,
            digits,
        })
    }

    /// Rounds `point` the way the store does before storing it.
    pub fn normalize(&self, point: &GeoPoint) -> GeoPoint {
        point.rounded(self.digits)
    }

    /// Distance in degrees within which a stored point still matches a shape.
    pub fn tolerance(&self) -> f64 {
        match_tolerance(self.digits)
    }

    /// Registers `point` for `subscriber`.
    ///
    /// Registering a point twice is a no-op reported as
    /// [`Registration::AlreadyRegistered`].
    pub async fn add(&self, subscriber: &str, point: &GeoPoint) -> Result<Registration, StoreError> {
        let point = self.normalize(point);
        let mut subscriptions = self.subscriptions.write().await;

        if subscriptions
            .iter()
            .any(|s| s.subscriber == subscriber && s.point == point)
        {
            debug!("{} already registered to {}", subscriber, point);
            return Ok(Registration::AlreadyRegistered);
        }

        let first = !subscriptions.iter().any(|s| s.subscriber == subscriber);
        subscriptions.push(Subscription {
            subscriber: subscriber.to_owned(),
            point,
            created_at: Utc::now(),
        });

        if let Err(e) = self.file.persist(&subscriptions).await {
            error!("failed to persist new subscription: {}", e);
            subscriptions.pop();
            return Err(e);
        }

        info!("{} registered to {}", subscriber, point);
        Ok(Registration::Added { first })
    }

    /// Removes the registration of `point` for `subscriber`.
    ///
    /// # Returns
    ///
    /// `true` if the registration existed.
    pub async fn remove(&self, subscriber: &str, point: &GeoPoint) -> Result<bool, StoreError> {
        let point = self.normalize(point);
        let mut subscriptions = self.subscriptions.write().await;

        let Some(index) = subscriptions
            .iter()
            .position(|s| s.subscriber == subscriber && s.point == point)
        else {
            return Ok(false);
        };

        let removed = subscriptions.remove(index);
        if let Err(e) = self.file.persist(&subscriptions).await {
            error!("failed to persist subscription removal: {}", e);
            subscriptions.insert(index, removed);
            return Err(e);
        }

        info!("{} unregistered from {}", subscriber, point);
        Ok(true)
    }

    /// Removes every registration of `subscriber` and returns how many there were.
    pub async fn remove_all(&self, subscriber: &str) -> Result<usize, StoreError> {
        let mut subscriptions = self.subscriptions.write().await;

        let previous = subscriptions.clone();
        subscriptions.retain(|s| s.subscriber != subscriber);
        let count = previous.len() - subscriptions.len();
        if count == 0 {
            return Ok(0);
        }

        if let Err(e) = self.file.persist(&subscriptions).await {
            error!("failed to persist subscription removals: {}", e);
            *subscriptions = previous;
            return Err(e);
        }

        info!("{} unregistered from {} points", subscriber, count);
        Ok(count)
    }

    /// Points of `subscriber` in registration order.
    pub async fn list(&self, subscriber: &str) -> Vec<GeoPoint> {
        self.subscriptions
            .read()
            .await
            .iter()
            .filter(|s| s.subscriber == subscriber)
            .map(|s| s.point)
            .collect()
    }

    pub async fn count(&self, subscriber: &str) -> usize {
        self.subscriptions
            .read()
            .await
            .iter()
            .filter(|s| s.subscriber == subscriber)
            .count()
    }

    /// Every (subscriber, point) registration lying inside or on the boundary of
    /// `geometry`, within [`Self::tolerance`].
    pub async fn points_within(&self, geometry: &Geometry) -> Vec<(String, GeoPoint)> {
        let tolerance = self.tolerance();

        self.subscriptions
            .read()
            .await
            .iter()
            .filter(|s| geometry.contains(&s.point, tolerance))
            .map(|s| (s.subscriber.clone(), s.point))
            .collect()
    }
}
