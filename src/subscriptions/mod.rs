//! Subscriber registrations and the spatial query the notification pipeline
//! relies on.
//!
//! A subscriber is the Matrix room a `register` command was sent from. It may hold
//! any number of points, each (subscriber, point) pair at most once.

mod subscription;
mod subscription_store;

pub use crate::subscriptions::{
    subscription::Subscription,
    subscription_store::{Registration, SubscriptionStore},
};
