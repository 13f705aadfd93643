//! Configuration file structures for the Nina bot.
//!
//! The configuration is read from a YAML file. Any value can be overridden by an
//! environment variable prefixed with `NINA_`, nested keys being separated by
//! `__`:
//!
//! ```bash
//! export NINA_MATRIX__PASSWORD="secret-from-env"
//! export NINA_FEEDS__POLLING_INTERVAL=60
//! ```
//!
//! # Configuration File Format
//!
//! ```yaml
//! feeds:
//!   # Warning feeds, polled concurrently
//!   urls:
//!     - "https://warnung.bund.de/bbk.mowas/gefahrendurchsagen.json"
//!     - "https://warnung.bund.de/bbk.dwd/unwetter.json"
//!   # Seconds between two poll cycles
//!   polling_interval: 120
//!   # Decimals kept from registered coordinates
//!   coordinate_digits: 4
//!   # Seconds an expired warning is kept before being forgotten
//!   retention: 604800
//!   # Tell subscribers when a warning they received is lifted
//!   notify_on_expiry: false
//!   # Consecutive failures of a feed before the admin room is alerted
//!   fetch_failure_threshold: 3
//!
//! matrix:
//!   user_id: "@nina:matrix.org"
//!   password: "secret-password"
//!   passphrase: "recovery-passphrase"
//!   # Seconds before an outbound message is considered failed
//!   send_timeout: 30
//!
//! admin:
//!   # Shown in the help message
//!   contact: "@owner:matrix.org"
//!   # Receives storage failures and repeated feed failures
//!   room: "!admin:matrix.org"
//!
//! welcome_message: "You will now receive the warnings for this place."
//! ```
//!
//! Only `feeds.urls` and the `matrix` credentials are required.

use std::{path::Path, time::Duration};

use anyhow::{Context, bail};
use chrono::TimeDelta;
use figment::{
    Figment,
    providers::{Env, Format, Yaml},
};
use serde::Deserialize;

use crate::poller::PollSettings;

/// Root configuration structure for the Nina bot.
#[derive(Debug, Deserialize)]
pub struct Config {
    pub feeds: Feeds,
    pub matrix: Matrix,
    #[serde(default)]
    pub admin: Admin,
    /// Sent along the first registration of a room.
    #[serde(default)]
    pub welcome_message: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Feeds {
    /// URLs of the warning feeds.
    pub urls: Vec<String>,

    /// Polling interval in seconds.
    #[serde(default = "default_polling_interval")]
    pub polling_interval: u64,

    /// Decimals kept from registered coordinates. 4 digits is about 11 meters.
    #[serde(default = "default_coordinate_digits")]
    pub coordinate_digits: u32,

    /// Seconds an expired warning and its notification records are kept.
    #[serde(default = "default_retention")]
    pub retention: u64,

    #[serde(default)]
    pub notify_on_expiry: bool,

    #[serde(default = "default_fetch_failure_threshold")]
    pub fetch_failure_threshold: u32,
}

#[derive(Debug, Deserialize)]
pub struct Matrix {
    /// Fully qualified Matrix user ID.
    ///
    /// # Examples
    ///
    /// - `@nina:matrix.org`
    /// - `@warnings:example.com`
    pub user_id: String,

    /// Matrix account password.
    ///
    /// Used for initial login. After successful authentication, the session
    /// is persisted and the bot can restore without re-authenticating.
    pub password: String,

    /// E2EE recovery passphrase.
    pub passphrase: String,

    /// Seconds before sending a message is given up.
    #[serde(default = "default_send_timeout")]
    pub send_timeout: u64,
}

#[derive(Debug, Default, Deserialize)]
pub struct Admin {
    pub contact: Option<String>,
    pub room: Option<String>,
}

fn default_polling_interval() -> u64 {
    120
}

fn default_coordinate_digits() -> u32 {
    4
}

fn default_retention() -> u64 {
    7 * 24 * 60 * 60
}

fn default_fetch_failure_threshold() -> u32 {
    3
}

fn default_send_timeout() -> u64 {
    30
}

impl Config {
    /// Reads the YAML file at `path`, then applies the `NINA_` environment overrides.
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be read, a required value is missing, or a value
    /// is out of range.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, anyhow::Error> {
        let path = path.as_ref();
        let config: Config = Figment::new()
            .merge(Yaml::file(path))
            .merge(Env::prefixed("NINA_").split("__"))
            .extract()
            .with_context(|| format!("invalid configuration {}", path.display()))?;

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), anyhow::Error> {
        if self.feeds.urls.is_empty() {
            bail!("feeds.urls must list at least one feed");
        }
        if self.feeds.polling_interval == 0 {
            bail!("feeds.polling_interval must be greater than 0");
        }
        if self.feeds.coordinate_digits > 10 {
            bail!("feeds.coordinate_digits must be at most 10");
        }
        if self.feeds.fetch_failure_threshold == 0 {
            bail!("feeds.fetch_failure_threshold must be greater than 0");
        }
        if self.matrix.send_timeout == 0 {
            bail!("matrix.send_timeout must be greater than 0");
        }
        Ok(())
    }

    /// Settings of the poll cycle.
    pub fn poll_settings(&self) -> PollSettings {
        PollSettings {
            urls: self.feeds.urls.clone(),
            send_timeout: Duration::from_secs(self.matrix.send_timeout),
            notify_on_expiry: self.feeds.notify_on_expiry,
            retention: TimeDelta::seconds(self.feeds.retention.min(i64::MAX as u64) as i64),
            fetch_failure_threshold: self.feeds.fetch_failure_threshold,
            admin_room: self.admin.room.clone(),
        }
    }
}
