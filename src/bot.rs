//! Bot orchestration.
//!
//! Wires the stores, the poller and the command handling to the Matrix client and
//! runs them side by side.

use std::{sync::Arc, time::Duration};

use log::{debug, info, warn};
use tokio::{
    fs,
    sync::RwLock,
    time::{self, MissedTickBehavior},
};

use crate::{
    Args,
    commands::Commander,
    config::Config,
    dispatch::DispatchTracker,
    feed::HttpFeed,
    matrix::{MatrixClient, UserCredentials},
    poller::Poller,
    storage::{FeedStateStore, JsonFile},
    subscriptions::SubscriptionStore,
    utils::get_path,
    warnings::WarningStore,
};

/// Context for processing a Matrix message.
struct MessageContext {
    /// The message body text
    body: String,
    /// The Matrix room ID where the message was sent, also the subscriber
    room_id: String,
    /// The Matrix user ID who sent the message
    sender_id: String,
    /// The Matrix event ID of the message
    event_id: String,
    matrix_client: Arc<MatrixClient>,
    commander: Arc<Commander>,
}

/// Main bot structure relaying warning feeds to Matrix rooms.
///
/// The bot runs two concurrent activities:
///
/// - **Poll Task**: on a timer (configured by `feeds.polling_interval`), runs a
///   [`Poller`] cycle: fetch the feeds, detect new, updated and expired warnings,
///   and notify the rooms with a registered point inside them
/// - **Matrix Sync**: listens for Matrix messages and answers each one through the
///   [`Commander`], each in its own task
///
/// All state lives in the data directory:
///
/// - `subscriptions.json` - registered points per room
/// - `warnings.json` - last known warnings
/// - `dispatch.json` - delivered and pending notifications
/// - `feeds.json` - conditional request validators per feed
/// - `session/` - Matrix session and encryption store
pub struct Bot {
    matrix_client: Arc<MatrixClient>,

    poller: Arc<Poller<HttpFeed, MatrixClient>>,

    polling_interval: u64,

    commander: Arc<Commander>,
}

impl Bot {
    /// Loads the stores from the data directory and logs in to Matrix.
    ///
    /// # Errors
    ///
    /// Fails if the data directory cannot be created, a state file is corrupted,
    /// or the Matrix login fails.
    pub async fn new(config: Config, args: Args) -> Result<Self, anyhow::Error> {
        fs::create_dir_all(&args.data).await?;

        let subscriptions = Arc::new(
            SubscriptionStore::load(
                JsonFile::new(get_path(&args.data, "subscriptions.json")),
                config.feeds.coordinate_digits,
            )
            .await?,
        );
        let warnings = WarningStore::load(JsonFile::new(get_path(&args.data, "warnings.json"))).await?;
        let tracker =
            DispatchTracker::load(JsonFile::new(get_path(&args.data, "dispatch.json"))).await?;
        let feed_states = Arc::new(RwLock::new(
            FeedStateStore::load(JsonFile::new(get_path(&args.data, "feeds.json"))).await?,
        ));

        let matrix_client = Arc::new(
            MatrixClient::new(
                &UserCredentials {
                    user_id: config.matrix.user_id.clone(),
                    password: config.matrix.password.clone(),
                    passphrase: config.matrix.passphrase.clone(),
                },
                &get_path(&args.data, "session"),
            )
            .await?,
        );

        let poller = Arc::new(Poller::new(
            HttpFeed::new(),
            Arc::clone(&matrix_client),
            config.poll_settings(),
            Arc::clone(&subscriptions),
            warnings,
            tracker,
            Arc::clone(&feed_states),
        ));

        let commander = Arc::new(Commander::new(
            subscriptions,
            feed_states,
            config.feeds.urls,
            config.welcome_message,
            config.admin.contact,
        ));

        Ok(Bot {
            matrix_client,
            poller,
            polling_interval: config.feeds.polling_interval,
            commander,
        })
    }

    /// Starts polling and handles Matrix messages until the sync loop stops.
    pub async fn start(self) -> Result<(), anyhow::Error> {
        self.start_poll_task();

        let matrix_client = Arc::clone(&self.matrix_client);
        let commander = Arc::clone(&self.commander);

        let on_message =
            move |body: String, room_id: String, sender_id: String, event_id: String| {
                Self::handle_matrix_message(MessageContext {
                    body,
                    room_id,
                    sender_id,
                    event_id,
                    matrix_client: Arc::clone(&matrix_client),
                    commander: Arc::clone(&commander),
                })
            };

        self.matrix_client.sync(on_message).await
    }

    fn start_poll_task(&self) {
        let poller = Arc::clone(&self.poller);
        let polling_interval = self.polling_interval;

        tokio::spawn(async move {
            info!("polling feeds every {} seconds", polling_interval);
            let mut interval = time::interval(Duration::from_secs(polling_interval));
            // A cycle longer than the interval delays the next one instead of stacking
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                interval.tick().await;
                // Already logged and reported to the admin room by the poller
                if let Err(e) = poller.run_cycle().await {
                    debug!("poll cycle failed, retrying at next tick: {}", e);
                }
            }
        });
    }

    fn handle_matrix_message(ctx: MessageContext) {
        tokio::spawn(async move {
            let response = ctx.commander.execute(&ctx.room_id, &ctx.body).await;

            if let Err(e) = ctx
                .matrix_client
                .send_reply(&ctx.room_id, &ctx.sender_id, &ctx.event_id, &response)
                .await
            {
                warn!("failed to answer {} in {}: {}", ctx.sender_id, ctx.room_id, e);
            }
        });
    }
}
