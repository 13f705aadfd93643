//! Command routing.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::RwLock;

use crate::{
    commands::{
        CommandContext,
        actions::{
            handle_feeds, handle_help, handle_list, handle_register, handle_unknown,
            handle_unregister, handle_unregister_all,
        },
        command::Command,
    },
    storage::FeedStateStore,
    subscriptions::SubscriptionStore,
};

/// Parses messages and runs the matching handler.
///
/// # Examples
///
/// ```no_run
/// let commander = Commander::new(subscriptions, feed_states, urls, None, None);
/// let reply = commander.execute("!room:example.com", "register 52.51704, 13.38792").await;
/// ```
pub struct Commander {
    subscriptions: Arc<SubscriptionStore>,
    feed_states: Arc<RwLock<FeedStateStore>>,
    feed_urls: Vec<String>,
    welcome_message: Option<String>,
    contact: Option<String>,
}

impl Commander {
    /// Creates a commander.
    ///
    /// # Arguments
    ///
    /// * `subscriptions` - Store modified by `register` and `unregister`
    /// * `feed_states` - Read by `feeds`
    /// * `feed_urls` - Configured feeds, listed by `feeds`
    /// * `welcome_message` - Sent along the first registration of a room
    /// * `contact` - Operator contact shown in the help
    pub fn new(
        subscriptions: Arc<SubscriptionStore>,
        feed_states: Arc<RwLock<FeedStateStore>>,
        feed_urls: Vec<String>,
        welcome_message: Option<String>,
        contact: Option<String>,
    ) -> Self {
        Commander {
            subscriptions,
            feed_states,
            feed_urls,
            welcome_message,
            contact,
        }
    }

    /// Parses `body` and runs the command for `subscriber`.
    ///
    /// # Returns
    ///
    /// The Markdown reply to send back. Every message gets one.
    pub async fn execute(&self, subscriber: &str, body: &str) -> String {
        let context = CommandContext {
            subscriber,
            subscriptions: &self.subscriptions,
        };
        let contact = self.contact.as_deref();

        match Command::parse(body) {
            Command::Help => handle_help(contact),
            Command::Register(input) => {
                handle_register(&context, &input, self.welcome_message.as_deref()).await
            }
            Command::Unregister(input) => handle_unregister(&context, &input).await,
            Command::UnregisterAll => handle_unregister_all(&context).await,
            Command::List => handle_list(&context).await,
            Command::Feeds => {
                let states = self.feed_states.read().await;
                handle_feeds(&self.feed_urls, &states, Utc::now())
            }
            Command::Unknown(body) => handle_unknown(&body, contact),
        }
    }
}
