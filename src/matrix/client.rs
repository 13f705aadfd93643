//! Matrix client wrapper for bot messaging and synchronization.
//!
//! [`MatrixClient`] owns the SDK client and is the bot's only transport: it
//! receives commands through [`MatrixClient::sync`] and delivers notifications as
//! the [`Messenger`] implementation.

use std::path::Path;

use log::{debug, error, info};
use matrix_sdk::{
    Client, RoomState,
    ruma::{
        EventId, RoomId, UserId,
        events::room::message::{AddMentions, ForwardThread, ReplyMetadata, RoomMessageEventContent},
    },
};

use crate::{
    dispatch::Messenger,
    errors::SendError,
    matrix::{UserCredentials, encryption::setup_client, session::MatrixSession, sync::MatrixSync},
};

const DISPLAY_NAME: &str = "Nina";

pub struct MatrixClient {
    matrix_sync: MatrixSync,
    client: Client,
}

impl MatrixClient {
    /// Logs in, restoring the session stored in `session_path` when there is one.
    pub async fn new(
        user_credentials: &UserCredentials,
        session_path: &Path,
    ) -> Result<Self, anyhow::Error> {
        let matrix_session = MatrixSession::new(session_path).await;
        let client = setup_client(user_credentials, &matrix_session).await?;

        client.account().set_display_name(Some(DISPLAY_NAME)).await?;

        let matrix_sync = MatrixSync::new(&client, &matrix_session);

        Ok(MatrixClient {
            matrix_sync,
            client,
        })
    }

    /// Runs the sync loop, calling `on_message` with
    /// `(body, room_id, sender_id, event_id)` for each text message received.
    ///
    /// Only returns when the loop stops.
    pub async fn sync<F>(&self, on_message: F) -> Result<(), anyhow::Error>
    where
        F: Fn(String, String, String, String) + Send + Sync + 'static + Clone,
    {
        self.matrix_sync.sync(on_message).await?;
        info!("matrix sync ended");
        Ok(())
    }

    /// Answers the message `event_id` sent by `sender_id`.
    pub async fn send_reply(
        &self,
        room_id: &str,
        sender_id: &str,
        event_id: &str,
        body: &str,
    ) -> Result<(), SendError> {
        let sender = UserId::parse(sender_id)
            .map_err(|_| SendError::UnknownRecipient(sender_id.to_owned()))?;
        let event = EventId::parse(event_id)
            .map_err(|e| SendError::Transport(format!("invalid event id {}: {}", event_id, e)))?;

        let content = RoomMessageEventContent::text_markdown(body).make_reply_to(
            ReplyMetadata::new(&event, &sender, None),
            ForwardThread::No,
            AddMentions::No,
        );

        self.send_content(room_id, content).await
    }

    async fn send_content(
        &self,
        room_id: &str,
        content: RoomMessageEventContent,
    ) -> Result<(), SendError> {
        let room_id_obj =
            RoomId::parse(room_id).map_err(|_| SendError::UnknownRecipient(room_id.to_owned()))?;
        // Unknown rooms may just not be synced yet after a fresh login
        let Some(room) = self.client.get_room(&room_id_obj) else {
            return Err(SendError::Transport(format!("room {} not synced", room_id)));
        };
        if room.state() == RoomState::Left {
            return Err(SendError::UnknownRecipient(room_id.to_owned()));
        }

        if let Err(e) = room.send(content).await {
            error!("failed to send message to {}: {:?}", room_id, e);
            return Err(SendError::Transport(e.to_string()));
        }

        debug!("message sent to {}", room_id);
        Ok(())
    }
}

impl Messenger for MatrixClient {
    async fn send(&self, recipient: &str, body: &str) -> Result<(), SendError> {
        self.send_content(recipient, RoomMessageEventContent::text_markdown(body))
            .await
    }
}
