//! Matrix client synchronization and event handling.
//!
//! [`MatrixSync::sync`]:
//! 1. Catches up with a first sync, so invitations received while offline are seen
//!    but old messages are not handled again
//! 2. Joins the rooms the bot is invited to
//! 3. Hands every new text message to the callback, except the bot's own
//! 4. Persists the sync token after each sync so a restart resumes where it stopped

use anyhow::Result;
use std::sync::Arc;

use log::{error, info, warn};
use matrix_sdk::{
    Client, LoopCtrl, Room, RoomState,
    config::SyncSettings,
    ruma::{
        api::client::filter::FilterDefinition,
        events::room::{
            member::StrippedRoomMemberEvent,
            message::{MessageType, OriginalSyncRoomMessageEvent},
        },
    },
};
use tokio::time::{Duration, sleep};

use crate::matrix::session::MatrixSession;

const MAX_JOIN_DELAY: u64 = 3600;

pub struct MatrixSync {
    client: Client,
    session: MatrixSession,
}

impl MatrixSync {
    pub fn new(client: &Client, session: &MatrixSession) -> Self {
        MatrixSync {
            client: client.to_owned(),
            session: session.to_owned(),
        }
    }

    pub async fn sync<F>(&self, on_message: F) -> Result<()>
    where
        F: Fn(String, String, String, String) + Send + Sync + 'static + Clone,
    {
        info!("start syncing");

        self.client.add_event_handler(auto_join_rooms);

        // Lazy-load room members, the bot never lists them
        let filter = FilterDefinition::with_lazy_loading();
        let mut sync_settings = SyncSettings::default().filter(filter.into());
        if let Some(sync_token) = self.session.get_sync_token() {
            sync_settings = sync_settings.token(sync_token);
        }

        let mut delay = 1;
        let response = loop {
            match self.client.sync_once(sync_settings.clone()).await {
                Ok(response) => break response,
                Err(e) => {
                    error!("initial sync failed, retrying in {}s: {}", delay, e);
                    sleep(Duration::from_secs(delay)).await;
                    delay = (delay * 2).min(60);
                }
            }
        };
        self.persist_sync_token(response.next_batch.clone()).await;

        // Registered after the first sync: only messages sent from now on are handled
        let on_message = Arc::new(on_message);
        self.client.add_event_handler({
            let on_message = Arc::clone(&on_message);
            move |event: OriginalSyncRoomMessageEvent, room: Room| async move {
                on_room_message(event, room, &on_message).await
            }
        });

        sync_settings = sync_settings.token(response.next_batch);

        self.client
            .sync_with_result_callback(sync_settings, |sync_result| async move {
                let response = sync_result?;
                self.persist_sync_token(response.next_batch).await;
                Ok(LoopCtrl::Continue)
            })
            .await?;

        Ok(())
    }

    async fn persist_sync_token(&self, sync_token: String) {
        if let Err(e) = self.session.persist_sync_token(sync_token).await {
            error!("failed to persist sync token: {:?}", e);
        }
    }
}

async fn auto_join_rooms(room_member: StrippedRoomMemberEvent, client: Client, room: Room) {
    let Some(user_id) = client.user_id() else {
        warn!("could not get user id from client");
        return;
    };

    if room_member.state_key != user_id {
        return;
    }

    tokio::spawn(async move {
        info!("auto joining room {}", room.room_id());
        let mut delay = 2;

        // Synapse can send the invite before the room is joinable, see
        // https://github.com/matrix-org/synapse/issues/4345
        while let Err(e) = room.join().await {
            if delay > MAX_JOIN_DELAY {
                error!("giving up joining room {}: {:?}", room.room_id(), e);
                return;
            }
            warn!(
                "failed to join room {} ({:?}), retrying in {}s",
                room.room_id(),
                e,
                delay
            );
            sleep(Duration::from_secs(delay)).await;
            delay *= 2;
        }
        info!("joined room {}", room.room_id());
    });
}

async fn on_room_message<F>(event: OriginalSyncRoomMessageEvent, room: Room, on_message: &Arc<F>)
where
    F: Fn(String, String, String, String) + Send + Sync + 'static,
{
    if room.state() != RoomState::Joined {
        return;
    }

    // Replies of the bot would otherwise be parsed as commands
    if event.sender.as_str() == room.own_user_id().as_str() {
        return;
    }

    let MessageType::Text(text_content) = event.content.msgtype else {
        return;
    };

    on_message(
        text_content.body,
        room.room_id().to_string(),
        event.sender.to_string(),
        event.event_id.to_string(),
    );
}
