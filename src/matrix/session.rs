//! Persistence of the Matrix login across restarts.
//!
//! The session directory holds the SDK's encrypted sqlite store and a `session`
//! JSON document with the access tokens and the last sync token.

use std::path::{Path, PathBuf};

use log::{debug, trace, warn};
use matrix_sdk::authentication::matrix;
use serde::{Deserialize, Serialize};

use crate::storage::JsonFile;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Session {
    user_session: matrix::MatrixSession,

    #[serde(skip_serializing_if = "Option::is_none")]
    sync_token: Option<String>,
}

/// The bot's Matrix session, as found on disk at startup.
#[derive(Clone)]
pub struct MatrixSession {
    session: Option<Session>,
    sqlite_path: PathBuf,
    file: JsonFile<Option<Session>>,
}

impl MatrixSession {
    /// Reads the session stored in `dir_path`.
    ///
    /// An unreadable session document is logged and ignored: the bot then logs in
    /// again with its credentials.
    pub async fn new(dir_path: &Path) -> Self {
        let sqlite_path = dir_path.join("sqlite");
        let file = JsonFile::new(dir_path.join("session"));
        debug!("read session at {}", dir_path.display());

        let session = match file.load().await {
            Ok(session) => session,
            Err(e) => {
                warn!("ignoring unreadable matrix session: {}", e);
                None
            }
        };
        debug!("found user session: {}", session.is_some());

        MatrixSession {
            session,
            sqlite_path,
            file,
        }
    }

    pub fn get_sqlite_path(&self) -> &Path {
        &self.sqlite_path
    }

    pub fn get_user_session(&self) -> Option<&matrix::MatrixSession> {
        self.session.as_ref().map(|s| &s.user_session)
    }

    pub fn get_sync_token(&self) -> Option<String> {
        self.session.as_ref().and_then(|s| s.sync_token.clone())
    }

    /// Stores `sync_token` next to the persisted user session.
    ///
    /// Does nothing if no user session was persisted yet.
    pub async fn persist_sync_token(&self, sync_token: String) -> anyhow::Result<()> {
        trace!("persist sync token {}", sync_token);

        let Some(mut session) = self.file.load().await? else {
            warn!("no user session to attach the sync token to");
            return Ok(());
        };
        session.sync_token = Some(sync_token);
        self.file.persist(&Some(session)).await?;

        Ok(())
    }

    /// Replaces the stored session with `user_session`, dropping the sync token.
    pub async fn persist_user_session(
        &self,
        user_session: &matrix::MatrixSession,
    ) -> anyhow::Result<()> {
        trace!("persist user session");

        self.file
            .persist(&Some(Session {
                user_session: user_session.clone(),
                sync_token: None,
            }))
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use matrix_sdk::{
        SessionMeta, SessionTokens, authentication::matrix::MatrixSession as SdkMatrixSession,
    };
    use tempfile::TempDir;
    use tokio::fs;

    fn create_user_session() -> SdkMatrixSession {
        SdkMatrixSession {
            meta: SessionMeta {
                user_id: "@nina:example.com".try_into().unwrap(),
                device_id: "DEVICEID".into(),
            },
            tokens: SessionTokens {
                access_token: "access_token".to_string(),
                refresh_token: None,
            },
        }
    }

    #[tokio::test]
    async fn test_new_without_session() {
        let temp_dir = TempDir::new().unwrap();

        let matrix_session = MatrixSession::new(temp_dir.path()).await;

        assert!(matrix_session.get_user_session().is_none());
        assert!(matrix_session.get_sync_token().is_none());
        assert_eq!(
            matrix_session.get_sqlite_path(),
            temp_dir.path().join("sqlite")
        );
    }

    #[tokio::test]
    async fn test_new_ignores_corrupted_session() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("session"), "not json")
            .await
            .unwrap();

        let matrix_session = MatrixSession::new(temp_dir.path()).await;

        assert!(matrix_session.get_user_session().is_none());
    }

    #[tokio::test]
    async fn test_persist_and_restore() {
        let temp_dir = TempDir::new().unwrap();
        let matrix_session = MatrixSession::new(temp_dir.path()).await;

        matrix_session
            .persist_user_session(&create_user_session())
            .await
            .unwrap();
        matrix_session
            .persist_sync_token("s42_token".to_string())
            .await
            .unwrap();

        let restored = MatrixSession::new(temp_dir.path()).await;
        assert_eq!(
            restored.get_user_session().unwrap().meta.user_id.to_string(),
            "@nina:example.com"
        );
        assert_eq!(restored.get_sync_token(), Some("s42_token".to_string()));
    }

    #[tokio::test]
    async fn test_persist_user_session_drops_sync_token() {
        let temp_dir = TempDir::new().unwrap();
        let matrix_session = MatrixSession::new(temp_dir.path()).await;
        matrix_session
            .persist_user_session(&create_user_session())
            .await
            .unwrap();
        matrix_session
            .persist_sync_token("old".to_string())
            .await
            .unwrap();

        matrix_session
            .persist_user_session(&create_user_session())
            .await
            .unwrap();

        assert!(
            MatrixSession::new(temp_dir.path())
                .await
                .get_sync_token()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_sync_token_without_user_session() {
        let temp_dir = TempDir::new().unwrap();
        let matrix_session = MatrixSession::new(temp_dir.path()).await;

        matrix_session
            .persist_sync_token("token".to_string())
            .await
            .unwrap();

        assert!(
            MatrixSession::new(temp_dir.path())
                .await
                .get_user_session()
                .is_none()
        );
    }
}
