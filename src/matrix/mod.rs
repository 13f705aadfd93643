//! Matrix protocol integration for the bot.
//!
//! Every Matrix room the bot is invited to is a subscriber: commands are read from
//! the room and warnings are posted back to it.
//!
//! # Architecture
//!
//! The module is structured around the [`MatrixClient`] which coordinates:
//! - **Encryption**: login, cross-signing and secret recovery via the encryption submodule
//! - **Session**: persisted tokens and sync position via the session submodule
//! - **Sync**: room invitations and incoming messages via the sync submodule
//!
//! # Examples
//!
//! ```no_run
//! # async fn example() -> anyhow::Result<()> {
//! let credentials = UserCredentials {
//!     user_id: "@nina:example.com".to_string(),
//!     password: "password".to_string(),
//!     passphrase: "recovery_phrase".to_string(),
//! };
//!
//! let client = MatrixClient::new(&credentials, Path::new("./data/session")).await?;
//! # Ok(())
//! # }
//! ```

mod client;
mod encryption;
mod session;
mod sync;

pub use crate::matrix::client::MatrixClient;

/// User credentials for a Matrix account
#[derive(Debug, Clone)]
pub struct UserCredentials {
    /// User ID of the matrix account
    pub user_id: String,
    /// Password of the matrix account
    pub password: String,
    /// Passphrase to recover the matrix account secrets
    pub passphrase: String,
}
