use mockall::automock;

use crate::errors::SendError;

/// Trait for delivering text messages to a subscriber.
///
/// Implemented by [`crate::matrix::MatrixClient`], where the recipient is a room id.
#[automock]
pub trait Messenger {
    /// Sends `body` (Markdown) to `recipient`.
    async fn send(&self, recipient: &str, body: &str) -> Result<(), SendError>;
}
