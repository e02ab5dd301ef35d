//! Asynchronous abstraction for talking to the person behind a player.
//!
//! The board never knows what transport sits behind a player. Servers plug in
//! an implementation backed by a socket; tests plug in scripted answers.

use async_trait::async_trait;
use thiserror::Error;

/// Why an input request could not be answered.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputError {
    /// The player's channel is gone, e.g. the socket closed
    #[error("input channel closed")]
    ChannelClosed,

    /// A second request was made while one is still outstanding
    #[error("an input request is already pending")]
    AlreadyPending,
}

/// Trait for sending messages to a player and asking them for input.
#[async_trait]
pub trait UserInterfacer: Send + Sync {
    /// Send a message. No response is expected.
    fn send(&self, message: &str);

    /// Show `dialog` and wait for the player's answer.
    ///
    /// Resolves at most once per call. Implementations must report
    /// [`InputError::AlreadyPending`] rather than replace an outstanding
    /// request.
    async fn request_input(&self, dialog: &str) -> Result<String, InputError>;
}
