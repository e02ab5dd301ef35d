//! The closed set of ways a turn can fail.

use crate::accident::AccidentType;
use crate::interfacer::InputError;
use crate::playable::Playable;
use crate::player::PlayerId;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A failed turn, as seen by the scheduler.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TurnError {
    /// Recoverable: the player retries and their accidents decay
    #[error("bad play: {0}")]
    BadPlay(#[from] BadPlay),

    /// Unrecoverable for this game
    #[error("game death: {0}")]
    GameDeath(DeathCause),

    /// Something outside the taxonomy; always a bug
    #[error("protocol violation: {0}")]
    Protocol(String),
}

impl From<InputError> for TurnError {
    fn from(err: InputError) -> Self {
        match err {
            InputError::ChannelClosed => TurnError::GameDeath(DeathCause::Disconnected),
            InputError::AlreadyPending => TurnError::Protocol(err.to_string()),
        }
    }
}

/// A rule-violating or malformed response.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
pub enum BadPlay {
    #[error("could not read a card number from {0:?}")]
    Unparseable(String),

    #[error("card {index} does not exist, hand has {hand_size} cards")]
    OutOfRange { index: usize, hand_size: usize },

    #[error("{card} is out of play due to a {accident}")]
    Suppressed {
        card: Playable,
        accident: AccidentType,
    },

    #[error("player {player} cannot play {card}")]
    Illegal { player: PlayerId, card: Playable },
}

/// Why a game died.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Error)]
pub enum DeathCause {
    #[error("a player disconnected")]
    Disconnected,

    #[error("the game was stopped")]
    Stopped,
}
