//! Events published while a game runs.
//!
//! The scheduler publishes every state change on a broadcast channel so
//! transports and tests can follow a game without touching its state.

use crate::accident::AccidentType;
use crate::error::{BadPlay, DeathCause};
use crate::playable::Playable;
use crate::player::PlayerId;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Events that occur as a game is played
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum GameEvent {
    /// Hands were dealt and the first turn is about to begin
    GameStarted {
        game_id: Uuid,
        turn_order: Vec<PlayerId>,
    },

    /// A card was played successfully
    CardPlayed { player: PlayerId, card: Playable },

    /// An accident landed on a player
    AccidentStruck {
        by: PlayerId,
        victim: PlayerId,
        accident: AccidentType,
    },

    /// A hotel grew
    FloorsCompleted {
        player: PlayerId,
        added: u32,
        total: u32,
    },

    /// Turn passed on after a successful play
    TurnRotated {
        player: PlayerId,
        next_player: PlayerId,
    },

    /// A player's response was rejected; they go again
    BadPlay { player: PlayerId, reason: BadPlay },

    /// A bad play burned a turn off the player's accidents
    AccidentsDecayed {
        player: PlayerId,
        /// Remaining turns of each of the player's accidents, oldest first
        remaining: Vec<u32>,
    },

    /// A hotel was finished
    GameOver { winner: PlayerId, floors: u32 },

    /// The game was torn down before anyone won
    GameDied { cause: DeathCause },
}
