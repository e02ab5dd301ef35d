//! The Builders - turn-execution core for a multiplayer hotel-building card game
//!
//! This crate provides the core game logic, including:
//! - Workers, accidents and the other playable cards
//! - Per-player state: hand, crew, hotel and active accidents
//! - The rules deciding what a turn looks like and when the game is over
//! - An async turn scheduler that recovers from bad plays and stops cleanly
//!
//! # Architecture
//!
//! The core never talks to a transport directly. Each player carries a
//! [`UserInterfacer`] that the scheduler awaits once per turn. A started game
//! runs on its own tokio task and owns all of its state.
//!
//! # Modules
//!
//! - [`accident`]: timed effects that take pieces out of play
//! - [`playable`]: workers, skills and cards
//! - [`player`]: players and per-player state
//! - [`rules`]: turn execution and game-over detection
//! - [`scheduler`]: the turn loop
//! - [`board`]: game context and lifecycle

pub mod accident;
pub mod board;
pub mod config;
pub mod error;
pub mod events;
pub mod interfacer;
pub mod playable;
pub mod player;
pub mod rules;
pub mod scheduler;

// Re-export commonly used types
pub use accident::{Accident, AccidentType};
pub use board::{BuildersBoard, GameHandle, GameStopper, Lifecycle};
pub use config::{ConfigError, GameConfig};
pub use error::{BadPlay, DeathCause, TurnError};
pub use events::GameEvent;
pub use interfacer::{InputError, UserInterfacer};
pub use playable::{PlayType, Playable, SkillType, Worker};
pub use player::{Hotel, Player, PlayerId, PlayerState};
pub use rules::{BuildersRules, Play};
pub use scheduler::{GameOutcome, SchedulerState, TurnScheduler};
