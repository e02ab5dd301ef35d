//! Per-game configuration.

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why a config can't be used.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid config JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("hand_size must be at least 1")]
    EmptyHand,

    #[error("floors_to_win must be at least 1")]
    NoFloorsToWin,

    #[error("work_per_floor must be positive, got {0}")]
    NonPositiveWork(f64),
}

/// Tunables for a single game.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Seed for the game's random source. `None` seeds from entropy.
    pub seed: Option<u64>,
    /// Cards each player holds
    pub hand_size: usize,
    /// Floors a hotel needs to win the game
    pub floors_to_win: u32,
    /// Crew work that completes one floor
    pub work_per_floor: f64,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            seed: None,
            hand_size: 5,
            floors_to_win: 5,
            work_per_floor: 3.0,
        }
    }
}

impl GameConfig {
    /// Parse and validate a config from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings no game can be played with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.hand_size == 0 {
            return Err(ConfigError::EmptyHand);
        }
        if self.floors_to_win == 0 {
            return Err(ConfigError::NoFloorsToWin);
        }
        // Also catches NaN
        if !(self.work_per_floor > 0.0) {
            return Err(ConfigError::NonPositiveWork(self.work_per_floor));
        }
        Ok(())
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Build the single random source a game draws from
    pub fn rng(&self) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }
}
