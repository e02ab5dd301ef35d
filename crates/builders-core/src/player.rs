//! Players and their per-game state.
//!
//! This module contains:
//! - `Player`, the identity plus its input collaborator
//! - `PlayerState` with accidents, hand, crew and hotel
//! - `Hotel`, the structure each player is racing to finish

use crate::accident::Accident;
use crate::interfacer::UserInterfacer;
use crate::playable::{Playable, Worker};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Index of a player, assigned when the board is set up
pub type PlayerId = u8;

/// Someone sitting at the table.
#[derive(Clone)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    interfacer: Arc<dyn UserInterfacer>,
}

impl Player {
    pub fn new(id: PlayerId, name: impl Into<String>, interfacer: Arc<dyn UserInterfacer>) -> Self {
        Self {
            id,
            name: name.into(),
            interfacer,
        }
    }

    pub fn interfacer(&self) -> &Arc<dyn UserInterfacer> {
        &self.interfacer
    }

    /// Fire-and-forget message to this player
    pub fn show(&self, message: &str) {
        self.interfacer.send(message);
    }
}

impl fmt::Debug for Player {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Player")
            .field("id", &self.id)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl PartialEq for Player {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Player {}

/// A player's hotel.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Hotel {
    pub floors: u32,
    /// Work banked towards the next floor
    pub work: f64,
}

impl Hotel {
    pub fn add_floor(&mut self) {
        self.floors += 1;
    }

    /// Bank some work, completing floors as thresholds are crossed.
    ///
    /// Returns how many floors were completed.
    pub fn add_work(&mut self, amount: f64, work_per_floor: f64) -> u32 {
        assert!(work_per_floor > 0.0, "work per floor must be positive");
        self.work += amount;

        let mut completed = 0;
        while self.work >= work_per_floor {
            self.work -= work_per_floor;
            self.floors += 1;
            completed += 1;
        }
        completed
    }
}

/// Everything the board tracks for a single player.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlayerState {
    /// Accidents afflicting this player, oldest first
    pub accidents: Vec<Accident>,
    /// Cards this player can choose from
    pub hand: Vec<Playable>,
    /// Workers on this player's site
    pub crew: Vec<Worker>,
    pub hotel: Hotel,
}

impl PlayerState {
    pub fn active_accidents(&self) -> impl Iterator<Item = &Accident> {
        self.accidents.iter().filter(|a| a.is_active())
    }

    /// The active accident keeping this playable out of play, if any
    pub fn suppressing_accident(&self, playable: &Playable) -> Option<&Accident> {
        self.accidents.iter().find(|a| a.suppresses(playable))
    }

    pub fn is_suppressed(&self, playable: &Playable) -> bool {
        self.suppressing_accident(playable).is_some()
    }

    /// Workers not currently affected by an active accident
    pub fn working_crew(&self) -> impl Iterator<Item = &Worker> {
        self.crew.iter().filter(|worker| {
            !self
                .active_accidents()
                .any(|accident| accident.affects_worker(worker))
        })
    }

    /// Work the crew puts into the hotel in one turn
    pub fn crew_output(&self) -> f64 {
        self.working_crew().map(|w| w.skill_level).sum()
    }

    /// Take one turn off every active accident. Returns how many decayed.
    pub(crate) fn decay_accidents(&mut self) -> usize {
        let mut decayed = 0;
        for accident in self.accidents.iter_mut().filter(|a| a.is_active()) {
            accident.decay();
            decayed += 1;
        }
        decayed
    }

    /// Drop accidents that have run out
    pub(crate) fn prune_inert(&mut self) {
        self.accidents.retain(Accident::is_active);
    }
}
