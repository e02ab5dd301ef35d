//! Playable pieces and cards.
//!
//! This module contains:
//! - `SkillType` for the trades a worker can have
//! - `Worker`, the piece that actually builds the hotel
//! - `Playable`, the closed set of things a player can hold and play

use crate::accident::AccidentType;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The trade of a worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SkillType {
    /// Bends metal and stuff
    MetalWorker,
    /// Installs wiring and lights
    Electrician,
    /// Makes things pretty
    Painter,
    /// Makes other workers more productive
    Foreman,
}

impl SkillType {
    /// All skills, in catalog order
    pub const ALL: [SkillType; 4] = [
        SkillType::MetalWorker,
        SkillType::Electrician,
        SkillType::Painter,
        SkillType::Foreman,
    ];

    /// Pick a skill uniformly at random
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self::ALL[rng.gen_range(0..Self::ALL.len())]
    }
}

impl fmt::Display for SkillType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SkillType::MetalWorker => "metal worker",
            SkillType::Electrician => "electrician",
            SkillType::Painter => "painter",
            SkillType::Foreman => "foreman",
        };
        f.write_str(name)
    }
}

/// Someone who labors. These guys build stuff.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Worker {
    pub skill: SkillType,
    /// How much work this worker puts into the hotel each turn
    pub skill_level: f64,
}

impl Worker {
    /// Default productivity of a freshly hired worker
    pub const BASE_SKILL_LEVEL: f64 = 1.0;

    pub fn new(skill: SkillType) -> Self {
        Self {
            skill,
            skill_level: Self::BASE_SKILL_LEVEL,
        }
    }

    /// Hire a worker with a random skill
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self::new(SkillType::random(rng))
    }
}

/// Tag describing what kind of thing a playable is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlayType {
    Worker,
    Accident,
    Floor,
}

/// Anything a player can hold in hand and play.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Playable {
    /// Joins the player's crew
    Worker(Worker),
    /// Hits the next player with an accident
    Accident(AccidentType),
    /// A prefabricated floor, added straight onto the hotel
    Floor,
}

impl Playable {
    pub fn play_type(&self) -> PlayType {
        match self {
            Playable::Worker(_) => PlayType::Worker,
            Playable::Accident(_) => PlayType::Accident,
            Playable::Floor => PlayType::Floor,
        }
    }

    /// Draw a random card.
    ///
    /// Workers make up half the deck, accidents and floors a quarter each.
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        match rng.gen_range(0..4) {
            0 | 1 => Playable::Worker(Worker::random(rng)),
            2 => Playable::Accident(AccidentType::random(rng)),
            _ => Playable::Floor,
        }
    }
}

impl fmt::Display for Playable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Playable::Worker(worker) => {
                write!(f, "Worker: {} (skill {:.1})", worker.skill, worker.skill_level)
            }
            Playable::Accident(kind) => write!(f, "Accident: {}", kind),
            Playable::Floor => f.write_str("Prefab floor"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_play_types() {
        assert_eq!(
            Playable::Worker(Worker::new(SkillType::Painter)).play_type(),
            PlayType::Worker
        );
        assert_eq!(
            Playable::Accident(AccidentType::Strike(SkillType::Foreman)).play_type(),
            PlayType::Accident
        );
        assert_eq!(Playable::Floor.play_type(), PlayType::Floor);
    }

    #[test]
    fn test_random_skill_is_seeded() {
        let mut a = StdRng::seed_from_u64(7);
        let mut b = StdRng::seed_from_u64(7);
        let first: Vec<SkillType> = (0..16).map(|_| SkillType::random(&mut a)).collect();
        let second: Vec<SkillType> = (0..16).map(|_| SkillType::random(&mut b)).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_random_draw_covers_every_play_type() {
        let mut rng = StdRng::seed_from_u64(42);
        let mut seen = std::collections::HashSet::new();
        for _ in 0..200 {
            seen.insert(Playable::random(&mut rng).play_type());
        }
        assert_eq!(seen.len(), 3);
    }

    #[test]
    fn test_new_worker_has_base_skill() {
        let worker = Worker::new(SkillType::Electrician);
        assert_eq!(worker.skill_level, Worker::BASE_SKILL_LEVEL);
    }
}
