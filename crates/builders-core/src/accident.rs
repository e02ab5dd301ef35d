//! Accidents: timed effects that take pieces out of play.
//!
//! An accident is played by one player onto the next player in turn order.
//! While it is active it suppresses every playable it affects, both in the
//! victim's hand and in their crew. Its counter only ever goes down, and only
//! when the victim makes a bad play.

use crate::playable::{Playable, SkillType, Worker};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The different accidents that can happen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AccidentType {
    /// All workers of a skill walk off the job
    Strike(SkillType),
}

impl AccidentType {
    /// Number of accident variants in the catalog
    pub const CATALOG_SIZE: usize = 1;

    /// Turns an accident of this type stays active
    pub fn turns_active(&self) -> u32 {
        match self {
            AccidentType::Strike(_) => 3,
        }
    }

    /// Pick an accident uniformly from the catalog, then uniformly from its
    /// sub-categories.
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        match rng.gen_range(0..Self::CATALOG_SIZE) {
            0 => AccidentType::Strike(SkillType::random(rng)),
            n => unreachable!("accident catalog index {n} out of range"),
        }
    }
}

impl fmt::Display for AccidentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccidentType::Strike(skill) => write!(f, "{} strike", skill),
        }
    }
}

/// An accident afflicting a player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Accident {
    pub kind: AccidentType,
    turns_remaining: u32,
}

impl Accident {
    /// A fresh accident running for the full duration of its type
    pub fn new(kind: AccidentType) -> Self {
        Self {
            kind,
            turns_remaining: kind.turns_active(),
        }
    }

    pub fn turns_remaining(&self) -> u32 {
        self.turns_remaining
    }

    pub fn is_active(&self) -> bool {
        self.turns_remaining > 0
    }

    /// Burn one turn off the counter. Inert accidents stay at zero.
    pub(crate) fn decay(&mut self) {
        self.turns_remaining = self.turns_remaining.saturating_sub(1);
    }

    /// Whether this accident's target matches the playable, regardless of
    /// whether it is still active.
    pub fn affects(&self, playable: &Playable) -> bool {
        match (self.kind, playable) {
            (AccidentType::Strike(_), Playable::Worker(worker)) => self.affects_worker(worker),
            (AccidentType::Strike(_), Playable::Accident(_)) => false,
            (AccidentType::Strike(_), Playable::Floor) => false,
        }
    }

    pub fn affects_worker(&self, worker: &Worker) -> bool {
        match self.kind {
            AccidentType::Strike(skill) => worker.skill == skill,
        }
    }

    /// Active and targeting the playable
    pub fn suppresses(&self, playable: &Playable) -> bool {
        self.is_active() && self.affects(playable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn metal_worker() -> Playable {
        Playable::Worker(Worker::new(SkillType::MetalWorker))
    }

    #[test]
    fn test_strike_lasts_three_turns() {
        let accident = Accident::new(AccidentType::Strike(SkillType::MetalWorker));
        assert_eq!(accident.turns_remaining(), 3);
        assert!(accident.is_active());
    }

    #[test]
    fn test_strike_only_affects_matching_workers() {
        let accident = Accident::new(AccidentType::Strike(SkillType::MetalWorker));

        assert!(accident.affects(&metal_worker()));
        assert!(!accident.affects(&Playable::Worker(Worker::new(SkillType::Painter))));
        assert!(!accident.affects(&Playable::Floor));
        assert!(!accident.affects(&Playable::Accident(AccidentType::Strike(
            SkillType::MetalWorker
        ))));
    }

    #[test]
    fn test_decay_floors_at_zero() {
        let mut accident = Accident::new(AccidentType::Strike(SkillType::Foreman));
        for _ in 0..5 {
            accident.decay();
        }
        assert_eq!(accident.turns_remaining(), 0);
        assert!(!accident.is_active());
    }

    #[test]
    fn test_inert_accident_no_longer_suppresses() {
        let mut accident = Accident::new(AccidentType::Strike(SkillType::MetalWorker));
        assert!(accident.suppresses(&metal_worker()));

        for _ in 0..3 {
            accident.decay();
        }

        assert!(accident.affects(&metal_worker()));
        assert!(!accident.suppresses(&metal_worker()));
    }

    #[test]
    fn test_random_accident_is_deterministic_for_seed() {
        let mut a = StdRng::seed_from_u64(1234);
        let mut b = StdRng::seed_from_u64(1234);
        for _ in 0..10 {
            assert_eq!(AccidentType::random(&mut a), AccidentType::random(&mut b));
        }
    }

    #[test]
    fn test_random_accident_picks_every_skill_eventually() {
        let mut rng = StdRng::seed_from_u64(99);
        let mut skills = std::collections::HashSet::new();
        for _ in 0..100 {
            let AccidentType::Strike(skill) = AccidentType::random(&mut rng);
            skills.insert(skill);
        }
        assert_eq!(skills.len(), SkillType::ALL.len());
    }
}
