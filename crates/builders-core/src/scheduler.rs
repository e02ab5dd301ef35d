//! The turn loop.
//!
//! Each step asks the rules to run one turn for the active player, awaits it,
//! and reacts to the result:
//!
//! | result           | reaction                                              |
//! |------------------|-------------------------------------------------------|
//! | game is over     | notify everyone, `GameOver`                           |
//! | `Ok(play)`       | apply the play, rotate the active player to the back  |
//! | `BadPlay`        | decay the player's accidents, same player goes again  |
//! | `GameDeath`      | `Dead`, nothing else changes                          |
//! | `Protocol`       | panic, this is a bug                                  |

use crate::board::{BuildersBoard, Lifecycle};
use crate::error::{DeathCause, TurnError};
use crate::events::GameEvent;
use crate::player::PlayerId;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Where the scheduler is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Running,
    GameOver,
    Dead,
}

/// How a game ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameOutcome {
    Over { winner: PlayerId, turns: u32 },
    Dead { cause: DeathCause },
}

/// Drives a started board one turn at a time.
pub struct TurnScheduler {
    board: BuildersBoard,
    state: SchedulerState,
    outcome: Option<GameOutcome>,
}

impl TurnScheduler {
    pub(crate) fn new(board: BuildersBoard) -> Self {
        Self {
            board,
            state: SchedulerState::Running,
            outcome: None,
        }
    }

    pub fn board(&self) -> &BuildersBoard {
        &self.board
    }

    /// Mutable access to the board between steps, for custom scenarios
    pub fn board_mut(&mut self) -> &mut BuildersBoard {
        &mut self.board
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    pub fn outcome(&self) -> Option<GameOutcome> {
        self.outcome
    }

    /// Run turns until the game is over or dead.
    pub async fn run(mut self) -> GameOutcome {
        loop {
            if let Some(outcome) = self.outcome {
                return outcome;
            }
            self.step().await;
        }
    }

    /// Advance the state machine by one transition.
    pub async fn step(&mut self) -> SchedulerState {
        if self.state != SchedulerState::Running {
            return self.state;
        }

        let rules = *self.board.rules();
        if let Some(winner) = rules.winner(&self.board) {
            self.finish_game(winner);
            return self.state;
        }

        let player = self.board.active_player().clone();
        let result = rules
            .execute_turn(&self.board, &player)
            .await
            .and_then(|play| self.board.apply_play(player.id, play));

        match result {
            Ok(()) => {
                let next_player = self.board.rotate();
                debug!(
                    player = player.id,
                    next_player,
                    turn = self.board.turn_number(),
                    "Turn complete"
                );
                self.board.publish(GameEvent::TurnRotated {
                    player: player.id,
                    next_player,
                });
            }
            Err(TurnError::BadPlay(reason)) => {
                info!(player = player.id, %reason, "Bad play");
                self.board.publish(GameEvent::BadPlay {
                    player: player.id,
                    reason,
                });

                // This wasn't a valid turn, burn a turn off the player's accidents
                match self.board.decay_accidents(player.id) {
                    Ok(remaining) => self.board.publish(GameEvent::AccidentsDecayed {
                        player: player.id,
                        remaining,
                    }),
                    Err(e) => panic!("unrecoverable turn failure for player {}: {}", player.id, e),
                }
            }
            Err(TurnError::GameDeath(cause)) => self.die(cause),
            Err(e @ TurnError::Protocol(_)) => {
                panic!("unrecoverable turn failure for player {}: {}", player.id, e)
            }
        }

        self.state
    }

    fn finish_game(&mut self, winner: PlayerId) {
        let floors = self
            .board
            .state(winner)
            .map(|s| s.hotel.floors)
            .unwrap_or_default();
        let winner_name = self
            .board
            .player(winner)
            .map(|p| p.name.clone())
            .unwrap_or_default();

        let message = format!(
            "Game over! {} finished a {}-floor hotel.",
            winner_name, floors
        );
        for player in self.board.players() {
            player.show(&message);
        }

        info!(game_id = %self.board.id(), winner, turns = self.board.turn_number(), "Game over");
        self.board.publish(GameEvent::GameOver { winner, floors });
        self.board.set_lifecycle(Lifecycle::Over);
        self.state = SchedulerState::GameOver;
        self.outcome = Some(GameOutcome::Over {
            winner,
            turns: self.board.turn_number(),
        });
    }

    fn die(&mut self, cause: DeathCause) {
        info!(game_id = %self.board.id(), %cause, "Game is dying");
        self.board.publish(GameEvent::GameDied { cause });
        self.board.set_lifecycle(Lifecycle::Stopped);
        self.state = SchedulerState::Dead;
        self.outcome = Some(GameOutcome::Dead { cause });
    }
}
