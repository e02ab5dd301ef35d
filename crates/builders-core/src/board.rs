//! The playing area: owns everything about a single game.
//!
//! A `BuildersBoard` moves through `Created → Configured → Running` and ends
//! either `Over` (someone finished their hotel) or `Stopped` (the game died).
//! Once started, the board is moved into a [`TurnScheduler`] that runs on its
//! own tokio task, so every mutation of game state happens on that one task.

use crate::accident::Accident;
use crate::config::GameConfig;
use crate::error::{DeathCause, TurnError};
use crate::events::GameEvent;
use crate::playable::Playable;
use crate::player::{Player, PlayerId, PlayerState};
use crate::rules::{BuildersRules, Play};
use crate::scheduler::{GameOutcome, TurnScheduler};
use rand::rngs::StdRng;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{info, warn};
use uuid::Uuid;

/// Capacity of the event channel before slow subscribers start lagging
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Where a board is in its life.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Created,
    Configured,
    Running,
    Over,
    Stopped,
}

/// The context for an entire game.
pub struct BuildersBoard {
    id: Uuid,
    config: GameConfig,
    rules: BuildersRules,
    /// Turn order. The active player is always first.
    players: Vec<Player>,
    states: HashMap<PlayerId, PlayerState>,
    rng: StdRng,
    lifecycle: Lifecycle,
    /// Successful turns so far
    turn_number: u32,
    events: broadcast::Sender<GameEvent>,
    stop_tx: Arc<watch::Sender<bool>>,
    stop_rx: watch::Receiver<bool>,
}

impl BuildersBoard {
    pub fn new(config: GameConfig) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let (stop_tx, stop_rx) = watch::channel(false);

        Self {
            id: Uuid::new_v4(),
            rules: BuildersRules::new(&config),
            rng: config.rng(),
            config,
            players: Vec::new(),
            states: HashMap::new(),
            lifecycle: Lifecycle::Created,
            turn_number: 0,
            events,
            stop_tx: Arc::new(stop_tx),
            stop_rx,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn rules(&self) -> &BuildersRules {
        &self.rules
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    pub fn turn_number(&self) -> u32 {
        self.turn_number
    }

    /// Players in turn order
    pub fn players(&self) -> &[Player] {
        &self.players
    }

    /// The player who is currently making moves
    pub fn active_player(&self) -> &Player {
        &self.players[0]
    }

    pub fn player(&self, id: PlayerId) -> Option<&Player> {
        self.players.iter().find(|p| p.id == id)
    }

    pub fn state(&self, id: PlayerId) -> Option<&PlayerState> {
        self.states.get(&id)
    }

    /// Mutable access for tests and custom setups.
    ///
    /// During a running game only the scheduler writes player state.
    pub fn state_mut(&mut self, id: PlayerId) -> Option<&mut PlayerState> {
        self.states.get_mut(&id)
    }

    pub fn states(&self) -> impl Iterator<Item = (&PlayerId, &PlayerState)> {
        self.states.iter()
    }

    /// Subscribe to game events. Subscribe before starting to see every event.
    pub fn subscribe(&self) -> broadcast::Receiver<GameEvent> {
        self.events.subscribe()
    }

    /// A handle that can stop this game from outside its task
    pub fn stopper(&self) -> GameStopper {
        GameStopper {
            game_id: self.id,
            tx: Arc::clone(&self.stop_tx),
        }
    }

    /// Sets up this game with players.
    ///
    /// Panics with fewer than two players or if players were already set.
    pub fn setup_players(&mut self, players: Vec<Player>) {
        assert!(players.len() >= 2, "You need more players for this game!");
        assert_eq!(
            self.lifecycle,
            Lifecycle::Created,
            "players can only be set up once"
        );
        for (i, player) in players.iter().enumerate() {
            assert!(
                players[..i].iter().all(|p| p.id != player.id),
                "duplicate player id {}",
                player.id
            );
        }

        self.players = players;
        self.lifecycle = Lifecycle::Configured;
    }

    /// Deal the game and hand it to a scheduler without spawning it.
    ///
    /// Panics unless players have been set up and the config is playable.
    pub fn into_scheduler(mut self) -> TurnScheduler {
        assert_eq!(
            self.lifecycle,
            Lifecycle::Configured,
            "board must be configured with players before starting"
        );
        if let Err(e) = self.config.validate() {
            panic!("unplayable game config: {}", e);
        }

        let rules = self.rules;
        rules.setup_game(&mut self);
        self.lifecycle = Lifecycle::Running;

        info!(game_id = %self.id, players = self.players.len(), "Game starting");
        self.publish(GameEvent::GameStarted {
            game_id: self.id,
            turn_order: self.players.iter().map(|p| p.id).collect(),
        });

        TurnScheduler::new(self)
    }

    /// Starts this game on the current tokio runtime.
    pub fn start_game(self) -> GameHandle {
        let stopper = self.stopper();
        let scheduler = self.into_scheduler();
        let task = tokio::spawn(scheduler.run());

        GameHandle { stopper, task }
    }

    /// Fail every pending input wait; the scheduler dies on its next step
    pub fn stop_game(&self) {
        self.stopper().stop_game();
    }

    pub(crate) fn publish(&self, event: GameEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }

    pub(crate) fn set_lifecycle(&mut self, lifecycle: Lifecycle) {
        self.lifecycle = lifecycle;
    }

    /// Give every player a fresh state and a dealt hand
    pub(crate) fn deal(&mut self, hand_size: usize) {
        for player in &self.players {
            let hand = (0..hand_size)
                .map(|_| Playable::random(&mut self.rng))
                .collect();
            self.states.insert(
                player.id,
                PlayerState {
                    hand,
                    ..PlayerState::default()
                },
            );
        }
    }

    /// Show a dialog to a player and wait for them, or for the game to stop.
    pub(crate) async fn request_input(
        &self,
        player: &Player,
        dialog: &str,
    ) -> Result<String, TurnError> {
        let mut stop_rx = self.stop_rx.clone();

        tokio::select! {
            biased;
            _ = stop_requested(&mut stop_rx) => Err(TurnError::GameDeath(DeathCause::Stopped)),
            response = player.interfacer().request_input(dialog) => Ok(response?),
        }
    }

    /// Write a validated play back into the board.
    pub(crate) fn apply_play(&mut self, player_id: PlayerId, play: Play) -> Result<(), TurnError> {
        let victim = self.players.get(1).map(|p| p.id);
        let work_per_floor = self.config.work_per_floor;
        let replacement = Playable::random(&mut self.rng);

        let state = self
            .states
            .get_mut(&player_id)
            .ok_or_else(|| missing_state(player_id))?;
        if play.hand_index >= state.hand.len() {
            return Err(TurnError::Protocol(format!(
                "validated play index {} outside hand of {}",
                play.hand_index,
                state.hand.len()
            )));
        }
        state.hand[play.hand_index] = replacement;

        let floors_before = state.hotel.floors;
        let mut struck = None;
        match &play.card {
            Playable::Worker(worker) => state.crew.push(*worker),
            Playable::Accident(kind) => struck = Some(*kind),
            Playable::Floor => state.hotel.add_floor(),
        }

        let output = state.crew_output();
        state.hotel.add_work(output, work_per_floor);
        state.prune_inert();
        let floors_after = state.hotel.floors;

        self.publish(GameEvent::CardPlayed {
            player: player_id,
            card: play.card,
        });

        if let Some(kind) = struck {
            match victim {
                Some(victim) => {
                    self.states
                        .get_mut(&victim)
                        .ok_or_else(|| missing_state(victim))?
                        .accidents
                        .push(Accident::new(kind));
                    self.publish(GameEvent::AccidentStruck {
                        by: player_id,
                        victim,
                        accident: kind,
                    });
                }
                None => warn!(player = player_id, "Accident played with nobody to hit"),
            }
        }

        if floors_after > floors_before {
            self.publish(GameEvent::FloorsCompleted {
                player: player_id,
                added: floors_after - floors_before,
                total: floors_after,
            });
        }

        self.turn_number += 1;
        Ok(())
    }

    /// Move the active player to the back of the turn order.
    ///
    /// Returns the new active player.
    pub(crate) fn rotate(&mut self) -> PlayerId {
        self.players.rotate_left(1);
        self.players[0].id
    }

    /// Burn a turn off every active accident of a player.
    ///
    /// Returns the remaining turns of each of their accidents.
    pub(crate) fn decay_accidents(&mut self, player_id: PlayerId) -> Result<Vec<u32>, TurnError> {
        let state = self
            .states
            .get_mut(&player_id)
            .ok_or_else(|| missing_state(player_id))?;
        state.decay_accidents();
        Ok(state.accidents.iter().map(Accident::turns_remaining).collect())
    }
}

pub(crate) fn missing_state(player_id: PlayerId) -> TurnError {
    TurnError::Protocol(format!("no state for player {}", player_id))
}

/// Resolves once a stop has been requested. Never resolves if nothing can
/// request one any more.
async fn stop_requested(stop_rx: &mut watch::Receiver<bool>) {
    let signalled = stop_rx.wait_for(|stopped| *stopped).await.is_ok();
    if !signalled {
        std::future::pending::<()>().await;
    }
}

/// Cloneable, non-owning handle used to stop a game from outside its task.
#[derive(Debug, Clone)]
pub struct GameStopper {
    game_id: Uuid,
    tx: Arc<watch::Sender<bool>>,
}

impl GameStopper {
    pub fn game_id(&self) -> Uuid {
        self.game_id
    }

    /// Halts the game. Safe to call any number of times.
    pub fn stop_game(&self) {
        let already_stopped = self.tx.send_replace(true);
        if !already_stopped {
            info!(game_id = %self.game_id, "Stopping game");
        }
    }

    pub fn is_stopped(&self) -> bool {
        *self.tx.borrow()
    }
}

/// A game running on its own task.
#[derive(Debug)]
pub struct GameHandle {
    stopper: GameStopper,
    task: JoinHandle<GameOutcome>,
}

impl GameHandle {
    pub fn game_id(&self) -> Uuid {
        self.stopper.game_id
    }

    pub fn stopper(&self) -> GameStopper {
        self.stopper.clone()
    }

    pub fn stop_game(&self) {
        self.stopper.stop_game();
    }

    /// Wait for the game to finish.
    ///
    /// A panic inside the game (a broken invariant) is resumed here.
    pub async fn outcome(self) -> GameOutcome {
        match self.task.await {
            Ok(outcome) => outcome,
            Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
            Err(_) => GameOutcome::Dead {
                cause: DeathCause::Stopped,
            },
        }
    }
}
