//! Game room management.

use builders_core::{
    BuildersBoard, GameConfig, GameEvent, GameHandle, GameOutcome, GameStopper, Player, PlayerId,
};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{broadcast, mpsc};
use uuid::Uuid;

use crate::interfacer::SocketInterfacer;
use crate::protocol::{PlayerInfo, RoomInfo, RoomStatus, ServerMessage};

#[derive(Debug, Error)]
pub enum RoomError {
    #[error("Room is full")]
    RoomFull,

    #[error("Player not in room")]
    PlayerNotInRoom,

    #[error("Not the host")]
    NotHost,

    #[error("Game already started")]
    GameAlreadyStarted,

    #[error("Not enough players")]
    NotEnoughPlayers,

    #[error("Game not started")]
    GameNotStarted,

    #[error("Not your turn")]
    NotYourTurn,
}

/// A player in a game room.
pub struct RoomPlayer {
    pub id: Uuid,
    pub name: String,
    pub connected: bool,
    /// Index in the game, assigned when the game starts
    pub game_index: Option<PlayerId>,
    pub interfacer: Arc<SocketInterfacer>,
}

impl RoomPlayer {
    pub fn new(id: Uuid, name: String, outgoing: mpsc::UnboundedSender<ServerMessage>) -> Self {
        Self {
            id,
            name,
            connected: true,
            game_index: None,
            interfacer: Arc::new(SocketInterfacer::new(id, outgoing)),
        }
    }

    pub fn to_info(&self) -> PlayerInfo {
        PlayerInfo {
            id: self.id,
            name: self.name.clone(),
            connected: self.connected,
        }
    }
}

/// A started game: the handle to await it and its event stream.
pub struct StartedGame {
    pub handle: GameHandle,
    pub events: broadcast::Receiver<GameEvent>,
}

/// A game room that can hold multiple players.
pub struct GameRoom {
    pub id: Uuid,
    pub name: String,
    pub max_players: u8,
    pub host_id: Uuid,
    pub status: RoomStatus,
    pub players: HashMap<Uuid, RoomPlayer>,
    /// Order of players for turn taking
    pub player_order: Vec<Uuid>,
    /// Stops the running game, once started
    pub game: Option<GameStopper>,
    /// How the last game ended
    pub outcome: Option<GameOutcome>,
}

impl GameRoom {
    pub fn new(
        id: Uuid,
        host_id: Uuid,
        host_name: String,
        max_players: u8,
        host_outgoing: mpsc::UnboundedSender<ServerMessage>,
    ) -> Self {
        let mut players = HashMap::new();
        players.insert(
            host_id,
            RoomPlayer::new(host_id, host_name.clone(), host_outgoing),
        );

        Self {
            id,
            name: format!("{}'s Site", host_name),
            max_players: max_players.clamp(2, 4),
            host_id,
            status: RoomStatus::Waiting,
            players,
            player_order: vec![host_id],
            game: None,
            outcome: None,
        }
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    pub fn is_full(&self) -> bool {
        self.players.len() >= self.max_players as usize
    }

    pub fn add_player(
        &mut self,
        player_id: Uuid,
        name: String,
        outgoing: mpsc::UnboundedSender<ServerMessage>,
    ) -> Result<(), RoomError> {
        if self.status != RoomStatus::Waiting {
            return Err(RoomError::GameAlreadyStarted);
        }
        if self.is_full() {
            return Err(RoomError::RoomFull);
        }

        self.players
            .insert(player_id, RoomPlayer::new(player_id, name, outgoing));
        self.player_order.push(player_id);
        Ok(())
    }

    pub fn remove_player(&mut self, player_id: Uuid) -> Result<bool, RoomError> {
        let player = self
            .players
            .remove(&player_id)
            .ok_or(RoomError::PlayerNotInRoom)?;
        player.interfacer.close();
        self.player_order.retain(|&id| id != player_id);

        // If host left, assign new host
        if player_id == self.host_id && !self.player_order.is_empty() {
            self.host_id = self.player_order[0];
        }

        // A game can't go on without one of its players
        self.stop_game();

        // Return true if room is now empty
        Ok(self.players.is_empty())
    }

    /// Mark a player as gone. A running game can't continue without them.
    pub fn disconnect_player(&mut self, player_id: Uuid) {
        if let Some(player) = self.players.get_mut(&player_id) {
            player.connected = false;
            player.interfacer.close();
        }
        self.stop_game();
    }

    pub fn start_game(
        &mut self,
        requester_id: Uuid,
        config: GameConfig,
    ) -> Result<StartedGame, RoomError> {
        if requester_id != self.host_id {
            return Err(RoomError::NotHost);
        }
        if self.status != RoomStatus::Waiting {
            return Err(RoomError::GameAlreadyStarted);
        }
        if self.players.len() < 2 {
            return Err(RoomError::NotEnoughPlayers);
        }

        let mut game_players = Vec::with_capacity(self.player_order.len());
        for (idx, player_id) in self.player_order.iter().enumerate() {
            if let Some(player) = self.players.get_mut(player_id) {
                let game_index = idx as PlayerId;
                player.game_index = Some(game_index);
                game_players.push(Player::new(
                    game_index,
                    player.name.clone(),
                    player.interfacer.clone(),
                ));
            }
        }

        let mut board = BuildersBoard::new(config);
        board.setup_players(game_players);
        let events = board.subscribe();
        let handle = board.start_game();

        self.game = Some(handle.stopper());
        self.status = RoomStatus::InGame;

        Ok(StartedGame { handle, events })
    }

    /// Route a player's answer to their pending prompt.
    pub fn respond(&self, player_id: Uuid, text: String) -> Result<(), RoomError> {
        if self.status != RoomStatus::InGame {
            return Err(RoomError::GameNotStarted);
        }
        let player = self
            .players
            .get(&player_id)
            .ok_or(RoomError::PlayerNotInRoom)?;

        if player.interfacer.fulfill(text) {
            Ok(())
        } else {
            Err(RoomError::NotYourTurn)
        }
    }

    pub fn stop_game(&self) {
        if let Some(stopper) = &self.game {
            stopper.stop_game();
        }
    }

    pub fn finish(&mut self, outcome: GameOutcome) {
        self.status = RoomStatus::Finished;
        self.game = None;
        self.outcome = Some(outcome);
    }

    pub fn player_name(&self, game_index: PlayerId) -> Option<String> {
        self.players
            .values()
            .find(|p| p.game_index == Some(game_index))
            .map(|p| p.name.clone())
    }

    pub fn to_info(&self) -> RoomInfo {
        RoomInfo {
            id: self.id,
            name: self.name.clone(),
            players: self
                .player_order
                .iter()
                .filter_map(|id| self.players.get(id).map(|p| p.to_info()))
                .collect(),
            max_players: self.max_players,
            host_id: self.host_id,
            status: self.status,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use builders_core::DeathCause;

    fn outgoing() -> (
        mpsc::UnboundedSender<ServerMessage>,
        mpsc::UnboundedReceiver<ServerMessage>,
    ) {
        mpsc::unbounded_channel()
    }

    fn room_with_two() -> (GameRoom, Uuid, Uuid, mpsc::UnboundedReceiver<ServerMessage>) {
        let host_id = Uuid::new_v4();
        let (host_tx, host_rx) = outgoing();
        let mut room = GameRoom::new(Uuid::new_v4(), host_id, "Host".to_string(), 4, host_tx);

        let player2 = Uuid::new_v4();
        let (tx, _rx) = outgoing();
        room.add_player(player2, "Player 2".to_string(), tx).unwrap();

        (room, host_id, player2, host_rx)
    }

    #[test]
    fn test_create_room() {
        let host_id = Uuid::new_v4();
        let (tx, _rx) = outgoing();
        let room = GameRoom::new(Uuid::new_v4(), host_id, "Host".to_string(), 4, tx);

        assert_eq!(room.player_count(), 1);
        assert!(!room.is_full());
        assert_eq!(room.host_id, host_id);
        assert_eq!(room.status, RoomStatus::Waiting);
        assert_eq!(room.name, "Host's Site");
    }

    #[test]
    fn test_add_remove_players() {
        let host_id = Uuid::new_v4();
        let (tx, _rx) = outgoing();
        let mut room = GameRoom::new(Uuid::new_v4(), host_id, "Host".to_string(), 2, tx);

        let player2 = Uuid::new_v4();
        let (tx2, _rx2) = outgoing();
        room.add_player(player2, "Player 2".to_string(), tx2).unwrap();

        assert_eq!(room.player_count(), 2);
        assert!(room.is_full());

        // Can't add more players
        let (tx3, _rx3) = outgoing();
        assert!(room
            .add_player(Uuid::new_v4(), "Player 3".to_string(), tx3)
            .is_err());

        // Remove a player
        let empty = room.remove_player(player2).unwrap();
        assert!(!empty);
        assert_eq!(room.player_count(), 1);

        // Host leaving empties the room
        assert!(room.remove_player(host_id).unwrap());
    }

    #[tokio::test]
    async fn test_start_game() {
        let host_id = Uuid::new_v4();
        let (tx, _rx) = outgoing();
        let mut room = GameRoom::new(Uuid::new_v4(), host_id, "Host".to_string(), 4, tx);

        // Can't start with only 1 player
        assert!(matches!(
            room.start_game(host_id, GameConfig::default()),
            Err(RoomError::NotEnoughPlayers)
        ));

        let player2 = Uuid::new_v4();
        let (tx2, _rx2) = outgoing();
        room.add_player(player2, "Player 2".to_string(), tx2).unwrap();

        // Non-host can't start
        assert!(matches!(
            room.start_game(player2, GameConfig::default()),
            Err(RoomError::NotHost)
        ));

        // Host can start
        let started = room.start_game(host_id, GameConfig::default()).unwrap();
        assert_eq!(room.status, RoomStatus::InGame);
        assert_eq!(room.player_name(1).as_deref(), Some("Player 2"));

        room.stop_game();
        assert_eq!(
            started.handle.outcome().await,
            GameOutcome::Dead {
                cause: DeathCause::Stopped
            }
        );
    }

    #[tokio::test]
    async fn test_responses_route_to_the_prompted_player() {
        let (mut room, host_id, player2, mut host_rx) = room_with_two();
        assert!(matches!(
            room.respond(host_id, "0".into()),
            Err(RoomError::GameNotStarted)
        ));

        let started = room
            .start_game(host_id, GameConfig::default().with_seed(1))
            .unwrap();

        // The host goes first
        let prompt = host_rx.recv().await;
        assert!(matches!(prompt, Some(ServerMessage::Prompt { .. })));

        assert!(matches!(
            room.respond(player2, "0".into()),
            Err(RoomError::NotYourTurn)
        ));
        room.respond(host_id, "0".into()).unwrap();

        room.disconnect_player(player2);
        assert!(matches!(
            started.handle.outcome().await,
            GameOutcome::Dead { .. }
        ));
        room.finish(GameOutcome::Dead {
            cause: DeathCause::Disconnected,
        });
        assert_eq!(room.status, RoomStatus::Finished);
        assert!(room.outcome.is_some());
    }
}
