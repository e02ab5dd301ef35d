//! WebSocket server and connection handling.

use crate::protocol::{ClientMessage, RoomStatus, ServerMessage};
use crate::room::{GameRoom, StartedGame};
use builders_core::{DeathCause, GameConfig, GameHandle, GameOutcome};
use dashmap::DashMap;
use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::mpsc;
use tokio::task::JoinError;
use tokio_tungstenite::{accept_async, tungstenite::Message};
use tracing::{error, info, warn};
use uuid::Uuid;

/// Server state shared across all connections.
pub struct ServerState {
    /// All active rooms
    pub rooms: DashMap<Uuid, GameRoom>,
    /// Mapping from player ID to their room ID
    pub player_rooms: DashMap<Uuid, Uuid>,
    /// Mapping from player ID to their message sender
    pub player_senders: DashMap<Uuid, mpsc::UnboundedSender<ServerMessage>>,
    /// Configuration for every game this server starts
    pub game_config: GameConfig,
}

impl ServerState {
    pub fn new(game_config: GameConfig) -> Self {
        Self {
            rooms: DashMap::new(),
            player_rooms: DashMap::new(),
            player_senders: DashMap::new(),
            game_config,
        }
    }

    /// Send a message to a specific player.
    pub fn send_to_player(&self, player_id: Uuid, msg: ServerMessage) {
        if let Some(sender) = self.player_senders.get(&player_id) {
            let _ = sender.send(msg);
        }
    }

    /// Broadcast a message to all players in a room.
    pub fn broadcast_to_room(&self, room_id: Uuid, msg: ServerMessage) {
        let player_ids: Vec<Uuid> = match self.rooms.get(&room_id) {
            Some(room) => room.players.keys().copied().collect(),
            None => return,
        };
        for player_id in player_ids {
            self.send_to_player(player_id, msg.clone());
        }
    }

    /// Broadcast a message to all players in a room except one.
    pub fn broadcast_to_room_except(&self, room_id: Uuid, except: Uuid, msg: ServerMessage) {
        let player_ids: Vec<Uuid> = match self.rooms.get(&room_id) {
            Some(room) => room.players.keys().copied().collect(),
            None => return,
        };
        for player_id in player_ids.into_iter().filter(|id| *id != except) {
            self.send_to_player(player_id, msg.clone());
        }
    }

    /// Get list of waiting rooms.
    pub fn get_waiting_rooms(&self) -> Vec<crate::protocol::RoomInfo> {
        self.rooms
            .iter()
            .filter(|r| r.status == RoomStatus::Waiting)
            .map(|r| r.to_info())
            .collect()
    }

    /// Record how a room's game ended and tell everyone in it.
    pub fn finish_game(&self, room_id: Uuid, outcome: GameOutcome) {
        if let Some(mut room) = self.rooms.get_mut(&room_id) {
            room.finish(outcome);
        }
        info!("Game in room {} ended: {:?}", room_id, outcome);
        self.broadcast_to_room(room_id, ServerMessage::GameEnded { outcome });
    }
}

impl Default for ServerState {
    fn default() -> Self {
        Self::new(GameConfig::default())
    }
}

/// Run the WebSocket server.
pub async fn run_server(addr: SocketAddr, state: Arc<ServerState>) -> anyhow::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!("Builders server listening on {}", addr);

    while let Ok((stream, peer_addr)) = listener.accept().await {
        let state = Arc::clone(&state);
        tokio::spawn(async move {
            if let Err(e) = handle_connection(stream, peer_addr, state).await {
                error!("Connection error from {}: {}", peer_addr, e);
            }
        });
    }

    Ok(())
}

/// Handle a single WebSocket connection.
async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    state: Arc<ServerState>,
) -> anyhow::Result<()> {
    let ws_stream = accept_async(stream).await?;
    info!("New WebSocket connection from {}", addr);

    let (mut ws_sender, mut ws_receiver) = ws_stream.split();

    // Assign a player ID
    let player_id = Uuid::new_v4();

    // Create channel for outgoing messages
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerMessage>();
    state.player_senders.insert(player_id, tx);

    // Send welcome message
    let welcome = ServerMessage::Welcome { player_id };
    let msg_text = serde_json::to_string(&welcome)?;
    ws_sender.send(Message::Text(msg_text.into())).await?;

    // Spawn task to forward messages from channel to WebSocket
    let send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if let Ok(text) = serde_json::to_string(&msg) {
                if ws_sender.send(Message::Text(text.into())).await.is_err() {
                    break;
                }
            }
        }
    });

    // Handle incoming messages
    while let Some(msg) = ws_receiver.next().await {
        match msg {
            Ok(Message::Text(text)) => {
                if let Ok(client_msg) = serde_json::from_str::<ClientMessage>(&text) {
                    handle_message(player_id, client_msg, &state);
                } else {
                    warn!("Invalid message from {}: {}", player_id, text);
                }
            }
            Ok(Message::Close(_)) => {
                info!("Client {} closing connection", player_id);
                break;
            }
            Ok(Message::Ping(_)) => {
                state.send_to_player(player_id, ServerMessage::Pong);
            }
            Err(e) => {
                error!("WebSocket error from {}: {}", player_id, e);
                break;
            }
            _ => {}
        }
    }

    // Clean up on disconnect
    handle_disconnect(player_id, &state);
    state.player_senders.remove(&player_id);
    send_task.abort();

    info!("Connection closed for {}", player_id);
    Ok(())
}

fn send_error(state: &ServerState, player_id: Uuid, message: impl Into<String>) {
    state.send_to_player(
        player_id,
        ServerMessage::Error {
            message: message.into(),
        },
    );
}

/// Handle a client message.
fn handle_message(player_id: Uuid, msg: ClientMessage, state: &Arc<ServerState>) {
    match msg {
        ClientMessage::CreateRoom {
            player_name,
            max_players,
        } => {
            let Some(outgoing) = state.player_senders.get(&player_id).map(|s| s.clone()) else {
                return;
            };
            let room_id = Uuid::new_v4();
            let room = GameRoom::new(room_id, player_id, player_name, max_players, outgoing);
            let room_info = room.to_info();

            state.rooms.insert(room_id, room);
            state.player_rooms.insert(player_id, room_id);

            state.send_to_player(player_id, ServerMessage::RoomCreated { room_id });
            state.send_to_player(player_id, ServerMessage::JoinedRoom { room: room_info });
        }

        ClientMessage::JoinRoom {
            room_id,
            player_name,
        } => {
            let Some(outgoing) = state.player_senders.get(&player_id).map(|s| s.clone()) else {
                return;
            };
            let joined = state
                .rooms
                .get_mut(&room_id)
                .map(|mut room| room.add_player(player_id, player_name, outgoing).map(|()| room.to_info()));

            match joined {
                Some(Ok(room_info)) => {
                    state.player_rooms.insert(player_id, room_id);
                    state.send_to_player(
                        player_id,
                        ServerMessage::JoinedRoom {
                            room: room_info.clone(),
                        },
                    );

                    // Notify other players
                    state.broadcast_to_room_except(
                        room_id,
                        player_id,
                        ServerMessage::RoomUpdated { room: room_info },
                    );
                }
                Some(Err(e)) => send_error(state, player_id, e.to_string()),
                None => send_error(state, player_id, "Room not found"),
            }
        }

        ClientMessage::LeaveRoom => {
            if let Some((_, room_id)) = state.player_rooms.remove(&player_id) {
                leave_room(player_id, room_id, state);
                state.send_to_player(player_id, ServerMessage::LeftRoom);
            }
        }

        ClientMessage::StartGame => {
            let Some(room_id) = state.player_rooms.get(&player_id).map(|r| *r) else {
                send_error(state, player_id, "Not in a room");
                return;
            };
            let started = state
                .rooms
                .get_mut(&room_id)
                .map(|mut room| room.start_game(player_id, state.game_config.clone()));

            match started {
                Some(Ok(started)) => {
                    let game_id = started.handle.game_id();
                    info!("Game {} started in room {}", game_id, room_id);
                    state.broadcast_to_room(room_id, ServerMessage::GameStarted { game_id });
                    watch_game(room_id, started, Arc::clone(state));
                }
                Some(Err(e)) => send_error(state, player_id, e.to_string()),
                None => send_error(state, player_id, "Room not found"),
            }
        }

        ClientMessage::Respond { text } => {
            let Some(room_id) = state.player_rooms.get(&player_id).map(|r| *r) else {
                send_error(state, player_id, "Not in a room");
                return;
            };
            let result = state.rooms.get(&room_id).map(|room| room.respond(player_id, text));
            if let Some(Err(e)) = result {
                send_error(state, player_id, e.to_string());
            }
        }

        ClientMessage::Chat { message } => {
            if let Some(room_id) = state.player_rooms.get(&player_id).map(|r| *r) {
                let player_name = state
                    .rooms
                    .get(&room_id)
                    .and_then(|r| r.players.get(&player_id).map(|p| p.name.clone()))
                    .unwrap_or_else(|| "Unknown".to_string());

                state.broadcast_to_room(
                    room_id,
                    ServerMessage::ChatMessage {
                        player_name,
                        message,
                    },
                );
            }
        }

        ClientMessage::ListRooms => {
            let rooms = state.get_waiting_rooms();
            state.send_to_player(player_id, ServerMessage::RoomList { rooms });
        }

        ClientMessage::Ping => {
            state.send_to_player(player_id, ServerMessage::Pong);
        }
    }
}

/// Forward a running game's events to its room and record its outcome.
fn watch_game(room_id: Uuid, started: StartedGame, state: Arc<ServerState>) {
    let StartedGame { handle, mut events } = started;

    let event_state = Arc::clone(&state);
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => {
                    event_state.broadcast_to_room(room_id, ServerMessage::GameEvent { event })
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!("Room {} event stream lagged by {} events", room_id, skipped);
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    tokio::spawn(async move {
        match game_result(handle).await {
            Ok(outcome) => state.finish_game(room_id, outcome),
            Err(e) if e.is_panic() => {
                // A panicked game broke an invariant; nothing it touched can be trusted
                error!("Game in room {} hit a fatal error, aborting", room_id);
                std::process::abort();
            }
            Err(e) => {
                warn!("Watcher for room {} was cancelled: {}", room_id, e);
                state.finish_game(
                    room_id,
                    GameOutcome::Dead {
                        cause: DeathCause::Stopped,
                    },
                );
            }
        }
    });
}

/// Wait for a game, keeping a panic inside it as a `JoinError`.
async fn game_result(handle: GameHandle) -> Result<GameOutcome, JoinError> {
    tokio::spawn(handle.outcome()).await
}

fn leave_room(player_id: Uuid, room_id: Uuid, state: &Arc<ServerState>) {
    let left = state.rooms.get_mut(&room_id).map(|mut room| {
        let is_empty = room.remove_player(player_id).unwrap_or(false);
        (is_empty, room.to_info())
    });

    match left {
        Some((true, _)) => {
            state.rooms.remove(&room_id);
        }
        Some((false, room_info)) => {
            state.broadcast_to_room(room_id, ServerMessage::RoomUpdated { room: room_info });
        }
        None => {}
    }
}

/// Handle player disconnect.
fn handle_disconnect(player_id: Uuid, state: &Arc<ServerState>) {
    let Some((_, room_id)) = state.player_rooms.remove(&player_id) else {
        return;
    };

    let in_game = state
        .rooms
        .get(&room_id)
        .map(|room| room.status == RoomStatus::InGame)
        .unwrap_or(false);

    if in_game {
        // Mark player as disconnected instead of removing during game
        let room_info = state.rooms.get_mut(&room_id).map(|mut room| {
            room.disconnect_player(player_id);
            room.to_info()
        });
        if let Some(room_info) = room_info {
            state.broadcast_to_room(room_id, ServerMessage::RoomUpdated { room: room_info });
        }
    } else {
        leave_room(player_id, room_id, state);
    }
}
