//! WebSocket protocol messages for The Builders multiplayer.

use builders_core::{GameEvent, GameOutcome};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Messages sent from client to server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum ClientMessage {
    /// Create a new game room
    CreateRoom { player_name: String, max_players: u8 },

    /// Join an existing room
    JoinRoom { room_id: Uuid, player_name: String },

    /// Leave current room
    LeaveRoom,

    /// Start the game (host only)
    StartGame,

    /// Answer the prompt currently shown to this player
    Respond { text: String },

    /// Send chat message
    Chat { message: String },

    /// Request room list
    ListRooms,

    /// Ping for keepalive
    Ping,
}

/// Messages sent from server to client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum ServerMessage {
    /// Welcome message with assigned player ID
    Welcome { player_id: Uuid },

    /// Room created successfully
    RoomCreated { room_id: Uuid },

    /// Joined room successfully
    JoinedRoom { room: RoomInfo },

    /// Left room successfully
    LeftRoom,

    /// Room state updated (player joined/left)
    RoomUpdated { room: RoomInfo },

    /// Game started
    GameStarted { game_id: Uuid },

    /// It's your turn; answer with `Respond`
    Prompt { text: String },

    /// Something the game wants this player to see
    Message { text: String },

    /// Something happened in the game
    GameEvent { event: GameEvent },

    /// Game finished, either by a win or because it died
    GameEnded { outcome: GameOutcome },

    /// Chat message received
    ChatMessage { player_name: String, message: String },

    /// List of available rooms
    RoomList { rooms: Vec<RoomInfo> },

    /// Error occurred
    Error { message: String },

    /// Pong response
    Pong,
}

/// Room information for clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomInfo {
    pub id: Uuid,
    pub name: String,
    pub players: Vec<PlayerInfo>,
    pub max_players: u8,
    pub host_id: Uuid,
    pub status: RoomStatus,
}

/// Player information in a room.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerInfo {
    pub id: Uuid,
    pub name: String,
    pub connected: bool,
}

/// Room status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoomStatus {
    Waiting,
    InGame,
    Finished,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_respond_message_shape() {
        let msg: ClientMessage =
            serde_json::from_str(r#"{"type":"Respond","payload":{"text":"2"}}"#).unwrap();
        assert!(matches!(msg, ClientMessage::Respond { text } if text == "2"));
    }

    #[test]
    fn test_prompt_serializes_with_payload() {
        let json = serde_json::to_value(ServerMessage::Prompt {
            text: "Pick a card".into(),
        })
        .unwrap();
        assert_eq!(json["type"], "Prompt");
        assert_eq!(json["payload"]["text"], "Pick a card");
    }
}
