//! WebSocket protocol message definitions
//! These are the wire types for client-server communication

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::game::classes::TankClassId;
use crate::game::maps::GameMap;
use crate::game::room::{PlayerId, RoomId, RoomState};

/// Messages sent from client to server
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientMsg {
    /// Ask for a fresh lobby listing
    GetLobby,

    /// Create a new room
    #[serde(rename_all = "camelCase")]
    CreateGame {
        /// Echoed back in `createGameResult`
        #[serde(default)]
        request_id: Option<u64>,
        #[serde(default)]
        name: String,
        #[serde(alias = "map", default)]
        map_id: String,
        /// Clamped to the configured bot limit
        #[serde(default)]
        bot_count: i64,
    },

    /// Join an existing room
    #[serde(rename_all = "camelCase")]
    JoinRoom {
        #[serde(default)]
        request_id: Option<u64>,
        room_id: RoomId,
        /// Unknown classes fall back to the default
        #[serde(default)]
        tank_class: Option<String>,
    },

    /// Client-predicted position, validated by the server
    Move { x: f32, y: f32, angle: f32 },

    /// Trigger pull from the given muzzle position
    Shoot { x: f32, y: f32, angle: f32 },

    /// Switch tank class without leaving the room
    #[serde(rename_all = "camelCase")]
    ChangeClass { tank_class: String },

    /// Activate the class boost ability
    Boost,

    /// Return to the lobby
    LeaveRoom,

    /// Ping for latency measurement
    Ping {
        /// Client timestamp
        t: u64,
    },
}

impl ClientMsg {
    /// Requests the client waits on a reply for
    pub fn expects_reply(&self) -> bool {
        matches!(
            self,
            ClientMsg::GetLobby
                | ClientMsg::CreateGame { .. }
                | ClientMsg::JoinRoom { .. }
                | ClientMsg::Ping { .. }
        )
    }
}

/// Messages sent from server to client
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ServerMsg {
    /// Welcome message after connection
    #[serde(rename_all = "camelCase")]
    Welcome {
        connection_id: Uuid,
        server_time: u64,
    },

    #[serde(rename_all = "camelCase")]
    CreateGameResult {
        request_id: Option<u64>,
        success: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        room_id: Option<RoomId>,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },

    #[serde(rename_all = "camelCase")]
    JoinRoomResult {
        request_id: Option<u64>,
        success: bool,
        #[serde(flatten)]
        joined: Option<Box<JoinedRoom>>,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },

    PlayerJoined {
        player: PlayerView,
    },

    #[serde(rename_all = "camelCase")]
    PlayerLeft {
        player_id: PlayerId,
    },

    /// Authoritative position of a tank
    PlayerMoved {
        id: PlayerId,
        x: f32,
        y: f32,
        angle: f32,
    },

    BulletFired {
        bullet: BulletView,
    },

    #[serde(rename_all = "camelCase")]
    BulletRemoved {
        bullet_id: String,
    },

    /// Health may be negative for the tick a tank is destroyed
    #[serde(rename_all = "camelCase")]
    PlayerHit {
        player_id: PlayerId,
        health: f32,
    },

    PlayerRespawned {
        player: PlayerView,
    },

    #[serde(rename_all = "camelCase")]
    ScoreUpdate {
        player_id: PlayerId,
        score: u32,
    },

    GameStarted,

    #[serde(rename_all = "camelCase")]
    GameWon {
        winner_id: PlayerId,
        winner_name: String,
        scores: BTreeMap<PlayerId, ScoreEntry>,
    },

    /// Operator reset back to `waiting` with zeroed scores
    GameReset {
        players: BTreeMap<PlayerId, PlayerView>,
    },

    LobbyUpdate {
        rooms: BTreeMap<RoomId, RoomSummary>,
    },

    #[serde(rename_all = "camelCase")]
    ClassChanged {
        player_id: PlayerId,
        tank_class: TankClassId,
    },

    /// Boost is active until the given server time (ms)
    #[serde(rename_all = "camelCase")]
    PlayerBoosted {
        player_id: PlayerId,
        until: u64,
    },

    /// Error message
    Error {
        code: String,
        message: String,
    },

    /// Pong response
    Pong {
        /// Echo back client timestamp
        t: u64,
    },
}

/// Public view of a tank
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerView {
    pub id: PlayerId,
    pub name: String,
    pub x: f32,
    pub y: f32,
    pub angle: f32,
    pub color: &'static str,
    pub score: u32,
    pub health: f32,
    pub is_bot: bool,
    pub tank_class: TankClassId,
}

/// Public view of a bullet at spawn
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulletView {
    pub id: String,
    pub owner_id: PlayerId,
    pub x: f32,
    pub y: f32,
    pub angle: f32,
    pub speed: f32,
    pub damage: f32,
    pub created_at: u64,
}

/// Everything a client needs to render a room it just joined
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinedRoom {
    pub player_id: PlayerId,
    pub players: BTreeMap<PlayerId, PlayerView>,
    pub map_id: String,
    pub map: GameMap,
    pub room_name: String,
    pub game_width: f32,
    pub game_height: f32,
    pub game_state: RoomState,
    /// Client-side movement tuning, mirrored from the server config
    pub tank_radius: f32,
    pub barrel_length: f32,
    pub max_speed: f32,
    /// Velocity multiplier the client applies, negated, on a rejected axis
    pub wall_bounce: f32,
}

/// Lobby listing entry
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSummary {
    pub id: RoomId,
    pub name: String,
    pub map_id: String,
    pub map_name: String,
    /// Human players only
    pub player_count: usize,
    pub bot_count: usize,
    pub max_players: usize,
    pub is_full: bool,
}

impl ServerMsg {
    pub fn error(code: &str, message: impl Into<String>) -> Self {
        ServerMsg::Error {
            code: code.to_string(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreEntry {
    pub name: String,
    pub score: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn create_game_accepts_legacy_map_field() {
        let msg: ClientMsg = serde_json::from_value(json!({
            "type": "createGame",
            "name": "Friday",
            "map": "island",
            "botCount": 2
        }))
        .unwrap();
        match msg {
            ClientMsg::CreateGame {
                request_id,
                name,
                map_id,
                bot_count,
            } => {
                assert_eq!(request_id, None);
                assert_eq!(name, "Friday");
                assert_eq!(map_id, "island");
                assert_eq!(bot_count, 2);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn unit_messages_parse_from_type_only() {
        let msg: ClientMsg = serde_json::from_str(r#"{"type":"leaveRoom"}"#).unwrap();
        assert!(matches!(msg, ClientMsg::LeaveRoom));
        let msg: ClientMsg = serde_json::from_str(r#"{"type":"getLobby"}"#).unwrap();
        assert!(matches!(msg, ClientMsg::GetLobby));
    }

    #[test]
    fn server_messages_use_camel_case() {
        let value = serde_json::to_value(ServerMsg::PlayerHit {
            player_id: "bot_ABC123".into(),
            health: -25.0,
        })
        .unwrap();
        assert_eq!(
            value,
            json!({"type": "playerHit", "playerId": "bot_ABC123", "health": -25.0})
        );

        let value = serde_json::to_value(ServerMsg::GameStarted).unwrap();
        assert_eq!(value, json!({"type": "gameStarted"}));
    }

    #[test]
    fn only_requests_expect_a_reply() {
        let join: ClientMsg =
            serde_json::from_str(r#"{"type":"joinRoom","roomId":"ABC123","requestId":4}"#).unwrap();
        assert!(join.expects_reply());
        assert!(ClientMsg::Ping { t: 1 }.expects_reply());
        assert!(!ClientMsg::Move {
            x: 1.0,
            y: 2.0,
            angle: 0.0
        }
        .expects_reply());
        assert!(!ClientMsg::Boost.expects_reply());
    }

    #[test]
    fn error_frames_carry_code_and_message() {
        let value = serde_json::to_value(ServerMsg::error("rate_limited", "Too many messages")).unwrap();
        assert_eq!(
            value,
            json!({"type": "error", "code": "rate_limited", "message": "Too many messages"})
        );
    }

    #[test]
    fn failed_join_omits_room_fields() {
        let value = serde_json::to_value(ServerMsg::JoinRoomResult {
            request_id: Some(7),
            success: false,
            joined: None,
            error: Some("Room not found".into()),
        })
        .unwrap();
        assert_eq!(
            value,
            json!({
                "type": "joinRoomResult",
                "requestId": 7,
                "success": false,
                "error": "Room not found"
            })
        );
    }
}
