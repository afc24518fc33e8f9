//! Room registry - owns every room and routes session commands to them

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info};

use crate::config::GameConfig;
use crate::ws::protocol::{ClientMsg, RoomSummary, ServerMsg};

use super::classes::TankClassId;
use super::maps::MapCatalog;
use super::outbox::Outbox;
use super::room::{random_code, PlayerId, Room, RoomId};
use super::snapshot::{LobbySnapshot, SnapshotBuilder};
use super::ConnectionId;

const ROOM_ID_LEN: usize = 6;
const ROOM_NAME_MAX_CHARS: usize = 20;

/// Per-connection routing record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub connection_id: ConnectionId,
    pub room_id: Option<RoomId>,
}

impl Session {
    pub fn new(connection_id: ConnectionId) -> Self {
        Self {
            connection_id,
            room_id: None,
        }
    }

    /// A human's player id is its connection id
    pub fn player_id(&self) -> PlayerId {
        self.connection_id.to_string()
    }
}

/// Failures reported back to the requesting client
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("Game name is required")]
    BlankName,

    #[error("Invalid map selected")]
    UnknownMap,

    #[error("Room not found")]
    RoomNotFound,

    #[error("Room is full")]
    RoomFull,

    #[error("Not in a room")]
    NotInRoom,
}

impl RegistryError {
    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            RegistryError::BlankName => "blank_name",
            RegistryError::UnknownMap => "unknown_map",
            RegistryError::RoomNotFound => "room_not_found",
            RegistryError::RoomFull => "room_full",
            RegistryError::NotInRoom => "not_in_room",
        }
    }
}

/// Registry of all active rooms
pub struct RoomRegistry {
    rooms: HashMap<RoomId, Room>,
    /// Creation order, which is also tick order
    order: Vec<RoomId>,
    config: Arc<GameConfig>,
    maps: MapCatalog,
    rng: ChaCha8Rng,
}

impl RoomRegistry {
    pub fn new(config: Arc<GameConfig>, maps: MapCatalog, seed: u64) -> Self {
        Self {
            rooms: HashMap::new(),
            order: Vec::new(),
            config,
            maps,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    #[cfg(test)]
    pub fn get(&self, id: &str) -> Option<&Room> {
        self.rooms.get(id)
    }

    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }

    /// Rooms in creation order
    pub fn rooms(&self) -> impl Iterator<Item = &Room> {
        self.order.iter().filter_map(|id| self.rooms.get(id))
    }

    /// Create a room with `bot_count` bots, clamped to the configured limit
    pub fn create_room(
        &mut self,
        name: &str,
        map_id: &str,
        bot_count: i64,
        out: &mut Outbox,
    ) -> Result<RoomId, RegistryError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(RegistryError::BlankName);
        }
        let map = self.maps.get(map_id).ok_or(RegistryError::UnknownMap)?;
        let bots = bot_count.clamp(0, self.config.max_bots as i64) as usize;

        let id = loop {
            let candidate = random_code(&mut self.rng, ROOM_ID_LEN);
            if !self.rooms.contains_key(&candidate) {
                break candidate;
            }
        };
        let name: String = name.chars().take(ROOM_NAME_MAX_CHARS).collect();

        let mut room = Room::new(id.clone(), name, map, self.config.clone(), self.rng.gen());
        for _ in 0..bots {
            room.add_bot();
        }

        info!(room_id = %id, map_id, bots, "Room created");
        self.rooms.insert(id.clone(), room);
        self.order.push(id.clone());
        self.broadcast_lobby(out);
        Ok(id)
    }

    /// Put the session's player into a room, leaving any previous room first.
    /// The caller sends the join result and then runs [`Self::check_game_start`].
    pub fn join_room(
        &mut self,
        session: &mut Session,
        room_id: &str,
        tank_class: Option<&str>,
        out: &mut Outbox,
    ) -> Result<PlayerId, RegistryError> {
        let player_id = session.player_id();
        let room = self.rooms.get(room_id).ok_or(RegistryError::RoomNotFound)?;
        if session.room_id.as_deref() == Some(room_id) && room.player(&player_id).is_some() {
            return Ok(player_id);
        }
        if room.is_full() {
            return Err(RegistryError::RoomFull);
        }

        if session.room_id.is_some() {
            self.leave_room(session, out)?;
        }

        let room = self.rooms.get_mut(room_id).ok_or(RegistryError::RoomNotFound)?;
        let class = TankClassId::resolve(tank_class);
        let player_id = room.add_human(session.connection_id, class);
        session.room_id = Some(room.id.clone());

        if let Some(player) = room.player(&player_id) {
            out.to_room_except(
                &room.id,
                session.connection_id,
                ServerMsg::PlayerJoined {
                    player: SnapshotBuilder::player(player),
                },
            );
        }
        info!(
            room_id = %room.id,
            player_id = %player_id,
            tank_class = class.as_str(),
            "Player joined room"
        );
        self.broadcast_lobby(out);
        Ok(player_id)
    }

    /// Remove the session's player from its room, deleting the room once no humans remain
    pub fn leave_room(&mut self, session: &mut Session, out: &mut Outbox) -> Result<(), RegistryError> {
        let room_id = session.room_id.take().ok_or(RegistryError::NotInRoom)?;
        let player_id = session.player_id();

        if let Some(room) = self.rooms.get_mut(&room_id) {
            if room.remove_player(&player_id, out).is_some() {
                info!(room_id = %room_id, player_id = %player_id, "Player left room");
            }
            if room.human_count() == 0 {
                self.rooms.remove(&room_id);
                self.order.retain(|id| *id != room_id);
                info!(room_id = %room_id, "Room deleted (no humans left)");
            }
        }
        self.broadcast_lobby(out);
        Ok(())
    }

    pub fn check_game_start(&mut self, room_id: &str, out: &mut Outbox) {
        if let Some(room) = self.rooms.get_mut(room_id) {
            room.check_game_start(out);
        }
    }

    /// Operator reset of one room
    pub fn reset_room(&mut self, room_id: &str, out: &mut Outbox) -> Result<(), RegistryError> {
        let room = self.rooms.get_mut(room_id).ok_or(RegistryError::RoomNotFound)?;
        room.reset(out);
        Ok(())
    }

    /// Step every room once, in creation order
    pub fn tick(&mut self, now: u64, out: &mut Outbox) {
        for id in &self.order {
            if let Some(room) = self.rooms.get_mut(id) {
                room.tick(now, out);
            }
        }
    }

    pub fn lobby(&self) -> BTreeMap<RoomId, RoomSummary> {
        self.rooms()
            .map(|room| {
                (
                    room.id.clone(),
                    SnapshotBuilder::room_summary(room, self.config.max_players),
                )
            })
            .collect()
    }

    pub fn lobby_snapshot(&self) -> LobbySnapshot {
        LobbySnapshot::new(self.lobby())
    }

    pub fn broadcast_lobby(&self, out: &mut Outbox) {
        out.to_lobby(ServerMsg::LobbyUpdate { rooms: self.lobby() });
    }

    /// Route one client message
    pub fn dispatch(&mut self, session: &mut Session, msg: ClientMsg, now: u64, out: &mut Outbox) {
        let connection = session.connection_id;
        match msg {
            ClientMsg::GetLobby => {
                out.to_connection(connection, ServerMsg::LobbyUpdate { rooms: self.lobby() });
            }
            ClientMsg::CreateGame {
                request_id,
                name,
                map_id,
                bot_count,
            } => {
                let result = self.create_room(&name, &map_id, bot_count, out);
                if let Err(e) = &result {
                    debug!(connection_id = %connection, code = e.code(), "Create game rejected");
                }
                out.to_connection(
                    connection,
                    ServerMsg::CreateGameResult {
                        request_id,
                        success: result.is_ok(),
                        error: result.as_ref().err().map(ToString::to_string),
                        room_id: result.ok(),
                    },
                );
            }
            ClientMsg::JoinRoom {
                request_id,
                room_id,
                tank_class,
            } => match self.join_room(session, &room_id, tank_class.as_deref(), out) {
                Ok(player_id) => {
                    let joined = self
                        .rooms
                        .get(&room_id)
                        .map(|room| Box::new(SnapshotBuilder::joined_room(room, &player_id)));
                    out.to_connection(
                        connection,
                        ServerMsg::JoinRoomResult {
                            request_id,
                            success: true,
                            joined,
                            error: None,
                        },
                    );
                    self.check_game_start(&room_id, out);
                }
                Err(e) => {
                    debug!(connection_id = %connection, room_id = %room_id, code = e.code(), "Join rejected");
                    out.to_connection(
                        connection,
                        ServerMsg::JoinRoomResult {
                            request_id,
                            success: false,
                            joined: None,
                            error: Some(e.to_string()),
                        },
                    );
                }
            },
            ClientMsg::Move { x, y, angle } => {
                if let Some((room, player_id)) = self.session_room(session) {
                    room.handle_move(&player_id, x, y, angle, out);
                }
            }
            ClientMsg::Shoot { x, y, angle } => {
                if let Some((room, player_id)) = self.session_room(session) {
                    room.handle_shoot(&player_id, x, y, angle, now, out);
                }
            }
            ClientMsg::ChangeClass { tank_class } => {
                if let Some((room, player_id)) = self.session_room(session) {
                    room.change_class(&player_id, TankClassId::resolve(Some(tank_class.as_str())), out);
                }
            }
            ClientMsg::Boost => {
                if let Some((room, player_id)) = self.session_room(session) {
                    if !room.try_boost(&player_id, now, out) {
                        debug!(connection_id = %connection, "Boost unavailable");
                    }
                }
            }
            ClientMsg::LeaveRoom => {
                if self.leave_room(session, out).is_err() {
                    debug!(connection_id = %connection, "Leave ignored, not in a room");
                }
            }
            ClientMsg::Ping { t } => {
                out.to_connection(connection, ServerMsg::Pong { t });
            }
        }
    }

    /// Transport-level disconnect
    pub fn disconnect(&mut self, session: &mut Session, out: &mut Outbox) {
        if session.room_id.is_some() {
            let _ = self.leave_room(session, out);
        }
    }

    fn session_room(&mut self, session: &Session) -> Option<(&mut Room, PlayerId)> {
        let room = self.rooms.get_mut(session.room_id.as_deref()?)?;
        Some((room, session.player_id()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::outbox::Audience;
    use crate::game::room::RoomState;
    use uuid::Uuid;

    fn registry(config: GameConfig) -> RoomRegistry {
        RoomRegistry::new(Arc::new(config), MapCatalog::builtin(), 7)
    }

    fn session() -> Session {
        Session::new(Uuid::new_v4())
    }

    #[test]
    fn created_room_holds_requested_bots() {
        let mut reg = registry(GameConfig::default());
        let mut out = Outbox::new();
        let id = reg.create_room("Arena", "warehouse", 2, &mut out).unwrap();

        let room = reg.get(&id).unwrap();
        assert_eq!(id.len(), 6);
        assert!(id.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
        assert_eq!(room.bot_ids.len(), 2);
        for bot_id in &room.bot_ids {
            assert!(room.player(bot_id).unwrap().is_bot());
        }
        assert_eq!(room.state, RoomState::Waiting);

        let summary = &reg.lobby()[&id];
        assert_eq!(summary.bot_count, 2);
        assert_eq!(summary.player_count, 0);
        assert_eq!(summary.map_name, "Warehouse");
        assert!(out
            .iter()
            .any(|e| e.audience == Audience::Lobby && matches!(e.msg, ServerMsg::LobbyUpdate { .. })));
    }

    #[test]
    fn bot_count_is_clamped() {
        let mut reg = registry(GameConfig::default());
        let mut out = Outbox::new();
        let none = reg.create_room("A", "island", -4, &mut out).unwrap();
        let many = reg.create_room("B", "island", 99, &mut out).unwrap();
        assert_eq!(reg.get(&none).unwrap().bot_count(), 0);
        assert_eq!(reg.get(&many).unwrap().bot_count(), 3);
    }

    #[test]
    fn create_validates_name_and_map() {
        let mut reg = registry(GameConfig::default());
        let mut out = Outbox::new();
        let blank = reg.create_room("   ", "island", 0, &mut out).unwrap_err();
        assert_eq!(blank, RegistryError::BlankName);
        assert_eq!(blank.to_string(), "Game name is required");

        let map = reg.create_room("Ok", "moon", 0, &mut out).unwrap_err();
        assert_eq!(map.code(), "unknown_map");
        assert!(reg.is_empty());
    }

    #[test]
    fn room_name_is_trimmed_and_truncated() {
        let mut reg = registry(GameConfig::default());
        let mut out = Outbox::new();
        let id = reg
            .create_room("   An exceptionally long room name  ", "killhouse", 0, &mut out)
            .unwrap();
        assert_eq!(reg.get(&id).unwrap().name, "An exceptionally lon");
    }

    #[test]
    fn join_rejects_missing_and_full_rooms() {
        let mut reg = registry(GameConfig {
            max_players: 1,
            ..GameConfig::default()
        });
        let mut out = Outbox::new();
        let mut first = session();
        let mut second = session();

        assert_eq!(
            reg.join_room(&mut first, "NOPE00", None, &mut out),
            Err(RegistryError::RoomNotFound)
        );

        let id = reg.create_room("Duel", "island", 0, &mut out).unwrap();
        reg.join_room(&mut first, &id, None, &mut out).unwrap();
        assert_eq!(
            reg.join_room(&mut second, &id, None, &mut out),
            Err(RegistryError::RoomFull)
        );
        assert_eq!(second.room_id, None);
        assert!(reg.lobby()[&id].is_full);
    }

    #[test]
    fn unknown_class_falls_back_to_default() {
        let mut reg = registry(GameConfig::default());
        let mut out = Outbox::new();
        let mut s = session();
        let id = reg.create_room("Classy", "battlefield", 0, &mut out).unwrap();
        let player_id = reg.join_room(&mut s, &id, Some("railgun"), &mut out).unwrap();
        let player = reg.get(&id).unwrap().player(&player_id).unwrap();
        assert_eq!(player.tank_class, TankClassId::Speedo);
        assert_eq!(s.room_id.as_deref(), Some(id.as_str()));
    }

    #[test]
    fn join_result_precedes_game_start() {
        let mut reg = registry(GameConfig {
            min_players_to_start: 1,
            ..GameConfig::default()
        });
        let mut out = Outbox::new();
        let mut s = session();
        let id = reg.create_room("Solo", "warehouse", 0, &mut out).unwrap();

        reg.dispatch(
            &mut s,
            ClientMsg::JoinRoom {
                request_id: Some(3),
                room_id: id.clone(),
                tank_class: Some("sniper".into()),
            },
            1_000,
            &mut out,
        );

        let position = |pred: fn(&ServerMsg) -> bool| out.iter().position(|e| pred(&e.msg));
        let result = position(|m| matches!(m, ServerMsg::JoinRoomResult { success: true, .. })).unwrap();
        let started = position(|m| matches!(m, ServerMsg::GameStarted)).unwrap();
        assert!(result < started);
        assert_eq!(reg.get(&id).unwrap().state, RoomState::Playing);
    }

    #[test]
    fn last_human_leaving_deletes_room_despite_bots() {
        let mut reg = registry(GameConfig::default());
        let mut out = Outbox::new();
        let mut s = session();
        let id = reg.create_room("Bots", "island", 3, &mut out).unwrap();
        reg.join_room(&mut s, &id, None, &mut out).unwrap();

        let mut out = Outbox::new();
        reg.leave_room(&mut s, &mut out).unwrap();

        assert!(reg.get(&id).is_none());
        assert_eq!(s.room_id, None);
        assert!(reg.lobby().is_empty());
        assert!(out.iter().any(|e| matches!(
            &e.msg,
            ServerMsg::LobbyUpdate { rooms } if rooms.is_empty()
        )));
        assert_eq!(reg.leave_room(&mut s, &mut out), Err(RegistryError::NotInRoom));
    }

    #[test]
    fn joining_elsewhere_leaves_previous_room() {
        let mut reg = registry(GameConfig::default());
        let mut out = Outbox::new();
        let mut s = session();
        let first = reg.create_room("One", "island", 0, &mut out).unwrap();
        let second = reg.create_room("Two", "island", 0, &mut out).unwrap();

        reg.join_room(&mut s, &first, None, &mut out).unwrap();
        reg.join_room(&mut s, &second, None, &mut out).unwrap();

        assert!(reg.get(&first).is_none());
        assert_eq!(reg.get(&second).unwrap().human_count(), 1);
        assert_eq!(s.room_id.as_deref(), Some(second.as_str()));
    }

    #[test]
    fn disconnect_removes_player_from_room() {
        let mut reg = registry(GameConfig::default());
        let mut out = Outbox::new();
        let mut a = session();
        let mut b = session();
        let id = reg.create_room("Pair", "island", 0, &mut out).unwrap();
        reg.join_room(&mut a, &id, None, &mut out).unwrap();
        reg.join_room(&mut b, &id, None, &mut out).unwrap();

        reg.disconnect(&mut a, &mut out);

        let room = reg.get(&id).unwrap();
        assert_eq!(room.human_count(), 1);
        assert!(room.player(&a.player_id()).is_none());
    }

    #[test]
    fn reset_of_unknown_room_fails() {
        let mut reg = registry(GameConfig::default());
        let mut out = Outbox::new();
        assert_eq!(reg.reset_room("ZZZZZZ", &mut out), Err(RegistryError::RoomNotFound));
    }

    #[test]
    fn ping_is_answered_to_sender_only() {
        let mut reg = registry(GameConfig::default());
        let mut out = Outbox::new();
        let mut s = session();
        reg.dispatch(&mut s, ClientMsg::Ping { t: 99 }, 0, &mut out);
        let envelope = out.iter().next().unwrap();
        assert_eq!(envelope.audience, Audience::Connection(s.connection_id));
        assert!(matches!(envelope.msg, ServerMsg::Pong { t: 99 }));
    }
}
