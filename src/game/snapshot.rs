//! Snapshot building: wire views of rooms, tanks and bullets

use std::collections::BTreeMap;

use crate::ws::protocol::{BulletView, JoinedRoom, PlayerView, RoomSummary, ScoreEntry};

use super::combat::Bullet;
use super::room::{Player, PlayerId, Room, RoomId};

/// Builds client-facing views of simulation state
pub struct SnapshotBuilder;

impl SnapshotBuilder {
    pub fn player(player: &Player) -> PlayerView {
        PlayerView {
            id: player.id.clone(),
            name: player.name.clone(),
            x: player.x,
            y: player.y,
            angle: player.angle,
            color: player.color,
            score: player.score,
            health: player.health,
            is_bot: player.is_bot(),
            tank_class: player.tank_class,
        }
    }

    pub fn players(players: &[Player]) -> BTreeMap<PlayerId, PlayerView> {
        players
            .iter()
            .map(|p| (p.id.clone(), Self::player(p)))
            .collect()
    }

    pub fn bullet(bullet: &Bullet) -> BulletView {
        BulletView {
            id: bullet.id.clone(),
            owner_id: bullet.owner_id.clone(),
            x: bullet.x,
            y: bullet.y,
            angle: bullet.angle,
            speed: bullet.speed,
            damage: bullet.damage,
            created_at: bullet.created_at,
        }
    }

    /// Full room state for a player who just joined
    pub fn joined_room(room: &Room, player_id: &str) -> JoinedRoom {
        let config = room.config();
        JoinedRoom {
            player_id: player_id.to_string(),
            players: Self::players(&room.players),
            map_id: room.map.id.clone(),
            map: (*room.map).clone(),
            room_name: room.name.clone(),
            game_width: room.map.width,
            game_height: room.map.height,
            game_state: room.state,
            tank_radius: config.tank_radius,
            barrel_length: config.barrel_length,
            max_speed: config.max_speed,
            wall_bounce: config.wall_bounce,
        }
    }

    pub fn scores(players: &[Player]) -> BTreeMap<PlayerId, ScoreEntry> {
        players
            .iter()
            .map(|p| {
                (
                    p.id.clone(),
                    ScoreEntry {
                        name: p.name.clone(),
                        score: p.score,
                    },
                )
            })
            .collect()
    }

    pub fn room_summary(room: &Room, max_players: usize) -> RoomSummary {
        let humans = room.human_count();
        RoomSummary {
            id: room.id.clone(),
            name: room.name.clone(),
            map_id: room.map.id.clone(),
            map_name: room.map.name.clone(),
            player_count: humans,
            bot_count: room.bot_count(),
            max_players,
            is_full: humans >= max_players,
        }
    }
}

/// Lobby listing plus population totals, published after every command
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LobbySnapshot {
    pub rooms: BTreeMap<RoomId, RoomSummary>,
    pub human_players: usize,
    pub bot_players: usize,
}

impl LobbySnapshot {
    pub fn new(rooms: BTreeMap<RoomId, RoomSummary>) -> Self {
        let human_players = rooms.values().map(|r| r.player_count).sum();
        let bot_players = rooms.values().map(|r| r.bot_count).sum();
        Self {
            rooms,
            human_players,
            bot_players,
        }
    }
}
