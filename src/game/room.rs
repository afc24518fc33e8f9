//! Room state and per-room simulation

use std::f32::consts::TAU;
use std::sync::Arc;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use tracing::{debug, info};

use crate::config::GameConfig;
use crate::ws::protocol::ServerMsg;

use super::bot::{BotBrain, BotContext, BotController, BOT_NAMES, SPEED_FACTOR};
use super::classes::{BoostState, TankClass, TankClassId};
use super::collision::{resolve_move, TANK_BLOCKERS};
use super::combat::{Bullet, CombatSystem, Flight, COOLDOWN_TOLERANCE_MS};
use super::geometry::distance;
use super::maps::GameMap;
use super::outbox::Outbox;
use super::snapshot::SnapshotBuilder;
use super::ConnectionId;

pub type PlayerId = String;
pub type RoomId = String;

pub const TANK_COLORS: [&str; 6] = ["#4CAF50", "#2196F3", "#FF9800", "#E91E63", "#9C27B0", "#00BCD4"];

/// Slack allowed between a tank's barrel tip and the muzzle position it reports
const MUZZLE_SLACK: f32 = 10.0;

const CODE_CHARS: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Random uppercase alphanumeric code
pub fn random_code<R: Rng>(rng: &mut R, len: usize) -> String {
    (0..len)
        .map(|_| CODE_CHARS[rng.gen_range(0..CODE_CHARS.len())] as char)
        .collect()
}

/// Room phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RoomState {
    /// Not enough players yet
    Waiting,
    Playing,
    /// Someone reached the win score
    Ended,
}

/// A tank in a room (authoritative)
#[derive(Debug, Clone)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub x: f32,
    pub y: f32,
    pub angle: f32,
    pub color: &'static str,
    pub score: u32,
    pub health: f32,
    pub tank_class: TankClassId,
    /// Owning connection; `None` for bots
    pub connection: Option<ConnectionId>,
    pub last_shot_at: Option<u64>,
    pub boost: BoostState,
    /// AI state; present only on bots
    pub brain: Option<BotBrain>,
}

impl Player {
    fn new(
        id: PlayerId,
        name: String,
        (x, y): (f32, f32),
        color: &'static str,
        health: f32,
        tank_class: TankClassId,
    ) -> Self {
        Self {
            id,
            name,
            x,
            y,
            angle: 0.0,
            color,
            score: 0,
            health,
            tank_class,
            connection: None,
            last_shot_at: None,
            boost: BoostState::default(),
            brain: None,
        }
    }

    pub fn is_bot(&self) -> bool {
        self.brain.is_some()
    }

    pub fn class(&self) -> TankClass {
        TankClass::for_class(self.tank_class)
    }

    #[cfg(test)]
    pub fn test_dummy(id: &str, x: f32, y: f32) -> Self {
        Self::new(
            id.to_string(),
            id.to_string(),
            (x, y),
            TANK_COLORS[0],
            100.0,
            TankClassId::default(),
        )
    }
}

/// One independent match
pub struct Room {
    pub id: RoomId,
    pub name: String,
    pub map: Arc<GameMap>,
    pub state: RoomState,
    /// Insertion order; hit detection and bot updates follow it
    pub players: Vec<Player>,
    pub bullets: Vec<Bullet>,
    pub bot_ids: Vec<PlayerId>,
    config: Arc<GameConfig>,
    rng: ChaCha8Rng,
}

impl Room {
    pub fn new(id: RoomId, name: String, map: Arc<GameMap>, config: Arc<GameConfig>, seed: u64) -> Self {
        Self {
            id,
            name,
            map,
            state: RoomState::Waiting,
            players: Vec::new(),
            bullets: Vec::new(),
            bot_ids: Vec::new(),
            config,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn player_index(&self, id: &str) -> Option<usize> {
        self.players.iter().position(|p| p.id == id)
    }

    pub fn player(&self, id: &str) -> Option<&Player> {
        self.players.iter().find(|p| p.id == id)
    }

    pub fn human_count(&self) -> usize {
        self.players.iter().filter(|p| !p.is_bot()).count()
    }

    pub fn bot_count(&self) -> usize {
        self.bot_ids.len()
    }

    pub fn is_full(&self) -> bool {
        self.human_count() >= self.config.max_players
    }

    /// Random map spawn point, or a random spot inside the map when it defines none
    fn spawn_point(&mut self) -> (f32, f32) {
        if !self.map.spawn_points.is_empty() {
            let sp = self.map.spawn_points[self.rng.gen_range(0..self.map.spawn_points.len())];
            return (sp.x, sp.y);
        }
        let margin = self.config.tank_radius * 2.0;
        let mut axis = |dim: f32| {
            if dim - margin > margin {
                self.rng.gen_range(margin..dim - margin)
            } else {
                dim / 2.0
            }
        };
        let x = axis(self.map.width);
        let y = axis(self.map.height);
        (x, y)
    }

    fn random_color(&mut self) -> &'static str {
        TANK_COLORS[self.rng.gen_range(0..TANK_COLORS.len())]
    }

    /// Add a bot with a random class at a random spawn point
    pub fn add_bot(&mut self) -> PlayerId {
        let id = loop {
            let candidate = format!("bot_{}", random_code(&mut self.rng, 6));
            if self.player_index(&candidate).is_none() {
                break candidate;
            }
        };
        let name = BOT_NAMES[self.bot_ids.len() % BOT_NAMES.len()].to_string();
        let class = TankClassId::ALL[self.rng.gen_range(0..TankClassId::ALL.len())];
        let spawn = self.spawn_point();
        let color = self.random_color();

        let mut bot = Player::new(id.clone(), name, spawn, color, self.config.starting_health, class);
        bot.angle = self.rng.gen_range(0.0..TAU);
        bot.brain = Some(BotBrain::new(&mut self.rng));

        self.players.push(bot);
        self.bot_ids.push(id.clone());
        id
    }

    /// Place a human at a random spawn point. Capacity is checked by the caller.
    pub fn add_human(&mut self, connection: ConnectionId, class: TankClassId) -> PlayerId {
        let id = connection.to_string();
        if self.player_index(&id).is_some() {
            return id;
        }
        let name = format!("Player {}", id.chars().take(4).collect::<String>());
        let spawn = self.spawn_point();
        let color = self.random_color();

        let mut player = Player::new(id.clone(), name, spawn, color, self.config.starting_health, class);
        player.connection = Some(connection);
        self.players.push(player);
        id
    }

    /// Remove a player and tell the room. Bullets they fired stay in flight.
    pub fn remove_player(&mut self, player_id: &str, out: &mut Outbox) -> Option<Player> {
        let index = self.player_index(player_id)?;
        let player = self.players.remove(index);
        self.bot_ids.retain(|id| id != player_id);
        out.to_room(
            &self.id,
            ServerMsg::PlayerLeft {
                player_id: player.id.clone(),
            },
        );
        Some(player)
    }

    /// `waiting -> playing` once enough tanks are present
    pub fn check_game_start(&mut self, out: &mut Outbox) {
        if self.state != RoomState::Waiting || self.players.len() < self.config.min_players_to_start {
            return;
        }
        self.state = RoomState::Playing;
        out.to_room(&self.id, ServerMsg::GameStarted);
        info!(room_id = %self.id, players = self.players.len(), "Game started");
    }

    /// Operator reset back to `waiting` with every score zeroed
    pub fn reset(&mut self, out: &mut Outbox) {
        for bullet in self.bullets.drain(..) {
            out.to_room(&self.id, ServerMsg::BulletRemoved { bullet_id: bullet.id });
        }
        for player in &mut self.players {
            player.score = 0;
            player.health = self.config.starting_health;
            player.last_shot_at = None;
            player.boost = BoostState::default();
        }
        self.state = RoomState::Waiting;
        out.to_room(
            &self.id,
            ServerMsg::GameReset {
                players: SnapshotBuilder::players(&self.players),
            },
        );
        info!(room_id = %self.id, "Room reset");
        self.check_game_start(out);
    }

    /// Validate a client-reported position. Corrected moves are echoed to the mover too.
    pub fn handle_move(&mut self, player_id: &str, x: f32, y: f32, angle: f32, out: &mut Outbox) {
        let Some(index) = self.player_index(player_id) else {
            return;
        };
        let radius = self.config.tank_radius;
        let arena = self.map.arena();
        let player = &mut self.players[index];

        let proposed = if x.is_finite() && y.is_finite() {
            (x, y)
        } else {
            (player.x, player.y)
        };
        let outcome = resolve_move((player.x, player.y), proposed, radius, arena, TANK_BLOCKERS);
        if outcome.is_blocked() {
            debug!(room_id = %self.id, player_id, "Move blocked on both axes");
        }
        player.x = outcome.x;
        player.y = outcome.y;
        if angle.is_finite() {
            player.angle = angle;
        }

        let msg = ServerMsg::PlayerMoved {
            id: player.id.clone(),
            x: player.x,
            y: player.y,
            angle: player.angle,
        };
        let corrected = (outcome.x, outcome.y) != (x, y);
        match player.connection {
            Some(connection) if !corrected => out.to_room_except(&self.id, connection, msg),
            _ => out.to_room(&self.id, msg),
        }
    }

    /// Human trigger pull, gated by room state and class cooldown
    pub fn handle_shoot(&mut self, player_id: &str, x: f32, y: f32, angle: f32, now: u64, out: &mut Outbox) {
        if self.state != RoomState::Playing {
            debug!(room_id = %self.id, player_id, "Shot ignored outside play");
            return;
        }
        let Some(index) = self.player_index(player_id) else {
            return;
        };
        let player = &self.players[index];
        let class = player.class();

        let min_gap = class.shoot_cooldown_ms.saturating_sub(COOLDOWN_TOLERANCE_MS);
        if !CombatSystem::can_fire(player.last_shot_at, now, min_gap) {
            debug!(room_id = %self.id, player_id, "Shot dropped, weapon cooling down");
            return;
        }

        let aim = if angle.is_finite() { angle } else { player.angle };
        let reach = self.config.tank_radius + self.config.barrel_length + MUZZLE_SLACK;
        let muzzle = if x.is_finite() && y.is_finite() && distance(player.x, player.y, x, y) <= reach {
            (x, y)
        } else {
            self.barrel_tip(index, aim)
        };

        self.fire(index, muzzle, aim, now, out);
    }

    pub fn change_class(&mut self, player_id: &str, class: TankClassId, out: &mut Outbox) -> bool {
        let Some(index) = self.player_index(player_id) else {
            return false;
        };
        let player = &mut self.players[index];
        // Boost timers survive the swap so the cooldown cannot be skipped
        player.tank_class = class;
        out.to_room(
            &self.id,
            ServerMsg::ClassChanged {
                player_id: player.id.clone(),
                tank_class: class,
            },
        );
        true
    }

    /// Activate the player's class boost if it has one and it is ready
    pub fn try_boost(&mut self, player_id: &str, now: u64, out: &mut Outbox) -> bool {
        let Some(index) = self.player_index(player_id) else {
            return false;
        };
        let player = &mut self.players[index];
        let Some(profile) = player.class().boost else {
            return false;
        };
        match player.boost.activate(&profile, now) {
            Some(until) => {
                out.to_room(
                    &self.id,
                    ServerMsg::PlayerBoosted {
                        player_id: player.id.clone(),
                        until,
                    },
                );
                true
            }
            None => false,
        }
    }

    /// One simulation step: bots first, then bullets. Idle unless playing.
    pub fn tick(&mut self, now: u64, out: &mut Outbox) {
        if self.state != RoomState::Playing {
            return;
        }
        self.update_bots(now, out);
        self.update_bullets(now, out);
    }

    fn barrel_tip(&self, index: usize, aim: f32) -> (f32, f32) {
        let player = &self.players[index];
        let barrel = self.config.barrel_length;
        (player.x + aim.cos() * barrel, player.y + aim.sin() * barrel)
    }

    /// Spawn every bullet of one trigger pull; shared by humans and bots
    fn fire(&mut self, index: usize, (x, y): (f32, f32), aim: f32, now: u64, out: &mut Outbox) {
        let player = &mut self.players[index];
        player.last_shot_at = Some(now);
        let class = player.class();
        let owner = player.id.clone();

        let angles = CombatSystem::volley_angles(&class, aim, &mut self.rng);
        let indexed = angles.len() > 1;
        for (i, angle) in angles.into_iter().enumerate() {
            let id = CombatSystem::bullet_id(now, &owner, indexed.then_some(i));
            let bullet = Bullet::new(id, owner.clone(), x, y, angle, &class, now);
            out.to_room(
                &self.id,
                ServerMsg::BulletFired {
                    bullet: SnapshotBuilder::bullet(&bullet),
                },
            );
            self.bullets.push(bullet);
        }
    }

    fn update_bots(&mut self, now: u64, out: &mut Outbox) {
        for index in 0..self.players.len() {
            let Some(mut brain) = self.players[index].brain.take() else {
                continue;
            };
            let target = BotController::nearest_enemy(index, &self.players);
            let bot = &self.players[index];
            let class = bot.class();
            let ctx = BotContext {
                arena: self.map.arena(),
                tank_radius: self.config.tank_radius,
                step: self.config.max_speed * SPEED_FACTOR * class.speed_multiplier(&bot.boost, now),
                tick_rate: self.config.tick_rate,
                now,
            };
            let decision = BotController::decide(bot, &mut brain, target, &class, ctx, &mut self.rng);

            let bot = &mut self.players[index];
            bot.brain = Some(brain);
            bot.x = decision.x;
            bot.y = decision.y;
            bot.angle = decision.angle;

            if decision.boost {
                if let Some(profile) = class.boost {
                    if let Some(until) = bot.boost.activate(&profile, now) {
                        out.to_room(
                            &self.id,
                            ServerMsg::PlayerBoosted {
                                player_id: bot.id.clone(),
                                until,
                            },
                        );
                    }
                }
            }

            if let Some(aim) = decision.fire {
                let muzzle = self.barrel_tip(index, decision.angle);
                self.fire(index, muzzle, aim, now, out);
            }

            let bot = &self.players[index];
            out.to_room(
                &self.id,
                ServerMsg::PlayerMoved {
                    id: bot.id.clone(),
                    x: bot.x,
                    y: bot.y,
                    angle: bot.angle,
                },
            );
        }
    }

    /// Advance bullets in list order; every removed bullet is announced exactly once
    fn update_bullets(&mut self, now: u64, out: &mut Outbox) {
        let lifetime = self.config.bullet_lifetime_ms;
        let radius = self.config.tank_radius;
        let (width, height) = (self.map.width, self.map.height);

        let mut survivors = Vec::with_capacity(self.bullets.len());
        let mut pending = std::mem::take(&mut self.bullets).into_iter();

        while let Some(mut bullet) = pending.next() {
            match CombatSystem::fly(&mut bullet, &self.map.obstacles, width, height, now, lifetime) {
                Flight::HitWall | Flight::Expired => {
                    out.to_room(&self.id, ServerMsg::BulletRemoved { bullet_id: bullet.id });
                    continue;
                }
                Flight::Airborne => {}
            }

            let Some(target) = CombatSystem::find_target(&bullet, &self.players, radius) else {
                survivors.push(bullet);
                continue;
            };

            out.to_room(
                &self.id,
                ServerMsg::BulletRemoved {
                    bullet_id: bullet.id.clone(),
                },
            );
            self.resolve_hit(target, &bullet, out);

            if self.state == RoomState::Ended {
                survivors.extend(pending);
                break;
            }
        }

        if self.state == RoomState::Ended {
            for bullet in survivors {
                out.to_room(&self.id, ServerMsg::BulletRemoved { bullet_id: bullet.id });
            }
        } else {
            self.bullets = survivors;
        }
    }

    fn resolve_hit(&mut self, target: usize, bullet: &Bullet, out: &mut Outbox) {
        let victim = &mut self.players[target];
        let (health, destroyed) = CombatSystem::apply_damage(victim.health, bullet.damage);
        victim.health = health;
        out.to_room(
            &self.id,
            ServerMsg::PlayerHit {
                player_id: victim.id.clone(),
                health,
            },
        );
        if !destroyed {
            return;
        }
        debug!(room_id = %self.id, player_id = %victim.id, killer = %bullet.owner_id, "Tank destroyed");

        // The shooter may have left since firing
        if let Some(owner) = self.player_index(&bullet.owner_id) {
            let shooter = &mut self.players[owner];
            shooter.score += 1;
            out.to_room(
                &self.id,
                ServerMsg::ScoreUpdate {
                    player_id: shooter.id.clone(),
                    score: shooter.score,
                },
            );
            self.check_win(owner, out);
        }

        if self.state == RoomState::Playing {
            let (x, y) = self.spawn_point();
            let victim = &mut self.players[target];
            victim.x = x;
            victim.y = y;
            victim.health = self.config.starting_health;
            out.to_room(
                &self.id,
                ServerMsg::PlayerRespawned {
                    player: SnapshotBuilder::player(victim),
                },
            );
        }
    }

    /// `playing -> ended` when the scorer reaches the win score
    fn check_win(&mut self, scorer: usize, out: &mut Outbox) {
        if self.state != RoomState::Playing {
            return;
        }
        let winner = &self.players[scorer];
        if winner.score < self.config.win_score {
            return;
        }
        self.state = RoomState::Ended;
        info!(
            room_id = %self.id,
            winner_id = %winner.id,
            score = winner.score,
            "Game won"
        );
        out.to_room(
            &self.id,
            ServerMsg::GameWon {
                winner_id: winner.id.clone(),
                winner_name: winner.name.clone(),
                scores: SnapshotBuilder::scores(&self.players),
            },
        );
    }
}
