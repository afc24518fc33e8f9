//! Bot decision making: target acquisition, wandering, pursuit and firing

use rand::Rng;
use std::f32::consts::TAU;

use super::classes::TankClass;
use super::collision::{resolve_move, Arena, TANK_BLOCKERS};
use super::geometry::distance;
use super::room::Player;

/// Bots pursue enemies closer than this
pub const ENGAGE_RADIUS: f32 = 400.0;
/// Bots open fire on enemies closer than this
pub const FIRE_RANGE: f32 = 350.0;
/// Added on top of the class cooldown so bots don't fire frame-perfectly
pub const REACTION_DELAY_MS: u64 = 200;
/// Fraction of the human top speed a bot drives at
pub const SPEED_FACTOR: f32 = 0.6;

pub const BOT_NAMES: [&str; 5] = ["Bot Alpha", "Bot Bravo", "Bot Charlie", "Bot Delta", "Bot Echo"];

/// Per-bot wander state
#[derive(Debug, Clone, PartialEq)]
pub struct BotBrain {
    pub wander_angle: f32,
    /// Ticks left before picking a new wander heading
    pub wander_ticks: i32,
}

impl BotBrain {
    pub fn new<R: Rng>(rng: &mut R) -> Self {
        Self {
            wander_angle: rng.gen_range(0.0..TAU),
            wander_ticks: 0,
        }
    }

    fn reroll<R: Rng>(&mut self, rng: &mut R, ticks: i32) {
        self.wander_angle = rng.gen_range(0.0..TAU);
        self.wander_ticks = ticks;
    }
}

/// Nearest other player as seen from a bot
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Target {
    pub index: usize,
    pub x: f32,
    pub y: f32,
    pub distance: f32,
}

/// Everything a bot needs to know about the world besides itself
#[derive(Debug, Clone, Copy)]
pub struct BotContext<'a> {
    pub arena: Arena<'a>,
    pub tank_radius: f32,
    /// Distance covered per tick, boost already applied
    pub step: f32,
    pub tick_rate: u32,
    pub now: u64,
}

/// What a bot wants to do this tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BotDecision {
    pub x: f32,
    pub y: f32,
    pub angle: f32,
    /// Aim angle when the bot pulls the trigger
    pub fire: Option<f32>,
    /// Bot wants its class boost
    pub boost: bool,
}

pub struct BotController;

impl BotController {
    /// Nearest player other than `bot_index`, by Euclidean distance
    pub fn nearest_enemy(bot_index: usize, players: &[Player]) -> Option<Target> {
        let bot = players.get(bot_index)?;
        players
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != bot_index)
            .map(|(index, p)| Target {
                index,
                x: p.x,
                y: p.y,
                distance: distance(bot.x, bot.y, p.x, p.y),
            })
            .min_by(|a, b| a.distance.total_cmp(&b.distance))
    }

    /// Run one decision step for a bot
    pub fn decide<R: Rng>(
        bot: &Player,
        brain: &mut BotBrain,
        target: Option<Target>,
        class: &TankClass,
        ctx: BotContext<'_>,
        rng: &mut R,
    ) -> BotDecision {
        let rate = ctx.tick_rate.max(1) as i32;

        brain.wander_ticks -= 1;
        if brain.wander_ticks <= 0 {
            let ticks = rng.gen_range(rate..=rate * 3);
            brain.reroll(rng, ticks);
        }

        let aim = target.map(|t| (t.y - bot.y).atan2(t.x - bot.x));
        let heading = match (target, aim) {
            (Some(t), Some(a)) if t.distance < ENGAGE_RADIUS => a,
            _ => brain.wander_angle,
        };

        let proposed = (
            bot.x + heading.cos() * ctx.step,
            bot.y + heading.sin() * ctx.step,
        );
        let outcome = resolve_move((bot.x, bot.y), proposed, ctx.tank_radius, ctx.arena, TANK_BLOCKERS);
        if !outcome.is_clear() {
            // Stuck against something, try elsewhere soon
            brain.reroll(rng, (rate / 2).max(1));
        }

        let fire = match (target, aim) {
            (Some(t), Some(a)) if t.distance < FIRE_RANGE && Self::reloaded(bot, class, ctx.now) => Some(a),
            _ => None,
        };

        let boost = class.boost.is_some()
            && target.is_some_and(|t| t.distance < ENGAGE_RADIUS && t.distance >= FIRE_RANGE);

        BotDecision {
            x: outcome.x,
            y: outcome.y,
            angle: aim.unwrap_or(bot.angle),
            fire,
            boost,
        }
    }

    fn reloaded(bot: &Player, class: &TankClass, now: u64) -> bool {
        bot.last_shot_at
            .map_or(true, |last| now.saturating_sub(last) > class.shoot_cooldown_ms + REACTION_DELAY_MS)
    }
}
