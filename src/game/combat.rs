//! Combat system - bullets, firing patterns, hit detection

use rand::Rng;

use super::classes::TankClass;
use super::collision::{bullet_blocked, Obstacle};
use super::geometry::distance;
use super::room::{Player, PlayerId};

/// Shots arriving up to this early are still honored, to absorb network jitter
pub const COOLDOWN_TOLERANCE_MS: u64 = 50;

/// Active bullet in a room
#[derive(Debug, Clone, PartialEq)]
pub struct Bullet {
    pub id: String,
    pub owner_id: PlayerId,
    pub x: f32,
    pub y: f32,
    pub angle: f32,
    /// Captured from the firing class at spawn; never re-read
    pub speed: f32,
    /// Captured from the firing class at spawn; never re-read
    pub damage: f32,
    pub created_at: u64,
}

impl Bullet {
    /// Create a new bullet with the firing class's stats frozen in
    pub fn new(
        id: String,
        owner_id: PlayerId,
        x: f32,
        y: f32,
        angle: f32,
        class: &TankClass,
        now: u64,
    ) -> Self {
        Self {
            id,
            owner_id,
            x,
            y,
            angle,
            speed: class.bullet_speed,
            damage: class.bullet_damage,
            created_at: now,
        }
    }

    /// Move one tick along the heading, returning the previous position
    pub fn advance(&mut self) -> (f32, f32) {
        let old = (self.x, self.y);
        self.x += self.angle.cos() * self.speed;
        self.y += self.angle.sin() * self.speed;
        old
    }

    pub fn expired(&self, now: u64, lifetime_ms: u64) -> bool {
        now.saturating_sub(self.created_at) > lifetime_ms
    }

    pub fn out_of_bounds(&self, width: f32, height: f32) -> bool {
        self.x < 0.0 || self.x > width || self.y < 0.0 || self.y > height
    }
}

/// What happened to a bullet during one tick of flight
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flight {
    /// Still airborne, may hit a player
    Airborne,
    /// Travelled segment crossed a wall
    HitWall,
    /// Left the map or outlived its lifetime
    Expired,
}

/// Combat system for firing patterns, cooldowns and damage
pub struct CombatSystem;

impl CombatSystem {
    /// Check if a shooter's cooldown has elapsed
    pub fn can_fire(last_shot_at: Option<u64>, now: u64, cooldown_ms: u64) -> bool {
        match last_shot_at {
            Some(last) => now.saturating_sub(last) >= cooldown_ms,
            None => true,
        }
    }

    /// Headings of every bullet produced by one trigger pull
    pub fn volley_angles<R: Rng>(class: &TankClass, aim: f32, rng: &mut R) -> Vec<f32> {
        if let Some(volley) = class.volley {
            if volley.count <= 1 {
                // A one-pellet volley has no angular step
                return vec![aim];
            }
            let spread = volley.spread_deg.to_radians();
            let step = spread / (volley.count - 1) as f32;
            let start = aim - spread / 2.0;
            return (0..volley.count).map(|i| start + step * i as f32).collect();
        }

        if class.bullet_spread_deg > 0.0 {
            let offset = rng.gen_range(-1.0f32..=1.0) * class.bullet_spread_deg.to_radians();
            return vec![aim + offset];
        }

        vec![aim]
    }

    /// Bullet ids are the spawn time and owner, plus an index within a volley
    pub fn bullet_id(now: u64, owner_id: &str, index: Option<usize>) -> String {
        match index {
            Some(i) => format!("{}-{}-{}", now, owner_id, i),
            None => format!("{}-{}", now, owner_id),
        }
    }

    /// Advance a bullet one tick and classify the result
    pub fn fly(
        bullet: &mut Bullet,
        obstacles: &[Obstacle],
        width: f32,
        height: f32,
        now: u64,
        lifetime_ms: u64,
    ) -> Flight {
        let old = bullet.advance();
        if bullet_blocked(old, (bullet.x, bullet.y), obstacles) {
            return Flight::HitWall;
        }
        if bullet.out_of_bounds(width, height) || bullet.expired(now, lifetime_ms) {
            return Flight::Expired;
        }
        Flight::Airborne
    }

    /// Index of the first non-owner player strictly within `radius` of the bullet
    pub fn find_target(bullet: &Bullet, players: &[Player], radius: f32) -> Option<usize> {
        players.iter().position(|p| {
            p.id != bullet.owner_id && distance(bullet.x, bullet.y, p.x, p.y) < radius
        })
    }

    /// Apply damage to health, returns (new_health, is_dead). Health may go negative.
    pub fn apply_damage(current_health: f32, damage: f32) -> (f32, bool) {
        let new_health = current_health - damage;
        (new_health, new_health <= 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::classes::{TankClassId, Volley};
    use crate::game::room::Player;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn bullet_at(x: f32, y: f32, angle: f32, speed: f32) -> Bullet {
        Bullet {
            id: "1-a".into(),
            owner_id: "a".into(),
            x,
            y,
            angle,
            speed,
            damage: 25.0,
            created_at: 1_000,
        }
    }

    #[test]
    fn shotgun_fans_symmetrically() {
        let class = TankClass::for_class(TankClassId::Shotgun);
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let angles = CombatSystem::volley_angles(&class, 0.0, &mut rng);
        let expected = [-15.0f32, -7.5, 0.0, 7.5, 15.0].map(f32::to_radians);
        assert_eq!(angles.len(), 5);
        for (got, want) in angles.iter().zip(expected) {
            assert!((got - want).abs() < 1e-6, "{got} != {want}");
        }
    }

    #[test]
    fn single_pellet_volley_fires_straight() {
        let class = TankClass {
            volley: Some(Volley {
                count: 1,
                spread_deg: 30.0,
            }),
            ..TankClass::for_class(TankClassId::Shotgun)
        };
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        assert_eq!(CombatSystem::volley_angles(&class, 0.7, &mut rng), vec![0.7]);
    }

    #[test]
    fn gatling_spread_stays_within_bounds() {
        let class = TankClass::for_class(TankClassId::Gatling);
        let limit = class.bullet_spread_deg.to_radians() + 1e-6;
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        for _ in 0..200 {
            let angles = CombatSystem::volley_angles(&class, 1.0, &mut rng);
            assert_eq!(angles.len(), 1);
            assert!((angles[0] - 1.0).abs() <= limit);
        }
    }

    #[test]
    fn sniper_fires_exactly_on_aim() {
        let class = TankClass::for_class(TankClassId::Sniper);
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        assert_eq!(CombatSystem::volley_angles(&class, -2.0, &mut rng), vec![-2.0]);
    }

    #[test]
    fn bullet_ids_encode_time_owner_and_index() {
        assert_eq!(CombatSystem::bullet_id(42, "p1", None), "42-p1");
        assert_eq!(CombatSystem::bullet_id(42, "p1", Some(3)), "42-p1-3");
    }

    #[test]
    fn cooldown_gates_firing() {
        assert!(CombatSystem::can_fire(None, 0, 300));
        assert!(!CombatSystem::can_fire(Some(1_000), 1_299, 300));
        assert!(CombatSystem::can_fire(Some(1_000), 1_300, 300));
    }

    #[test]
    fn bullet_stopped_by_wall_on_first_crossing_tick() {
        let wall = [Obstacle::wall(5.0, -5.0, 10.0, 10.0)];
        let mut bullet = bullet_at(0.0, 0.0, 0.0, 10.0);
        let flight = CombatSystem::fly(&mut bullet, &wall, 1000.0, 1000.0, 1_000, 2_000);
        assert_eq!(flight, Flight::HitWall);
    }

    #[test]
    fn bullet_flies_past_water() {
        let water = [Obstacle::water(5.0, -5.0, 10.0, 10.0)];
        let mut bullet = bullet_at(0.0, 0.0, 0.0, 10.0);
        let flight = CombatSystem::fly(&mut bullet, &water, 1000.0, 1000.0, 1_000, 2_000);
        assert_eq!(flight, Flight::Airborne);
        assert_eq!(bullet.x, 10.0);
    }

    #[test]
    fn bullet_expires_after_lifetime() {
        let mut bullet = bullet_at(100.0, 100.0, 0.0, 1.0);
        assert_eq!(
            CombatSystem::fly(&mut bullet, &[], 1000.0, 1000.0, 3_000, 2_000),
            Flight::Airborne
        );
        assert_eq!(
            CombatSystem::fly(&mut bullet, &[], 1000.0, 1000.0, 3_001, 2_000),
            Flight::Expired
        );
    }

    #[test]
    fn bullet_leaving_map_expires() {
        let mut bullet = bullet_at(995.0, 100.0, 0.0, 10.0);
        assert_eq!(
            CombatSystem::fly(&mut bullet, &[], 1000.0, 1000.0, 1_000, 2_000),
            Flight::Expired
        );
    }

    #[test]
    fn owner_is_never_hit_and_first_player_wins() {
        let bullet = bullet_at(100.0, 100.0, 0.0, 10.0);
        let players = vec![
            Player::test_dummy("a", 100.0, 100.0),
            Player::test_dummy("b", 105.0, 100.0),
            Player::test_dummy("c", 101.0, 100.0),
        ];
        assert_eq!(CombatSystem::find_target(&bullet, &players, 15.0), Some(1));
    }

    #[test]
    fn damage_can_push_health_below_zero() {
        assert_eq!(CombatSystem::apply_damage(20.0, 50.0), (-30.0, true));
        assert_eq!(CombatSystem::apply_damage(100.0, 25.0), (75.0, false));
    }
}
