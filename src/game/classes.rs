//! Tank class profiles - weapon and ability stats per class

use serde::{Deserialize, Serialize};

/// Tank classes available in the game
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TankClassId {
    /// Balanced gun with a speed boost
    #[default]
    Speedo,
    /// Fast, hard-hitting, slow to reload
    Sniper,
    /// Rapid fire with random spread
    Gatling,
    /// Fans several pellets per shot
    Shotgun,
}

impl TankClassId {
    pub const ALL: [TankClassId; 4] = [
        TankClassId::Speedo,
        TankClassId::Sniper,
        TankClassId::Gatling,
        TankClassId::Shotgun,
    ];

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "speedo" => Some(Self::Speedo),
            "sniper" => Some(Self::Sniper),
            "gatling" => Some(Self::Gatling),
            "shotgun" => Some(Self::Shotgun),
            _ => None,
        }
    }

    /// Unknown or missing ids resolve to the default class
    pub fn resolve(raw: Option<&str>) -> Self {
        raw.and_then(Self::parse).unwrap_or_default()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Speedo => "speedo",
            Self::Sniper => "sniper",
            Self::Gatling => "gatling",
            Self::Shotgun => "shotgun",
        }
    }
}

/// Several bullets fanned evenly over `spread_deg` per shot
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Volley {
    pub count: u32,
    pub spread_deg: f32,
}

/// Temporary speed multiplier gated by duration and cooldown
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoostProfile {
    pub cooldown_ms: u64,
    pub duration_ms: u64,
    pub speed_multiplier: f32,
}

/// Per-tank boost timers, in server milliseconds
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BoostState {
    pub active_until: u64,
    pub ready_at: u64,
}

impl BoostState {
    pub fn is_active(&self, now: u64) -> bool {
        now < self.active_until
    }

    /// Start a boost if the cooldown has elapsed, returning when it ends
    pub fn activate(&mut self, profile: &BoostProfile, now: u64) -> Option<u64> {
        if now < self.ready_at {
            return None;
        }
        self.active_until = now + profile.duration_ms;
        self.ready_at = self.active_until + profile.cooldown_ms;
        Some(self.active_until)
    }
}

/// Stats for one tank class
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TankClass {
    pub bullet_speed: f32,
    pub bullet_damage: f32,
    pub shoot_cooldown_ms: u64,
    /// Random offset within +/- this many degrees per shot
    pub bullet_spread_deg: f32,
    pub volley: Option<Volley>,
    pub boost: Option<BoostProfile>,
}

impl TankClass {
    /// Movement multiplier at `now`, 1.0 unless a boost is running
    pub fn speed_multiplier(&self, boost: &BoostState, now: u64) -> f32 {
        match self.boost {
            Some(profile) if boost.is_active(now) => profile.speed_multiplier,
            _ => 1.0,
        }
    }

    pub fn for_class(id: TankClassId) -> Self {
        match id {
            TankClassId::Speedo => Self {
                bullet_speed: 10.0,
                bullet_damage: 25.0,
                shoot_cooldown_ms: 300,
                bullet_spread_deg: 0.0,
                volley: None,
                boost: Some(BoostProfile {
                    cooldown_ms: 3000,
                    duration_ms: 1000,
                    speed_multiplier: 1.8,
                }),
            },
            TankClassId::Sniper => Self {
                bullet_speed: 18.0,
                bullet_damage: 50.0,
                shoot_cooldown_ms: 1000,
                bullet_spread_deg: 0.0,
                volley: None,
                boost: None,
            },
            TankClassId::Gatling => Self {
                bullet_speed: 12.0,
                bullet_damage: 10.0,
                shoot_cooldown_ms: 100,
                bullet_spread_deg: 8.0,
                volley: None,
                boost: None,
            },
            TankClassId::Shotgun => Self {
                bullet_speed: 9.0,
                bullet_damage: 15.0,
                shoot_cooldown_ms: 800,
                bullet_spread_deg: 0.0,
                volley: Some(Volley {
                    count: 5,
                    spread_deg: 30.0,
                }),
                boost: None,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_class_falls_back_to_default() {
        assert_eq!(TankClassId::resolve(Some("railgun")), TankClassId::Speedo);
        assert_eq!(TankClassId::resolve(None), TankClassId::Speedo);
        assert_eq!(TankClassId::resolve(Some(" Sniper ")), TankClassId::Sniper);
    }

    #[test]
    fn ids_round_trip_through_names() {
        for id in TankClassId::ALL {
            assert_eq!(TankClassId::parse(id.as_str()), Some(id));
        }
    }

    #[test]
    fn only_speedo_can_boost() {
        for id in TankClassId::ALL {
            let class = TankClass::for_class(id);
            assert_eq!(class.boost.is_some(), id == TankClassId::Speedo);
        }
    }

    #[test]
    fn boost_respects_duration_and_cooldown() {
        let class = TankClass::for_class(TankClassId::Speedo);
        let profile = class.boost.unwrap();
        let mut state = BoostState::default();

        assert_eq!(state.activate(&profile, 10_000), Some(11_000));
        assert_eq!(class.speed_multiplier(&state, 10_500), 1.8);
        assert_eq!(class.speed_multiplier(&state, 11_000), 1.0);

        assert_eq!(state.activate(&profile, 13_999), None);
        assert_eq!(state.activate(&profile, 14_000), Some(15_000));
    }

    #[test]
    fn shotgun_fans_five_pellets() {
        let volley = TankClass::for_class(TankClassId::Shotgun).volley.unwrap();
        assert_eq!(volley.count, 5);
        assert_eq!(volley.spread_deg, 30.0);
    }
}
