//! Configuration module - environment variable parsing

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

/// Application configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    /// Server binding address
    pub server_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Allowed client origins for CORS (comma-separated, `*` for any)
    pub client_origin: String,
    /// Directory holding the browser client bundle, served at `/`
    pub static_dir: Option<PathBuf>,
    /// Bearer token required by operator endpoints; open when unset
    pub admin_token: Option<String>,
    /// Simulation tuning shared by every room
    pub game: GameConfig,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        // Hosting platforms provide PORT, fall back to SERVER_ADDR or default
        let server_addr = if let Ok(port) = env::var("PORT") {
            format!("0.0.0.0:{}", port)
        } else {
            env::var("SERVER_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string())
        };

        Ok(Self {
            server_addr: server_addr
                .parse()
                .map_err(|_| ConfigError::InvalidAddress)?,
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            client_origin: env::var("CLIENT_ORIGIN").unwrap_or_else(|_| "*".to_string()),
            static_dir: env::var("STATIC_DIR").ok().map(PathBuf::from),
            admin_token: env::var("ADMIN_TOKEN").ok().filter(|t| !t.trim().is_empty()),
            game: GameConfig::from_env()?,
        })
    }
}

/// Immutable simulation inputs. Distances are map units, speeds are units per tick.
#[derive(Clone, Debug, PartialEq)]
pub struct GameConfig {
    /// Maximum human players per room
    pub max_players: usize,
    /// Maximum bots a room may be created with
    pub max_bots: usize,
    /// Total players (human + bot) needed to leave `waiting`
    pub min_players_to_start: usize,
    /// Score that ends the game
    pub win_score: u32,
    /// Collision radius of a tank
    pub tank_radius: f32,
    /// Distance from tank center to muzzle
    pub barrel_length: f32,
    /// Bullets older than this are removed
    pub bullet_lifetime_ms: u64,
    pub starting_health: f32,
    /// Simulation steps per second
    pub tick_rate: u32,
    /// Human top speed; bots move at a fraction of it
    pub max_speed: f32,
    /// Damping applied to velocity on a rejected axis
    pub wall_bounce: f32,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            max_players: 4,
            max_bots: 3,
            min_players_to_start: 2,
            win_score: 10,
            tank_radius: 15.0,
            barrel_length: 20.0,
            bullet_lifetime_ms: 2000,
            starting_health: 100.0,
            tick_rate: 60,
            max_speed: 5.0,
            wall_bounce: 0.5,
        }
    }
}

impl GameConfig {
    /// Defaults overridden by any tuning variables present in the environment
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let config = Self {
            max_players: env_or("MAX_PLAYERS", defaults.max_players)?,
            max_bots: env_or("MAX_BOTS", defaults.max_bots)?,
            min_players_to_start: env_or("MIN_PLAYERS_TO_START", defaults.min_players_to_start)?,
            win_score: env_or("WIN_SCORE", defaults.win_score)?,
            tank_radius: env_or("TANK_RADIUS", defaults.tank_radius)?,
            barrel_length: env_or("BARREL_LENGTH", defaults.barrel_length)?,
            bullet_lifetime_ms: env_or("BULLET_LIFETIME_MS", defaults.bullet_lifetime_ms)?,
            starting_health: env_or("STARTING_HEALTH", defaults.starting_health)?,
            tick_rate: env_or("TICK_RATE", defaults.tick_rate)?,
            max_speed: env_or("MAX_SPEED", defaults.max_speed)?,
            wall_bounce: env_or("WALL_BOUNCE", defaults.wall_bounce)?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject tunings the simulation cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_players == 0 {
            return Err(ConfigError::OutOfRange("MAX_PLAYERS must be at least 1"));
        }
        if self.min_players_to_start == 0 {
            return Err(ConfigError::OutOfRange("MIN_PLAYERS_TO_START must be at least 1"));
        }
        if self.win_score == 0 {
            return Err(ConfigError::OutOfRange("WIN_SCORE must be at least 1"));
        }
        if self.tick_rate == 0 || self.tick_rate > 1000 {
            return Err(ConfigError::OutOfRange("TICK_RATE must be within 1..=1000"));
        }
        if !(self.tank_radius > 0.0) {
            return Err(ConfigError::OutOfRange("TANK_RADIUS must be positive"));
        }
        if !(self.starting_health > 0.0) {
            return Err(ConfigError::OutOfRange("STARTING_HEALTH must be positive"));
        }
        if !(0.0..=1.0).contains(&self.wall_bounce) {
            return Err(ConfigError::OutOfRange("WALL_BOUNCE must be within 0..=1"));
        }
        Ok(())
    }
}

fn env_or<T: FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid { key, value: raw }),
        Err(_) => Ok(default),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid server address format")]
    InvalidAddress,

    #[error("Invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },

    #[error("{0}")]
    OutOfRange(&'static str),
}
