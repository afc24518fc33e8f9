//! Application state shared across routes

use std::sync::Arc;

use crate::config::Config;
use crate::game::maps::MapCatalog;
use crate::game::{GameHandle, GameServer};
use crate::ws::hub::SessionHub;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub game: GameHandle,
    pub hub: SessionHub,
}

impl AppState {
    /// Build the state plus the game loop the caller must spawn
    pub fn new(config: Config) -> (Self, GameServer) {
        let config = Arc::new(config);
        let hub = SessionHub::new();

        let (server, game) = GameServer::new(
            Arc::new(config.game.clone()),
            MapCatalog::builtin(),
            hub.clone(),
            rand::random(),
        );

        let state = Self { config, game, hub };
        (state, server)
    }
}
