//! Game simulation modules

pub mod bot;
pub mod classes;
pub mod collision;
pub mod combat;
pub mod geometry;
pub mod maps;
pub mod outbox;
pub mod registry;
pub mod room;
pub mod server;
pub mod snapshot;

pub use registry::RegistryError;
pub use server::{GameHandle, GameServer, ServerError};

use uuid::Uuid;

/// Transport connection identifier, also the player id of a human
pub type ConnectionId = Uuid;
