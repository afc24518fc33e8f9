//! Authoritative game loop: the single owner of rooms and sessions

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::config::GameConfig;
use crate::util::time::{tick_period, unix_millis, Timer};
use crate::ws::hub::SessionHub;
use crate::ws::protocol::{ClientMsg, ServerMsg};

use super::maps::MapCatalog;
use super::outbox::{Audience, Outbox};
use super::registry::{RegistryError, RoomRegistry, Session};
use super::room::RoomId;
use super::snapshot::LobbySnapshot;
use super::ConnectionId;

const COMMAND_QUEUE: usize = 1024;

/// Everything the transport and HTTP layers can ask of the game loop
#[derive(Debug)]
pub enum Command {
    Connected {
        connection_id: ConnectionId,
    },
    Input {
        connection_id: ConnectionId,
        msg: ClientMsg,
    },
    Disconnected {
        connection_id: ConnectionId,
    },
    ResetRoom {
        room_id: RoomId,
        reply: oneshot::Sender<Result<(), RegistryError>>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ServerError {
    #[error("Game server is not running")]
    Closed,

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// Cloneable handle used by sockets and HTTP handlers
#[derive(Clone)]
pub struct GameHandle {
    commands: mpsc::Sender<Command>,
    lobby: watch::Receiver<LobbySnapshot>,
}

impl GameHandle {
    pub async fn connect(&self, connection_id: ConnectionId) -> Result<(), ServerError> {
        self.send(Command::Connected { connection_id }).await
    }

    pub async fn input(&self, connection_id: ConnectionId, msg: ClientMsg) -> Result<(), ServerError> {
        self.send(Command::Input { connection_id, msg }).await
    }

    pub async fn disconnect(&self, connection_id: ConnectionId) -> Result<(), ServerError> {
        self.send(Command::Disconnected { connection_id }).await
    }

    /// Operator reset, resolved once the loop has applied it
    pub async fn reset_room(&self, room_id: RoomId) -> Result<(), ServerError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::ResetRoom { room_id, reply }).await?;
        rx.await.map_err(|_| ServerError::Closed)??;
        Ok(())
    }

    /// Latest lobby published by the loop
    pub fn lobby(&self) -> LobbySnapshot {
        self.lobby.borrow().clone()
    }

    async fn send(&self, command: Command) -> Result<(), ServerError> {
        self.commands.send(command).await.map_err(|_| ServerError::Closed)
    }
}

/// Owns the registry and session table; nothing else touches room state
pub struct GameServer {
    registry: RoomRegistry,
    sessions: HashMap<ConnectionId, Session>,
    hub: SessionHub,
    commands: mpsc::Receiver<Command>,
    lobby: watch::Sender<LobbySnapshot>,
    tick_period: Duration,
}

impl GameServer {
    pub fn new(
        config: Arc<GameConfig>,
        maps: MapCatalog,
        hub: SessionHub,
        seed: u64,
    ) -> (Self, GameHandle) {
        let (command_tx, command_rx) = mpsc::channel(COMMAND_QUEUE);
        let (lobby_tx, lobby_rx) = watch::channel(LobbySnapshot::default());
        let server = Self {
            tick_period: tick_period(config.tick_rate),
            registry: RoomRegistry::new(config, maps, seed),
            sessions: HashMap::new(),
            hub,
            commands: command_rx,
            lobby: lobby_tx,
        };
        let handle = GameHandle {
            commands: command_tx,
            lobby: lobby_rx,
        };
        (server, handle)
    }

    /// Run until every [`GameHandle`] is dropped
    pub async fn run(mut self) {
        info!(
            tick_micros = self.tick_period.as_micros() as u64,
            "Game loop started"
        );

        let mut ticker = interval(self.tick_period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = ticker.tick() => self.run_tick(),
                command = self.commands.recv() => match command {
                    Some(command) => self.handle_command(command),
                    None => {
                        info!("Command channel closed, stopping game loop");
                        break;
                    }
                },
            }
        }
    }

    fn run_tick(&mut self) {
        let timer = Timer::new();
        let mut out = Outbox::new();
        self.registry.tick(unix_millis(), &mut out);
        self.flush(&mut out);

        if timer.elapsed() > self.tick_period {
            warn!(
                elapsed_micros = timer.elapsed_micros(),
                rooms = self.registry.len(),
                "Tick overran its period"
            );
        }
    }

    fn handle_command(&mut self, command: Command) {
        let mut out = Outbox::new();
        match command {
            Command::Connected { connection_id } => {
                debug!(connection_id = %connection_id, "Session opened");
                self.sessions
                    .insert(connection_id, Session::new(connection_id));
                out.to_connection(
                    connection_id,
                    ServerMsg::LobbyUpdate {
                        rooms: self.registry.lobby(),
                    },
                );
            }
            Command::Input { connection_id, msg } => {
                let Some(session) = self.sessions.get_mut(&connection_id) else {
                    debug!(connection_id = %connection_id, "Input from unknown session dropped");
                    return;
                };
                self.registry.dispatch(session, msg, unix_millis(), &mut out);
            }
            Command::Disconnected { connection_id } => {
                if let Some(mut session) = self.sessions.remove(&connection_id) {
                    self.registry.disconnect(&mut session, &mut out);
                    debug!(connection_id = %connection_id, "Session closed");
                }
            }
            Command::ResetRoom { room_id, reply } => {
                let result = self.registry.reset_room(&room_id, &mut out);
                match &result {
                    Ok(()) => info!(room_id = %room_id, "Room reset by operator"),
                    Err(e) => debug!(room_id = %room_id, error = %e, "Room reset rejected"),
                }
                let _ = reply.send(result);
            }
        }

        self.lobby.send_replace(self.registry.lobby_snapshot());
        self.flush(&mut out);
    }

    /// Resolve audiences against the session table and hand messages to the hub
    fn flush(&self, out: &mut Outbox) {
        for envelope in out.drain() {
            for connection_id in self.recipients(&envelope.audience) {
                self.hub.send(connection_id, envelope.msg.clone());
            }
        }
    }

    fn recipients(&self, audience: &Audience) -> Vec<ConnectionId> {
        match audience {
            Audience::Connection(id) => vec![*id],
            Audience::Room(room_id) => self.members(|s| s.room_id.as_ref() == Some(room_id)),
            Audience::RoomExcept(room_id, skip) => self.members(|s| {
                s.room_id.as_ref() == Some(room_id) && s.connection_id != *skip
            }),
            Audience::Lobby => self.members(|s| s.room_id.is_none()),
        }
    }

    fn members(&self, filter: impl Fn(&Session) -> bool) -> Vec<ConnectionId> {
        self.sessions
            .values()
            .filter(|s| filter(s))
            .map(|s| s.connection_id)
            .collect()
    }
}
