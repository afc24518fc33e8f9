//! Outbound message queue filled by rooms and the registry

use crate::ws::protocol::ServerMsg;

use super::room::RoomId;
use super::ConnectionId;

/// Who a message is for. Resolved to connections when the outbox is flushed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Audience {
    /// Every connection currently in the room
    Room(RoomId),
    /// Every connection in the room except one
    RoomExcept(RoomId, ConnectionId),
    /// Every connection not in any room
    Lobby,
    Connection(ConnectionId),
}

#[derive(Debug, Clone)]
pub struct Envelope {
    pub audience: Audience,
    pub msg: ServerMsg,
}

/// Ordered list of messages produced by one command or tick
#[derive(Debug, Default)]
pub struct Outbox {
    envelopes: Vec<Envelope>,
}

impl Outbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, audience: Audience, msg: ServerMsg) {
        self.envelopes.push(Envelope { audience, msg });
    }

    pub fn to_room(&mut self, room_id: &RoomId, msg: ServerMsg) {
        self.push(Audience::Room(room_id.clone()), msg);
    }

    pub fn to_room_except(&mut self, room_id: &RoomId, skip: ConnectionId, msg: ServerMsg) {
        self.push(Audience::RoomExcept(room_id.clone(), skip), msg);
    }

    pub fn to_lobby(&mut self, msg: ServerMsg) {
        self.push(Audience::Lobby, msg);
    }

    pub fn to_connection(&mut self, connection_id: ConnectionId, msg: ServerMsg) {
        self.push(Audience::Connection(connection_id), msg);
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.envelopes.is_empty()
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.envelopes.len()
    }

    #[cfg(test)]
    pub fn iter(&self) -> impl Iterator<Item = &Envelope> {
        self.envelopes.iter()
    }

    pub fn drain(&mut self) -> std::vec::Drain<'_, Envelope> {
        self.envelopes.drain(..)
    }
}
