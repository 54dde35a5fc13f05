//! Messages exchanged with clients, and how they are routed.
//!
//! Frames are JSON objects tagged by a `"type"` field. Session logic never
//! writes to sockets itself: it produces [`Outbound`] values, and whoever
//! owns the connections implements [`Outbox`] to deliver them.

use crate::games::connect_n::{GameStatus, Grid, MoveError, ParticipantId, RejectionKind};
use crate::session::{Participant, SessionId};
use serde::{Deserialize, Serialize};

/// Request sent by a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Take a seat in the current game.
    Join {
        /// Display name.
        name: String,
    },
    /// Drop a disc into a one-based column.
    Move {
        /// Target column.
        column: i64,
    },
}

/// Message sent to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Reply to a join: the requester's participant record.
    Joined(Participant),
    /// Full game state after a change.
    State(SessionSnapshot),
    /// A move was refused. Only the requester receives this.
    IllegalMove(IllegalMove),
    /// The game was abandoned and the session reset.
    Terminated {
        /// Human-readable reason.
        message: String,
    },
    /// A frame could not be processed.
    Error {
        /// Human-readable reason.
        message: String,
    },
}

impl ServerMessage {
    /// Builds a termination notice.
    pub fn terminated(message: impl Into<String>) -> Self {
        ServerMessage::Terminated {
            message: message.into(),
        }
    }

    /// Builds a protocol error.
    pub fn error(message: impl Into<String>) -> Self {
        ServerMessage::Error {
            message: message.into(),
        }
    }

    /// Short name for logging.
    pub fn label(&self) -> &'static str {
        match self {
            ServerMessage::Joined(_) => "joined",
            ServerMessage::State(_) => "state",
            ServerMessage::IllegalMove(_) => "illegal_move",
            ServerMessage::Terminated { .. } => "terminated",
            ServerMessage::Error { .. } => "error",
        }
    }
}

/// Everything a client needs to draw the game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    /// Session the state belongs to.
    pub session_id: SessionId,
    /// Discs, bottom row first.
    pub grid: Grid,
    /// Game status.
    pub status: GameStatus,
    /// Whose turn it is; after a win, the winner.
    pub player_to_move: Option<Participant>,
    /// Discs in a row needed to win.
    pub win_length: usize,
}

/// Record of a refused move.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IllegalMove {
    /// Why the move was refused.
    pub message: String,
    /// Participant who attempted the move.
    pub player_id: ParticipantId,
    /// Category of the refusal.
    pub kind: RejectionKind,
}

impl IllegalMove {
    /// Builds the record sent back for `error`.
    pub fn new(error: &MoveError, player_id: ParticipantId) -> Self {
        Self {
            message: error.to_string(),
            player_id,
            kind: error.kind(),
        }
    }
}

/// A message together with who should receive it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    /// Only the connection that caused the event.
    Reply(ServerMessage),
    /// Every connected client.
    Broadcast(ServerMessage),
}

impl Outbound {
    /// The message, regardless of audience.
    pub fn message(&self) -> &ServerMessage {
        match self {
            Outbound::Reply(message) | Outbound::Broadcast(message) => message,
        }
    }
}

/// Delivery target for the messages an event produces.
///
/// Implementations are called while the session lock is held, in the order
/// the messages were produced. They must not block; queue and return.
pub trait Outbox {
    /// Sends to the connection that caused the event.
    fn reply(&self, message: ServerMessage);

    /// Sends to every connected client.
    fn broadcast(&self, message: ServerMessage);
}

/// Hands `outbound` to `outbox` in order.
pub fn deliver<O: Outbox + ?Sized>(outbox: &O, outbound: Vec<Outbound>) {
    for item in outbound {
        match item {
            Outbound::Reply(message) => outbox.reply(message),
            Outbound::Broadcast(message) => outbox.broadcast(message),
        }
    }
}
