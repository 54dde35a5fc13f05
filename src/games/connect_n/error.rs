//! Move rejection types.

use derive_more::{Display, Error};
use serde::{Deserialize, Serialize};

/// Why a move was refused.
///
/// The display text is what the requester sees, so it is phrased for people.
#[derive(Debug, Clone, PartialEq, Eq, Display, Error)]
pub enum MoveError {
    /// Column outside `1..=columns`.
    #[display("Column {column} is out of range of (1-{columns})")]
    OutOfRange {
        /// Requested column, one-based.
        column: i64,
        /// Number of columns in the grid.
        columns: usize,
    },

    /// Column already holds a disc in every row.
    #[display("No more discs may be added to column {column} because it is full")]
    ColumnFull {
        /// Requested column, one-based.
        column: i64,
    },

    /// The game has been won or drawn.
    #[display("The game is already over")]
    GameOver,

    /// Someone other than the player to move tried to move.
    #[display("It is not your turn, waiting for {waiting_for} to move")]
    NotYourTurn {
        /// Name of the player whose turn it is.
        waiting_for: String,
    },

    /// Fewer than two players have joined.
    #[display("The game has not started yet, waiting for a second player to join")]
    NotStarted,

    /// The requester belongs to a game that has since been reset.
    #[display("This game has ended, join again to play a new one")]
    SessionEnded,
}

impl MoveError {
    /// Machine-readable category of this rejection.
    pub fn kind(&self) -> RejectionKind {
        match self {
            MoveError::OutOfRange { .. } => RejectionKind::OutOfRange,
            MoveError::ColumnFull { .. } => RejectionKind::ColumnFull,
            MoveError::GameOver => RejectionKind::GameOver,
            MoveError::NotYourTurn { .. } => RejectionKind::NotYourTurn,
            MoveError::NotStarted => RejectionKind::NotStarted,
            MoveError::SessionEnded => RejectionKind::SessionEnded,
        }
    }
}

/// Category of a [`MoveError`], carried on the wire next to the message.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RejectionKind {
    /// See [`MoveError::OutOfRange`].
    OutOfRange,
    /// See [`MoveError::ColumnFull`].
    ColumnFull,
    /// See [`MoveError::GameOver`].
    GameOver,
    /// See [`MoveError::NotYourTurn`].
    NotYourTurn,
    /// See [`MoveError::NotStarted`].
    NotStarted,
    /// See [`MoveError::SessionEnded`].
    SessionEnded,
}
