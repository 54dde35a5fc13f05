//! Connect-N: drop discs into columns, first to line up N wins.

mod engine;
mod error;
pub mod rules;
mod types;

pub use engine::GameEngine;
pub use error::{MoveError, RejectionKind};
pub use types::{EMPTY, GameStatus, Grid, GridError, ParticipantId};
