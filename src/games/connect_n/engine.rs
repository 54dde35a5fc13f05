//! Connect-N game engine.
//!
//! Owns the grid and the game status. Every mutation goes through
//! [`GameEngine::add_disc`], which keeps columns bottom-contiguous and never
//! touches the grid once the game is won or drawn.

use super::error::MoveError;
use super::rules::{completes_run, is_draw};
use super::types::{GameStatus, Grid, GridError, ParticipantId};
use crate::config::GameConfig;
use std::num::NonZeroUsize;
use tracing::{debug, info, instrument};

/// Grid, rules and status for one game.
#[derive(Debug, Clone)]
pub struct GameEngine {
    grid: Grid,
    win_length: usize,
    status: GameStatus,
}

impl GameEngine {
    /// Creates an engine with an empty grid.
    #[instrument]
    pub fn new(config: &GameConfig) -> Self {
        Self {
            grid: Grid::new(config.rows().get(), config.columns().get()),
            win_length: config.win_length().get(),
            status: GameStatus::InProgress,
        }
    }

    /// Creates an engine starting from an existing position.
    ///
    /// The status starts as in progress regardless of the contents; it is
    /// only evaluated when a disc is added.
    #[instrument]
    pub fn with_grid(
        rows: Vec<Vec<ParticipantId>>,
        win_length: NonZeroUsize,
    ) -> Result<Self, GridError> {
        Ok(Self {
            grid: Grid::from_rows(rows)?,
            win_length: win_length.get(),
            status: GameStatus::InProgress,
        })
    }

    /// Returns the grid.
    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    /// Returns the game status.
    pub fn status(&self) -> GameStatus {
        self.status
    }

    /// Number of rows.
    pub fn rows(&self) -> usize {
        self.grid.rows()
    }

    /// Number of columns.
    pub fn columns(&self) -> usize {
        self.grid.columns()
    }

    /// Discs in a row needed to win.
    pub fn win_length(&self) -> usize {
        self.win_length
    }

    /// Number of discs in a one-based column, or `None` if it does not exist.
    pub fn column_height(&self, column: i64) -> Option<usize> {
        self.column_index(column).map(|index| self.grid.height(index))
    }

    /// Drops a disc for `participant` into a one-based column.
    ///
    /// The disc lands on the lowest empty row. Returns the status after the
    /// move: won if the disc completes a run of `win_length`, drawn if the
    /// grid is now full, in progress otherwise.
    ///
    /// # Errors
    ///
    /// - [`MoveError::GameOver`] once the game is won or drawn
    /// - [`MoveError::OutOfRange`] for a column outside `1..=columns`
    /// - [`MoveError::ColumnFull`] when the column has no empty row
    ///
    /// The grid is untouched when an error is returned.
    #[instrument(skip(self), fields(status = %self.status))]
    pub fn add_disc(
        &mut self,
        column: i64,
        participant: ParticipantId,
    ) -> Result<GameStatus, MoveError> {
        if self.status.is_terminal() {
            debug!("Rejecting move after game end");
            return Err(MoveError::GameOver);
        }

        let index = self.column_index(column).ok_or(MoveError::OutOfRange {
            column,
            columns: self.columns(),
        })?;

        let row = self.grid.height(index);
        if row >= self.rows() {
            return Err(MoveError::ColumnFull { column });
        }

        self.grid.set(row, index, participant);
        self.status = self.evaluate(row, index);

        info!(row, status = %self.status, "Disc added");
        debug!("Grid:\n{}", self.grid.display());
        Ok(self.status)
    }

    fn column_index(&self, column: i64) -> Option<usize> {
        usize::try_from(column)
            .ok()
            .filter(|&c| (1..=self.columns()).contains(&c))
            .map(|c| c - 1)
    }

    fn evaluate(&self, row: usize, column: usize) -> GameStatus {
        if completes_run(&self.grid, row, column, self.win_length) {
            GameStatus::Won
        } else if is_draw(&self.grid) {
            GameStatus::Drawn
        } else {
            GameStatus::InProgress
        }
    }
}
