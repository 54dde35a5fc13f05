//! Core domain types for connect-N.

use derive_more::{Display, Error};
use serde::{Deserialize, Serialize};

/// Identifier of a participant; also the value stored in an occupied cell.
pub type ParticipantId = u32;

/// Cell value meaning "no disc".
pub const EMPTY: ParticipantId = 0;

/// Rectangular grid of discs.
///
/// Indexed `[row][column]`, both zero-based, with row 0 at the bottom.
/// Occupied cells in a column are always contiguous from the bottom.
///
/// On the wire the grid is an array of rows, bottom row first, e.g.
/// `[[0,1,1],[0,0,2],[0,0,0]]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    try_from = "Vec<Vec<ParticipantId>>",
    into = "Vec<Vec<ParticipantId>>"
)]
pub struct Grid {
    rows: usize,
    columns: usize,
    cells: Vec<Vec<ParticipantId>>,
}

impl Grid {
    /// Creates an empty grid.
    pub fn new(rows: usize, columns: usize) -> Self {
        Self {
            rows,
            columns,
            cells: vec![vec![EMPTY; columns]; rows],
        }
    }

    /// Builds a grid from explicit rows (bottom row first).
    ///
    /// Fails if the rows are ragged, if there are none, or if any disc sits
    /// above an empty cell.
    pub fn from_rows(cells: Vec<Vec<ParticipantId>>) -> Result<Self, GridError> {
        let columns = cells.first().map(Vec::len).ok_or(GridError::Empty)?;
        if columns == 0 {
            return Err(GridError::Empty);
        }
        if let Some((row, found)) = cells
            .iter()
            .map(Vec::len)
            .enumerate()
            .find(|(_, len)| *len != columns)
        {
            return Err(GridError::Ragged {
                row,
                expected: columns,
                found,
            });
        }

        let grid = Self {
            rows: cells.len(),
            columns,
            cells,
        };

        for column in 0..grid.columns {
            let height = grid.height(column);
            if let Some(row) = (height..grid.rows).find(|&row| grid.cells[row][column] != EMPTY) {
                return Err(GridError::Floating { row, column });
            }
        }

        Ok(grid)
    }

    /// Number of rows.
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Number of columns.
    pub fn columns(&self) -> usize {
        self.columns
    }

    /// Returns the cell at a zero-based position, or `None` outside the grid.
    pub fn get(&self, row: usize, column: usize) -> Option<ParticipantId> {
        self.cells.get(row).and_then(|r| r.get(column)).copied()
    }

    /// Like [`Grid::get`], but accepts signed coordinates for outward scans.
    pub fn get_signed(&self, row: isize, column: isize) -> Option<ParticipantId> {
        let row = usize::try_from(row).ok()?;
        let column = usize::try_from(column).ok()?;
        self.get(row, column)
    }

    /// Number of discs stacked in a zero-based column.
    pub fn height(&self, column: usize) -> usize {
        self.cells
            .iter()
            .take_while(|row| row.get(column).is_some_and(|&cell| cell != EMPTY))
            .count()
    }

    /// True when the top cell of every column is occupied.
    pub fn is_full(&self) -> bool {
        self.cells
            .last()
            .is_some_and(|top| top.iter().all(|&cell| cell != EMPTY))
    }

    /// Rows of the grid, bottom row first.
    pub fn as_rows(&self) -> &[Vec<ParticipantId>] {
        &self.cells
    }

    pub(super) fn set(&mut self, row: usize, column: usize, participant: ParticipantId) {
        self.cells[row][column] = participant;
    }

    /// Formats the grid top row first, one `[ ]` per cell.
    pub fn display(&self) -> String {
        self.cells
            .iter()
            .rev()
            .map(|row| {
                row.iter()
                    .map(|&cell| match cell {
                        EMPTY => "[ ]".to_string(),
                        id => format!("[{}]", id),
                    })
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl From<Grid> for Vec<Vec<ParticipantId>> {
    fn from(grid: Grid) -> Self {
        grid.cells
    }
}

impl TryFrom<Vec<Vec<ParticipantId>>> for Grid {
    type Error = GridError;

    fn try_from(cells: Vec<Vec<ParticipantId>>) -> Result<Self, Self::Error> {
        Self::from_rows(cells)
    }
}

/// Reasons a set of rows cannot form a [`Grid`].
#[derive(Debug, Clone, PartialEq, Eq, Display, Error)]
pub enum GridError {
    /// No rows, or rows with no cells.
    #[display("Grid must have at least one row and one column")]
    Empty,
    /// A row whose length differs from the first row.
    #[display("Row {row} has {found} cells, expected {expected}")]
    Ragged {
        /// Offending row.
        row: usize,
        /// Length of the first row.
        expected: usize,
        /// Length of the offending row.
        found: usize,
    },
    /// A disc with an empty cell below it.
    #[display("Disc at row {row}, column {column} is not supported from below")]
    Floating {
        /// Row of the unsupported disc.
        row: usize,
        /// Column of the unsupported disc.
        column: usize,
    },
}

/// Current status of the game.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, strum::Display,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum GameStatus {
    /// Game is ongoing.
    #[default]
    InProgress,
    /// The last move completed a winning run.
    Won,
    /// The grid filled up without a winning run.
    Drawn,
}

impl GameStatus {
    /// Won and drawn games accept no further moves.
    pub fn is_terminal(self) -> bool {
        !matches!(self, GameStatus::InProgress)
    }
}
