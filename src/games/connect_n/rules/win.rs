//! Win detection for connect-N.

use super::super::{EMPTY, Grid, ParticipantId};
use tracing::{instrument, trace};

/// The four lines a run can lie on, as `(row step, column step)`.
///
/// Vertical, horizontal, rising diagonal, falling diagonal. Each is scanned
/// in both directions, which covers all eight compass directions.
pub const AXES: [(isize, isize); 4] = [(1, 0), (0, 1), (1, 1), (1, -1)];

/// Checks whether the disc at `(row, column)` completes a run of `win_length`.
///
/// Only runs passing through the given cell are considered, so this is meant
/// to be called with the position of the disc that was just placed. Axes are
/// checked in [`AXES`] order and the first hit ends the search.
#[instrument(skip(grid))]
pub fn completes_run(grid: &Grid, row: usize, column: usize, win_length: usize) -> bool {
    let owner = match grid.get(row, column) {
        Some(owner) if owner != EMPTY => owner,
        _ => return false,
    };
    let reach = win_length.saturating_sub(1);

    AXES.iter().any(|&(row_step, column_step)| {
        let forward = count_matching(grid, owner, (row, column), (row_step, column_step), reach);
        let backward =
            count_matching(grid, owner, (row, column), (-row_step, -column_step), reach);
        let run = 1 + forward + backward;
        trace!(row_step, column_step, run, "Scanned axis");
        run >= win_length
    })
}

/// Counts consecutive cells owned by `owner`, walking away from `origin`.
///
/// The origin itself is not counted. Stops at `limit`, at a cell with a
/// different owner, or at the edge of the grid.
fn count_matching(
    grid: &Grid,
    owner: ParticipantId,
    origin: (usize, usize),
    step: (isize, isize),
    limit: usize,
) -> usize {
    let (row, column) = (origin.0 as isize, origin.1 as isize);
    (1..=limit as isize)
        .take_while(|&distance| {
            grid.get_signed(row + step.0 * distance, column + step.1 * distance) == Some(owner)
        })
        .count()
}
