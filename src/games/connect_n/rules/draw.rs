//! Draw detection for connect-N.

use super::super::Grid;
use tracing::instrument;

/// Checks whether the grid has no room left.
///
/// Discs stack from the bottom, so the grid is full exactly when the top row
/// is. Callers are expected to have ruled out a win first.
#[instrument(skip(grid))]
pub fn is_draw(grid: &Grid) -> bool {
    grid.is_full()
}
