//! Automatic placement of new widgets.

use crate::grid::{GridPosition, GridSize};
use std::collections::HashSet;

/// Cells covered by existing widgets.
#[derive(Debug, Clone, Default)]
pub struct Occupancy {
    cells: HashSet<(u32, u32)>,
}

impl Occupancy {
    /// Builds the occupied set from widget footprints.
    pub fn from_footprints<I>(footprints: I) -> Self
    where
        I: IntoIterator<Item = (GridPosition, GridSize)>,
    {
        let mut occupancy = Self::default();
        for (pos, size) in footprints {
            occupancy.occupy(pos, size);
        }
        occupancy
    }

    /// Marks every cell of a footprint as taken.
    pub fn occupy(&mut self, pos: GridPosition, size: GridSize) {
        for y in pos.y..pos.y.saturating_add(size.height) {
            for x in pos.x..pos.x.saturating_add(size.width) {
                self.cells.insert((x, y));
            }
        }
    }

    /// Whether every cell of the footprint is free.
    pub fn is_free(&self, pos: GridPosition, size: GridSize) -> bool {
        (pos.y..pos.y.saturating_add(size.height)).all(|y| {
            (pos.x..pos.x.saturating_add(size.width)).all(|x| !self.cells.contains(&(x, y)))
        })
    }
}

/// First free origin for a widget of `size`, scanning rows top to bottom
/// and columns left to right.
///
/// Gives up after `row_limit` rows and returns the origin, which may
/// overlap.
pub fn find_position(
    occupancy: &Occupancy,
    size: GridSize,
    columns: u32,
    row_limit: u32,
) -> GridPosition {
    let last_x = columns.saturating_sub(size.width);
    for y in 0..row_limit {
        for x in 0..=last_x {
            let pos = GridPosition::new(x, y);
            if occupancy.is_free(pos, size) {
                return pos;
            }
        }
    }
    tracing::warn!(
        "No free {}x{} spot in the first {} rows, placing at origin",
        size.width,
        size.height,
        row_limit
    );
    GridPosition::ORIGIN
}
