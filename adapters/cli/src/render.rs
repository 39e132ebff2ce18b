//! Plain-text rendering of the occupancy grid.

use robot_fleet_core::{CellKind, Grid};

const fn glyph(kind: CellKind) -> char {
    match kind {
        CellKind::Empty => '.',
        CellKind::Obstacle => '#',
        CellKind::Robot => 'R',
        CellKind::Task => 'T',
    }
}

/// Draws one line per grid row.
pub(crate) fn grid(grid: &Grid) -> String {
    let width = grid.columns() as usize + 1;
    let mut out = String::with_capacity(width * grid.rows() as usize);
    for cell in grid.cells() {
        if cell.col == 0 && cell.row > 0 {
            out.push('\n');
        }
        out.push(glyph(cell.kind));
    }
    out
}
