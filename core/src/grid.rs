//! Dense occupancy grid shared by the pathfinder and the tick engine.

use serde::{Deserialize, Serialize};

use crate::{CellCoord, SimulationError};

/// What currently occupies a grid cell.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CellKind {
    /// Nothing occupies the cell.
    #[default]
    Empty,
    /// A robot stands on the cell.
    Robot,
    /// A task waits on the cell.
    Task,
    /// The cell is impassable.
    Obstacle,
}

/// Single cell record as exchanged with external stores.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Cell {
    /// Zero-based row of the cell.
    pub row: u32,
    /// Zero-based column of the cell.
    pub col: u32,
    /// Occupant of the cell.
    pub kind: CellKind,
}

impl Cell {
    /// Coordinate of the cell.
    #[must_use]
    pub const fn coord(&self) -> CellCoord {
        CellCoord::new(self.row, self.col)
    }
}

/// Fixed-size occupancy map stored in row-major order.
///
/// Serialises as a row-major 2-D array of [`Cell`] records.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Vec<Cell>>", into = "Vec<Vec<Cell>>")]
pub struct Grid {
    rows: u32,
    columns: u32,
    cells: Vec<CellKind>,
}

impl Grid {
    /// Creates an empty grid with the provided dimensions.
    #[must_use]
    pub fn new(rows: u32, columns: u32) -> Self {
        let capacity_u64 = u64::from(rows) * u64::from(columns);
        let capacity = usize::try_from(capacity_u64).unwrap_or(0);
        Self {
            rows,
            columns,
            cells: vec![CellKind::Empty; capacity],
        }
    }

    /// Number of rows contained in the grid.
    #[must_use]
    pub const fn rows(&self) -> u32 {
        self.rows
    }

    /// Number of columns contained in the grid.
    #[must_use]
    pub const fn columns(&self) -> u32 {
        self.columns
    }

    /// Reports whether the coordinate lies inside the grid.
    #[must_use]
    pub const fn contains(&self, cell: CellCoord) -> bool {
        cell.row() < self.rows && cell.column() < self.columns
    }

    /// Returns the cell record at the provided coordinate.
    pub fn cell_at(&self, cell: CellCoord) -> Result<Cell, SimulationError> {
        let kind = self.kind_at(cell).ok_or_else(|| self.out_of_bounds(cell))?;
        Ok(Cell {
            row: cell.row(),
            col: cell.column(),
            kind,
        })
    }

    /// Overwrites the kind of a single cell.
    pub fn set_cell(&mut self, cell: CellCoord, kind: CellKind) -> Result<(), SimulationError> {
        let index = self.index(cell).ok_or_else(|| self.out_of_bounds(cell))?;
        self.cells[index] = kind;
        Ok(())
    }

    /// Kind of the cell at the provided coordinate, if it lies inside the grid.
    #[must_use]
    pub fn kind_at(&self, cell: CellCoord) -> Option<CellKind> {
        self.index(cell)
            .and_then(|index| self.cells.get(index).copied())
    }

    /// Reports whether the cell holds an obstacle. Cells off the grid never do.
    #[must_use]
    pub fn is_obstacle(&self, cell: CellCoord) -> bool {
        self.kind_at(cell) == Some(CellKind::Obstacle)
    }

    /// Reports whether the cell lies inside the grid and holds nothing.
    #[must_use]
    pub fn is_empty(&self, cell: CellCoord) -> bool {
        self.kind_at(cell) == Some(CellKind::Empty)
    }

    /// Resets every cell to [`CellKind::Empty`].
    pub fn clear(&mut self) {
        self.cells.fill(CellKind::Empty);
    }

    /// Iterator over every cell in row-major order.
    pub fn cells(&self) -> impl Iterator<Item = Cell> + '_ {
        let width = usize::try_from(self.columns).unwrap_or(usize::MAX).max(1);
        self.cells.iter().enumerate().map(move |(index, kind)| Cell {
            row: u32::try_from(index / width).unwrap_or(u32::MAX),
            col: u32::try_from(index % width).unwrap_or(u32::MAX),
            kind: *kind,
        })
    }

    /// Number of cells holding the provided kind.
    #[must_use]
    pub fn count(&self, kind: CellKind) -> usize {
        self.cells.iter().filter(|cell| **cell == kind).count()
    }

    fn index(&self, cell: CellCoord) -> Option<usize> {
        if self.contains(cell) {
            let row = usize::try_from(cell.row()).ok()?;
            let column = usize::try_from(cell.column()).ok()?;
            let width = usize::try_from(self.columns).ok()?;
            Some(row * width + column)
        } else {
            None
        }
    }

    fn out_of_bounds(&self, cell: CellCoord) -> SimulationError {
        SimulationError::OutOfBounds {
            cell,
            rows: self.rows,
            columns: self.columns,
        }
    }
}

impl From<Grid> for Vec<Vec<Cell>> {
    fn from(grid: Grid) -> Self {
        let width = usize::try_from(grid.columns).unwrap_or(0);
        if width == 0 {
            return Vec::new();
        }

        let mut rows: Vec<Vec<Cell>> = Vec::with_capacity(grid.cells.len() / width);
        for cell in grid.cells() {
            if cell.col == 0 {
                rows.push(Vec::with_capacity(width));
            }
            if let Some(row) = rows.last_mut() {
                row.push(cell);
            }
        }
        rows
    }
}

impl TryFrom<Vec<Vec<Cell>>> for Grid {
    type Error = SimulationError;

    fn try_from(rows: Vec<Vec<Cell>>) -> Result<Self, Self::Error> {
        let row_count = u32::try_from(rows.len())
            .map_err(|_| SimulationError::InconsistentState("grid has too many rows".into()))?;
        let column_count = rows.first().map_or(0, Vec::len);
        let column_count = u32::try_from(column_count)
            .map_err(|_| SimulationError::InconsistentState("grid has too many columns".into()))?;

        let mut grid = Grid::new(row_count, column_count);
        for (row_index, row) in rows.into_iter().enumerate() {
            if row.len() != column_count as usize {
                return Err(SimulationError::InconsistentState(format!(
                    "grid row {row_index} holds {} cells, expected {column_count}",
                    row.len()
                )));
            }

            for (column_index, cell) in row.into_iter().enumerate() {
                if cell.row as usize != row_index || cell.col as usize != column_index {
                    return Err(SimulationError::InconsistentState(format!(
                        "cell record {} found at position ({row_index}, {column_index})",
                        cell.coord()
                    )));
                }
                grid.set_cell(cell.coord(), cell.kind)?;
            }
        }
        Ok(grid)
    }
}
