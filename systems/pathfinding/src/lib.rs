#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Deterministic A* pathfinding over the occupancy grid.
//!
//! Searches use Manhattan distance as the heuristic, a uniform step cost and
//! four-directional movement. When the goal cannot be reached through free
//! cells the planner falls back to a straight vertical-then-horizontal route
//! that ignores obstacles, so callers never observe a pathfinding failure.

use robot_fleet_core::{CellCoord, Grid, Route};

/// Path produced by a search together with how it was obtained.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PathPlan {
    /// Steps toward the goal, excluding the start and including the goal.
    pub steps: Vec<CellCoord>,
    /// Whether the path came from A*, the fallback, or a blocked endpoint.
    pub route: Route,
}

impl PathPlan {
    fn blocked() -> Self {
        Self {
            steps: Vec::new(),
            route: Route::Blocked,
        }
    }
}

/// Finds a path from `start` to `goal`.
///
/// Returns an empty path when either endpoint is an obstacle or lies off the
/// grid, and when `start` equals `goal`.
#[must_use]
pub fn find_path(start: CellCoord, goal: CellCoord, grid: &Grid) -> Vec<CellCoord> {
    search(start, goal, grid).steps
}

/// Finds a path from `start` to `goal` and reports which route produced it.
#[must_use]
pub fn search(start: CellCoord, goal: CellCoord, grid: &Grid) -> PathPlan {
    Pathfinder::default().search(start, goal, grid)
}

/// Straight route that first closes the row gap, then the column gap.
///
/// Obstacles are ignored. The route is empty when `start` equals `goal`.
#[must_use]
pub fn simple_path(start: CellCoord, goal: CellCoord) -> Vec<CellCoord> {
    let mut path = Vec::with_capacity(start.manhattan_distance(goal) as usize);
    let mut row = start.row();
    let mut column = start.column();

    while row != goal.row() {
        if row < goal.row() {
            row += 1;
        } else {
            row -= 1;
        }
        path.push(CellCoord::new(row, column));
    }

    while column != goal.column() {
        if column < goal.column() {
            column += 1;
        } else {
            column -= 1;
        }
        path.push(CellCoord::new(row, column));
    }

    path
}

/// A* planner that reuses its scratch buffers between searches.
#[derive(Debug, Default)]
pub struct Pathfinder {
    nodes: Vec<SearchNode>,
    open: Vec<usize>,
    closed: Vec<bool>,
}

impl Pathfinder {
    /// Creates a planner with empty scratch buffers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Finds a path from `start` to `goal` and reports which route produced it.
    pub fn search(&mut self, start: CellCoord, goal: CellCoord, grid: &Grid) -> PathPlan {
        if !grid.contains(start) || !grid.contains(goal) {
            return PathPlan::blocked();
        }

        if grid.is_obstacle(start) || grid.is_obstacle(goal) {
            return PathPlan::blocked();
        }

        if let Some(steps) = self.a_star(start, goal, grid) {
            return PathPlan {
                steps,
                route: Route::Direct,
            };
        }

        PathPlan {
            steps: simple_path(start, goal),
            route: Route::Fallback,
        }
    }

    fn prepare(&mut self, grid: &Grid) {
        self.nodes.clear();
        self.open.clear();

        let cell_count_u64 = u64::from(grid.rows()) * u64::from(grid.columns());
        let cell_count = usize::try_from(cell_count_u64).unwrap_or(0);
        self.closed.clear();
        self.closed.resize(cell_count, false);
    }

    fn a_star(&mut self, start: CellCoord, goal: CellCoord, grid: &Grid) -> Option<Vec<CellCoord>> {
        self.prepare(grid);

        let heuristic = start.manhattan_distance(goal);
        self.nodes.push(SearchNode {
            cell: start,
            g: 0,
            f: heuristic,
            parent: None,
        });
        self.open.push(0);

        while let Some(slot) = self.lowest_cost_slot() {
            let current = self.open.remove(slot);
            let node = self.nodes[current];

            if node.cell == goal {
                return Some(self.reconstruct(current));
            }

            if let Some(index) = closed_index(grid, node.cell) {
                self.closed[index] = true;
            }

            for neighbor in cardinal_neighbors(node.cell, grid.rows(), grid.columns()) {
                if grid.is_obstacle(neighbor) {
                    continue;
                }
                if closed_index(grid, neighbor).is_some_and(|index| self.closed[index]) {
                    continue;
                }

                let g = node.g + 1;
                self.relax(SearchNode {
                    cell: neighbor,
                    g,
                    f: g + neighbor.manhattan_distance(goal),
                    parent: Some(current),
                });
            }
        }

        None
    }

    /// Opens `candidate`, or swaps it into the slot of the open node for the
    /// same cell when it reaches that cell with a strictly lower `g`.
    fn relax(&mut self, candidate: SearchNode) {
        match self.open_slot(candidate.cell) {
            None => {
                self.nodes.push(candidate);
                self.open.push(self.nodes.len() - 1);
            }
            Some(existing) => {
                if candidate.g < self.nodes[self.open[existing]].g {
                    self.nodes.push(candidate);
                    self.open[existing] = self.nodes.len() - 1;
                }
            }
        }
    }

    /// Slot of the open node with the strictly lowest `f`; earlier slots win ties.
    fn lowest_cost_slot(&self) -> Option<usize> {
        let mut best: Option<(usize, u32)> = None;
        for (slot, &index) in self.open.iter().enumerate() {
            let f = self.nodes[index].f;
            match best {
                Some((_, best_f)) if f >= best_f => {}
                _ => best = Some((slot, f)),
            }
        }
        best.map(|(slot, _)| slot)
    }

    fn open_slot(&self, cell: CellCoord) -> Option<usize> {
        self.open
            .iter()
            .position(|&index| self.nodes[index].cell == cell)
    }

    fn reconstruct(&self, goal_index: usize) -> Vec<CellCoord> {
        let mut path = Vec::new();
        let mut cursor = Some(goal_index);
        while let Some(index) = cursor {
            let node = self.nodes[index];
            if node.parent.is_none() {
                break;
            }
            path.push(node.cell);
            cursor = node.parent;
        }
        path.reverse();
        path
    }
}

#[derive(Clone, Copy, Debug)]
struct SearchNode {
    cell: CellCoord,
    g: u32,
    f: u32,
    parent: Option<usize>,
}

/// In-bounds neighbours in the order up, down, left, right.
fn cardinal_neighbors(cell: CellCoord, rows: u32, columns: u32) -> impl Iterator<Item = CellCoord> {
    let mut candidates = [None; 4];

    if let Some(row) = cell.row().checked_sub(1) {
        candidates[0] = Some(CellCoord::new(row, cell.column()));
    }
    if cell.row() + 1 < rows {
        candidates[1] = Some(CellCoord::new(cell.row() + 1, cell.column()));
    }
    if let Some(column) = cell.column().checked_sub(1) {
        candidates[2] = Some(CellCoord::new(cell.row(), column));
    }
    if cell.column() + 1 < columns {
        candidates[3] = Some(CellCoord::new(cell.row(), cell.column() + 1));
    }

    candidates.into_iter().flatten()
}

fn closed_index(grid: &Grid, cell: CellCoord) -> Option<usize> {
    if !grid.contains(cell) {
        return None;
    }
    let row = usize::try_from(cell.row()).ok()?;
    let column = usize::try_from(cell.column()).ok()?;
    let width = usize::try_from(grid.columns()).ok()?;
    row.checked_mul(width)?.checked_add(column)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn neighbors_follow_up_down_left_right_order() {
        let neighbors: Vec<_> = cardinal_neighbors(CellCoord::new(1, 1), 3, 3).collect();
        assert_eq!(
            neighbors,
            vec![
                CellCoord::new(0, 1),
                CellCoord::new(2, 1),
                CellCoord::new(1, 0),
                CellCoord::new(1, 2),
            ]
        );
    }

    #[test]
    fn neighbors_skip_cells_beyond_the_edges() {
        let neighbors: Vec<_> = cardinal_neighbors(CellCoord::new(0, 0), 1, 2).collect();
        assert_eq!(neighbors, vec![CellCoord::new(0, 1)]);
    }

    #[test]
    fn lowest_cost_slot_prefers_first_enqueued_on_ties() {
        let mut pathfinder = Pathfinder::new();
        let seeds = [
            (CellCoord::new(0, 0), 4),
            (CellCoord::new(0, 1), 3),
            (CellCoord::new(1, 0), 3),
            (CellCoord::new(1, 1), 5),
        ];
        for (cell, f) in seeds {
            pathfinder.nodes.push(SearchNode {
                cell,
                g: 0,
                f,
                parent: None,
            });
            pathfinder.open.push(pathfinder.nodes.len() - 1);
        }

        assert_eq!(pathfinder.lowest_cost_slot(), Some(1));
    }

    #[test]
    fn relaxation_replaces_open_nodes_only_on_strictly_lower_cost() {
        let mut pathfinder = Pathfinder::new();
        let crowded = CellCoord::new(2, 2);
        let other = CellCoord::new(0, 3);
        for (cell, g) in [(crowded, 5), (other, 1)] {
            pathfinder.nodes.push(SearchNode {
                cell,
                g,
                f: g + 1,
                parent: Some(7),
            });
            pathfinder.open.push(pathfinder.nodes.len() - 1);
        }

        pathfinder.relax(SearchNode {
            cell: crowded,
            g: 2,
            f: 3,
            parent: Some(9),
        });

        assert_eq!(pathfinder.open.len(), 2);
        assert_eq!(pathfinder.open, vec![2, 1]);
        let replaced = pathfinder.nodes[pathfinder.open[0]];
        assert_eq!(replaced.cell, crowded);
        assert_eq!(replaced.g, 2);
        assert_eq!(replaced.parent, Some(9));

        pathfinder.relax(SearchNode {
            cell: crowded,
            g: 2,
            f: 3,
            parent: Some(11),
        });

        assert_eq!(pathfinder.open, vec![2, 1]);
        assert_eq!(pathfinder.nodes.len(), 3);
        assert_eq!(pathfinder.nodes[pathfinder.open[0]].parent, Some(9));
    }

    #[test]
    fn simple_path_moves_vertically_before_horizontally() {
        let path = simple_path(CellCoord::new(2, 3), CellCoord::new(0, 1));
        assert_eq!(
            path,
            vec![
                CellCoord::new(1, 3),
                CellCoord::new(0, 3),
                CellCoord::new(0, 2),
                CellCoord::new(0, 1),
            ]
        );
        assert!(simple_path(CellCoord::new(4, 4), CellCoord::new(4, 4)).is_empty());
    }

    #[test]
    fn scratch_buffers_do_not_leak_between_searches() {
        let grid = Grid::new(4, 4);
        let mut pathfinder = Pathfinder::new();

        let first = pathfinder.search(CellCoord::new(0, 0), CellCoord::new(3, 3), &grid);
        let second = pathfinder.search(CellCoord::new(0, 0), CellCoord::new(3, 3), &grid);

        assert_eq!(first, second);
        assert_eq!(first.route, Route::Direct);
        assert_eq!(first.steps.len(), 6);
    }
}
