#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative simulation state for the robot fleet.
//!
//! A [`Simulation`] is a plain value: every operation takes it explicitly,
//! so ticks and grid edits on one instance can never interleave and separate
//! instances share nothing. Adapters drive it through [`apply`], which
//! validates commands before mutating anything and reports what changed as
//! [`Event`] values.

pub mod snapshot;
mod tick;

use std::collections::HashSet;

use robot_fleet_core::{
    CellCoord, CellKind, Command, Event, Grid, PlacementKind, Rejection, Robot, RobotId,
    SimulationError, Speed, Strategy, Task, TaskId, DEFAULT_GRID_COLUMNS, DEFAULT_GRID_ROWS,
};
use serde::{Deserialize, Serialize};

pub use tick::{advance_tick, advance_tick_with_events};

/// Lifecycle state derived from the simulation flags.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SimulationState {
    /// Not running; the grid may be edited.
    Idle,
    /// Ticking.
    Running,
    /// Running but ticks are suspended.
    Paused,
    /// Stopped because every task was completed.
    Complete,
}

/// Result of a successful grid edit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EditOutcome {
    /// An entity of the given kind was placed on an empty cell.
    Placed(PlacementKind),
    /// The occupants of the cell were removed.
    Cleared,
}

/// Represents the authoritative robot fleet simulation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Simulation {
    grid: Grid,
    robots: Vec<Robot>,
    tasks: Vec<Task>,
    is_running: bool,
    is_paused: bool,
    #[serde(default)]
    speed: Speed,
    #[serde(default)]
    strategy: Strategy,
    #[serde(default)]
    tick: u64,
    #[serde(default)]
    next_robot_id: u32,
    #[serde(default)]
    next_task_id: u32,
}

impl Default for Simulation {
    fn default() -> Self {
        Self::new(DEFAULT_GRID_ROWS, DEFAULT_GRID_COLUMNS)
    }
}

impl Simulation {
    /// Creates an idle simulation over an empty grid of the given size.
    #[must_use]
    pub fn new(rows: u32, columns: u32) -> Self {
        Self {
            grid: Grid::new(rows, columns),
            robots: Vec::new(),
            tasks: Vec::new(),
            is_running: false,
            is_paused: false,
            speed: Speed::default(),
            strategy: Strategy::default(),
            tick: 0,
            next_robot_id: 1,
            next_task_id: 1,
        }
    }

    /// Places an entity on an empty cell, or removes everything on an occupied one.
    ///
    /// Grid cell kinds and the robot and task lists are updated together.
    /// Removing a robot releases the task it claimed; removing a task clears
    /// the target of the robot that claimed it. Nothing changes when the
    /// simulation is running or the cell lies off the grid.
    pub fn edit_cell(
        &mut self,
        cell: CellCoord,
        placement: PlacementKind,
        out: &mut Vec<Event>,
    ) -> Result<EditOutcome, SimulationError> {
        if self.is_running {
            return Err(SimulationError::OperationNotAllowed(
                Rejection::EditWhileRunning,
            ));
        }

        let occupant = self.grid.cell_at(cell)?.kind;
        if occupant == CellKind::Empty {
            self.place(cell, placement, out)?;
            return Ok(EditOutcome::Placed(placement));
        }

        self.clear_cell(cell, occupant, out)?;
        Ok(EditOutcome::Cleared)
    }

    /// Starts ticking. Requires at least one robot and one task.
    ///
    /// Starting a paused simulation resumes it.
    pub fn start(&mut self, out: &mut Vec<Event>) -> Result<(), SimulationError> {
        if self.robots.is_empty() {
            return Err(SimulationError::OperationNotAllowed(Rejection::NoRobots));
        }
        if self.tasks.is_empty() {
            return Err(SimulationError::OperationNotAllowed(Rejection::NoTasks));
        }

        if self.is_running {
            if self.is_paused {
                self.is_paused = false;
                out.push(Event::PauseToggled { paused: false });
            }
            return Ok(());
        }

        self.is_running = true;
        self.is_paused = false;
        self.tick = 0;
        tracing::info!(
            robots = self.robots.len(),
            tasks = self.tasks.len(),
            strategy = %self.strategy,
            "simulation started"
        );
        out.push(Event::SimulationStarted);
        Ok(())
    }

    /// Pauses a running simulation or resumes a paused one.
    ///
    /// Returns the pause state after the toggle.
    pub fn toggle_pause(&mut self, out: &mut Vec<Event>) -> Result<bool, SimulationError> {
        if !self.is_running {
            return Err(SimulationError::OperationNotAllowed(
                Rejection::PauseWhileIdle,
            ));
        }

        self.is_paused = !self.is_paused;
        tracing::info!(paused = self.is_paused, tick = self.tick, "pause toggled");
        out.push(Event::PauseToggled {
            paused: self.is_paused,
        });
        Ok(self.is_paused)
    }

    /// Drops every target, path and claim and stops the simulation in place.
    pub fn reset(&mut self, out: &mut Vec<Event>) {
        for robot in &mut self.robots {
            robot.clear_target();
        }
        for task in &mut self.tasks {
            let _ = task.release();
        }
        self.is_running = false;
        self.is_paused = false;
        self.tick = 0;
        tracing::info!("simulation reset");
        out.push(Event::SimulationReset);
    }

    /// Empties the grid and removes every robot and task.
    pub fn clear(&mut self, out: &mut Vec<Event>) {
        self.grid.clear();
        self.robots.clear();
        self.tasks.clear();
        self.is_running = false;
        self.is_paused = false;
        self.tick = 0;
        tracing::info!("grid cleared");
        out.push(Event::GridCleared);
    }

    /// Records the requested tick cadence.
    pub fn set_speed(&mut self, speed: Speed, out: &mut Vec<Event>) {
        self.speed = speed;
        out.push(Event::SpeedChanged { speed });
    }

    /// Selects the assignment policy used from the next tick onwards.
    pub fn set_strategy(&mut self, strategy: Strategy, out: &mut Vec<Event>) {
        self.strategy = strategy;
        out.push(Event::StrategyChanged { strategy });
    }

    /// Verifies that the grid, robots and tasks agree with each other.
    ///
    /// Checks that every entity lies on the grid, identifiers are unique, each
    /// cell kind matches the entities on it, robot paths stay on the grid,
    /// advance one cell per step and end at their targets, and every claim is
    /// mirrored by the claiming robot's target.
    pub fn check_consistency(&self) -> Result<(), SimulationError> {
        let mut robot_ids = HashSet::new();
        for robot in &self.robots {
            let _ = self.grid.cell_at(robot.position())?;
            if !robot_ids.insert(robot.id()) {
                return Err(inconsistent(format!("duplicate robot id {}", robot.id())));
            }
            match robot.target() {
                None if !robot.path().is_empty() => {
                    return Err(inconsistent(format!(
                        "{} holds a path without a target",
                        robot.id()
                    )));
                }
                Some(target) if robot.path().back().is_some_and(|last| *last != target) => {
                    return Err(inconsistent(format!(
                        "path of {} does not end at its target {target}",
                        robot.id()
                    )));
                }
                _ => {}
            }
            let mut previous = robot.position();
            for &step in robot.path() {
                let _ = self.grid.cell_at(step)?;
                if previous.manhattan_distance(step) != 1 {
                    return Err(inconsistent(format!(
                        "path of {} jumps from {previous} to {step}",
                        robot.id()
                    )));
                }
                previous = step;
            }
        }

        let mut task_ids = HashSet::new();
        let mut claimants = HashSet::new();
        for task in &self.tasks {
            let _ = self.grid.cell_at(task.position())?;
            if !task_ids.insert(task.id()) {
                return Err(inconsistent(format!("duplicate task id {}", task.id())));
            }
            let Some(claimant) = task.assigned_to() else {
                continue;
            };
            if !claimants.insert(claimant) {
                return Err(inconsistent(format!("{claimant} claims several tasks")));
            }
            let target = self
                .robots
                .iter()
                .find(|robot| robot.id() == claimant)
                .and_then(Robot::target);
            if target != Some(task.position()) {
                return Err(inconsistent(format!(
                    "{} is claimed by {claimant} which does not target it",
                    task.id()
                )));
            }
        }

        for robot in &self.robots {
            let Some(target) = robot.target() else {
                continue;
            };
            let claimed = self
                .tasks
                .iter()
                .any(|task| task.assigned_to() == Some(robot.id()) && task.position() == target);
            if !claimed {
                return Err(inconsistent(format!(
                    "{} targets {target} without claiming a task there",
                    robot.id()
                )));
            }
        }

        for cell in self.grid.cells() {
            let coord = cell.coord();
            let expected = occupant_kind(coord, &self.robots, &self.tasks);
            let agrees = match cell.kind {
                CellKind::Obstacle => expected == CellKind::Empty,
                kind => kind == expected,
            };
            if !agrees {
                return Err(inconsistent(format!(
                    "cell {coord} is marked {:?} but holds {expected:?}",
                    cell.kind
                )));
            }
        }

        Ok(())
    }

    fn place(
        &mut self,
        cell: CellCoord,
        placement: PlacementKind,
        out: &mut Vec<Event>,
    ) -> Result<(), SimulationError> {
        self.grid.set_cell(cell, placement.cell_kind())?;
        match placement {
            PlacementKind::Robot => {
                let robot = RobotId::new(self.next_robot_id);
                self.next_robot_id = self.next_robot_id.saturating_add(1);
                self.robots.push(Robot::new(robot, cell));
                out.push(Event::RobotPlaced { robot, cell });
            }
            PlacementKind::Task => {
                let task = TaskId::new(self.next_task_id);
                self.next_task_id = self.next_task_id.saturating_add(1);
                self.tasks.push(Task::new(task, cell));
                out.push(Event::TaskPlaced { task, cell });
            }
            PlacementKind::Obstacle => out.push(Event::ObstaclePlaced { cell }),
        }
        Ok(())
    }

    fn clear_cell(
        &mut self,
        cell: CellCoord,
        occupant: CellKind,
        out: &mut Vec<Event>,
    ) -> Result<(), SimulationError> {
        self.grid.set_cell(cell, CellKind::Empty)?;
        if occupant == CellKind::Obstacle {
            out.push(Event::ObstacleRemoved { cell });
        }

        let (removed_robots, kept_robots): (Vec<Robot>, Vec<Robot>) = self
            .robots
            .drain(..)
            .partition(|robot| robot.position() == cell);
        self.robots = kept_robots;
        for robot in removed_robots {
            for task in &mut self.tasks {
                if task.assigned_to() == Some(robot.id()) {
                    let _ = task.release();
                }
            }
            out.push(Event::RobotRemoved {
                robot: robot.id(),
                cell,
            });
        }

        let (removed_tasks, kept_tasks): (Vec<Task>, Vec<Task>) = self
            .tasks
            .drain(..)
            .partition(|task| task.position() == cell);
        self.tasks = kept_tasks;
        for task in removed_tasks {
            if let Some(claimant) = task.assigned_to() {
                if let Some(robot) = self.robots.iter_mut().find(|robot| robot.id() == claimant) {
                    robot.clear_target();
                }
            }
            out.push(Event::TaskRemoved {
                task: task.id(),
                cell,
            });
        }

        Ok(())
    }

    /// Advances the identifier allocators past every identifier in use.
    pub(crate) fn restore_allocators(&mut self) {
        let next_robot = self
            .robots
            .iter()
            .map(|robot| robot.id().get())
            .max()
            .map_or(1, |id| id.saturating_add(1));
        let next_task = self
            .tasks
            .iter()
            .map(|task| task.id().get())
            .max()
            .map_or(1, |id| id.saturating_add(1));
        self.next_robot_id = self.next_robot_id.max(next_robot);
        self.next_task_id = self.next_task_id.max(next_task);
    }
}

/// Applies the provided command to the simulation.
///
/// Commands are validated before any state changes, so a rejected command
/// leaves the simulation untouched.
pub fn apply(
    simulation: &mut Simulation,
    command: Command,
    out_events: &mut Vec<Event>,
) -> Result<(), SimulationError> {
    match command {
        Command::EditCell { cell, placement } => {
            let _ = simulation.edit_cell(cell, placement, out_events)?;
        }
        Command::Start => simulation.start(out_events)?,
        Command::TogglePause => {
            let _ = simulation.toggle_pause(out_events)?;
        }
        Command::Reset => simulation.reset(out_events),
        Command::ClearGrid => simulation.clear(out_events),
        Command::ConfigureSpeed { speed } => simulation.set_speed(speed, out_events),
        Command::ConfigureStrategy { strategy } => simulation.set_strategy(strategy, out_events),
        Command::Tick => tick::run(simulation, out_events),
    }
    Ok(())
}

/// Query functions that provide read-only access to the simulation state.
pub mod query {
    use robot_fleet_core::{CellCoord, Grid, Robot, Speed, Strategy, Task};

    use super::{Simulation, SimulationState};

    /// Provides read-only access to the occupancy grid.
    #[must_use]
    pub fn grid(simulation: &Simulation) -> &Grid {
        &simulation.grid
    }

    /// Robots in the order they were placed.
    #[must_use]
    pub fn robots(simulation: &Simulation) -> &[Robot] {
        &simulation.robots
    }

    /// Outstanding tasks in the order they were placed.
    #[must_use]
    pub fn tasks(simulation: &Simulation) -> &[Task] {
        &simulation.tasks
    }

    /// Robot standing on the provided cell, if any.
    #[must_use]
    pub fn robot_at(simulation: &Simulation, cell: CellCoord) -> Option<&Robot> {
        simulation
            .robots
            .iter()
            .find(|robot| robot.position() == cell)
    }

    /// Task located on the provided cell, if any.
    #[must_use]
    pub fn task_at(simulation: &Simulation, cell: CellCoord) -> Option<&Task> {
        simulation.tasks.iter().find(|task| task.position() == cell)
    }

    /// Reports whether the simulation is ticking or paused mid-run.
    #[must_use]
    pub fn is_running(simulation: &Simulation) -> bool {
        simulation.is_running
    }

    /// Reports whether ticks are suspended.
    #[must_use]
    pub fn is_paused(simulation: &Simulation) -> bool {
        simulation.is_paused
    }

    /// Requested tick cadence.
    #[must_use]
    pub fn speed(simulation: &Simulation) -> Speed {
        simulation.speed
    }

    /// Active assignment policy.
    #[must_use]
    pub fn strategy(simulation: &Simulation) -> Strategy {
        simulation.strategy
    }

    /// Number of ticks advanced since the simulation last started.
    #[must_use]
    pub fn tick(simulation: &Simulation) -> u64 {
        simulation.tick
    }

    /// Lifecycle state derived from the simulation flags.
    #[must_use]
    pub fn state(simulation: &Simulation) -> SimulationState {
        match (simulation.is_running, simulation.is_paused) {
            (true, true) => SimulationState::Paused,
            (true, false) => SimulationState::Running,
            (false, _) if simulation.tick > 0 && simulation.tasks.is_empty() => {
                SimulationState::Complete
            }
            (false, _) => SimulationState::Idle,
        }
    }
}

/// Kind a cell should carry given the entities standing on it.
///
/// Robots take precedence over tasks they pass over.
pub(crate) fn occupant_kind(cell: CellCoord, robots: &[Robot], tasks: &[Task]) -> CellKind {
    if robots.iter().any(|robot| robot.position() == cell) {
        CellKind::Robot
    } else if tasks.iter().any(|task| task.position() == cell) {
        CellKind::Task
    } else {
        CellKind::Empty
    }
}

fn inconsistent(message: String) -> SimulationError {
    SimulationError::InconsistentState(message)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn place(simulation: &mut Simulation, row: u32, column: u32, placement: PlacementKind) {
        let mut events = Vec::new();
        let outcome = simulation
            .edit_cell(CellCoord::new(row, column), placement, &mut events)
            .expect("edit succeeds");
        assert_eq!(outcome, EditOutcome::Placed(placement));
    }

    #[test]
    fn new_simulation_is_idle_and_empty() {
        let simulation = Simulation::default();

        assert_eq!(query::state(&simulation), SimulationState::Idle);
        assert_eq!(query::grid(&simulation).rows(), DEFAULT_GRID_ROWS);
        assert_eq!(query::grid(&simulation).columns(), DEFAULT_GRID_COLUMNS);
        assert!(query::robots(&simulation).is_empty());
        assert!(query::tasks(&simulation).is_empty());
        assert_eq!(simulation.check_consistency(), Ok(()));
    }

    #[test]
    fn identifiers_are_never_reused() {
        let mut simulation = Simulation::new(3, 3);
        let mut events = Vec::new();
        place(&mut simulation, 0, 0, PlacementKind::Robot);
        let _ = simulation
            .edit_cell(CellCoord::new(0, 0), PlacementKind::Robot, &mut events)
            .expect("removal succeeds");
        place(&mut simulation, 1, 1, PlacementKind::Robot);

        assert_eq!(query::robots(&simulation)[0].id(), RobotId::new(2));
    }

    #[test]
    fn restore_allocators_continues_after_highest_id() {
        let mut simulation = Simulation::new(3, 3);
        place(&mut simulation, 0, 0, PlacementKind::Task);
        place(&mut simulation, 0, 1, PlacementKind::Task);
        simulation.next_task_id = 0;

        simulation.restore_allocators();

        assert_eq!(simulation.next_task_id, 3);
        assert_eq!(simulation.next_robot_id, 1);
    }

    #[test]
    fn consistency_check_flags_unmirrored_claims() {
        let mut simulation = Simulation::new(3, 3);
        place(&mut simulation, 0, 0, PlacementKind::Robot);
        place(&mut simulation, 2, 2, PlacementKind::Task);
        simulation.tasks[0].claim(RobotId::new(1));

        assert!(matches!(
            simulation.check_consistency(),
            Err(SimulationError::InconsistentState(_))
        ));
    }

    #[test]
    fn consistency_check_flags_stale_cells() {
        let mut simulation = Simulation::new(3, 3);
        place(&mut simulation, 1, 1, PlacementKind::Task);
        simulation
            .grid
            .set_cell(CellCoord::new(1, 1), CellKind::Empty)
            .expect("in bounds");

        assert!(simulation.check_consistency().is_err());
    }

    #[test]
    fn occupant_kind_prefers_robots() {
        let cell = CellCoord::new(1, 1);
        let robots = vec![Robot::new(RobotId::new(1), cell)];
        let tasks = vec![Task::new(TaskId::new(1), cell)];

        assert_eq!(occupant_kind(cell, &robots, &tasks), CellKind::Robot);
        assert_eq!(occupant_kind(cell, &[], &tasks), CellKind::Task);
        assert_eq!(occupant_kind(cell, &[], &[]), CellKind::Empty);
    }
}
