#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the robot fleet simulation.
//!
//! This crate defines the data model and the message surface that connects
//! adapters, the authoritative simulation and the pure systems. Adapters
//! submit [`Command`] values describing desired mutations, the world executes
//! them through its `apply` entry point and reports [`Event`] values
//! describing what changed. Systems such as pathfinding and task assignment
//! operate on the [`Grid`], [`Robot`] and [`Task`] types declared here.

mod grid;

use std::{collections::VecDeque, fmt, str::FromStr, time::Duration};

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use grid::{Cell, CellKind, Grid};

/// Number of grid rows used when no explicit dimensions are configured.
pub const DEFAULT_GRID_ROWS: u32 = 30;
/// Number of grid columns used when no explicit dimensions are configured.
pub const DEFAULT_GRID_COLUMNS: u32 = 75;

/// Location of a single grid cell expressed as row and column coordinates.
///
/// Serialises as a `[row, column]` pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "(u32, u32)", into = "(u32, u32)")]
pub struct CellCoord {
    row: u32,
    column: u32,
}

impl CellCoord {
    /// Creates a new grid cell coordinate.
    #[must_use]
    pub const fn new(row: u32, column: u32) -> Self {
        Self { row, column }
    }

    /// Zero-based row index of the cell.
    #[must_use]
    pub const fn row(&self) -> u32 {
        self.row
    }

    /// Zero-based column index of the cell.
    #[must_use]
    pub const fn column(&self) -> u32 {
        self.column
    }

    /// Computes the Manhattan distance between two cell coordinates.
    #[must_use]
    pub fn manhattan_distance(self, other: CellCoord) -> u32 {
        self.row().abs_diff(other.row()) + self.column().abs_diff(other.column())
    }
}

impl From<(u32, u32)> for CellCoord {
    fn from((row, column): (u32, u32)) -> Self {
        Self::new(row, column)
    }
}

impl From<CellCoord> for (u32, u32) {
    fn from(cell: CellCoord) -> Self {
        (cell.row, cell.column)
    }
}

impl fmt::Display for CellCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.column)
    }
}

/// Unique identifier assigned to a robot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RobotId(u32);

impl RobotId {
    /// Creates a new robot identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for RobotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "robot{}", self.0)
    }
}

/// Unique identifier assigned to a task.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(u32);

impl TaskId {
    /// Creates a new task identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task{}", self.0)
    }
}

/// Autonomous agent travelling across the grid to complete tasks.
///
/// The robot keeps the remaining steps toward its target in `path`, excluding
/// the cell it currently occupies. A robot without a target never holds a
/// path, and a non-empty path always ends at the target.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Robot {
    id: RobotId,
    position: CellCoord,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    target: Option<CellCoord>,
    #[serde(default)]
    path: VecDeque<CellCoord>,
}

impl Robot {
    /// Creates an idle robot standing on the provided cell.
    #[must_use]
    pub fn new(id: RobotId, position: CellCoord) -> Self {
        Self {
            id,
            position,
            target: None,
            path: VecDeque::new(),
        }
    }

    /// Identifier assigned to the robot.
    #[must_use]
    pub const fn id(&self) -> RobotId {
        self.id
    }

    /// Cell currently occupied by the robot.
    #[must_use]
    pub const fn position(&self) -> CellCoord {
        self.position
    }

    /// Cell the robot is travelling toward, if any.
    #[must_use]
    pub const fn target(&self) -> Option<CellCoord> {
        self.target
    }

    /// Remaining steps toward the target in travel order.
    #[must_use]
    pub fn path(&self) -> &VecDeque<CellCoord> {
        &self.path
    }

    /// Reports whether the robot has no target.
    #[must_use]
    pub const fn is_idle(&self) -> bool {
        self.target.is_none()
    }

    /// Head of the queued path, if any.
    #[must_use]
    pub fn next_step(&self) -> Option<CellCoord> {
        self.path.front().copied()
    }

    /// Points the robot at a new target, discarding any previous path.
    pub fn assign_target(&mut self, target: CellCoord) {
        self.target = Some(target);
        self.path.clear();
    }

    /// Clears the target together with the queued path.
    pub fn clear_target(&mut self) {
        self.target = None;
        self.path.clear();
    }

    /// Discards the queued path while keeping the target.
    pub fn clear_path(&mut self) {
        self.path.clear();
    }

    /// Replaces the queued path.
    ///
    /// Returns `false` and leaves the robot untouched when the robot has no
    /// target or a non-empty path does not end at the target.
    pub fn assign_path(&mut self, path: Vec<CellCoord>) -> bool {
        let Some(target) = self.target else {
            return path.is_empty();
        };

        if let Some(last) = path.last() {
            if *last != target {
                return false;
            }
        }

        self.path = path.into();
        true
    }

    /// Moves the robot onto the head of its path and returns the vacated cell.
    pub fn advance(&mut self) -> Option<CellCoord> {
        let next = self.path.pop_front()?;
        let from = self.position;
        self.position = next;
        Some(from)
    }

    /// Reports whether the robot stands on its target.
    #[must_use]
    pub fn has_arrived(&self) -> bool {
        self.target == Some(self.position)
    }
}

/// Discrete unit of work located on a grid cell.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    id: TaskId,
    position: CellCoord,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    assigned_to: Option<RobotId>,
}

impl Task {
    /// Creates an unassigned task on the provided cell.
    #[must_use]
    pub const fn new(id: TaskId, position: CellCoord) -> Self {
        Self {
            id,
            position,
            assigned_to: None,
        }
    }

    /// Identifier assigned to the task.
    #[must_use]
    pub const fn id(&self) -> TaskId {
        self.id
    }

    /// Cell the task is located on.
    #[must_use]
    pub const fn position(&self) -> CellCoord {
        self.position
    }

    /// Robot that claimed the task, if any.
    #[must_use]
    pub const fn assigned_to(&self) -> Option<RobotId> {
        self.assigned_to
    }

    /// Reports whether no robot claimed the task.
    #[must_use]
    pub const fn is_unassigned(&self) -> bool {
        self.assigned_to.is_none()
    }

    /// Records the robot that claimed the task.
    pub fn claim(&mut self, robot: RobotId) {
        self.assigned_to = Some(robot);
    }

    /// Clears the claim, returning the robot that held it.
    pub fn release(&mut self) -> Option<RobotId> {
        self.assigned_to.take()
    }
}

/// Policy used to bind idle robots to unassigned tasks.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Strategy {
    /// Each idle robot claims the closest unassigned task.
    #[default]
    #[serde(rename = "nearest")]
    NearestFirst,
    /// Unassigned tasks are dealt to idle robots in turn.
    #[serde(rename = "roundrobin")]
    RoundRobin,
}

impl Strategy {
    /// Stable textual name of the strategy.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NearestFirst => "nearest",
            Self::RoundRobin => "roundrobin",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Strategy {
    type Err = ParseSettingError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "nearest" | "nearest-first" => Ok(Self::NearestFirst),
            "roundrobin" | "round-robin" => Ok(Self::RoundRobin),
            other => Err(ParseSettingError::new("strategy", other)),
        }
    }
}

/// Cadence requested for ticking the simulation.
///
/// The simulation only records the setting; whoever schedules ticks decides
/// how to honour it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Speed {
    /// One tick per second.
    Slow,
    /// Two ticks per second.
    #[default]
    Normal,
    /// Five ticks per second.
    Fast,
}

impl Speed {
    /// Interval between consecutive ticks at this speed.
    #[must_use]
    pub const fn tick_interval(self) -> Duration {
        match self {
            Self::Slow => Duration::from_millis(1000),
            Self::Normal => Duration::from_millis(500),
            Self::Fast => Duration::from_millis(200),
        }
    }

    /// Stable textual name of the speed.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Slow => "slow",
            Self::Normal => "normal",
            Self::Fast => "fast",
        }
    }
}

impl fmt::Display for Speed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Speed {
    type Err = ParseSettingError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "slow" => Ok(Self::Slow),
            "normal" => Ok(Self::Normal),
            "fast" => Ok(Self::Fast),
            other => Err(ParseSettingError::new("speed", other)),
        }
    }
}

/// Error produced when a textual setting does not name a known value.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("unknown {setting} '{value}'")]
pub struct ParseSettingError {
    setting: &'static str,
    value: String,
}

impl ParseSettingError {
    fn new(setting: &'static str, value: &str) -> Self {
        Self {
            setting,
            value: value.to_owned(),
        }
    }
}

/// Kind of entity a grid edit places on an empty cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlacementKind {
    /// Places a new robot.
    Robot,
    /// Places a new task.
    Task,
    /// Places an impassable obstacle.
    Obstacle,
}

impl PlacementKind {
    /// Cell kind written to the grid when the placement succeeds.
    #[must_use]
    pub const fn cell_kind(self) -> CellKind {
        match self {
            Self::Robot => CellKind::Robot,
            Self::Task => CellKind::Task,
            Self::Obstacle => CellKind::Obstacle,
        }
    }
}

/// How a planned path was produced.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Route {
    /// A* reached the goal through free cells.
    Direct,
    /// The goal was unreachable, so the straight vertical-then-horizontal
    /// route was used. It may cross obstacles.
    Fallback,
    /// The start or goal is an obstacle or lies off the grid.
    Blocked,
}

/// Commands that express all permissible simulation mutations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    /// Places an entity on an empty cell or clears an occupied one.
    EditCell {
        /// Cell targeted by the edit.
        cell: CellCoord,
        /// Entity to place when the cell is empty.
        placement: PlacementKind,
    },
    /// Starts ticking the simulation.
    Start,
    /// Pauses a running simulation or resumes a paused one.
    TogglePause,
    /// Drops every assignment and stops the simulation in place.
    Reset,
    /// Empties the grid, removing every robot, task and obstacle.
    ClearGrid,
    /// Updates the requested tick cadence.
    ConfigureSpeed {
        /// Cadence to record.
        speed: Speed,
    },
    /// Updates the task assignment policy.
    ConfigureStrategy {
        /// Policy applied from the next tick onwards.
        strategy: Strategy,
    },
    /// Advances the simulation by a single tick.
    Tick,
}

/// Events reported by the simulation after processing commands.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    /// Confirms that a robot was placed on the grid.
    RobotPlaced {
        /// Identifier allocated to the robot.
        robot: RobotId,
        /// Cell the robot occupies.
        cell: CellCoord,
    },
    /// Confirms that a task was placed on the grid.
    TaskPlaced {
        /// Identifier allocated to the task.
        task: TaskId,
        /// Cell the task occupies.
        cell: CellCoord,
    },
    /// Confirms that an obstacle was placed on the grid.
    ObstaclePlaced {
        /// Cell blocked by the obstacle.
        cell: CellCoord,
    },
    /// Confirms that a robot was removed from the grid.
    RobotRemoved {
        /// Identifier of the removed robot.
        robot: RobotId,
        /// Cell the robot occupied.
        cell: CellCoord,
    },
    /// Confirms that a task was removed from the grid without completion.
    TaskRemoved {
        /// Identifier of the removed task.
        task: TaskId,
        /// Cell the task occupied.
        cell: CellCoord,
    },
    /// Confirms that an obstacle was removed from the grid.
    ObstacleRemoved {
        /// Cell that is passable again.
        cell: CellCoord,
    },
    /// Announces that the simulation started ticking.
    SimulationStarted,
    /// Announces a pause state change.
    PauseToggled {
        /// Pause state after the toggle.
        paused: bool,
    },
    /// Announces that every assignment was dropped and the simulation stopped.
    SimulationReset,
    /// Announces that the grid was emptied.
    GridCleared,
    /// Announces a new tick cadence.
    SpeedChanged {
        /// Cadence now recorded.
        speed: Speed,
    },
    /// Announces a new assignment policy.
    StrategyChanged {
        /// Policy now active.
        strategy: Strategy,
    },
    /// Indicates that the simulation advanced by one tick.
    TimeAdvanced {
        /// Number of ticks advanced since the simulation started.
        tick: u64,
    },
    /// Confirms that an idle robot claimed a task.
    TaskAssigned {
        /// Robot that claimed the task.
        robot: RobotId,
        /// Task that was claimed.
        task: TaskId,
        /// Cell the robot now targets.
        target: CellCoord,
    },
    /// Reports that a stale claim held by a target-less robot was dropped.
    TaskReleased {
        /// Robot that held the claim.
        robot: RobotId,
        /// Task that became available again.
        task: TaskId,
    },
    /// Reports that a path toward the robot's target was planned.
    PathPlanned {
        /// Robot that received the path.
        robot: RobotId,
        /// Number of steps in the path.
        steps: usize,
        /// How the path was produced.
        route: Route,
    },
    /// Reports that the next step of a path was blocked and the path dropped.
    PathInvalidated {
        /// Robot whose path became stale.
        robot: RobotId,
        /// Cell that blocked the step.
        blocked: CellCoord,
    },
    /// Confirms that a robot moved between two cells.
    RobotAdvanced {
        /// Robot that moved.
        robot: RobotId,
        /// Cell the robot occupied before moving.
        from: CellCoord,
        /// Cell the robot occupies after moving.
        to: CellCoord,
    },
    /// Confirms that a robot reached its target and retired the task.
    TaskCompleted {
        /// Robot that completed the task.
        robot: RobotId,
        /// Task that was retired.
        task: TaskId,
        /// Cell the task occupied.
        cell: CellCoord,
    },
    /// Announces that the task list emptied and the simulation stopped.
    SimulationCompleted {
        /// Tick on which the final task was completed.
        tick: u64,
    },
}

/// Reasons an operation may be refused by the simulation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Error)]
pub enum Rejection {
    /// Grid edits are refused while the simulation runs, paused or not.
    #[error("grid edits are rejected while the simulation is running")]
    EditWhileRunning,
    /// The simulation cannot start without robots.
    #[error("cannot start without any robots")]
    NoRobots,
    /// The simulation cannot start without tasks.
    #[error("cannot start without any tasks")]
    NoTasks,
    /// Only a running simulation can be paused or resumed.
    #[error("cannot pause a simulation that is not running")]
    PauseWhileIdle,
}

/// Errors surfaced by simulation operations.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum SimulationError {
    /// The coordinate lies outside the grid extents.
    #[error("cell {cell} lies outside the {rows}x{columns} grid")]
    OutOfBounds {
        /// Coordinate that was requested.
        cell: CellCoord,
        /// Number of rows in the grid.
        rows: u32,
        /// Number of columns in the grid.
        columns: u32,
    },
    /// The operation is refused in the current simulation state.
    #[error("operation not allowed: {0}")]
    OperationNotAllowed(Rejection),
    /// Grid, robots and tasks disagree with each other.
    #[error("inconsistent simulation state: {0}")]
    InconsistentState(String),
}
