#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Scenario system that emits the commands populating a fresh grid.
//!
//! Layouts are expressed as command batches rather than direct mutations so
//! they flow through the same validation as interactive edits. Every batch
//! starts with [`Command::ClearGrid`].

use std::{fmt, str::FromStr};

use rand::{seq::index, Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use robot_fleet_core::{CellCoord, Command, PlacementKind};
use serde::{Deserialize, Serialize};
use thiserror::Error;

const DEFAULT_ROBOTS: [(u32, u32); 8] = [
    (5, 10),
    (5, 20),
    (5, 30),
    (15, 15),
    (15, 25),
    (25, 10),
    (25, 20),
    (25, 30),
];

const DEFAULT_TASKS: [(u32, u32); 11] = [
    (10, 5),
    (10, 15),
    (10, 25),
    (10, 35),
    (20, 10),
    (20, 20),
    (20, 30),
    (25, 5),
    (25, 15),
    (25, 25),
    (25, 35),
];

const RANDOM_ROBOTS: (usize, usize) = (5, 15);
const RANDOM_TASKS: (usize, usize) = (10, 25);
const RANDOM_OBSTACLES: (usize, usize) = (10, 30);

/// Named starting layouts.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scenario {
    /// An empty grid.
    Empty,
    /// The fixed warehouse layout of eight robots and eleven tasks.
    #[default]
    Default,
    /// A seeded random scatter of robots, tasks and obstacles.
    Random,
}

impl Scenario {
    /// Commands that build this scenario on a `rows` by `columns` grid.
    ///
    /// `seed` only affects [`Scenario::Random`].
    #[must_use]
    pub fn commands(self, rows: u32, columns: u32, seed: u64) -> Vec<Command> {
        match self {
            Self::Empty => vec![Command::ClearGrid],
            Self::Default => default_layout(rows, columns),
            Self::Random => random_layout(rows, columns, seed),
        }
    }

    /// Lowercase name used in configuration files.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Empty => "empty",
            Self::Default => "default",
            Self::Random => "random",
        }
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raised when a scenario name is not recognised.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("unknown scenario `{0}`, expected one of: empty, default, random")]
pub struct UnknownScenario(pub String);

impl FromStr for Scenario {
    type Err = UnknownScenario;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "empty" => Ok(Self::Empty),
            "default" => Ok(Self::Default),
            "random" => Ok(Self::Random),
            other => Err(UnknownScenario(other.to_owned())),
        }
    }
}

/// Commands placing the fixed warehouse layout.
///
/// Cells that fall outside a smaller grid are skipped.
#[must_use]
pub fn default_layout(rows: u32, columns: u32) -> Vec<Command> {
    let robots = DEFAULT_ROBOTS
        .iter()
        .map(|&(row, column)| (CellCoord::new(row, column), PlacementKind::Robot));
    let tasks = DEFAULT_TASKS
        .iter()
        .map(|&(row, column)| (CellCoord::new(row, column), PlacementKind::Task));

    let mut commands = vec![Command::ClearGrid];
    commands.extend(
        robots
            .chain(tasks)
            .filter(|(cell, _)| cell.row() < rows && cell.column() < columns)
            .map(|(cell, placement)| Command::EditCell { cell, placement }),
    );
    commands
}

/// Commands scattering robots, tasks and obstacles over distinct cells.
///
/// Draws between 5 and 14 robots, 10 and 24 tasks and 10 and 29 obstacles,
/// capped by the number of cells available. The same seed always yields
/// the same layout.
#[must_use]
pub fn random_layout(rows: u32, columns: u32, seed: u64) -> Vec<Command> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let capacity = usize::try_from(u64::from(rows) * u64::from(columns)).unwrap_or(usize::MAX);

    let mut remaining = capacity;
    let mut draw = |(low, high): (usize, usize)| {
        let count = rng.gen_range(low..high).min(remaining);
        remaining -= count;
        count
    };
    let robots = draw(RANDOM_ROBOTS);
    let tasks = draw(RANDOM_TASKS);
    let obstacles = draw(RANDOM_OBSTACLES);

    let picked = index::sample(&mut rng, capacity, robots + tasks + obstacles);
    tracing::debug!(seed, robots, tasks, obstacles, "random layout drawn");

    let width = columns as usize;
    let mut commands = Vec::with_capacity(picked.len() + 1);
    commands.push(Command::ClearGrid);
    for (order, slot) in picked.into_iter().enumerate() {
        let placement = if order < robots {
            PlacementKind::Robot
        } else if order < robots + tasks {
            PlacementKind::Task
        } else {
            PlacementKind::Obstacle
        };
        let cell = CellCoord::new((slot / width) as u32, (slot % width) as u32);
        commands.push(Command::EditCell { cell, placement });
    }
    commands
}
