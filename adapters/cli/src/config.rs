//! Run configuration assembled from command-line flags and an optional TOML file.

use std::{fs, path::Path, path::PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use robot_fleet_core::{Speed, Strategy, DEFAULT_GRID_COLUMNS, DEFAULT_GRID_ROWS};
use robot_fleet_system_scenario::Scenario;
use serde::Deserialize;

const DEFAULT_MAX_TICKS: u64 = 10_000;
const MAX_GRID_CELLS: u64 = 1_000_000;

/// Headless robot fleet simulation.
///
/// Builds a grid from a scenario or a saved snapshot, then ticks it until
/// every task is completed or the tick limit is reached. Flags override
/// values read from `--config`.
#[derive(Debug, Parser)]
#[command(name = "robot-fleet", version, about, long_about = None)]
pub(crate) struct Cli {
    /// TOML file providing defaults for the options below.
    #[arg(long, env = "ROBOT_FLEET_CONFIG")]
    pub(crate) config: Option<PathBuf>,

    /// Number of grid rows.
    #[arg(long)]
    pub(crate) rows: Option<u32>,

    /// Number of grid columns.
    #[arg(long)]
    pub(crate) columns: Option<u32>,

    /// Assignment policy: `nearest` or `roundrobin`.
    #[arg(long)]
    pub(crate) strategy: Option<Strategy>,

    /// Tick cadence: `slow`, `normal` or `fast`.
    #[arg(long)]
    pub(crate) speed: Option<Speed>,

    /// Starting layout: `default`, `random` or `empty`.
    #[arg(long)]
    pub(crate) scenario: Option<Scenario>,

    /// Seed for the random scenario. Drawn at startup when omitted.
    #[arg(long, env = "ROBOT_FLEET_SEED")]
    pub(crate) seed: Option<u64>,

    /// Stop after this many ticks even if tasks remain.
    #[arg(long)]
    pub(crate) max_ticks: Option<u64>,

    /// Tick as fast as possible instead of sleeping between ticks.
    #[arg(long)]
    pub(crate) no_delay: bool,

    /// Print the grid after every tick.
    #[arg(long)]
    pub(crate) show_grid: bool,

    /// Resume from a snapshot instead of building a scenario.
    #[arg(long, conflicts_with = "scenario")]
    pub(crate) load: Option<PathBuf>,

    /// Write the final state to this snapshot file.
    #[arg(long)]
    pub(crate) save: Option<PathBuf>,

    /// Emit logs as JSON lines.
    #[arg(long, env = "ROBOT_FLEET_JSON_LOGS")]
    pub(crate) json_logs: bool,
}

/// Options accepted in the TOML configuration file.
#[derive(Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct FileConfig {
    pub(crate) rows: Option<u32>,
    pub(crate) columns: Option<u32>,
    pub(crate) strategy: Option<Strategy>,
    pub(crate) speed: Option<Speed>,
    pub(crate) scenario: Option<Scenario>,
    pub(crate) seed: Option<u64>,
    pub(crate) max_ticks: Option<u64>,
}

impl FileConfig {
    /// Parses a configuration document.
    pub(crate) fn parse(contents: &str) -> Result<Self> {
        toml::from_str(contents).context("invalid configuration file")
    }

    /// Reads and parses the configuration file at `path`.
    pub(crate) fn read(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        Self::parse(&contents).with_context(|| format!("in {}", path.display()))
    }
}

/// Fully resolved run settings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Settings {
    pub(crate) rows: u32,
    pub(crate) columns: u32,
    /// Explicitly requested policy; a loaded snapshot keeps its own otherwise.
    pub(crate) strategy: Option<Strategy>,
    /// Explicitly requested cadence; a loaded snapshot keeps its own otherwise.
    pub(crate) speed: Option<Speed>,
    pub(crate) scenario: Scenario,
    pub(crate) seed: Option<u64>,
    pub(crate) max_ticks: u64,
    pub(crate) no_delay: bool,
    pub(crate) show_grid: bool,
    pub(crate) load: Option<PathBuf>,
    pub(crate) save: Option<PathBuf>,
}

impl Settings {
    /// Reads the config file named by the flags, if any, and merges it.
    pub(crate) fn from_cli(cli: &Cli) -> Result<Self> {
        let file = match &cli.config {
            Some(path) => FileConfig::read(path)?,
            None => FileConfig::default(),
        };
        Self::merge(cli, file)
    }

    /// Combines flags with file values; flags win.
    pub(crate) fn merge(cli: &Cli, file: FileConfig) -> Result<Self> {
        let rows = cli.rows.or(file.rows).unwrap_or(DEFAULT_GRID_ROWS);
        let columns = cli.columns.or(file.columns).unwrap_or(DEFAULT_GRID_COLUMNS);
        anyhow::ensure!(
            rows > 0 && columns > 0,
            "grid must have at least one row and one column, got {rows}x{columns}"
        );
        anyhow::ensure!(
            u64::from(rows) * u64::from(columns) <= MAX_GRID_CELLS,
            "grid of {rows}x{columns} exceeds the limit of {MAX_GRID_CELLS} cells"
        );

        Ok(Self {
            rows,
            columns,
            strategy: cli.strategy.or(file.strategy),
            speed: cli.speed.or(file.speed),
            scenario: cli.scenario.or(file.scenario).unwrap_or_default(),
            seed: cli.seed.or(file.seed),
            max_ticks: cli.max_ticks.or(file.max_ticks).unwrap_or(DEFAULT_MAX_TICKS),
            no_delay: cli.no_delay,
            show_grid: cli.show_grid,
            load: cli.load.clone(),
            save: cli.save.clone(),
        })
    }
}
