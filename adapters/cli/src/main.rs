#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that runs the robot fleet simulation headlessly.

mod config;
mod render;

use std::thread;

use anyhow::{Context, Result};
use clap::Parser;
use robot_fleet_core::{Command, Event};
use robot_fleet_world::{self as world, query, snapshot, Simulation, SimulationState};
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::{Cli, Settings};

/// Entry point for the robot fleet command-line interface.
fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.json_logs);

    let settings = Settings::from_cli(&cli)?;
    tracing::debug!(?settings, "resolved configuration");

    let mut simulation = prepare(&settings)?;
    let report = run(&mut simulation, &settings)?;

    println!("{}", report.summary(&simulation));

    if let Some(path) = &settings.save {
        snapshot::save(&simulation, path)
            .with_context(|| format!("failed to save snapshot to {}", path.display()))?;
        tracing::info!(path = %path.display(), "snapshot written");
    }

    Ok(())
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if json {
        fmt().with_env_filter(filter).json().init();
    } else {
        fmt().with_env_filter(filter).init();
    }
}

/// Builds the starting simulation from a snapshot or a scenario.
fn prepare(settings: &Settings) -> Result<Simulation> {
    let mut simulation = match &settings.load {
        Some(path) => snapshot::load(path)
            .with_context(|| format!("failed to load snapshot from {}", path.display()))?,
        None => {
            let seed = settings.seed.unwrap_or_else(rand::random);
            tracing::info!(
                scenario = %settings.scenario,
                seed,
                rows = settings.rows,
                columns = settings.columns,
                "building scenario"
            );
            let mut simulation = Simulation::new(settings.rows, settings.columns);
            let commands = settings
                .scenario
                .commands(settings.rows, settings.columns, seed);
            apply_all(&mut simulation, commands)?;
            simulation
        }
    };

    let mut settings_commands = Vec::new();
    if let Some(strategy) = settings.strategy {
        settings_commands.push(Command::ConfigureStrategy { strategy });
    }
    if let Some(speed) = settings.speed {
        settings_commands.push(Command::ConfigureSpeed { speed });
    }
    apply_all(&mut simulation, settings_commands)?;

    Ok(simulation)
}

fn apply_all(simulation: &mut Simulation, commands: Vec<Command>) -> Result<()> {
    let mut events = Vec::new();
    for command in commands {
        world::apply(simulation, command.clone(), &mut events)
            .with_context(|| format!("command {command:?} was rejected"))?;
    }
    Ok(())
}

/// Outcome of a run.
#[derive(Debug, Default, PartialEq, Eq)]
struct RunReport {
    ticks: u64,
    completed: usize,
    fallback_routes: usize,
}

impl RunReport {
    fn record(&mut self, events: &[Event]) {
        for event in events {
            match event {
                Event::TimeAdvanced { .. } => self.ticks += 1,
                Event::TaskCompleted { .. } => self.completed += 1,
                Event::PathPlanned {
                    route: robot_fleet_core::Route::Fallback,
                    ..
                } => self.fallback_routes += 1,
                _ => {}
            }
        }
    }

    fn summary(&self, simulation: &Simulation) -> String {
        let outcome = match query::state(simulation) {
            SimulationState::Complete => "all tasks completed",
            SimulationState::Idle => "nothing to do",
            SimulationState::Running | SimulationState::Paused => "tick limit reached",
        };
        format!(
            "{outcome} after {} ticks: {} tasks completed, {} remaining, {} fallback routes",
            self.ticks,
            self.completed,
            query::tasks(simulation).len(),
            self.fallback_routes,
        )
    }
}

/// Ticks the simulation until it stops or the tick limit is reached.
fn run(simulation: &mut Simulation, settings: &Settings) -> Result<RunReport> {
    let mut report = RunReport::default();
    if query::robots(simulation).is_empty() || query::tasks(simulation).is_empty() {
        tracing::warn!("grid needs at least one robot and one task, not starting");
        return Ok(report);
    }

    let mut events = Vec::new();
    world::apply(simulation, Command::Start, &mut events).context("failed to start")?;

    let interval = query::speed(simulation).tick_interval();
    while query::is_running(simulation) && report.ticks < settings.max_ticks {
        if !settings.no_delay {
            thread::sleep(interval);
        }

        events.clear();
        world::apply(simulation, Command::Tick, &mut events).context("tick failed")?;
        report.record(&events);

        if settings.show_grid {
            println!("tick {}\n{}", query::tick(simulation), render::grid(query::grid(simulation)));
        }
    }

    if query::is_running(simulation) {
        tracing::warn!(
            max_ticks = settings.max_ticks,
            remaining = query::tasks(simulation).len(),
            "stopping at the tick limit"
        );
    }
    Ok(report)
}
