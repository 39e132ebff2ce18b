//! Per-tick state transition: assign, plan, move, detect completion.

use robot_fleet_core::{CellCoord, CellKind, Event, Grid, Robot, Route, Task};
use robot_fleet_system_assignment::assign;
use robot_fleet_system_pathfinding::Pathfinder;

use crate::{occupant_kind, Simulation};

/// Advances the simulation by one tick and returns the updated state.
///
/// Does nothing unless the simulation is running and not paused. A tick
/// always runs to completion; a blocked step only affects the robot taking it.
#[must_use]
pub fn advance_tick(simulation: Simulation) -> Simulation {
    let mut events = Vec::new();
    advance_tick_with_events(simulation, &mut events)
}

/// Like [`advance_tick`], also reporting what happened during the tick.
#[must_use]
pub fn advance_tick_with_events(
    mut simulation: Simulation,
    out_events: &mut Vec<Event>,
) -> Simulation {
    run(&mut simulation, out_events);
    simulation
}

pub(crate) fn run(simulation: &mut Simulation, out: &mut Vec<Event>) {
    if !simulation.is_running || simulation.is_paused {
        return;
    }

    simulation.tick = simulation.tick.saturating_add(1);
    let tick = simulation.tick;
    let span = tracing::debug_span!("tick", tick);
    let _entered = span.enter();
    out.push(Event::TimeAdvanced { tick });

    assign(
        simulation.strategy,
        &mut simulation.robots,
        &mut simulation.tasks,
        out,
    );

    let mut pathfinder = Pathfinder::new();
    for robot in &mut simulation.robots {
        if robot.target().is_some() && robot.path().is_empty() {
            plan(robot, &simulation.grid, &mut pathfinder, out);
        }
    }

    let mut working = simulation.grid.clone();
    for index in 0..simulation.robots.len() {
        move_robot(simulation, index, &mut working, &mut pathfinder, out);
    }
    simulation.grid = working;

    if simulation.tasks.is_empty() {
        simulation.is_running = false;
        simulation.is_paused = false;
        tracing::info!(tick, "all tasks completed");
        out.push(Event::SimulationCompleted { tick });
    }

    debug_assert!(
        simulation.check_consistency().is_ok(),
        "tick {tick} left the simulation inconsistent: {:?}",
        simulation.check_consistency()
    );
}

fn plan(robot: &mut Robot, grid: &Grid, pathfinder: &mut Pathfinder, out: &mut Vec<Event>) {
    let Some(target) = robot.target() else {
        return;
    };

    let plan = pathfinder.search(robot.position(), target, grid);
    if plan.route == Route::Fallback {
        tracing::warn!(
            robot = %robot.id(),
            from = %robot.position(),
            to = %target,
            "target unreachable through free cells, using straight route"
        );
    }

    let steps = plan.steps.len();
    if robot.assign_path(plan.steps) {
        out.push(Event::PathPlanned {
            robot: robot.id(),
            steps,
            route: plan.route,
        });
    }
}

fn move_robot(
    simulation: &mut Simulation,
    index: usize,
    working: &mut Grid,
    pathfinder: &mut Pathfinder,
    out: &mut Vec<Event>,
) {
    let robot = &mut simulation.robots[index];

    if robot.has_arrived() {
        let cell = robot.position();
        complete(robot, cell, &mut simulation.tasks, out);
        return;
    }

    let Some(next) = robot.next_step() else {
        return;
    };

    if working.is_obstacle(next) {
        tracing::debug!(robot = %robot.id(), blocked = %next, "path blocked, replanning");
        out.push(Event::PathInvalidated {
            robot: robot.id(),
            blocked: next,
        });
        robot.clear_path();
        plan(robot, working, pathfinder, out);
        return;
    }

    let Some(from) = robot.advance() else {
        return;
    };
    let to = robot.position();
    out.push(Event::RobotAdvanced {
        robot: robot.id(),
        from,
        to,
    });

    if robot.has_arrived() {
        complete(robot, to, &mut simulation.tasks, out);
    }

    set_cell(
        working,
        from,
        occupant_kind(from, &simulation.robots, &simulation.tasks),
    );
    set_cell(working, to, CellKind::Robot);
}

fn complete(robot: &mut Robot, cell: CellCoord, tasks: &mut Vec<Task>, out: &mut Vec<Event>) {
    if let Some(position) = tasks.iter().position(|task| task.position() == cell) {
        let task = tasks.remove(position);
        tracing::debug!(robot = %robot.id(), task = %task.id(), %cell, "task completed");
        out.push(Event::TaskCompleted {
            robot: robot.id(),
            task: task.id(),
            cell,
        });
    }
    robot.clear_target();
}

fn set_cell(grid: &mut Grid, cell: CellCoord, kind: CellKind) {
    if grid.set_cell(cell, kind).is_err() {
        tracing::warn!(%cell, "robot left the grid");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use robot_fleet_core::PlacementKind;

    use crate::query;

    fn simulation_with(
        rows: u32,
        columns: u32,
        placements: &[(u32, u32, PlacementKind)],
    ) -> Simulation {
        let mut simulation = Simulation::new(rows, columns);
        let mut events = Vec::new();
        for &(row, column, placement) in placements {
            let _ = simulation
                .edit_cell(CellCoord::new(row, column), placement, &mut events)
                .expect("edit succeeds");
        }
        simulation
    }

    #[test]
    fn idle_simulation_does_not_tick() {
        let simulation = simulation_with(
            3,
            3,
            &[(0, 0, PlacementKind::Robot), (2, 2, PlacementKind::Task)],
        );
        let mut events = Vec::new();

        let after = advance_tick_with_events(simulation.clone(), &mut events);

        assert_eq!(after, simulation);
        assert!(events.is_empty());
    }

    #[test]
    fn robot_standing_on_its_task_completes_it_in_place() {
        let mut simulation = simulation_with(
            3,
            3,
            &[(1, 1, PlacementKind::Task), (2, 2, PlacementKind::Task)],
        );
        simulation.robots.push(Robot::new(
            robot_fleet_core::RobotId::new(9),
            CellCoord::new(1, 1),
        ));
        simulation
            .grid
            .set_cell(CellCoord::new(1, 1), CellKind::Robot)
            .expect("in bounds");
        let mut events = Vec::new();
        simulation.start(&mut events).expect("start succeeds");

        let simulation = advance_tick(simulation);

        assert_eq!(query::tasks(&simulation).len(), 1);
        assert_eq!(
            query::tasks(&simulation)[0].position(),
            CellCoord::new(2, 2)
        );
        assert!(query::robots(&simulation)[0].is_idle());
        assert_eq!(
            query::grid(&simulation).kind_at(CellCoord::new(1, 1)),
            Some(CellKind::Robot)
        );
    }

    #[test]
    fn passing_over_a_task_restores_its_cell() {
        let mut simulation = simulation_with(
            1,
            4,
            &[
                (0, 0, PlacementKind::Robot),
                (0, 1, PlacementKind::Task),
                (0, 3, PlacementKind::Task),
            ],
        );
        let mut events = Vec::new();
        simulation.set_strategy(robot_fleet_core::Strategy::RoundRobin, &mut events);
        simulation.tasks.swap(0, 1);
        simulation.start(&mut events).expect("start succeeds");

        let simulation = advance_tick(simulation);
        assert_eq!(
            query::grid(&simulation).kind_at(CellCoord::new(0, 1)),
            Some(CellKind::Robot)
        );
        assert_eq!(query::tasks(&simulation).len(), 2);

        let simulation = advance_tick(simulation);
        assert_eq!(
            query::grid(&simulation).kind_at(CellCoord::new(0, 1)),
            Some(CellKind::Task)
        );
        assert_eq!(
            query::grid(&simulation).kind_at(CellCoord::new(0, 2)),
            Some(CellKind::Robot)
        );
        assert_eq!(simulation.check_consistency(), Ok(()));
    }
}
