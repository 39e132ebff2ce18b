use robot_fleet_core::{CellCoord, Command, Event, PlacementKind, Strategy};
use robot_fleet_world::{self as world, query, Simulation};

#[test]
fn deterministic_replay_produces_identical_runs() {
    let first = replay(scripted_commands(Strategy::NearestFirst));
    let second = replay(scripted_commands(Strategy::NearestFirst));

    assert_eq!(first, second, "replay diverged between runs");
    assert!(first.events.contains(&Event::SimulationCompleted { tick: first.ticks }));
}

#[test]
fn strategies_diverge_on_the_same_layout() {
    let nearest = replay(scripted_commands(Strategy::NearestFirst));
    let round_robin = replay(scripted_commands(Strategy::RoundRobin));

    assert_ne!(assignments(&nearest.events), assignments(&round_robin.events));
    assert_eq!(nearest.final_state.tasks_remaining, 0);
    assert_eq!(round_robin.final_state.tasks_remaining, 0);
}

#[derive(Debug, PartialEq, Eq)]
struct ReplayOutcome {
    events: Vec<Event>,
    ticks: u64,
    final_state: FinalState,
}

#[derive(Debug, PartialEq, Eq)]
struct FinalState {
    robot_cells: Vec<CellCoord>,
    tasks_remaining: usize,
}

fn replay(commands: Vec<Command>) -> ReplayOutcome {
    let mut simulation = Simulation::new(12, 12);
    let mut events = Vec::new();

    for command in commands {
        world::apply(&mut simulation, command, &mut events).expect("scripted command accepted");
    }

    for _ in 0..200 {
        if !query::is_running(&simulation) {
            break;
        }
        world::apply(&mut simulation, Command::Tick, &mut events).expect("tick accepted");
    }

    ReplayOutcome {
        events,
        ticks: query::tick(&simulation),
        final_state: FinalState {
            robot_cells: query::robots(&simulation)
                .iter()
                .map(|robot| robot.position())
                .collect(),
            tasks_remaining: query::tasks(&simulation).len(),
        },
    }
}

fn assignments(events: &[Event]) -> Vec<&Event> {
    events
        .iter()
        .filter(|event| matches!(event, Event::TaskAssigned { .. }))
        .collect()
}

fn scripted_commands(strategy: Strategy) -> Vec<Command> {
    let mut commands = vec![Command::ConfigureStrategy { strategy }];
    let placements = [
        (1, 1, PlacementKind::Robot),
        (10, 10, PlacementKind::Robot),
        (6, 2, PlacementKind::Robot),
        (2, 9, PlacementKind::Task),
        (9, 2, PlacementKind::Task),
        (5, 5, PlacementKind::Task),
        (0, 11, PlacementKind::Task),
        (11, 0, PlacementKind::Task),
        (4, 4, PlacementKind::Obstacle),
        (4, 5, PlacementKind::Obstacle),
        (4, 6, PlacementKind::Obstacle),
        (5, 4, PlacementKind::Obstacle),
        (6, 4, PlacementKind::Obstacle),
    ];
    commands.extend(
        placements
            .into_iter()
            .map(|(row, column, placement)| Command::EditCell {
                cell: CellCoord::new(row, column),
                placement,
            }),
    );
    commands.push(Command::Start);
    commands
}
