use std::path::PathBuf;

use robot_fleet_core::{CellCoord, Command, PlacementKind, RobotId, SimulationError, Speed};
use robot_fleet_world::{
    self as world, query,
    snapshot::{self, SnapshotError},
    Simulation,
};

fn mid_run() -> Simulation {
    let mut simulation = Simulation::new(6, 8);
    let mut events = Vec::new();
    for command in [
        Command::EditCell {
            cell: CellCoord::new(0, 0),
            placement: PlacementKind::Robot,
        },
        Command::EditCell {
            cell: CellCoord::new(5, 7),
            placement: PlacementKind::Task,
        },
        Command::EditCell {
            cell: CellCoord::new(2, 3),
            placement: PlacementKind::Obstacle,
        },
        Command::ConfigureSpeed { speed: Speed::Slow },
        Command::Start,
        Command::Tick,
        Command::Tick,
        Command::TogglePause,
    ] {
        world::apply(&mut simulation, command, &mut events).expect("command accepted");
    }
    simulation
}

fn scratch_file(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("robot-fleet-{}-{name}", std::process::id()))
}

#[test]
fn json_round_trip_preserves_the_simulation() {
    let simulation = mid_run();

    let json = snapshot::to_json(&simulation).expect("serialises");
    let restored = snapshot::from_json(&json).expect("deserialises");

    assert_eq!(restored, simulation);
    assert_eq!(query::speed(&restored), Speed::Slow);
    assert!(query::is_paused(&restored));
}

#[test]
fn snapshot_uses_the_interchange_field_names() {
    let json = snapshot::to_json(&mid_run()).expect("serialises");
    let value: serde_json::Value = serde_json::from_str(&json).expect("valid json");

    assert_eq!(value["isRunning"], serde_json::json!(true));
    assert_eq!(value["isPaused"], serde_json::json!(true));
    assert_eq!(value["grid"][2][3]["kind"], serde_json::json!("obstacle"));
    assert_eq!(value["grid"][2][3]["row"], serde_json::json!(2));
    assert_eq!(value["grid"][2][3]["col"], serde_json::json!(3));
    assert_eq!(value["tasks"][0]["assignedTo"], serde_json::json!(1));
    assert_eq!(value["robots"][0]["target"], serde_json::json!([5, 7]));
}

#[test]
fn save_and_load_through_the_filesystem() {
    let path = scratch_file("save-load.json");
    let simulation = mid_run();

    snapshot::save(&simulation, &path).expect("saves");
    let loaded = snapshot::load(&path);
    let _ = std::fs::remove_file(&path);

    assert_eq!(loaded.expect("loads"), simulation);
}

#[test]
fn loading_continues_identifier_allocation() {
    let json = snapshot::to_json(&mid_run()).expect("serialises");
    let mut value: serde_json::Value = serde_json::from_str(&json).expect("valid json");
    let object = value.as_object_mut().expect("object");
    let _ = object.remove("nextRobotId");
    let _ = object.remove("nextTaskId");
    object["isRunning"] = serde_json::json!(false);
    object["isPaused"] = serde_json::json!(false);
    let mut simulation = snapshot::from_json(&value.to_string()).expect("deserialises");

    let mut events = Vec::new();
    let _ = simulation
        .edit_cell(CellCoord::new(4, 4), PlacementKind::Robot, &mut events)
        .expect("edit succeeds");

    assert_eq!(query::robots(&simulation)[1].id(), RobotId::new(2));
}

#[test]
fn dangling_claims_are_rejected() {
    let json = snapshot::to_json(&mid_run()).expect("serialises");
    let mut value: serde_json::Value = serde_json::from_str(&json).expect("valid json");
    value["tasks"][0]["assignedTo"] = serde_json::json!(42);

    let error = snapshot::from_json(&value.to_string()).expect_err("inconsistent");

    assert!(matches!(
        error,
        SnapshotError::Invalid(SimulationError::InconsistentState(_))
    ));
}

#[test]
fn stale_cells_are_rejected() {
    let json = snapshot::to_json(&mid_run()).expect("serialises");
    let mut value: serde_json::Value = serde_json::from_str(&json).expect("valid json");
    value["grid"][0][5]["kind"] = serde_json::json!("task");

    assert!(matches!(
        snapshot::from_json(&value.to_string()),
        Err(SnapshotError::Invalid(_))
    ));
}

#[test]
fn entities_off_the_grid_are_rejected() {
    let json = snapshot::to_json(&mid_run()).expect("serialises");
    let mut value: serde_json::Value = serde_json::from_str(&json).expect("valid json");
    value["tasks"][0]["position"] = serde_json::json!([40, 40]);

    assert!(matches!(
        snapshot::from_json(&value.to_string()),
        Err(SnapshotError::Invalid(SimulationError::OutOfBounds { .. }))
    ));
}

fn claimed_two_by_two(path: serde_json::Value) -> String {
    let mut simulation = Simulation::new(2, 2);
    let mut events = Vec::new();
    for (cell, placement) in [
        (CellCoord::new(0, 0), PlacementKind::Robot),
        (CellCoord::new(1, 1), PlacementKind::Task),
    ] {
        let _ = simulation
            .edit_cell(cell, placement, &mut events)
            .expect("edit succeeds");
    }
    let json = snapshot::to_json(&simulation).expect("serialises");
    let mut value: serde_json::Value = serde_json::from_str(&json).expect("valid json");
    value["robots"][0]["target"] = serde_json::json!([1, 1]);
    value["robots"][0]["path"] = path;
    value["tasks"][0]["assignedTo"] = serde_json::json!(1);
    value["isRunning"] = serde_json::json!(true);
    value.to_string()
}

#[test]
fn paths_leaving_the_grid_are_rejected() {
    let json = claimed_two_by_two(serde_json::json!([[7, 7], [1, 1]]));

    assert!(matches!(
        snapshot::from_json(&json),
        Err(SnapshotError::Invalid(SimulationError::OutOfBounds { .. }))
    ));
}

#[test]
fn paths_skipping_cells_are_rejected() {
    let json = claimed_two_by_two(serde_json::json!([[1, 1]]));

    assert!(matches!(
        snapshot::from_json(&json),
        Err(SnapshotError::Invalid(SimulationError::InconsistentState(_)))
    ));
}

#[test]
fn contiguous_loaded_paths_are_followed_on_the_grid() {
    let json = claimed_two_by_two(serde_json::json!([[1, 0], [1, 1]]));
    let mut simulation = snapshot::from_json(&json).expect("consistent snapshot");
    let mut events = Vec::new();

    for _ in 0..2 {
        world::apply(&mut simulation, Command::Tick, &mut events).expect("tick succeeds");
    }

    assert_eq!(
        query::robots(&simulation)[0].position(),
        CellCoord::new(1, 1)
    );
    assert!(query::tasks(&simulation).is_empty());
    assert_eq!(simulation.check_consistency(), Ok(()));
}
