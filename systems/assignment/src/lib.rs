#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure task assignment policies binding idle robots to unassigned tasks.
//!
//! Policies mutate the provided robot and task slices in place: an idle robot
//! receives a target and the claimed task records the robot. Every claim is
//! reported through an [`Event::TaskAssigned`] so callers can log or replay
//! assignments.

use robot_fleet_core::{Event, Robot, Strategy, Task};

/// Strategy for distributing unassigned tasks across idle robots.
pub trait AssignmentPolicy: std::fmt::Debug + Send + Sync {
    /// Assigns unassigned tasks to idle robots.
    fn assign(&self, robots: &mut [Robot], tasks: &mut [Task], out: &mut Vec<Event>);
}

/// Each idle robot claims the closest unassigned task.
///
/// Only tasks that were unassigned when the pass began are candidates, so a
/// claim released by the orphan cleanup becomes claimable on the next pass.
#[derive(Clone, Copy, Debug, Default)]
pub struct NearestFirst;

impl AssignmentPolicy for NearestFirst {
    fn assign(&self, robots: &mut [Robot], tasks: &mut [Task], out: &mut Vec<Event>) {
        let available: Vec<usize> = tasks
            .iter()
            .enumerate()
            .filter(|(_, task)| task.is_unassigned())
            .map(|(index, _)| index)
            .collect();
        release_orphaned_claims(robots, tasks, out);

        for robot in robots.iter_mut().filter(|robot| robot.is_idle()) {
            let mut nearest: Option<(usize, u32)> = None;
            for &index in &available {
                let task = &tasks[index];
                if !task.is_unassigned() {
                    continue;
                }
                let distance = robot.position().manhattan_distance(task.position());
                match nearest {
                    Some((_, best)) if distance >= best => {}
                    _ => nearest = Some((index, distance)),
                }
            }

            let Some((index, _)) = nearest else {
                break;
            };
            claim(robot, &mut tasks[index], out);
        }
    }
}

/// Unassigned tasks are dealt to idle robots in turn.
///
/// The i-th unassigned task goes to idle robot `i mod idle_count`, skipping
/// robots that already received a target earlier in the same pass. Tasks left
/// over wait for a later invocation.
#[derive(Clone, Copy, Debug, Default)]
pub struct RoundRobin;

impl AssignmentPolicy for RoundRobin {
    fn assign(&self, robots: &mut [Robot], tasks: &mut [Task], out: &mut Vec<Event>) {
        let idle: Vec<usize> = robots
            .iter()
            .enumerate()
            .filter(|(_, robot)| robot.is_idle())
            .map(|(index, _)| index)
            .collect();
        let available: Vec<usize> = tasks
            .iter()
            .enumerate()
            .filter(|(_, task)| task.is_unassigned())
            .map(|(index, _)| index)
            .collect();

        if idle.is_empty() || available.is_empty() {
            return;
        }

        for (turn, &task_index) in available.iter().enumerate() {
            let robot = &mut robots[idle[turn % idle.len()]];
            if robot.is_idle() {
                claim(robot, &mut tasks[task_index], out);
            }
        }
    }
}

/// Returns the policy implementing the provided strategy.
#[must_use]
pub fn policy_for(strategy: Strategy) -> &'static dyn AssignmentPolicy {
    match strategy {
        Strategy::NearestFirst => &NearestFirst,
        Strategy::RoundRobin => &RoundRobin,
    }
}

/// Runs the policy implementing `strategy` over the provided robots and tasks.
pub fn assign(strategy: Strategy, robots: &mut [Robot], tasks: &mut [Task], out: &mut Vec<Event>) {
    policy_for(strategy).assign(robots, tasks, out);
}

/// Drops claims held by robots that no longer have a target.
///
/// Running this repeatedly is harmless: once every target-less robot is free
/// of claims nothing changes.
pub fn release_orphaned_claims(robots: &[Robot], tasks: &mut [Task], out: &mut Vec<Event>) {
    for robot in robots.iter().filter(|robot| robot.is_idle()) {
        for task in tasks
            .iter_mut()
            .filter(|task| task.assigned_to() == Some(robot.id()))
        {
            if task.release().is_some() {
                tracing::debug!(robot = %robot.id(), task = %task.id(), "released orphaned claim");
                out.push(Event::TaskReleased {
                    robot: robot.id(),
                    task: task.id(),
                });
            }
        }
    }
}

fn claim(robot: &mut Robot, task: &mut Task, out: &mut Vec<Event>) {
    task.claim(robot.id());
    robot.assign_target(task.position());
    tracing::debug!(
        robot = %robot.id(),
        task = %task.id(),
        target = %task.position(),
        "task assigned"
    );
    out.push(Event::TaskAssigned {
        robot: robot.id(),
        task: task.id(),
        target: task.position(),
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use robot_fleet_core::{CellCoord, RobotId, TaskId};

    #[test]
    fn release_is_idempotent() {
        let robots = vec![Robot::new(RobotId::new(1), CellCoord::new(0, 0))];
        let mut tasks = vec![Task::new(TaskId::new(1), CellCoord::new(3, 3))];
        tasks[0].claim(RobotId::new(1));
        let mut events = Vec::new();

        release_orphaned_claims(&robots, &mut tasks, &mut events);
        release_orphaned_claims(&robots, &mut tasks, &mut events);

        assert!(tasks[0].is_unassigned());
        assert_eq!(
            events,
            vec![Event::TaskReleased {
                robot: RobotId::new(1),
                task: TaskId::new(1),
            }]
        );
    }

    #[test]
    fn policy_for_matches_strategy() {
        assert_eq!(format!("{:?}", policy_for(Strategy::NearestFirst)), "NearestFirst");
        assert_eq!(format!("{:?}", policy_for(Strategy::RoundRobin)), "RoundRobin");
    }
}
