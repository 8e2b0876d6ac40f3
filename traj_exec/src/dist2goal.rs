//! # Distance to goal monitor
//!
//! Tracks the position at the end of the most recent goal and reports how
//! far the vehicle is from it. Stop goals don't move the tracked position.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use nalgebra::Point2;
use serde::Serialize;

use comms_if::traj::TrajExecGoal;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Default, Clone)]
pub struct Dist2Goal {
    goal: Option<Point2<f64>>
}

/// Error between the vehicle and the goal position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Dist2GoalReport {
    pub err_x_m: f64,
    pub err_y_m: f64,
    pub dist_m: f64
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Dist2Goal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_goal(&mut self, goal: Point2<f64>) {
        self.goal = Some(goal);
    }

    pub fn goal(&self) -> Option<Point2<f64>> {
        self.goal
    }

    /// Track the final state of a newly submitted goal.
    pub fn on_goal(&mut self, goal: &TrajExecGoal) {
        if goal.is_stop() {
            return;
        }

        if let Some(s) = goal.states.last() {
            self.goal = Some(s.position());
        }
    }

    /// Error of `position` against the tracked goal, if there is one.
    pub fn report(&self, position: &Point2<f64>) -> Option<Dist2GoalReport> {
        self.goal.map(|g| {
            let err = g - position;
            Dist2GoalReport {
                err_x_m: err[0],
                err_y_m: err[1],
                dist_m: dist_to_goal(position, &g)
            }
        })
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Planar Euclidean distance between two points.
pub fn dist_to_goal(position: &Point2<f64>, goal: &Point2<f64>) -> f64 {
    (goal - position).norm()
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
