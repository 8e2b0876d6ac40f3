//! # Planned trajectories
//!
//! Both the ramp controller and the receding horizon planner produce a
//! [`PlannedTraj`], which the client wraps into a [`TrajExecGoal`] by adding
//! the goal header. The trailing zero command is added by the goal itself.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use comms_if::traj::{ExecMode, GoalHeader, Twist, TrajExecGoal, VehicleState};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A trajectory ready to be submitted for execution.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedTraj {
    /// Time between consecutive commands.
    ///
    /// Units: seconds
    pub timestep_s: f64,

    pub exec_mode: ExecMode,

    /// Reference states, world frame velocities.
    pub states: Vec<VehicleState>,

    /// Commands, not including the trailing stop.
    pub commands: Vec<Twist>
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl PlannedTraj {
    /// Build the goal for this trajectory.
    pub fn into_goal(self, header: GoalHeader) -> TrajExecGoal {
        TrajExecGoal::new(
            header,
            self.timestep_s,
            self.exec_mode,
            self.states,
            self.commands
        )
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
