//! # Trajectory goals
//!
//! A [`TrajExecGoal`] is the unit of work submitted to the trajectory
//! execution service: a sequence of reference states paired with a sequence
//! of commands. The execution service pre-empts any goal in progress with the
//! newest one it receives.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use chrono::{serde::ts_milliseconds, DateTime, Utc};
use nalgebra::{Point2, Rotation2, Vector2};
use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Planar state of the vehicle.
///
/// Velocities are in the world frame.
#[derive(Debug, Copy, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VehicleState {
    /// Time at which the state is valid.
    ///
    /// Units: seconds
    pub stamp_s: f64,

    /// Units: meters
    pub x_m: f64,

    /// Units: meters
    pub y_m: f64,

    /// Heading, angle from the world X axis.
    ///
    /// Units: radians
    pub theta_rad: f64,

    /// World frame X velocity.
    ///
    /// Units: meters/second
    pub vx_ms: f64,

    /// World frame Y velocity.
    ///
    /// Units: meters/second
    pub vy_ms: f64,

    /// Yaw rate.
    ///
    /// Units: radians/second
    pub omega_rads: f64,
}

/// A command to the vehicle: forward speed and yaw rate/steering demand.
#[derive(Debug, Copy, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Twist {
    /// Units: meters/second
    pub v_ms: f64,

    /// Units: radians/second
    pub omega_rads: f64,
}

/// Metadata common to all goals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoalHeader {
    /// Sequence number, strictly increasing over the life of a client.
    pub seq: u64,

    /// Time the goal was created.
    #[serde(with = "ts_milliseconds")]
    pub stamp: DateTime<Utc>,

    /// Coordinate frame the states are expressed in.
    pub frame_id: String,
}

/// A trajectory for the execution service to follow.
///
/// Build goals with [`TrajExecGoal::new`] or [`TrajExecGoal::stop`], which
/// guarantee that the final command is the zero command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrajExecGoal {
    pub header: GoalHeader,

    /// Time between consecutive states/commands.
    ///
    /// Units: seconds
    pub timestep_s: f64,

    pub exec_mode: ExecMode,

    /// Reference states, index aligned with `commands`.
    pub states: Vec<VehicleState>,

    /// Commands, the same length as `states` or one longer.
    pub commands: Vec<Twist>,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// How the execution service should follow a goal.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecMode {
    /// Play the commands back open loop.
    OpenLoop,

    /// Apply PID heading corrections against the reference states while
    /// executing.
    PidHeading,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl VehicleState {
    pub fn position(&self) -> Point2<f64> {
        Point2::new(self.x_m, self.y_m)
    }

    pub fn world_velocity(&self) -> Vector2<f64> {
        Vector2::new(self.vx_ms, self.vy_ms)
    }

    /// Velocity rotated into the body frame.
    pub fn body_velocity(&self) -> Vector2<f64> {
        Rotation2::new(-self.theta_rad) * self.world_velocity()
    }

    /// Build a state from a body frame velocity.
    pub fn from_body(
        stamp_s: f64,
        x_m: f64,
        y_m: f64,
        theta_rad: f64,
        vel_ms_b: Vector2<f64>,
        omega_rads: f64
    ) -> Self {
        let vel_ms_w = Rotation2::new(theta_rad) * vel_ms_b;

        Self {
            stamp_s,
            x_m,
            y_m,
            theta_rad,
            vx_ms: vel_ms_w[0],
            vy_ms: vel_ms_w[1],
            omega_rads
        }
    }

    /// This state with all rates zeroed.
    pub fn at_rest(&self) -> Self {
        Self {
            vx_ms: 0.0,
            vy_ms: 0.0,
            omega_rads: 0.0,
            ..*self
        }
    }
}

impl Twist {
    pub fn new(v_ms: f64, omega_rads: f64) -> Self {
        Self { v_ms, omega_rads }
    }

    pub fn zero() -> Self {
        Self::default()
    }

    pub fn is_zero(&self) -> bool {
        self.v_ms == 0.0 && self.omega_rads == 0.0
    }
}

impl TrajExecGoal {
    /// Create a new goal.
    ///
    /// A zero command is always appended to `commands`, so that the vehicle
    /// comes to a stop at the end of the goal even if no newer goal arrives.
    pub fn new(
        header: GoalHeader,
        timestep_s: f64,
        exec_mode: ExecMode,
        states: Vec<VehicleState>,
        mut commands: Vec<Twist>
    ) -> Self {
        commands.push(Twist::zero());

        Self {
            header,
            timestep_s,
            exec_mode,
            states,
            commands
        }
    }

    /// A goal which brings the vehicle to a stop where it currently is.
    ///
    /// Contains two zero commands and two resting states, since some execution
    /// services reject single step trajectories.
    pub fn stop(header: GoalHeader, timestep_s: f64, state: &VehicleState) -> Self {
        let rest = state.at_rest();

        Self::new(
            header,
            timestep_s,
            ExecMode::OpenLoop,
            vec![rest, rest],
            vec![Twist::zero()]
        )
    }

    pub fn final_command(&self) -> Option<&Twist> {
        self.commands.last()
    }

    /// True if the last command in the goal is the zero command.
    pub fn ends_with_stop(&self) -> bool {
        self.final_command().map(|c| c.is_zero()).unwrap_or(false)
    }

    /// True if every command in the goal is the zero command.
    pub fn is_stop(&self) -> bool {
        self.commands.iter().all(|c| c.is_zero())
    }

    /// Number of steps in the goal.
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

impl GoalHeader {
    pub fn new(seq: u64, frame_id: &str) -> Self {
        Self {
            seq,
            stamp: Utc::now(),
            frame_id: frame_id.to_string()
        }
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
