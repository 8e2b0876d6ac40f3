//! Optimiser data types
//!
//! The optimiser works on a 10 element augmented state and a 2 element
//! control. These are held in named structures here and only flattened into
//! arrays at the optimiser boundary.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use nalgebra::{Point2, Vector2};
use serde::{Deserialize, Serialize};

use comms_if::traj::VehicleState;
use super::OptimiserError;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Number of elements in the flattened solver state.
pub const STATE_DIM: usize = 10;

/// Number of elements in the flattened solver control.
pub const CONTROL_DIM: usize = 2;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Augmented state used by the optimiser.
///
/// Velocities are in the body frame. The previous control is carried in the
/// state so that control rates can be penalised.
#[derive(Debug, Copy, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SolverState {
    pub x_m: f64,
    pub y_m: f64,
    pub theta_rad: f64,
    pub vx_ms_b: f64,
    pub vy_ms_b: f64,
    pub omega_rads: f64,

    /// Previously applied speed command
    pub prev_v_ms: f64,

    /// Previously applied steer command
    pub prev_steer: f64,

    /// Unused, always zero on input
    pub reserved: [f64; 2]
}

/// A control applied by the optimiser.
#[derive(Debug, Copy, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SolverControl {
    /// Speed command.
    ///
    /// Units: meters/second
    pub v_ms: f64,

    /// Steer command, used directly as the yaw rate command.
    ///
    /// Units: radians/second
    pub steer: f64
}

/// One optimisation problem.
#[derive(Debug, Clone, PartialEq)]
pub struct Problem {
    /// Start state, from the (possibly extrapolated) vehicle state
    pub start: SolverState,

    /// Initial control guess, `horizon` long
    pub u_init: Vec<SolverControl>,

    /// Destination, only the first six elements are meaningful
    pub destination: SolverState,

    /// Obstacle position in the world frame, if one has been seen
    pub obstacle: Option<Point2<f64>>,

    /// Number of controls to plan
    pub horizon: usize,

    /// Time between planned steps.
    ///
    /// Units: seconds
    pub timestep_s: f64
}

/// The optimiser's solution.
#[derive(Debug, Clone, PartialEq)]
pub struct Solution {
    /// `horizon + 1` states, the first being the start state
    pub states: Vec<SolverState>,

    /// `horizon` controls
    pub controls: Vec<SolverControl>,

    /// False if the optimiser stopped before converging
    pub converged: bool
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl SolverState {
    /// Build the start state for a vehicle state and the last commanded
    /// control.
    pub fn from_vehicle(state: &VehicleState, prev: SolverControl) -> Self {
        let vel_ms_b = state.body_velocity();

        Self {
            x_m: state.x_m,
            y_m: state.y_m,
            theta_rad: state.theta_rad,
            vx_ms_b: vel_ms_b[0],
            vy_ms_b: vel_ms_b[1],
            omega_rads: state.omega_rads,
            prev_v_ms: prev.v_ms,
            prev_steer: prev.steer,
            reserved: [0f64; 2]
        }
    }

    /// Build a destination from the planar part of the state.
    pub fn destination(dest: &[f64; 6]) -> Self {
        Self {
            x_m: dest[0],
            y_m: dest[1],
            theta_rad: dest[2],
            vx_ms_b: dest[3],
            vy_ms_b: dest[4],
            omega_rads: dest[5],
            ..Default::default()
        }
    }

    /// Convert into a vehicle state with world frame velocities.
    pub fn to_vehicle(&self, stamp_s: f64) -> VehicleState {
        VehicleState::from_body(
            stamp_s,
            self.x_m,
            self.y_m,
            self.theta_rad,
            Vector2::new(self.vx_ms_b, self.vy_ms_b),
            self.omega_rads
        )
    }

    pub fn position(&self) -> Point2<f64> {
        Point2::new(self.x_m, self.y_m)
    }

    pub fn to_array(&self) -> [f64; STATE_DIM] {
        [
            self.x_m, self.y_m, self.theta_rad,
            self.vx_ms_b, self.vy_ms_b, self.omega_rads,
            self.prev_v_ms, self.prev_steer,
            self.reserved[0], self.reserved[1]
        ]
    }

    pub fn from_array(a: &[f64; STATE_DIM]) -> Self {
        Self {
            x_m: a[0],
            y_m: a[1],
            theta_rad: a[2],
            vx_ms_b: a[3],
            vy_ms_b: a[4],
            omega_rads: a[5],
            prev_v_ms: a[6],
            prev_steer: a[7],
            reserved: [a[8], a[9]]
        }
    }

    pub fn is_finite(&self) -> bool {
        self.to_array().iter().all(|v| v.is_finite())
    }
}

impl SolverControl {
    pub fn new(v_ms: f64, steer: f64) -> Self {
        Self { v_ms, steer }
    }

    pub fn to_array(&self) -> [f64; CONTROL_DIM] {
        [self.v_ms, self.steer]
    }

    pub fn from_array(a: &[f64; CONTROL_DIM]) -> Self {
        Self::new(a[0], a[1])
    }

    pub fn is_finite(&self) -> bool {
        self.v_ms.is_finite() && self.steer.is_finite()
    }
}

impl Problem {
    /// The initial guess flattened into `[v_0, steer_0, v_1, steer_1, ...]`.
    pub fn u_init_flat(&self) -> Vec<f64> {
        self.u_init.iter().flat_map(|u| u.to_array().to_vec()).collect()
    }
}

impl Solution {
    /// Build a solution from flattened state and control sequences.
    pub fn from_flat(
        x: &[f64],
        u: &[f64],
        converged: bool
    ) -> Result<Self, OptimiserError> {
        if x.len() % STATE_DIM != 0 || u.len() % CONTROL_DIM != 0 {
            return Err(OptimiserError::RaggedOutput {
                state_len: x.len(),
                control_len: u.len()
            });
        }

        let mut states = Vec::with_capacity(x.len() / STATE_DIM);
        for chunk in x.chunks(STATE_DIM) {
            let mut a = [0f64; STATE_DIM];
            a.copy_from_slice(chunk);
            states.push(SolverState::from_array(&a));
        }

        let controls = u
            .chunks(CONTROL_DIM)
            .map(|c| SolverControl::new(c[0], c[1]))
            .collect();

        Ok(Self { states, controls, converged })
    }

    /// Check the solution has the shape expected for `horizon`, holds at
    /// least one control, and contains only finite values.
    pub fn validate(&self, horizon: usize) -> Result<(), OptimiserError> {
        if self.controls.is_empty()
            || self.states.len() != horizon + 1
            || self.controls.len() != horizon
        {
            return Err(OptimiserError::MalformedSolution {
                horizon,
                num_states: self.states.len(),
                num_controls: self.controls.len()
            });
        }

        if let Some(i) = self.states.iter().position(|s| !s.is_finite()) {
            return Err(OptimiserError::NonFiniteState(i));
        }

        if let Some(i) = self.controls.iter().position(|c| !c.is_finite()) {
            return Err(OptimiserError::NonFiniteControl(i));
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
