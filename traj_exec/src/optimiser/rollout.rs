//! # Rollout optimiser
//!
//! A simple reference optimiser which rolls a unicycle model forward under a
//! heading pursuit law. The vehicle steers towards the destination, or
//! towards a waypoint beside the obstacle while the obstacle lies on the
//! direct path. It doesn't iterate, so the initial guess is only used for
//! its length, and it always reports convergence.
//!
//! This is used by the simulation and tests in place of a full optimiser.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::trace;
use nalgebra::{Point2, Vector2};
use serde::Deserialize;

use util::maths::{clamp, clamp_abs, wrap_to_pi};
use super::*;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct RolloutParams {
    /// Units: meters/second
    pub cruise_vel_ms: f64,

    /// Gain from heading error to steer command
    pub heading_gain: f64,

    /// Units: radians/second
    pub max_steer_rads: f64,

    /// Speed falls off linearly inside this distance of the destination.
    ///
    /// Units: meters
    pub slow_radius_m: f64,

    /// Lateral distance at which the obstacle is passed.
    ///
    /// Units: meters
    pub clearance_m: f64,

    /// Units: meters/second^2
    pub max_accel_mss: f64
}

pub struct RolloutOptimiser {
    params: RolloutParams
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for RolloutParams {
    fn default() -> Self {
        Self {
            cruise_vel_ms: 1.0,
            heading_gain: 1.5,
            max_steer_rads: 1.0,
            slow_radius_m: 1.0,
            clearance_m: 0.75,
            max_accel_mss: 1.0
        }
    }
}

impl RolloutOptimiser {
    pub fn new(params: RolloutParams) -> Self {
        Self { params }
    }

    /// The point the vehicle should currently steer towards.
    fn target(&self, pos: &Point2<f64>, problem: &Problem) -> Point2<f64> {
        let dest = problem.destination.position();

        let obs = match problem.obstacle {
            Some(o) => o,
            None => return dest
        };

        let to_dest = dest - pos;
        let dist_m = to_dest.norm();
        if dist_m < 1e-6 {
            return dest;
        }
        let dir = to_dest / dist_m;

        // Position of the obstacle along and across the direct path, +ve
        // lateral being to the left
        let rel = obs - pos;
        let along_m = rel.dot(&dir);
        let lateral_m = dir[0] * rel[1] - dir[1] * rel[0];

        if along_m > 0f64 && along_m < dist_m && lateral_m.abs() < self.params.clearance_m {
            let left = Vector2::new(-dir[1], dir[0]);
            let side = if lateral_m > 0f64 { -1f64 } else { 1f64 };

            obs + left * side * self.params.clearance_m + dir * self.params.clearance_m
        }
        else {
            dest
        }
    }
}

impl Optimiser for RolloutOptimiser {
    fn solve(&mut self, problem: &Problem) -> Result<Solution, OptimiserError> {
        if problem.horizon == 0 {
            return Err(OptimiserError::SolverFailed("zero length horizon".into()));
        }
        if !(problem.timestep_s > 0f64) {
            return Err(OptimiserError::SolverFailed(
                format!("invalid timestep {}", problem.timestep_s)
            ));
        }
        if !problem.start.is_finite() {
            return Err(OptimiserError::SolverFailed("non-finite start state".into()));
        }

        let dt = problem.timestep_s;
        let p = &self.params;
        let dest = problem.destination.position();

        let mut states = Vec::with_capacity(problem.horizon + 1);
        let mut controls = Vec::with_capacity(problem.horizon);

        let mut s = problem.start;
        states.push(s);

        for _ in 0..problem.horizon {
            let pos = s.position();
            let target = self.target(&pos, problem);
            let to_target = target - pos;

            let head_err_rad = if to_target.norm() > 1e-6 {
                wrap_to_pi(to_target[1].atan2(to_target[0]) - s.theta_rad)
            }
            else {
                0f64
            };

            let steer = clamp_abs(p.heading_gain * head_err_rad, p.max_steer_rads);

            // Slow down near the destination and when facing away from the
            // target
            let dist_m = (dest - pos).norm();
            let v_dem_ms = p.cruise_vel_ms
                * (dist_m / p.slow_radius_m).min(1f64)
                * head_err_rad.cos().max(0f64);
            let v_ms = clamp(
                v_dem_ms,
                s.prev_v_ms - p.max_accel_mss * dt,
                s.prev_v_ms + p.max_accel_mss * dt
            );

            let theta_rad = s.theta_rad + steer * dt;
            s = SolverState {
                x_m: s.x_m + v_ms * theta_rad.cos() * dt,
                y_m: s.y_m + v_ms * theta_rad.sin() * dt,
                theta_rad,
                vx_ms_b: v_ms,
                vy_ms_b: 0f64,
                omega_rads: steer,
                prev_v_ms: v_ms,
                prev_steer: steer,
                reserved: [0f64; 2]
            };

            controls.push(SolverControl::new(v_ms, steer));
            states.push(s);
        }

        trace!(
            "Rollout from ({:.3}, {:.3}) ends at ({:.3}, {:.3})",
            problem.start.x_m, problem.start.y_m, s.x_m, s.y_m
        );

        Ok(Solution {
            states,
            controls,
            converged: true
        })
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
