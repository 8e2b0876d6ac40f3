//! # Localisation module
//!
//! Turns odometry from the execution service into planar [`VehicleState`]s and
//! keeps the two most recent states, which the ramp controller uses to find
//! its timestep.
//!
//! Odometry velocities are given in the body frame. They are rotated into the
//! world frame here, once, so that everything downstream works in world
//! frame velocities.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod extrapolate;
pub use extrapolate::*;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::{debug, warn};
use nalgebra::Vector2;

use comms_if::{eqpt::OdomMsg, traj::VehicleState};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The latest and previous vehicle states.
#[derive(Debug, Clone, Default)]
pub struct StateHistory {
    prev: Option<VehicleState>,
    cur: Option<VehicleState>
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl StateHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new state, the current state becoming the previous one.
    pub fn push(&mut self, state: VehicleState) {
        self.prev = self.cur.replace(state);
    }

    pub fn current(&self) -> Option<&VehicleState> {
        self.cur.as_ref()
    }

    pub fn previous(&self) -> Option<&VehicleState> {
        self.prev.as_ref()
    }

    /// True once at least one state has been received.
    pub fn has_state(&self) -> bool {
        self.cur.is_some()
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Convert an odometry message into a planar state.
///
/// Returns `None` if the message contains non-finite values.
pub fn state_from_odom(msg: &OdomMsg) -> Option<VehicleState> {
    let heading_rad = msg.heading_rad();

    let state = VehicleState::from_body(
        msg.stamp_s,
        msg.position_m[0],
        msg.position_m[1],
        heading_rad,
        Vector2::new(msg.lin_vel_ms_b[0], msg.lin_vel_ms_b[1]),
        msg.ang_vel_rads_b[2]
    );

    let finite = [
        state.stamp_s, state.x_m, state.y_m, state.theta_rad,
        state.vx_ms, state.vy_ms, state.omega_rads
    ].iter().all(|v| v.is_finite());

    if !finite {
        warn!("Discarding odometry with non-finite values: {:?}", msg);
        return None;
    }

    debug!(
        "State at {:.3} s: pos ({:.3}, {:.3}) m, heading {:.3} rad, vel ({:.3}, {:.3}) m/s",
        state.stamp_s, state.x_m, state.y_m, state.theta_rad, state.vx_ms, state.vy_ms
    );

    Some(state)
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn test_state_from_odom() {
        // Facing +y and driving forwards, so world velocity is along +y
        let msg = OdomMsg::planar(1.5, 2.0, -1.0, FRAC_PI_2, 0.5, 0.0, 0.1);
        let state = state_from_odom(&msg).unwrap();

        assert_eq!(state.stamp_s, 1.5);
        assert!((state.x_m - 2.0).abs() < 1e-12);
        assert!((state.y_m + 1.0).abs() < 1e-12);
        assert!((state.theta_rad - FRAC_PI_2).abs() < 1e-9);
        assert!(state.vx_ms.abs() < 1e-9);
        assert!((state.vy_ms - 0.5).abs() < 1e-9);
        assert!((state.omega_rads - 0.1).abs() < 1e-12);

        // Non-finite messages are dropped
        let bad = OdomMsg::planar(1.5, f64::NAN, 0.0, 0.0, 0.0, 0.0, 0.0);
        assert!(state_from_odom(&bad).is_none());
    }

    #[test]
    fn test_history() {
        let mut hist = StateHistory::new();
        assert!(!hist.has_state());

        let a = VehicleState { stamp_s: 1.0, ..Default::default() };
        let b = VehicleState { stamp_s: 2.0, ..Default::default() };

        hist.push(a);
        assert_eq!(hist.current(), Some(&a));
        assert_eq!(hist.previous(), None);

        hist.push(b);
        assert_eq!(hist.current(), Some(&b));
        assert_eq!(hist.previous(), Some(&a));
    }
}
