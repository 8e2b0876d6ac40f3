//! Latency compensation by extrapolating the vehicle state forward in time.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::trace;

use comms_if::{net::{NetError, StateSender}, traj::VehicleState};

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// Sink for predicted states, used for visualisation.
pub trait PredictedStatePub {
    fn publish(&mut self, state: &VehicleState) -> Result<(), NetError>;
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Projects states forward by a fixed lookahead.
#[derive(Debug, Clone, Copy)]
pub struct Extrapolator {
    lookahead_s: f64
}

/// Predicted state sink which drops everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullStatePub;

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Extrapolator {
    pub fn new(lookahead_s: f64) -> Self {
        Self { lookahead_s }
    }

    pub fn lookahead_s(&self) -> f64 {
        self.lookahead_s
    }

    /// Extrapolate the state and publish the prediction.
    ///
    /// Failing to publish is not fatal, the prediction is still returned.
    pub fn project(
        &self,
        state: &VehicleState,
        publisher: &mut dyn PredictedStatePub
    ) -> VehicleState {
        let predicted = extrapolate(state, self.lookahead_s);

        if let Err(e) = publisher.publish(&predicted) {
            trace!("Could not publish predicted state: {}", e);
        }

        predicted
    }
}

impl PredictedStatePub for NullStatePub {
    fn publish(&mut self, _state: &VehicleState) -> Result<(), NetError> {
        Ok(())
    }
}

impl PredictedStatePub for StateSender {
    fn publish(&mut self, state: &VehicleState) -> Result<(), NetError> {
        self.send(*state)
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Move the state forward by `dt_s` assuming constant world frame velocity
/// and yaw rate.
///
/// Velocities, yaw rate and the timestamp are carried over unchanged, so the
/// result is still comparable with the state it came from.
pub fn extrapolate(state: &VehicleState, dt_s: f64) -> VehicleState {
    VehicleState {
        x_m: state.x_m + dt_s * state.vx_ms,
        y_m: state.y_m + dt_s * state.vy_ms,
        theta_rad: state.theta_rad + dt_s * state.omega_rads,
        ..*state
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
