//! Ramp control parameters

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::Deserialize;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for ramp control
#[derive(Deserialize, Debug, Clone)]
pub struct Params {

    /// Acceleration applied to the commanded speed.
    ///
    /// Units: meters/second^2
    pub accel_mss: f64,

    /// Speed at which the ramp is complete.
    ///
    /// Units: meters/second
    pub target_vel_ms: f64,

    /// Commanded speed at the start of the ramp.
    ///
    /// Units: meters/second
    #[serde(default)]
    pub initial_vel_ms: f64,

    /// Time after which the ramp is abandoned and the vehicle stopped.
    ///
    /// Units: seconds
    pub timeout_s: f64,

    /// Timestep used when only one state has been received so far.
    ///
    /// Units: seconds
    #[serde(default = "default_nominal_dt_s")]
    pub nominal_dt_s: f64,

    /// Period of the ramp loop while ramping before a plan. Zero runs the
    /// loop as fast as possible.
    ///
    /// Units: seconds
    #[serde(default)]
    pub loop_period_s: f64
}

/// Parameters for the heading PID controller
#[derive(Deserialize, Debug, Clone)]
pub struct PidParams {

    /// Proportional gain
    pub k_p: f64,

    /// Integral gain
    pub k_i: f64,

    /// Derivative gain
    pub k_d: f64,

    /// Limit on the magnitude of the integral contribution
    #[serde(default = "default_integral_limit")]
    pub integral_limit: f64,

    /// Limit on the magnitude of the derivative contribution
    #[serde(default = "default_deriv_limit")]
    pub deriv_limit: f64,

    /// Limit on the magnitude of the controller output.
    ///
    /// Units: radians/second
    #[serde(default = "default_output_limit")]
    pub output_limit: f64,

    /// Timesteps at or below this produce no derivative term.
    ///
    /// Units: seconds
    #[serde(default = "default_min_dt_s")]
    pub min_dt_s: f64,

    /// Clear the integral and previous error whenever a ramp starts.
    ///
    /// When false the controller state carries over between ramps.
    #[serde(default)]
    pub reset_on_ramp_entry: bool
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

fn default_nominal_dt_s() -> f64 {
    0.1
}

fn default_integral_limit() -> f64 {
    0.25
}

fn default_deriv_limit() -> f64 {
    0.1
}

fn default_output_limit() -> f64 {
    1.0
}

fn default_min_dt_s() -> f64 {
    1e-3
}
