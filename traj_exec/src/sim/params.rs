//! Simulated vehicle parameters

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Deserialize;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

#[derive(Deserialize, Debug, Clone)]
pub struct SimParams {

    /// Rate at which the vehicle is stepped and odometry published.
    ///
    /// Units: hertz
    pub rate_hz: f64,

    /// Length of the simulation.
    ///
    /// Units: seconds
    pub duration_s: f64,

    /// Units: meters/second^2
    pub max_accel_mss: f64,

    /// Units: radians/second
    pub max_yaw_rate_rads: f64,

    /// Gain on heading error when a goal asks for heading correction
    pub heading_gain: f64,

    /// Initial `[x, y, heading]`.
    ///
    /// Units: meters, radians
    #[serde(default)]
    pub initial_pose: [f64; 3],

    /// Position of the obstacle, if there is one.
    ///
    /// Units: meters
    #[serde(default)]
    pub obstacle_m: Option<[f64; 2]>,

    /// The obstacle is only reported when closer than this.
    ///
    /// Units: meters
    pub detection_range_m: f64,

    /// Delay before the start command is sent.
    ///
    /// Units: seconds
    #[serde(default = "default_cmd_delay_s")]
    pub cmd_delay_s: f64,

    /// Period of the distance to goal log.
    ///
    /// Units: seconds
    #[serde(default = "default_report_period_s")]
    pub report_period_s: f64
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

fn default_cmd_delay_s() -> f64 {
    0.5
}

fn default_report_period_s() -> f64 {
    0.1
}
