//! Receding horizon planning parameters

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::{Deserialize, Deserializer, de::Error};

// Internal
use crate::optimiser::NonConvergencePolicy;
use comms_if::traj::ExecMode;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for receding horizon planning
#[derive(Deserialize, Debug, Clone)]
pub struct Params {

    /// Number of controls in each plan, at least one
    #[serde(deserialize_with = "nonzero_horizon")]
    pub horizon: usize,

    /// Time between planned steps.
    ///
    /// Units: seconds
    pub timestep_s: f64,

    /// Destination as `[x, y, theta, vx, vy, omega]`, velocities in the body
    /// frame.
    ///
    /// Units: meters, radians, meters/second, radians/second
    pub destination: [f64; 6],

    /// Planning ends once the vehicle is this close to the destination.
    ///
    /// Units: meters
    pub goal_threshold_m: f64,

    /// Maximum duration of a planning episode.
    ///
    /// Units: seconds
    pub timeout_s: f64,

    /// Number of steps the vehicle is assumed to execute between replans.
    /// The warm start is shifted by this many controls at each replan.
    pub step_on_last_traj: usize,

    /// Plan from the extrapolated state rather than the latest state
    #[serde(default)]
    pub use_extrapolate: bool,

    /// How far ahead the state is extrapolated.
    ///
    /// Units: seconds
    #[serde(default)]
    pub extrapolate_dt_s: f64,

    /// Replanning rate of the fixed rate variant.
    ///
    /// Units: hertz
    pub replan_rate_hz: f64,

    /// Execution mode given to planned goals
    pub exec_mode: ExecMode,

    /// Control used to fill the initial guess at the start of an episode,
    /// `[v, steer]`
    #[serde(default)]
    pub init_ctrl_guess: [f64; 2],

    /// What to do with unconverged solutions
    #[serde(default)]
    pub non_convergence: NonConvergencePolicy
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

fn nonzero_horizon<'de, D>(deserializer: D) -> Result<usize, D::Error>
where
    D: Deserializer<'de>
{
    let horizon = usize::deserialize(deserializer)?;

    if horizon == 0 {
        return Err(D::Error::custom("horizon must be at least 1"));
    }

    Ok(horizon)
}
