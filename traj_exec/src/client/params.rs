//! Trajectory client parameters

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::Deserialize;

// Internal
use comms_if::net::InboxParams;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for the trajectory client
#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct Params {

    /// Coordinate frame given in goal headers
    pub frame_id: String,

    /// Sleep between spins while idle.
    ///
    /// Units: seconds
    pub spin_period_s: f64,

    /// Depths of the inbound queues
    pub inbox: InboxParams,

    /// Save every submitted goal as JSON in the session
    pub save_goals: bool
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for Params {
    fn default() -> Self {
        Self {
            frame_id: String::from("/base_link"),
            spin_period_s: 0.01,
            inbox: InboxParams::default(),
            save_goals: true
        }
    }
}
