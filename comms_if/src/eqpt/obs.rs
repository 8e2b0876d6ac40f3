//! # Obstacle observation messages

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// The centre of the nearest obstacle cluster seen by the perception stack.
///
/// When nothing is detected the perception stack publishes a reading far out
/// of range, so consumers must check readings against their own sanity bound.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObstacleMsg {
    /// Time of the observation.
    ///
    /// Units: seconds
    #[serde(default)]
    pub stamp_s: f64,

    /// Units: meters
    pub x_m: f64,

    /// Units: meters
    pub y_m: f64,
}
