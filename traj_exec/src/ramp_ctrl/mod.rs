//! # Ramp control module
//!
//! Ramp control accelerates the vehicle from rest towards a target cruise
//! speed along a straight line, while a PID controller on the heading error
//! holds the vehicle pointing along the world X axis.
//!
//! Each step produces a one-step trajectory: the predicted position along the
//! ramp, and the commanded speed and steer. The ramp gives up after a timeout,
//! at which point the vehicle is stopped.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

pub mod controllers;
pub mod params;
pub mod state;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

pub use controllers::*;
pub use params::{Params, PidParams};
pub use state::*;
