//! # Receding horizon planning module
//!
//! The planner repeatedly solves a finite horizon problem from the latest
//! vehicle state, submits the first part of the plan for execution, and
//! replans. Each solve is warm started from the previous solution, shifted by
//! the number of steps the vehicle is assumed to have executed in the
//! meantime.
//!
//! A planning episode ends when the vehicle is within the goal threshold of
//! the destination, when the episode times out, or when the optimiser fails.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

pub mod params;
pub mod state;
pub mod warm_start;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

pub use params::Params;
pub use state::*;
pub use warm_start::WarmStart;
