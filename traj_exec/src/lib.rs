//! # Trajectory client library.
//!
//! This library holds the trajectory client core: ramp-up control, the
//! receding-horizon planner and the phase state machine tying them together,
//! along with the simulated vehicle used to exercise them without hardware.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Trajectory client - receives state, obstacle and command events and runs the controllers
pub mod client;

/// Distance to goal monitor - reports how far the vehicle is from the latest goal
pub mod dist2goal;

/// Localisation module - state ingestion and latency compensating extrapolation
pub mod loc;

/// Receding horizon planning module - warm started replanning with the optimiser
pub mod mpc;

/// Optimiser interface - the contract with the trajectory optimiser and a reference rollout
pub mod optimiser;

/// Executable parameters
pub mod params;

/// Planned trajectories, the common output of the ramp and receding horizon controllers
pub mod plan;

/// Ramp control module - accelerates to cruise speed while holding heading
pub mod ramp_ctrl;

/// Simulation module - a kinematic vehicle standing in for the trajectory execution service
pub mod sim;
