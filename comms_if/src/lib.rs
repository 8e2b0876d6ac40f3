//! # Communications interface crate.
//!
//! Provides all common communications interfaces for the software: the
//! messages exchanged between the trajectory client, the vehicle and the
//! operator, and the in-process transport which carries them.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Operator commands to the trajectory client
pub mod tc;

/// Sensor data produced by the vehicle's equipment (odometry, obstacle detection)
pub mod eqpt;

/// Trajectory goals for the execution service
pub mod traj;

/// Network module
pub mod net;
