//! # Equipment Interface
//!
//! This module defines the sensor messages produced by the vehicle and its
//! perception stack.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

pub mod obs;
pub mod odom;

// ------------------------------------------------------------------------------------------------
// EXPORTS
// ------------------------------------------------------------------------------------------------

pub use obs::ObstacleMsg;
pub use odom::OdomMsg;
