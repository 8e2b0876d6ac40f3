//! # Odometry messages

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use nalgebra::{UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A filtered state estimate of the vehicle.
///
/// Position and attitude are in the world frame, the twist is in the vehicle
/// body frame (x forwards, y left, z up).
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct OdomMsg {
    /// Time the estimate is valid at.
    ///
    /// Units: seconds
    pub stamp_s: f64,

    /// Position of the vehicle in the world frame.
    ///
    /// Units: meters
    pub position_m: Vector3<f64>,

    /// Attitude of the vehicle, rotating the body frame into the world frame.
    pub attitude_q: UnitQuaternion<f64>,

    /// Linear velocity in the body frame.
    ///
    /// Units: meters/second
    pub lin_vel_ms_b: Vector3<f64>,

    /// Angular velocity in the body frame.
    ///
    /// Units: radians/second
    pub ang_vel_rads_b: Vector3<f64>,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl OdomMsg {
    /// Build a message for a vehicle moving in the XY plane.
    pub fn planar(
        stamp_s: f64,
        x_m: f64,
        y_m: f64,
        heading_rad: f64,
        vx_ms_b: f64,
        vy_ms_b: f64,
        yaw_rate_rads: f64,
    ) -> Self {
        Self {
            stamp_s,
            position_m: Vector3::new(x_m, y_m, 0.0),
            attitude_q: UnitQuaternion::from_euler_angles(0.0, 0.0, heading_rad),
            lin_vel_ms_b: Vector3::new(vx_ms_b, vy_ms_b, 0.0),
            ang_vel_rads_b: Vector3::new(0.0, 0.0, yaw_rate_rads),
        }
    }

    /// Heading (yaw about the world Z axis) in the range [-pi, pi].
    pub fn heading_rad(&self) -> f64 {
        self.attitude_q.euler_angles().2
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
