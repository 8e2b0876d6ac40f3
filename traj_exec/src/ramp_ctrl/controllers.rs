//! # Ramp controllers module
//!
//! The heading PID controller used by ramp control. Unlike a free-running PID
//! each contribution is bounded: the integral accumulator is held so that its
//! contribution never exceeds the integral limit, the derivative is clamped
//! and the total output is saturated.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::debug;
use serde::Serialize;

// Internal
use util::maths::{clamp_abs, wrap_to_pi};
use super::PidParams;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A bounded PID controller
#[derive(Debug, Serialize, Clone)]
pub struct PidController {
    /// Proportional gain
    k_p: f64,

    /// Integral gain
    k_i: f64,

    /// Dervative gain
    k_d: f64,

    integral_limit: f64,
    deriv_limit: f64,
    output_limit: f64,
    min_dt_s: f64,

    /// Previous error
    prev_error: Option<f64>,

    /// The integral accumulation
    integral: f64
}

/// Individual contributions of one controller evaluation.
#[derive(Debug, Serialize, Clone, Copy, Default, PartialEq)]
pub struct PidTerms {
    pub error: f64,
    pub p: f64,
    pub i: f64,
    pub d: f64,
    pub output: f64
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl PidController {

    /// Create a new controller from the parameters.
    pub fn new(params: &PidParams) -> Self {
        Self {
            k_p: params.k_p,
            k_i: params.k_i,
            k_d: params.k_d,
            integral_limit: params.integral_limit.abs(),
            deriv_limit: params.deriv_limit.abs(),
            output_limit: params.output_limit.abs(),
            min_dt_s: params.min_dt_s,
            prev_error: None,
            integral: 0f64
        }
    }

    /// Clear the integral and previous error.
    pub fn reset(&mut self) {
        self.integral = 0f64;
        self.prev_error = None;
    }

    pub fn integral(&self) -> f64 {
        self.integral
    }

    /// Get the value of the controller for the given error and timestep.
    ///
    /// Non-positive or non-finite timesteps accumulate no integral and
    /// produce no derivative.
    pub fn get(&mut self, error: f64, dt_s: f64) -> PidTerms {
        let dt_s = if dt_s.is_finite() && dt_s > 0f64 { dt_s } else { 0f64 };

        // Accumulate the integral, holding the accumulator at the point where
        // its contribution saturates so it can't wind up.
        self.integral += error * dt_s;
        if self.k_i != 0f64 {
            self.integral = clamp_abs(self.integral, self.integral_limit / self.k_i.abs());
        }

        let p = self.k_p * error;
        let i = clamp_abs(self.k_i * self.integral, self.integral_limit);

        // Small timesteps would produce huge derivatives, so they're skipped
        let d = match self.prev_error {
            Some(e) if dt_s > self.min_dt_s => {
                clamp_abs(self.k_d * (error - e) / dt_s, self.deriv_limit)
            },
            _ => 0f64
        };

        let output = clamp_abs(p + i + d, self.output_limit);

        self.prev_error = Some(error);

        PidTerms { error, p, i, d, output }
    }
}

/// Heading controller, driving the vehicle towards zero heading.
#[derive(Debug, Serialize, Clone)]
pub struct HeadingPid {
    ctrl: PidController
}

impl HeadingPid {
    pub fn new(params: &PidParams) -> Self {
        Self {
            ctrl: PidController::new(params)
        }
    }

    pub fn reset(&mut self) {
        self.ctrl.reset()
    }

    /// Get the steer command for the current heading.
    pub fn get(&mut self, heading_rad: f64, dt_s: f64) -> PidTerms {
        let error = wrap_to_pi(0f64 - heading_rad);
        let terms = self.ctrl.get(error, dt_s);

        debug!(
            "Heading PID: error = {:.4}, p = {:.4}, i = {:.4}, d = {:.4}, out = {:.4}",
            terms.error, terms.p, terms.i, terms.d, terms.output
        );

        terms
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
