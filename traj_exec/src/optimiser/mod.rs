//! # Optimiser interface
//!
//! The receding horizon planner treats the trajectory optimiser as a black
//! box behind the [`Optimiser`] trait: given a start state, an initial
//! control guess, a destination and an optional obstacle, it returns a
//! sequence of `horizon + 1` states and `horizon` controls.
//!
//! Solutions are validated before use, see [`Solution::validate`].

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

pub mod rollout;
pub mod types;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Deserialize;
use thiserror::Error;

pub use rollout::{RolloutOptimiser, RolloutParams};
pub use types::*;

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// A trajectory optimiser.
pub trait Optimiser {
    /// Solve the problem, returning the planned states and controls.
    fn solve(&mut self, problem: &Problem) -> Result<Solution, OptimiserError>;
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum OptimiserError {
    #[error("The optimiser failed: {0}")]
    SolverFailed(String),

    #[error("Optimiser output isn't a whole number of states and controls ({state_len} state values, {control_len} control values)")]
    RaggedOutput {
        state_len: usize,
        control_len: usize
    },

    #[error("Solution for horizon {horizon} has {num_states} states and {num_controls} controls")]
    MalformedSolution {
        horizon: usize,
        num_states: usize,
        num_controls: usize
    },

    #[error("Solution state {0} contains non-finite values")]
    NonFiniteState(usize),

    #[error("Solution control {0} contains non-finite values")]
    NonFiniteControl(usize),

    #[error("The optimiser did not converge")]
    NotConverged
}

/// What to do with a solution the optimiser reports as unconverged.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Deserialize)]
pub enum NonConvergencePolicy {
    /// Use the solution anyway, logging a warning.
    Accept,

    /// Treat it as a failure and stop the vehicle.
    Stop
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for NonConvergencePolicy {
    fn default() -> Self {
        NonConvergencePolicy::Accept
    }
}

impl<F> Optimiser for F
where
    F: FnMut(&Problem) -> Result<Solution, OptimiserError>
{
    fn solve(&mut self, problem: &Problem) -> Result<Solution, OptimiserError> {
        self(problem)
    }
}
