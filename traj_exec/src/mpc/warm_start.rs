//! Warm start control sequence
//!
//! Holds the controls of the last solution, to be used as the initial guess
//! of the next solve once shifted forward.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use crate::optimiser::SolverControl;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct WarmStart {
    controls: Vec<SolverControl>,

    /// Used when there are no controls left to extend the sequence with
    fill: SolverControl
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl WarmStart {
    /// A warm start of `horizon` copies of `guess`.
    pub fn new(horizon: usize, guess: SolverControl) -> Self {
        Self {
            controls: vec![guess; horizon],
            fill: guess
        }
    }

    /// Refill with `horizon` copies of the fill control.
    pub fn reset(&mut self, horizon: usize) {
        self.controls = vec![self.fill; horizon];
    }

    /// Drop the first `k` controls.
    ///
    /// Shifting by more than the length leaves the sequence empty.
    pub fn shift(&mut self, k: usize) {
        let k = k.min(self.controls.len());
        self.controls.drain(..k);
    }

    /// Replace the controls with those from a new solution.
    pub fn replace(&mut self, controls: Vec<SolverControl>) {
        self.controls = controls;
    }

    /// The guess for a problem of `horizon` controls.
    ///
    /// Truncated if too long, and extended with copies of the last control
    /// if too short.
    pub fn guess(&self, horizon: usize) -> Vec<SolverControl> {
        let last = self.controls.last().copied().unwrap_or(self.fill);

        let mut guess: Vec<SolverControl> = self.controls.iter().copied().take(horizon).collect();
        guess.resize(horizon, last);

        guess
    }

    /// The first control of the sequence, the one about to be applied.
    pub fn first(&self) -> SolverControl {
        self.controls.first().copied().unwrap_or(self.fill)
    }

    pub fn as_slice(&self) -> &[SolverControl] {
        &self.controls
    }

    pub fn len(&self) -> usize {
        self.controls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.controls.is_empty()
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
