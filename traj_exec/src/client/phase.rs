//! # Client phases
//!
//! The phase table of the trajectory client. Transitions not listed in
//! [`Phase::next`] are invalid and leave the phase unchanged.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Serialize;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
pub enum Phase {
    /// No command has been run yet
    Init,

    /// Accelerating to cruise speed
    Ramp,

    /// An obstacle was seen while ramping, planning is about to start
    Switching,

    /// Running a single planning iteration
    PlanningSingle,

    /// Running the receding horizon loop
    PlanningMpc,

    /// The vehicle has been sent a stop goal
    Stopped
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PhaseEvent {
    /// A ramp step was requested
    RampCmd,

    /// A valid obstacle observation arrived
    ObstacleSeen,

    RampTimeout,

    /// A single planning iteration was requested
    PlanOnce,

    /// The single planning iteration finished, returning to the given phase
    PlanOnceDone(Phase),

    MpcBegin,

    /// The receding horizon loop ended, for any reason
    MpcExit,

    /// The vehicle was stopped by command or failure
    Stop
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Phase {
    /// The phase following `event`, or `None` if the event isn't valid in
    /// this phase.
    pub fn next(self, event: PhaseEvent) -> Option<Phase> {
        use Phase::*;
        use PhaseEvent::*;

        match (self, event) {
            (Init, RampCmd) | (Ramp, RampCmd) | (Stopped, RampCmd) => Some(Ramp),

            (Ramp, ObstacleSeen) => Some(Switching),

            (Ramp, RampTimeout) => Some(Stopped),

            (_, PlanOnce) => Some(PlanningSingle),
            (PlanningSingle, PlanOnceDone(prev)) => Some(prev),

            (Init, MpcBegin)
            | (Ramp, MpcBegin)
            | (Switching, MpcBegin)
            | (Stopped, MpcBegin) => Some(PlanningMpc),

            (PlanningMpc, MpcExit) => Some(Stopped),

            (_, Stop) => Some(Stopped),

            _ => None
        }
    }
}

impl Default for Phase {
    fn default() -> Self {
        Phase::Init
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
