//! Goal archive
//!
//! Keeps a CSV summary of every submitted goal and, if enabled, saves the
//! full goal as JSON through the session save thread.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Serialize;

use comms_if::traj::{ExecMode, TrajExecGoal};
use util::{
    archive::{ArchiveError, Archiver},
    session::Session
};

use super::Phase;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct GoalArchive {
    session: Option<Session>,
    save_goals: bool,
    arch_goals: Archiver
}

/// CSV row describing one goal.
#[derive(Debug, Clone, Serialize)]
struct GoalRecord {
    time_s: f64,
    seq: u64,
    phase: Phase,
    exec_mode: ExecMode,
    num_states: usize,
    num_commands: usize,
    first_v_ms: f64,
    first_omega_rads: f64,
    stop: bool
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl GoalArchive {
    pub fn new(session: &Session, save_goals: bool) -> Result<Self, ArchiveError> {
        Ok(Self {
            session: Some(session.clone()),
            save_goals,
            arch_goals: Archiver::from_path(session, "client/goals.csv")?
        })
    }

    /// Archive a goal submitted in the given phase.
    pub fn record(
        &mut self,
        goal: &TrajExecGoal,
        phase: Phase,
        time_s: f64
    ) -> Result<(), ArchiveError> {
        let first = goal.commands.first().copied().unwrap_or_default();

        self.arch_goals.serialise(GoalRecord {
            time_s,
            seq: goal.header.seq,
            phase,
            exec_mode: goal.exec_mode,
            num_states: goal.states.len(),
            num_commands: goal.commands.len(),
            first_v_ms: first.v_ms,
            first_omega_rads: first.omega_rads,
            stop: goal.is_stop()
        })?;

        if self.save_goals {
            if let Some(ref s) = self.session {
                s.save(format!("goals/goal_{:06}.json", goal.header.seq), goal.clone());
            }
        }

        Ok(())
    }
}
