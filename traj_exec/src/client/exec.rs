//! Connection to the trajectory execution service
//!
//! Goals are fire and forget: the client never waits for a goal to be
//! accepted or completed, it only submits newer ones.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use comms_if::{
    net::{GoalSender, NetError},
    traj::TrajExecGoal
};

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

pub trait TrajExecClient {
    /// Submit a goal, pre-empting any goal in progress.
    fn send_goal(&mut self, goal: TrajExecGoal) -> Result<(), NetError>;
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl TrajExecClient for GoalSender {
    fn send_goal(&mut self, goal: TrajExecGoal) -> Result<(), NetError> {
        self.send(goal)
    }
}
