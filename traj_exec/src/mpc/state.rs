//! Receding horizon planning state

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{info, warn};
use nalgebra::Point2;
use serde::Serialize;

// Internal
use super::*;
use crate::{
    optimiser::{NonConvergencePolicy, OptimiserError, Problem, Solution, SolverControl, SolverState},
    plan::PlannedTraj
};
use comms_if::traj::{Twist, VehicleState};
use util::{
    archive::{Archived, ArchiveError, Archiver},
    session::Session
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

pub struct MpcCtrl {
    params: Params,

    destination: SolverState,

    warm_start: WarmStart,

    /// Number of completed iterations in this episode
    iteration: usize,

    /// Start of the current episode
    start_time_s: f64,

    report: StatusReport,

    arch_report: Archiver
}

/// Status of one planning iteration, archived by the client.
#[derive(Debug, Default, Copy, Clone, Serialize)]
pub struct StatusReport {
    pub time_s: f64,
    pub iteration: usize,
    pub start_x_m: f64,
    pub start_y_m: f64,
    pub start_theta_rad: f64,
    pub dist_to_goal_m: f64,
    pub solve_time_s: f64,
    pub converged: bool,
    pub first_v_ms: f64,
    pub first_steer: f64
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Reason a planning episode ended.
#[derive(Debug)]
pub enum MpcExit {
    GoalReached {
        dist_m: f64
    },

    Timeout {
        elapsed_s: f64
    },

    /// A stop command arrived during the episode
    Aborted,

    OptimiserFailed(OptimiserError)
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl MpcCtrl {
    pub fn new(params: &Params) -> Self {
        let guess = SolverControl::new(params.init_ctrl_guess[0], params.init_ctrl_guess[1]);

        Self {
            params: params.clone(),
            destination: SolverState::destination(&params.destination),
            warm_start: WarmStart::new(params.horizon, guess),
            iteration: 0,
            start_time_s: 0f64,
            report: StatusReport::default(),
            arch_report: Archiver::default()
        }
    }

    /// Start archiving iteration reports into the session.
    pub fn init_archive(&mut self, session: &Session) -> Result<(), ArchiveError> {
        self.arch_report = Archiver::from_path(session, "mpc/status_report.csv")?;
        Ok(())
    }

    /// The report of the last accepted iteration.
    pub fn report(&self) -> &StatusReport {
        &self.report
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    /// Start a new planning episode.
    pub fn begin(&mut self, now_s: f64) {
        self.iteration = 0;
        self.start_time_s = now_s;
        self.warm_start.reset(self.params.horizon);

        info!(
            "Planning towards ({:.3}, {:.3}) m, horizon {} x {:.3} s",
            self.destination.x_m, self.destination.y_m, self.params.horizon, self.params.timestep_s
        );
    }

    pub fn iteration(&self) -> usize {
        self.iteration
    }

    pub fn warm_start(&self) -> &WarmStart {
        &self.warm_start
    }

    /// Planar distance from the state to the destination.
    pub fn dist_to_goal(&self, state: &VehicleState) -> f64 {
        (state.position() - self.destination.position()).norm()
    }

    /// Check whether the episode should end before the next iteration.
    pub fn check_exit(&self, state: &VehicleState, now_s: f64) -> Option<MpcExit> {
        let dist_m = self.dist_to_goal(state);
        if dist_m <= self.params.goal_threshold_m {
            return Some(MpcExit::GoalReached { dist_m });
        }

        let elapsed_s = now_s - self.start_time_s;
        if elapsed_s >= self.params.timeout_s {
            return Some(MpcExit::Timeout { elapsed_s });
        }

        None
    }

    /// Build the problem for this iteration from the start state.
    ///
    /// Except on the first iteration the warm start is shifted by the number
    /// of control steps assumed executed since the last plan.
    pub fn prepare(&mut self, start: &VehicleState, obstacle: Option<Point2<f64>>) -> Problem {
        if self.iteration > 0 {
            self.warm_start.shift(self.params.step_on_last_traj);
        }

        Problem {
            start: SolverState::from_vehicle(start, self.warm_start.first()),
            u_init: self.warm_start.guess(self.params.horizon),
            destination: self.destination,
            obstacle,
            horizon: self.params.horizon,
            timestep_s: self.params.timestep_s
        }
    }

    /// Check the solution and convert it into a trajectory.
    ///
    /// On success the solution's controls become the new warm start.
    pub fn accept(
        &mut self,
        solution: Solution,
        start: &VehicleState,
        solve_time_s: f64
    ) -> Result<PlannedTraj, OptimiserError> {
        solution.validate(self.params.horizon)?;

        if !solution.converged {
            match self.params.non_convergence {
                NonConvergencePolicy::Accept => {
                    warn!("Optimiser did not converge on iteration {}, using the solution anyway", self.iteration)
                },
                NonConvergencePolicy::Stop => return Err(OptimiserError::NotConverged)
            }
        }

        let dt = self.params.timestep_s;

        let states = solution.states
            .iter()
            .enumerate()
            .map(|(i, s)| s.to_vehicle(start.stamp_s + i as f64 * dt))
            .collect();

        let commands = solution.controls
            .iter()
            .map(|u| Twist::new(u.v_ms, u.steer))
            .collect();

        let first = solution.controls.first().copied().unwrap_or_default();
        self.report = StatusReport {
            time_s: start.stamp_s,
            iteration: self.iteration,
            start_x_m: start.x_m,
            start_y_m: start.y_m,
            start_theta_rad: start.theta_rad,
            dist_to_goal_m: self.dist_to_goal(start),
            solve_time_s,
            converged: solution.converged,
            first_v_ms: first.v_ms,
            first_steer: first.steer
        };

        info!(
            "MPC iteration {}: {:.3} m to goal, solved in {:.4} s",
            self.iteration, self.report.dist_to_goal_m, solve_time_s
        );

        self.warm_start.replace(solution.controls);

        Ok(PlannedTraj {
            timestep_s: dt,
            exec_mode: self.params.exec_mode,
            states,
            commands
        })
    }

    /// Mark the end of an iteration.
    pub fn end_iteration(&mut self) {
        self.iteration += 1;
    }
}

impl Archived for MpcCtrl {
    fn write(&mut self) -> Result<(), ArchiveError> {
        self.arch_report.serialise(self.report)
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use comms_if::traj::ExecMode;

    fn params() -> Params {
        Params {
            horizon: 4,
            timestep_s: 0.1,
            destination: [3.0, 0.0, 0.0, 0.0, 0.0, 0.0],
            goal_threshold_m: 0.2,
            timeout_s: 5.0,
            step_on_last_traj: 1,
            use_extrapolate: false,
            extrapolate_dt_s: 0.0,
            replan_rate_hz: 10.0,
            exec_mode: ExecMode::PidHeading,
            init_ctrl_guess: [0.2, 0.0],
            non_convergence: NonConvergencePolicy::Accept
        }
    }

    fn solution(horizon: usize, converged: bool) -> Solution {
        Solution {
            states: (0..=horizon)
                .map(|i| SolverState { x_m: i as f64 * 0.1, vx_ms_b: 1.0, ..Default::default() })
                .collect(),
            controls: (0..horizon).map(|i| SolverControl::new(1.0 + i as f64, 0.0)).collect(),
            converged
        }
    }

    #[test]
    fn test_exit_conditions() {
        let mut mpc = MpcCtrl::new(&params());
        mpc.begin(10.0);

        let far = VehicleState::default();
        let near = VehicleState { x_m: 2.9, ..Default::default() };

        assert!(mpc.check_exit(&far, 10.0).is_none());
        assert!(matches!(mpc.check_exit(&near, 10.0), Some(MpcExit::GoalReached { .. })));
        assert!(matches!(mpc.check_exit(&far, 15.0), Some(MpcExit::Timeout { .. })));
        assert!((mpc.dist_to_goal(&far) - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_prepare_and_shift() {
        let mut mpc = MpcCtrl::new(&params());
        mpc.begin(0.0);

        let start = VehicleState { x_m: 0.5, vx_ms: 0.4, ..Default::default() };

        // First iteration uses the unshifted initial guess
        let p = mpc.prepare(&start, None);
        assert_eq!(p.u_init, vec![SolverControl::new(0.2, 0.0); 4]);
        assert_eq!(p.start.x_m, 0.5);
        assert_eq!(p.start.prev_v_ms, 0.2);
        assert_eq!(p.horizon, 4);
        assert_eq!(p.destination.x_m, 3.0);

        mpc.accept(solution(4, true), &start, 0.01).unwrap();
        mpc.end_iteration();

        // Second iteration shifts by one control, padding with the last
        let p = mpc.prepare(&start, Some(Point2::new(1.0, 0.0)));
        let expected: Vec<_> = [2.0, 3.0, 4.0, 4.0].iter().map(|v| SolverControl::new(*v, 0.0)).collect();
        assert_eq!(p.u_init, expected);
        assert_eq!(p.start.prev_v_ms, 2.0);
        assert_eq!(p.obstacle, Some(Point2::new(1.0, 0.0)));
    }

    #[test]
    fn test_accept() {
        let mut mpc = MpcCtrl::new(&params());
        mpc.begin(0.0);

        let start = VehicleState { stamp_s: 2.0, ..Default::default() };
        let traj = mpc.accept(solution(4, true), &start, 0.01).unwrap();

        assert_eq!(traj.states.len(), 5);
        assert_eq!(traj.commands.len(), 4);
        assert_eq!(traj.exec_mode, ExecMode::PidHeading);
        assert!((traj.states[3].stamp_s - 2.3).abs() < 1e-12);
        assert_eq!(traj.states[1].vx_ms, 1.0);
        assert_eq!(traj.commands[0], Twist::new(1.0, 0.0));

        // Wrong shape rejected, warm start untouched
        let before = mpc.warm_start().clone();
        assert!(matches!(
            mpc.accept(solution(3, true), &start, 0.01),
            Err(OptimiserError::MalformedSolution { .. })
        ));
        assert_eq!(mpc.warm_start(), &before);
    }

    #[test]
    fn test_empty_plan_rejected() {
        let mut p = params();
        p.horizon = 0;
        let mut mpc = MpcCtrl::new(&p);
        mpc.begin(0.0);

        assert!(matches!(
            mpc.accept(solution(0, true), &VehicleState::default(), 0.01),
            Err(OptimiserError::MalformedSolution { num_controls: 0, .. })
        ));
    }

    #[test]
    fn test_non_convergence_policy() {
        let mut mpc = MpcCtrl::new(&params());
        assert!(mpc.accept(solution(4, false), &VehicleState::default(), 0.01).is_ok());

        let mut p = params();
        p.non_convergence = NonConvergencePolicy::Stop;
        let mut mpc = MpcCtrl::new(&p);
        assert!(matches!(
            mpc.accept(solution(4, false), &VehicleState::default(), 0.01),
            Err(OptimiserError::NotConverged)
        ));
    }

    #[test]
    fn test_begin_resets() {
        let mut mpc = MpcCtrl::new(&params());
        mpc.begin(0.0);
        mpc.accept(solution(4, true), &VehicleState::default(), 0.01).unwrap();
        mpc.end_iteration();
        assert_eq!(mpc.iteration(), 1);

        mpc.begin(1.0);
        assert_eq!(mpc.iteration(), 0);
        assert_eq!(mpc.warm_start().as_slice(), &vec![SolverControl::new(0.2, 0.0); 4][..]);
    }
}
