//! # Trajectory client
//!
//! The client owns all controller state and runs on a single thread. Inbound
//! events (odometry, obstacle observations and operator commands) are queued
//! in the [`Inbox`] and drained by [`TrajClient::spin_once`], which the
//! control loops call between iterations so that the latest state is always
//! used for the next step.
//!
//! Commands are only run once a state estimate has been received. While a
//! loop is running, drained commands are queued and run after the loop
//! returns, except for stop which ends the loop at the next iteration
//! boundary.
//!
//! Every loop exit, whatever the reason, submits a stop goal.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

pub mod archive;
pub mod exec;
pub mod params;
pub mod phase;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use std::collections::VecDeque;
use log::{debug, error, info, trace, warn};
use nalgebra::Point2;
use thiserror::Error;

// Internal
use comms_if::{
    eqpt::{ObstacleMsg, OdomMsg},
    net::{Inbox, NetError},
    tc::ClientCmd,
    traj::{GoalHeader, TrajExecGoal, VehicleState}
};
use util::{
    archive::{ArchiveError, Archived},
    session::Session,
    time::{self, Clock, SystemClock}
};
use crate::{
    loc::{self, Extrapolator, NullStatePub, PredictedStatePub, StateHistory},
    mpc::{MpcCtrl, MpcExit},
    optimiser::{Optimiser, OptimiserError},
    params::TrajExecParams,
    plan::PlannedTraj,
    ramp_ctrl::{RampCtrl, RampOutput}
};

pub use archive::GoalArchive;
pub use exec::TrajExecClient;
pub use params::Params;
pub use phase::{Phase, PhaseEvent};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Obstacle readings at or beyond this X position are treated as invalid.
///
/// Units: meters
pub const OBSTACLE_MAX_VALID_X_M: f64 = 100.0;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

pub struct TrajClient {
    params: TrajExecParams,

    inbox: Inbox,
    exec: Box<dyn TrajExecClient>,
    optimiser: Box<dyn Optimiser>,
    state_pub: Box<dyn PredictedStatePub>,
    clock: Box<dyn Clock>,

    extrapolator: Extrapolator,
    ramp_ctrl: RampCtrl,
    mpc_ctrl: MpcCtrl,
    goal_archive: GoalArchive,

    phase: Phase,
    states: StateHistory,

    /// First valid obstacle observation
    obstacle: Option<Point2<f64>>,

    /// Set by the first valid obstacle observation, never cleared
    switch_flag: bool,

    /// Commands drained while a loop was running
    pending_cmds: VecDeque<ClientCmd>,

    /// Set once any inbound channel has been disconnected
    inbox_closed: bool,

    /// Sequence number of the next goal
    next_seq: u64
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("No state estimate has been received yet")]
    NoStateEstimate,

    #[error("{event:?} is not valid in phase {phase:?}")]
    InvalidTransition {
        phase: Phase,
        event: PhaseEvent
    },

    #[error("Ramp is disabled once an obstacle has been seen")]
    RampDisabled,

    #[error("Planning failed: {0}")]
    PlanningFailed(OptimiserError),

    #[error("Could not initialise the archives: {0}")]
    ArchiveInitError(ArchiveError)
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum RampStatus {
    Running,
    TimedOut
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl TrajClient {
    /// Create a new client.
    ///
    /// The client uses the system clock and doesn't publish predicted states
    /// unless configured otherwise with [`TrajClient::with_clock`] and
    /// [`TrajClient::with_state_pub`].
    pub fn new(
        params: TrajExecParams,
        inbox: Inbox,
        exec: Box<dyn TrajExecClient>,
        optimiser: Box<dyn Optimiser>
    ) -> Self {
        Self {
            extrapolator: Extrapolator::new(params.mpc.extrapolate_dt_s),
            ramp_ctrl: RampCtrl::new(&params.ramp, &params.pid),
            mpc_ctrl: MpcCtrl::new(&params.mpc),
            goal_archive: GoalArchive::default(),
            params,
            inbox,
            exec,
            optimiser,
            state_pub: Box::new(NullStatePub),
            clock: Box::new(SystemClock::new()),
            phase: Phase::Init,
            states: StateHistory::new(),
            obstacle: None,
            switch_flag: false,
            pending_cmds: VecDeque::new(),
            inbox_closed: false,
            next_seq: 0
        }
    }

    pub fn with_clock(mut self, clock: Box<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_state_pub(mut self, state_pub: Box<dyn PredictedStatePub>) -> Self {
        self.state_pub = state_pub;
        self
    }

    /// Archive controller reports and goals into the session.
    pub fn init_archives(&mut self, session: &Session) -> Result<(), ClientError> {
        self.ramp_ctrl.init_archive(session).map_err(ClientError::ArchiveInitError)?;
        self.mpc_ctrl.init_archive(session).map_err(ClientError::ArchiveInitError)?;
        self.goal_archive = GoalArchive::new(session, self.params.client.save_goals)
            .map_err(ClientError::ArchiveInitError)?;

        Ok(())
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn switch_flag(&self) -> bool {
        self.switch_flag
    }

    pub fn obstacle(&self) -> Option<Point2<f64>> {
        self.obstacle
    }

    pub fn current_state(&self) -> Option<&VehicleState> {
        self.states.current()
    }

    pub fn ramp_ctrl(&self) -> &RampCtrl {
        &self.ramp_ctrl
    }

    pub fn mpc_ctrl(&self) -> &MpcCtrl {
        &self.mpc_ctrl
    }

    /// Number of goals submitted so far.
    pub fn num_goals(&self) -> u64 {
        self.next_seq
    }

    /// Run until the inbound channels are closed.
    pub fn spin(&mut self) {
        info!("Trajectory client running");

        loop {
            let cycle_start_s = self.clock.now_s();

            self.spin_once();

            while let Some(cmd) = self.pending_cmds.pop_front() {
                match self.handle_command(cmd) {
                    Ok(()) => (),
                    Err(e @ ClientError::PlanningFailed(_)) => error!("{:?} failed: {}", cmd, e),
                    Err(e) => warn!("Ignoring {:?}: {}", cmd, e)
                }
            }

            if self.inbox_closed {
                info!("Inbound channels closed, client exiting");
                break;
            }

            self.sleep_rest_of_cycle(self.params.client.spin_period_s, cycle_start_s);
        }
    }

    /// Drain all pending inbound events.
    ///
    /// State and obstacle events are processed immediately, commands are
    /// queued. Returns false once any inbound channel has been closed.
    pub fn spin_once(&mut self) -> bool {
        loop {
            match self.inbox.try_recv_odom() {
                Ok(Some(msg)) => self.on_odom(&msg),
                Ok(None) => break,
                Err(e) => {
                    self.mark_closed(e);
                    break;
                }
            }
        }

        loop {
            match self.inbox.try_recv_obstacle() {
                Ok(Some(msg)) => self.on_obstacle(&msg),
                Ok(None) => break,
                Err(e) => {
                    self.mark_closed(e);
                    break;
                }
            }
        }

        loop {
            match self.inbox.try_recv_cmd() {
                Ok(Some(cmd)) => {
                    info!("Received command {:?} (code {})", cmd, cmd.code());
                    self.pending_cmds.push_back(cmd);
                },
                Ok(None) => break,
                Err(e) => {
                    self.mark_closed(e);
                    break;
                }
            }
        }

        !self.inbox_closed
    }

    /// Process a vehicle state update.
    pub fn on_odom(&mut self, msg: &OdomMsg) {
        if let Some(state) = loc::state_from_odom(msg) {
            self.states.push(state);
        }
    }

    /// Process an obstacle observation.
    ///
    /// Only the first valid observation is used, it sets the switch flag and
    /// moves a running ramp into the switching phase.
    pub fn on_obstacle(&mut self, msg: &ObstacleMsg) {
        let valid = msg.x_m.is_finite()
            && msg.y_m.is_finite()
            && msg.x_m < OBSTACLE_MAX_VALID_X_M;

        if !valid {
            trace!("Discarding obstacle reading at ({}, {})", msg.x_m, msg.y_m);
            return;
        }

        if self.switch_flag {
            debug!("Obstacle already registered, ignoring reading at ({:.3}, {:.3})", msg.x_m, msg.y_m);
            return;
        }

        info!("Obstacle detected at ({:.3}, {:.3}) m", msg.x_m, msg.y_m);

        self.obstacle = Some(Point2::new(msg.x_m, msg.y_m));
        self.switch_flag = true;

        if self.phase == Phase::Ramp {
            if let Err(e) = self.transition(PhaseEvent::ObstacleSeen) {
                warn!("{}", e);
            }
        }
    }

    /// Run a command.
    ///
    /// Commands received before any state estimate are rejected with
    /// [`ClientError::NoStateEstimate`].
    pub fn handle_command(&mut self, cmd: ClientCmd) -> Result<(), ClientError> {
        if !self.states.has_state() {
            return Err(ClientError::NoStateEstimate);
        }

        info!("Running command {:?}", cmd);

        match cmd {
            ClientCmd::Stop => {
                self.stop_vehicle();
                Ok(())
            },
            ClientCmd::Ramp => self.ramp_once(),
            ClientCmd::Plan => self.plan_once(),
            ClientCmd::RampThenPlan => self.ramp_then_plan(),
            ClientCmd::Mpc => self.run_mpc(false).map(|_| ()),
            ClientCmd::FixedRateMpc => self.run_mpc(true).map(|_| ())
        }
    }

    /// Perform a single ramp step.
    pub fn ramp_once(&mut self) -> Result<(), ClientError> {
        if self.switch_flag {
            return Err(ClientError::RampDisabled);
        }

        self.enter_ramp()?;
        self.ramp_step()?;

        Ok(())
    }

    /// Ramp until an obstacle is seen, then run the receding horizon loop.
    ///
    /// If an obstacle has already been seen the ramp is skipped.
    pub fn ramp_then_plan(&mut self) -> Result<(), ClientError> {
        if !self.switch_flag {
            self.enter_ramp()?;

            loop {
                let cycle_start_s = self.clock.now_s();

                if self.ramp_step()? == RampStatus::TimedOut {
                    return Ok(());
                }

                self.spin_once();

                if self.take_stop_request() {
                    info!("Ramp aborted by stop command");
                    self.stop_vehicle();
                    return Ok(());
                }

                if self.switch_flag {
                    break;
                }

                self.sleep_rest_of_cycle(self.params.ramp.loop_period_s, cycle_start_s);
            }

            info!("Ending ramp to start planning");
            self.send_stop();
        }

        self.run_mpc(false).map(|_| ())
    }

    /// Run one planning iteration and return to the current phase.
    ///
    /// If planning fails the vehicle is stopped.
    pub fn plan_once(&mut self) -> Result<(), ClientError> {
        let state = self.cur_state()?;
        let prev_phase = self.phase;

        self.transition(PhaseEvent::PlanOnce)?;
        self.mpc_ctrl.begin(self.clock.now_s());

        match self.plan_iteration(&state) {
            Ok(()) => self.transition(PhaseEvent::PlanOnceDone(prev_phase)),
            Err(e) => {
                self.stop_vehicle();
                Err(ClientError::PlanningFailed(e))
            }
        }
    }

    /// Run the receding horizon loop until the goal is reached, the loop
    /// times out, the optimiser fails or a stop command arrives.
    ///
    /// The fixed rate variant sleeps out the rest of each replanning period.
    pub fn run_mpc(&mut self, fixed_rate: bool) -> Result<MpcExit, ClientError> {
        self.cur_state()?;
        self.transition(PhaseEvent::MpcBegin)?;

        let period_s = if fixed_rate {
            1.0 / self.params.mpc.replan_rate_hz
        }
        else {
            0.0
        };

        self.mpc_ctrl.begin(self.clock.now_s());

        let exit = loop {
            let cycle_start_s = self.clock.now_s();

            let state = match self.cur_state() {
                Ok(s) => s,
                Err(_) => break MpcExit::Aborted
            };

            if let Some(exit) = self.mpc_ctrl.check_exit(&state, cycle_start_s) {
                break exit;
            }

            if let Err(e) = self.plan_iteration(&state) {
                break MpcExit::OptimiserFailed(e);
            }

            self.spin_once();

            if self.take_stop_request() {
                break MpcExit::Aborted;
            }

            self.mpc_ctrl.end_iteration();

            if fixed_rate {
                self.sleep_rest_of_cycle(period_s, cycle_start_s);
            }
        };

        match exit {
            MpcExit::GoalReached { dist_m } => info!(
                "Goal reached, {:.3} m from destination after {} iterations",
                dist_m, self.mpc_ctrl.iteration()
            ),
            MpcExit::Timeout { elapsed_s } => info!(
                "MPC timed out after {:.3} s, stopping", elapsed_s
            ),
            MpcExit::Aborted => info!("MPC aborted by stop command"),
            MpcExit::OptimiserFailed(ref e) => error!(
                "Optimiser failed on iteration {}, stopping: {}", self.mpc_ctrl.iteration(), e
            )
        }

        self.send_stop();
        self.transition(PhaseEvent::MpcExit)?;

        Ok(exit)
    }

    /// Submit a stop goal and move to the stopped phase.
    pub fn stop_vehicle(&mut self) {
        self.send_stop();
        if let Err(e) = self.transition(PhaseEvent::Stop) {
            warn!("{}", e);
        }
    }

    fn enter_ramp(&mut self) -> Result<(), ClientError> {
        let state = self.cur_state()?;

        if self.phase != Phase::Ramp || !self.ramp_ctrl.is_active() {
            self.transition(PhaseEvent::RampCmd)?;
            self.ramp_ctrl.begin(&state, self.clock.now_s());
        }

        Ok(())
    }

    fn ramp_step(&mut self) -> Result<RampStatus, ClientError> {
        let cur = self.cur_state()?;
        let prev = self.states.previous().copied();
        let now_s = self.clock.now_s();

        match self.ramp_ctrl.step(prev.as_ref(), &cur, now_s) {
            RampOutput::Step { traj, .. } => {
                if let Err(e) = self.ramp_ctrl.write() {
                    warn!("Could not archive ramp report: {}", e);
                }
                self.submit(traj);
                Ok(RampStatus::Running)
            },
            RampOutput::TimedOut { elapsed_s } => {
                info!("Ramp timed out after {:.3} s, stopping", elapsed_s);
                self.send_stop();
                self.transition(PhaseEvent::RampTimeout)?;
                Ok(RampStatus::TimedOut)
            }
        }
    }

    /// Plan from `state` and submit the result.
    fn plan_iteration(&mut self, state: &VehicleState) -> Result<(), OptimiserError> {
        let start = if self.params.mpc.use_extrapolate {
            self.extrapolator.project(state, &mut *self.state_pub)
        }
        else {
            *state
        };

        let problem = self.mpc_ctrl.prepare(&start, self.obstacle);

        let solve_start_s = self.clock.now_s();
        let solution = self.optimiser.solve(&problem)?;
        let solve_time_s = self.clock.now_s() - solve_start_s;

        let traj = self.mpc_ctrl.accept(solution, &start, solve_time_s)?;

        if let Err(e) = self.mpc_ctrl.write() {
            warn!("Could not archive MPC report: {}", e);
        }

        self.submit(traj);

        Ok(())
    }

    fn submit(&mut self, traj: PlannedTraj) {
        let header = self.next_header();
        self.send_goal(traj.into_goal(header));
    }

    fn send_stop(&mut self) {
        let state = self.states.current().copied().unwrap_or_default();
        let goal = TrajExecGoal::stop(self.next_header(), self.params.mpc.timestep_s, &state);

        info!("Submitting stop goal {}", goal.header.seq);
        self.send_goal(goal);
    }

    fn send_goal(&mut self, goal: TrajExecGoal) {
        debug!(
            "Submitting goal {}: {} states, {} commands",
            goal.header.seq, goal.states.len(), goal.commands.len()
        );

        if let Err(e) = self.goal_archive.record(&goal, self.phase, self.clock.now_s()) {
            warn!("Could not archive goal: {}", e);
        }

        if let Err(e) = self.exec.send_goal(goal) {
            warn!("Could not submit goal: {}", e);
        }
    }

    fn next_header(&mut self) -> GoalHeader {
        let header = GoalHeader::new(self.next_seq, &self.params.client.frame_id);
        self.next_seq += 1;
        header
    }

    fn transition(&mut self, event: PhaseEvent) -> Result<(), ClientError> {
        match self.phase.next(event) {
            Some(next) => {
                if next != self.phase {
                    info!("Phase {:?} -> {:?}", self.phase, next);
                }
                self.phase = next;
                Ok(())
            },
            None => Err(ClientError::InvalidTransition {
                phase: self.phase,
                event
            })
        }
    }

    /// Remove a pending stop command, and any queued before it.
    fn take_stop_request(&mut self) -> bool {
        match self.pending_cmds.iter().position(|c| *c == ClientCmd::Stop) {
            Some(i) => {
                self.pending_cmds.drain(..=i);
                true
            },
            None => false
        }
    }

    fn cur_state(&self) -> Result<VehicleState, ClientError> {
        self.states.current().copied().ok_or(ClientError::NoStateEstimate)
    }

    fn mark_closed(&mut self, e: NetError) {
        if !self.inbox_closed {
            info!("{}", e);
        }
        self.inbox_closed = true;
    }

    fn sleep_rest_of_cycle(&self, period_s: f64, cycle_start_s: f64) {
        if let Some(d) = time::remaining_in_cycle(period_s, cycle_start_s, self.clock.now_s()) {
            self.clock.sleep(d);
        }
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use std::{cell::RefCell, rc::Rc};
    use comms_if::{
        net::{inbox, InboxParams, InboxSenders},
        traj::{ExecMode, Twist}
    };
    use util::time::ManualClock;
    use crate::{
        mpc,
        optimiser::{NonConvergencePolicy, Problem, RolloutParams, Solution, SolverControl, SolverState},
        ramp_ctrl
    };

    type Goals = Rc<RefCell<Vec<TrajExecGoal>>>;

    struct FakeExec(Goals);

    impl TrajExecClient for FakeExec {
        fn send_goal(&mut self, goal: TrajExecGoal) -> Result<(), NetError> {
            self.0.borrow_mut().push(goal);
            Ok(())
        }
    }

    fn params() -> TrajExecParams {
        TrajExecParams {
            client: Params::default(),
            pid: ramp_ctrl::PidParams {
                k_p: 1.0,
                k_i: 0.0,
                k_d: 0.0,
                integral_limit: 0.25,
                deriv_limit: 0.1,
                output_limit: 0.5,
                min_dt_s: 1e-3,
                reset_on_ramp_entry: false
            },
            ramp: ramp_ctrl::Params {
                accel_mss: 0.5,
                target_vel_ms: 1.0,
                initial_vel_ms: 0.0,
                timeout_s: 10.0,
                nominal_dt_s: 0.1,
                loop_period_s: 0.0
            },
            mpc: mpc::Params {
                horizon: 3,
                timestep_s: 0.1,
                destination: [3.0, 0.0, 0.0, 0.0, 0.0, 0.0],
                goal_threshold_m: 0.1,
                timeout_s: 1.0,
                step_on_last_traj: 1,
                use_extrapolate: true,
                extrapolate_dt_s: 0.5,
                replan_rate_hz: 10.0,
                exec_mode: ExecMode::PidHeading,
                init_ctrl_guess: [0.0, 0.0],
                non_convergence: NonConvergencePolicy::Accept
            },
            rollout: RolloutParams::default()
        }
    }

    /// Optimiser returning a straight line at constant speed, advancing the
    /// clock by the given solve time.
    fn straight_line(
        clock: ManualClock,
        solve_time_s: f64,
        problems: Rc<RefCell<Vec<Problem>>>
    ) -> Box<dyn Optimiser> {
        Box::new(move |p: &Problem| -> Result<Solution, OptimiserError> {
            clock.advance(solve_time_s);
            problems.borrow_mut().push(p.clone());

            Ok(Solution {
                states: (0..=p.horizon)
                    .map(|i| SolverState { x_m: p.start.x_m + 0.1 * i as f64, ..p.start })
                    .collect(),
                controls: vec![SolverControl::new(1.0, 0.0); p.horizon],
                converged: true
            })
        })
    }

    fn client(
        optimiser: Box<dyn Optimiser>,
        clock: ManualClock
    ) -> (TrajClient, InboxSenders, Goals) {
        let (tx, rx) = inbox(&InboxParams::default());
        let goals: Goals = Rc::new(RefCell::new(Vec::new()));

        let client = TrajClient::new(params(), rx, Box::new(FakeExec(goals.clone())), optimiser)
            .with_clock(Box::new(clock));

        (client, tx, goals)
    }

    fn at_origin() -> OdomMsg {
        OdomMsg::planar(0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0)
    }

    #[test]
    fn test_command_before_state_ignored() {
        let clock = ManualClock::new(0.0);
        let problems = Rc::new(RefCell::new(Vec::new()));
        let (mut client, _tx, goals) = client(straight_line(clock.clone(), 0.0, problems), clock);

        assert!(matches!(
            client.handle_command(ClientCmd::Ramp),
            Err(ClientError::NoStateEstimate)
        ));
        assert_eq!(client.phase(), Phase::Init);
        assert!(goals.borrow().is_empty());
    }

    #[test]
    fn test_obstacle_validity() {
        let clock = ManualClock::new(0.0);
        let problems = Rc::new(RefCell::new(Vec::new()));
        let (mut client, _tx, _goals) = client(straight_line(clock.clone(), 0.0, problems), clock);

        for x in [100.0, 150.0, f64::NAN, f64::INFINITY].iter() {
            client.on_obstacle(&ObstacleMsg { stamp_s: 0.0, x_m: *x, y_m: 0.0 });
            assert!(!client.switch_flag());
        }

        client.on_obstacle(&ObstacleMsg { stamp_s: 0.0, x_m: 99.9, y_m: 1.0 });
        assert!(client.switch_flag());
        assert_eq!(client.obstacle(), Some(Point2::new(99.9, 1.0)));

        // First valid reading wins
        client.on_obstacle(&ObstacleMsg { stamp_s: 0.0, x_m: 5.0, y_m: 0.0 });
        assert_eq!(client.obstacle(), Some(Point2::new(99.9, 1.0)));
        assert!(client.switch_flag());
    }

    #[test]
    fn test_ramp_disabled_after_obstacle() {
        let clock = ManualClock::new(0.0);
        let problems = Rc::new(RefCell::new(Vec::new()));
        let (mut client, _tx, goals) = client(straight_line(clock.clone(), 0.0, problems), clock);

        client.on_odom(&at_origin());
        client.handle_command(ClientCmd::Ramp).unwrap();
        assert_eq!(client.phase(), Phase::Ramp);

        client.on_obstacle(&ObstacleMsg { stamp_s: 0.0, x_m: 2.0, y_m: 0.0 });
        assert_eq!(client.phase(), Phase::Switching);

        assert!(matches!(client.handle_command(ClientCmd::Ramp), Err(ClientError::RampDisabled)));
        assert_eq!(goals.borrow().len(), 1);
    }

    #[test]
    fn test_plan_once_returns_to_phase() {
        let clock = ManualClock::new(0.0);
        let problems = Rc::new(RefCell::new(Vec::new()));
        let (mut client, _tx, goals) = client(
            straight_line(clock.clone(), 0.0, problems.clone()), clock
        );

        client.on_odom(&OdomMsg::planar(0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 0.0));
        client.handle_command(ClientCmd::Ramp).unwrap();
        client.handle_command(ClientCmd::Plan).unwrap();

        assert_eq!(client.phase(), Phase::Ramp);

        let goals = goals.borrow();
        assert_eq!(goals.len(), 2);

        // Horizon + 1 states, horizon commands plus the stop
        assert_eq!(goals[1].states.len(), 4);
        assert_eq!(goals[1].commands.len(), 4);
        assert_eq!(goals[1].exec_mode, ExecMode::PidHeading);
        assert!(goals[1].ends_with_stop());
        assert_eq!(goals[1].commands[0], Twist::new(1.0, 0.0));

        // Planned from the extrapolated state, 0.5 s at 1 m/s
        assert!((problems.borrow()[0].start.x_m - 1.5).abs() < 1e-9);
    }

    #[test]
    fn test_plan_once_failure_stops() {
        let clock = ManualClock::new(0.0);
        let opt = Box::new(|_: &Problem| -> Result<Solution, OptimiserError> {
            Ok(Solution { states: vec![], controls: vec![], converged: true })
        });
        let (mut client, _tx, goals) = client(opt, clock);

        client.on_odom(&at_origin());
        assert!(matches!(
            client.handle_command(ClientCmd::Plan),
            Err(ClientError::PlanningFailed(OptimiserError::MalformedSolution { .. }))
        ));

        assert_eq!(client.phase(), Phase::Stopped);
        let goals = goals.borrow();
        assert_eq!(goals.len(), 1);
        assert!(goals[0].is_stop());
    }

    #[test]
    fn test_stop_command_aborts_mpc() {
        let clock = ManualClock::new(0.0);
        let problems = Rc::new(RefCell::new(Vec::new()));
        let (mut client, tx, goals) = client(
            straight_line(clock.clone(), 0.01, problems), clock
        );

        client.on_odom(&at_origin());

        // Queued before the loop starts, so drained after the first iteration
        tx.send_cmd(ClientCmd::Plan).unwrap();
        tx.send_cmd(ClientCmd::Stop).unwrap();
        tx.send_cmd(ClientCmd::Ramp).unwrap();

        let exit = client.run_mpc(false).unwrap();
        assert!(matches!(exit, MpcExit::Aborted));
        assert_eq!(client.phase(), Phase::Stopped);

        let goals = goals.borrow();
        assert_eq!(goals.len(), 2);
        assert!(goals.last().unwrap().is_stop());

        // Commands after the stop are still pending
        assert_eq!(client.pending_cmds, vec![ClientCmd::Ramp]);
    }

    #[test]
    fn test_goal_sequence_numbers() {
        let clock = ManualClock::new(0.0);
        let problems = Rc::new(RefCell::new(Vec::new()));
        let (mut client, _tx, goals) = client(straight_line(clock.clone(), 0.0, problems), clock);

        client.on_odom(&at_origin());
        for _ in 0..3 {
            client.handle_command(ClientCmd::Ramp).unwrap();
        }
        client.handle_command(ClientCmd::Stop).unwrap();

        let seqs: Vec<u64> = goals.borrow().iter().map(|g| g.header.seq).collect();
        assert_eq!(seqs, vec![0, 1, 2, 3]);
        assert!(goals.borrow().iter().all(|g| g.ends_with_stop()));
        assert!(goals.borrow().iter().all(|g| g.header.frame_id == "/base_link"));
        assert_eq!(client.num_goals(), 4);
    }
}
