//! End to end scenarios for the trajectory client.
//!
//! The client is driven on a single thread with a manual clock. Goals are
//! captured by a fake execution service, which can also inject inbound
//! events when it receives a goal, standing in for the vehicle reacting to
//! what it has been told to do.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::{cell::{Cell, RefCell}, rc::Rc};
use nalgebra::Point2;

use comms_if::{
    eqpt::{ObstacleMsg, OdomMsg},
    net::{inbox, InboxParams, InboxSenders, NetError},
    tc::ClientCmd,
    traj::{ExecMode, TrajExecGoal}
};
use traj_lib::{
    client::{self, Phase, TrajClient, TrajExecClient},
    mpc::{self, MpcExit},
    optimiser::{
        NonConvergencePolicy, Optimiser, OptimiserError, Problem, RolloutOptimiser,
        RolloutParams, Solution, SolverControl
    },
    params::TrajExecParams,
    ramp_ctrl,
    sim::{SimParams, SimVehicle}
};
use util::time::ManualClock;

// ---------------------------------------------------------------------------
// HELPERS
// ---------------------------------------------------------------------------

type Goals = Rc<RefCell<Vec<TrajExecGoal>>>;

/// Inbound event injected by the fake execution service.
#[derive(Clone, Copy)]
enum Inject {
    Nothing,

    /// Send an obstacle observation when the nth goal (counting from 1) is
    /// received
    ObstacleOnGoal(usize, f64, f64),

    /// Send an obstacle observation with every goal
    ObstacleEveryGoal(f64, f64)
}

/// Records goals and advances the clock by `dt_s` for each one.
struct FakeExec {
    goals: Goals,
    clock: ManualClock,
    dt_s: f64,
    tx: InboxSenders,
    inject: Inject
}

impl TrajExecClient for FakeExec {
    fn send_goal(&mut self, goal: TrajExecGoal) -> Result<(), NetError> {
        self.goals.borrow_mut().push(goal);
        self.clock.advance(self.dt_s);

        let n = self.goals.borrow().len();
        let obs = match self.inject {
            Inject::Nothing => None,
            Inject::ObstacleOnGoal(k, x_m, y_m) if k == n => Some((x_m, y_m)),
            Inject::ObstacleOnGoal(..) => None,
            Inject::ObstacleEveryGoal(x_m, y_m) => Some((x_m, y_m))
        };

        if let Some((x_m, y_m)) = obs {
            self.tx.send_obstacle(ObstacleMsg { stamp_s: self.clock_s(), x_m, y_m })?;
        }

        Ok(())
    }
}

impl FakeExec {
    fn clock_s(&self) -> f64 {
        use util::time::Clock;
        self.clock.now_s()
    }
}

/// Executes each goal on a simulated vehicle for `steps` simulation steps,
/// then publishes the vehicle's odometry.
struct SimExec {
    goals: Goals,
    clock: ManualClock,
    sim: SimVehicle,
    steps: usize,
    tx: InboxSenders
}

impl TrajExecClient for SimExec {
    fn send_goal(&mut self, goal: TrajExecGoal) -> Result<(), NetError> {
        self.goals.borrow_mut().push(goal.clone());
        self.sim.accept_goal(goal);

        for _ in 0..self.steps {
            self.sim.step(0.1);
            self.clock.advance(0.1);
        }

        self.tx.send_odom(self.sim.odom())
    }
}

fn params() -> TrajExecParams {
    TrajExecParams {
        client: client::Params::default(),
        pid: ramp_ctrl::PidParams {
            k_p: 1.0,
            k_i: 0.1,
            k_d: 0.05,
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
            horizon: 10,
            timestep_s: 0.1,
            destination: [3.0, 0.0, 0.0, 0.0, 0.0, 0.0],
            goal_threshold_m: 0.25,
            timeout_s: 1.0,
            step_on_last_traj: 1,
            use_extrapolate: false,
            extrapolate_dt_s: 0.0,
            replan_rate_hz: 10.0,
            exec_mode: ExecMode::PidHeading,
            init_ctrl_guess: [0.0, 0.0],
            non_convergence: NonConvergencePolicy::Accept
        },
        rollout: RolloutParams::default()
    }
}

/// Optimiser which doesn't move, advancing the clock by `solve_time_s` and
/// recording the clock time each solve started at.
fn stationary(
    clock: ManualClock,
    solve_time_s: f64,
    problems: Rc<RefCell<Vec<(f64, Problem)>>>
) -> Box<dyn Optimiser> {
    Box::new(move |p: &Problem| -> Result<Solution, OptimiserError> {
        use util::time::Clock;

        problems.borrow_mut().push((clock.now_s(), p.clone()));
        clock.advance(solve_time_s);

        Ok(Solution {
            states: vec![p.start; p.horizon + 1],
            controls: vec![SolverControl::new(0.5, 0.0); p.horizon],
            converged: true
        })
    })
}

fn make_client(
    params: TrajExecParams,
    optimiser: Box<dyn Optimiser>,
    clock: &ManualClock,
    exec_dt_s: f64,
    inject: Inject
) -> (TrajClient, InboxSenders, Goals) {
    let (tx, rx) = inbox(&InboxParams::default());
    let goals: Goals = Rc::new(RefCell::new(Vec::new()));

    let exec = FakeExec {
        goals: goals.clone(),
        clock: clock.clone(),
        dt_s: exec_dt_s,
        tx: tx.clone(),
        inject
    };

    let client = TrajClient::new(params, rx, Box::new(exec), optimiser)
        .with_clock(Box::new(clock.clone()));

    (client, tx, goals)
}

fn odom_at(x_m: f64, y_m: f64) -> OdomMsg {
    OdomMsg::planar(0.0, x_m, y_m, 0.0, 0.0, 0.0, 0.0)
}

fn assert_every_goal_ends_with_stop(goals: &[TrajExecGoal]) {
    for g in goals {
        assert!(g.ends_with_stop(), "goal {} doesn't end with a stop", g.header.seq);
    }
}

// ---------------------------------------------------------------------------
// SCENARIOS
// ---------------------------------------------------------------------------

/// One state estimate then repeated ramp commands, the nth goal commands
/// min(n a dt, V).
#[test]
fn test_ramp_from_single_state() {
    let clock = ManualClock::new(0.0);
    let problems = Rc::new(RefCell::new(Vec::new()));
    let (mut client, tx, goals) = make_client(
        params(), stationary(clock.clone(), 0.0, problems.clone()), &clock, 0.0, Inject::Nothing
    );

    tx.send_odom(odom_at(0.0, 0.0)).unwrap();
    client.spin_once();

    for _ in 0..30 {
        client.handle_command(ClientCmd::Ramp).unwrap();
    }

    assert_eq!(client.phase(), Phase::Ramp);

    let goals = goals.borrow();
    assert_eq!(goals.len(), 30);

    for (i, g) in goals.iter().enumerate() {
        let n = (i + 1) as f64;
        let expected = (n * 0.5 * 0.1).min(1.0);
        assert!(
            (g.commands[0].v_ms - expected).abs() < 1e-9,
            "goal {} commanded {} m/s, expected {}", i, g.commands[0].v_ms, expected
        );
        assert_eq!(g.states.len(), 1);
        assert_eq!(g.exec_mode, ExecMode::OpenLoop);
    }

    assert!(client.ramp_ctrl().is_complete());
    assert!(problems.borrow().is_empty());
    assert_every_goal_ends_with_stop(&goals);
}

/// An obstacle seen during the ramp ends it and hands over to planning.
#[test]
fn test_obstacle_switches_to_planning() {
    let clock = ManualClock::new(0.0);
    let problems = Rc::new(RefCell::new(Vec::new()));
    let (mut client, tx, goals) = make_client(
        params(),
        stationary(clock.clone(), 0.1, problems.clone()),
        &clock,
        0.1,
        Inject::ObstacleOnGoal(5, 50.0, 0.0)
    );

    tx.send_odom(odom_at(0.0, 0.0)).unwrap();
    client.spin_once();
    client.handle_command(ClientCmd::RampThenPlan).unwrap();

    assert!(client.switch_flag());
    assert_eq!(client.obstacle(), Some(Point2::new(50.0, 0.0)));
    assert_eq!(client.phase(), Phase::Stopped);

    let goals = goals.borrow();

    // Five ramp goals, then the stop ending the ramp
    for g in goals[..5].iter() {
        assert_eq!(g.exec_mode, ExecMode::OpenLoop);
        assert!(!g.is_stop());
    }
    assert!(goals[5].is_stop());

    // Planned goals follow, then the final stop
    let planned = &goals[6..goals.len() - 1];
    assert!(!planned.is_empty());
    assert_eq!(planned.len(), problems.borrow().len());
    for g in planned {
        assert_eq!(g.exec_mode, ExecMode::PidHeading);
        assert_eq!(g.states.len(), 11);
    }
    assert!(goals.last().unwrap().is_stop());

    // The planner was given the obstacle
    for (_, p) in problems.borrow().iter() {
        assert_eq!(p.obstacle, Some(Point2::new(50.0, 0.0)));
    }

    assert_every_goal_ends_with_stop(&goals);
}

/// Readings beyond the sanity bound never end the ramp.
#[test]
fn test_far_obstacle_ignored_until_ramp_timeout() {
    let clock = ManualClock::new(0.0);
    let problems = Rc::new(RefCell::new(Vec::new()));
    let (mut client, tx, goals) = make_client(
        params(),
        stationary(clock.clone(), 0.1, problems.clone()),
        &clock,
        0.1,
        Inject::ObstacleEveryGoal(150.0, 0.0)
    );

    tx.send_odom(odom_at(0.0, 0.0)).unwrap();
    client.spin_once();
    client.handle_command(ClientCmd::RampThenPlan).unwrap();

    assert!(!client.switch_flag());
    assert!(client.obstacle().is_none());
    assert_eq!(client.phase(), Phase::Stopped);
    assert!(clock_now(&clock) >= 10.0);

    // Ramped all the way to the timeout, then stopped without planning
    let goals = goals.borrow();
    assert!(goals.len() > 90);
    assert!(goals[..goals.len() - 1].iter().all(|g| g.exec_mode == ExecMode::OpenLoop && !g.is_stop()));
    assert!(goals.last().unwrap().is_stop());
    assert!(problems.borrow().is_empty());
}

fn clock_now(clock: &ManualClock) -> f64 {
    use util::time::Clock;
    clock.now_s()
}

/// Starting on the destination, planning ends before the optimiser is
/// called.
#[test]
fn test_mpc_at_destination() {
    let clock = ManualClock::new(0.0);
    let calls = Rc::new(Cell::new(0usize));
    let opt_calls = calls.clone();
    let opt = Box::new(move |p: &Problem| -> Result<Solution, OptimiserError> {
        opt_calls.set(opt_calls.get() + 1);
        Ok(Solution {
            states: vec![p.start; p.horizon + 1],
            controls: vec![SolverControl::default(); p.horizon],
            converged: true
        })
    });
    let (mut client, tx, goals) = make_client(params(), opt, &clock, 0.0, Inject::Nothing);

    tx.send_odom(odom_at(3.0, 0.0)).unwrap();
    client.spin_once();

    let exit = client.run_mpc(false).unwrap();
    assert!(matches!(exit, MpcExit::GoalReached { dist_m } if dist_m == 0.0));

    assert_eq!(calls.get(), 0);
    assert_eq!(client.phase(), Phase::Stopped);

    let goals = goals.borrow();
    assert_eq!(goals.len(), 1);
    assert!(goals[0].is_stop());
}

#[test]
fn test_mpc_timeout() {
    let clock = ManualClock::new(0.0);
    let problems = Rc::new(RefCell::new(Vec::new()));
    let (mut client, tx, goals) = make_client(
        params(), stationary(clock.clone(), 0.25, problems.clone()), &clock, 0.0, Inject::Nothing
    );

    tx.send_odom(odom_at(0.0, 0.0)).unwrap();
    client.spin_once();

    let exit = client.run_mpc(false).unwrap();
    assert!(matches!(exit, MpcExit::Timeout { elapsed_s } if elapsed_s >= 1.0));

    // Solves start at 0, 0.25, 0.5 and 0.75 s
    assert_eq!(problems.borrow().len(), 4);

    let goals = goals.borrow();
    assert_eq!(goals.len(), 5);
    assert!(goals[..4].iter().all(|g| !g.is_stop()));
    assert!(goals[4].is_stop());
    assert_eq!(client.phase(), Phase::Stopped);
}

#[test]
fn test_mpc_warm_start_shifted() {
    let clock = ManualClock::new(0.0);
    let problems = Rc::new(RefCell::new(Vec::new()));

    // Each step's speed is its index so the shift is visible in the guess
    let recorded = problems.clone();
    let opt_clock = clock.clone();
    let opt = Box::new(move |p: &Problem| -> Result<Solution, OptimiserError> {
        recorded.borrow_mut().push(p.clone());
        opt_clock.advance(0.25);

        Ok(Solution {
            states: vec![p.start; p.horizon + 1],
            controls: (0..p.horizon).map(|i| SolverControl::new(i as f64, 0.0)).collect(),
            converged: true
        })
    });
    let (mut client, tx, _goals) = make_client(params(), opt, &clock, 0.0, Inject::Nothing);

    tx.send_odom(odom_at(0.0, 0.0)).unwrap();
    client.spin_once();
    client.run_mpc(false).unwrap();

    let problems = problems.borrow();
    assert!(problems.len() > 1);

    // First guess is the configured fill, later ones the previous solution
    // shifted by one control and padded with its last
    assert!(problems[0].u_init.iter().all(|u| *u == SolverControl::new(0.0, 0.0)));

    let expected: Vec<_> = (1..10)
        .chain(std::iter::once(9))
        .map(|v| SolverControl::new(v as f64, 0.0))
        .collect();
    for p in problems[1..].iter() {
        assert_eq!(p.u_init, expected);
        assert_eq!(p.start.prev_v_ms, 1.0);
    }
}

#[test]
fn test_optimiser_failure_stops() {
    let clock = ManualClock::new(0.0);
    let opt = Box::new(|_: &Problem| -> Result<Solution, OptimiserError> {
        Err(OptimiserError::SolverFailed("infeasible".into()))
    });
    let (mut client, tx, goals) = make_client(params(), opt, &clock, 0.0, Inject::Nothing);

    tx.send_odom(odom_at(0.0, 0.0)).unwrap();
    client.spin_once();

    let exit = client.run_mpc(false).unwrap();
    assert!(matches!(exit, MpcExit::OptimiserFailed(OptimiserError::SolverFailed(_))));
    assert_eq!(client.phase(), Phase::Stopped);

    let goals = goals.borrow();
    assert_eq!(goals.len(), 1);
    assert!(goals[0].is_stop());

    // The next episode starts cleanly
    drop(goals);
    assert_eq!(client.mpc_ctrl().iteration(), 0);
}

#[test]
fn test_non_finite_solution_rejected() {
    let clock = ManualClock::new(0.0);
    let opt = Box::new(|p: &Problem| -> Result<Solution, OptimiserError> {
        let mut states = vec![p.start; p.horizon + 1];
        states[3].x_m = f64::NAN;
        Ok(Solution {
            states,
            controls: vec![SolverControl::default(); p.horizon],
            converged: true
        })
    });
    let (mut client, tx, goals) = make_client(params(), opt, &clock, 0.0, Inject::Nothing);

    tx.send_odom(odom_at(0.0, 0.0)).unwrap();
    client.spin_once();

    let exit = client.run_mpc(false).unwrap();
    assert!(matches!(exit, MpcExit::OptimiserFailed(OptimiserError::NonFiniteState(3))));
    assert_eq!(goals.borrow().len(), 1);
    assert!(goals.borrow()[0].is_stop());
}

#[test]
fn test_non_convergence_policy_stop() {
    let clock = ManualClock::new(0.0);
    let opt = Box::new(|p: &Problem| -> Result<Solution, OptimiserError> {
        Ok(Solution {
            states: vec![p.start; p.horizon + 1],
            controls: vec![SolverControl::default(); p.horizon],
            converged: false
        })
    });

    let mut p = params();
    p.mpc.non_convergence = NonConvergencePolicy::Stop;
    let (mut client, tx, goals) = make_client(p, opt, &clock, 0.0, Inject::Nothing);

    tx.send_odom(odom_at(0.0, 0.0)).unwrap();
    client.spin_once();

    let exit = client.run_mpc(false).unwrap();
    assert!(matches!(exit, MpcExit::OptimiserFailed(OptimiserError::NotConverged)));
    assert_eq!(goals.borrow().len(), 1);
}

/// The fixed rate variant starts a solve every replanning period.
#[test]
fn test_fixed_rate_mpc() {
    let clock = ManualClock::new(0.0);
    let problems = Rc::new(RefCell::new(Vec::new()));
    let (mut client, tx, goals) = make_client(
        params(), stationary(clock.clone(), 0.02, problems.clone()), &clock, 0.0, Inject::Nothing
    );

    tx.send_odom(odom_at(0.0, 0.0)).unwrap();
    client.spin_once();

    tx.send_cmd(ClientCmd::FixedRateMpc).unwrap();
    client.spin_once();
    drop(tx);
    client.spin();

    let problems = problems.borrow();
    assert!(problems.len() >= 9);
    for w in problems.windows(2) {
        assert!((w[1].0 - w[0].0 - 0.1).abs() < 1e-6, "solves at {} and {}", w[0].0, w[1].0);
    }

    assert_eq!(client.phase(), Phase::Stopped);
    assert!(goals.borrow().last().unwrap().is_stop());
}

/// Commands arriving during a loop are run once it has finished.
#[test]
fn test_spin_runs_queued_commands() {
    let clock = ManualClock::new(0.0);
    let problems = Rc::new(RefCell::new(Vec::new()));
    let (mut client, tx, goals) = make_client(
        params(), stationary(clock.clone(), 0.25, problems.clone()), &clock, 0.0, Inject::Nothing
    );

    tx.send_odom(odom_at(0.0, 0.0)).unwrap();
    tx.send_cmd(ClientCmd::Mpc).unwrap();
    tx.send_cmd(ClientCmd::Ramp).unwrap();
    drop(tx);

    client.spin();

    // MPC ran to its timeout, then the ramp step ran
    let goals = goals.borrow();
    assert_eq!(problems.borrow().len(), 4);
    assert_eq!(goals.len(), 6);
    assert!(goals[4].is_stop());
    assert_eq!(goals[5].exec_mode, ExecMode::OpenLoop);
    assert_eq!(client.phase(), Phase::Ramp);

    let seqs: Vec<u64> = goals.iter().map(|g| g.header.seq).collect();
    assert_eq!(seqs, (0..6).collect::<Vec<u64>>());
}

/// A command sent before any state estimate is dropped without effect.
#[test]
fn test_spin_ignores_command_without_state() {
    let clock = ManualClock::new(0.0);
    let problems = Rc::new(RefCell::new(Vec::new()));
    let (mut client, tx, goals) = make_client(
        params(), stationary(clock.clone(), 0.0, problems), &clock, 0.0, Inject::Nothing
    );

    tx.send_cmd(ClientCmd::RampThenPlan).unwrap();
    drop(tx);

    client.spin();

    assert_eq!(client.phase(), Phase::Init);
    assert!(goals.borrow().is_empty());
}

/// Closed loop with the rollout optimiser driving the simulated vehicle to
/// the destination.
#[test]
fn test_closed_loop_reaches_destination() {
    let clock = ManualClock::new(0.0);
    let (tx, rx) = inbox(&InboxParams::default());
    let goals: Goals = Rc::new(RefCell::new(Vec::new()));

    let sim_params = SimParams {
        rate_hz: 10.0,
        duration_s: 60.0,
        max_accel_mss: 1.0,
        max_yaw_rate_rads: 1.0,
        heading_gain: 1.0,
        initial_pose: [0.0, 0.0, 0.0],
        obstacle_m: None,
        detection_range_m: 1.0,
        cmd_delay_s: 0.0,
        report_period_s: 1.0
    };

    let exec = SimExec {
        goals: goals.clone(),
        clock: clock.clone(),
        sim: SimVehicle::new(&sim_params),
        steps: 2,
        tx: tx.clone()
    };

    let mut p = params();
    p.mpc.timeout_s = 30.0;
    let optimiser = RolloutOptimiser::new(p.rollout.clone());

    let mut client = TrajClient::new(p, rx, Box::new(exec), Box::new(optimiser))
        .with_clock(Box::new(clock.clone()));

    tx.send_odom(odom_at(0.0, 0.0)).unwrap();
    client.spin_once();

    let exit = client.run_mpc(false).unwrap();
    assert!(matches!(exit, MpcExit::GoalReached { dist_m } if dist_m <= 0.25));

    let state = client.current_state().unwrap();
    assert!((state.x_m - 3.0).abs() <= 0.25);
    assert!(state.y_m.abs() < 1e-6);

    assert!(goals.borrow().last().unwrap().is_stop());
}
