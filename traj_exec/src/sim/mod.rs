//! # Simulation module
//!
//! A kinematic vehicle standing in for the trajectory execution service. It
//! executes the commands of the newest goal it has received at the goal's
//! timestep, falling back to the goal's final (zero) command once the goal
//! runs out, and publishes odometry and obstacle observations back to the
//! client.
//!
//! When the obstacle is out of detection range an out of range reading is
//! published instead, which the client discards.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

mod params;
pub use params::SimParams;

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::sync::mpsc::Receiver;
use log::{debug, info, trace, warn};
use nalgebra::{Point2, Vector2};

use comms_if::{
    eqpt::{ObstacleMsg, OdomMsg},
    net::{InboxSenders, NetError},
    tc::ClientCmd,
    traj::{ExecMode, TrajExecGoal, Twist, VehicleState}
};
use util::{
    maths::{clamp_abs, wrap_to_pi},
    script_interpreter::{PendingEvents, ScriptInterpreter},
    time::{self, Clock, SystemClock}
};
use crate::dist2goal::Dist2Goal;

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// X position of the reading published when no obstacle is detected.
///
/// Units: meters
pub const OUT_OF_RANGE_X_M: f64 = 1000.0;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

pub struct SimVehicle {
    params: SimParams,

    time_s: f64,

    state: VehicleState,

    /// Forward speed in the body frame
    speed_ms: f64,

    /// Goal being executed and the time it was received
    goal: Option<(TrajExecGoal, f64)>
}

/// Channels between the simulation and the client.
pub struct SimLinks {
    pub inbound: InboxSenders,
    pub goals: Receiver<TrajExecGoal>,
    pub predicted: Receiver<VehicleState>
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl SimVehicle {
    pub fn new(params: &SimParams) -> Self {
        let [x_m, y_m, theta_rad] = params.initial_pose;

        Self {
            params: params.clone(),
            time_s: 0.0,
            state: VehicleState {
                x_m,
                y_m,
                theta_rad,
                ..Default::default()
            },
            speed_ms: 0.0,
            goal: None
        }
    }

    pub fn time_s(&self) -> f64 {
        self.time_s
    }

    pub fn state(&self) -> &VehicleState {
        &self.state
    }

    /// Start executing a goal, pre-empting the current one.
    pub fn accept_goal(&mut self, goal: TrajExecGoal) {
        trace!("Sim accepted goal {} ({} commands)", goal.header.seq, goal.commands.len());
        self.goal = Some((goal, self.time_s));
    }

    /// The command to apply now, and the reference state if there is one.
    fn command(&self) -> (Twist, Option<&VehicleState>, ExecMode) {
        let (goal, start_s) = match self.goal {
            Some((ref g, s)) => (g, s),
            None => return (Twist::zero(), None, ExecMode::OpenLoop)
        };

        // Small offset so accumulated time error doesn't repeat a step
        let index = if goal.timestep_s > 0.0 {
            ((self.time_s - start_s) / goal.timestep_s + 1e-6).floor().max(0.0) as usize
        }
        else {
            0
        };

        let cmd = goal.commands
            .get(index)
            .or_else(|| goal.commands.last())
            .copied()
            .unwrap_or_default();

        (cmd, goal.states.get(index), goal.exec_mode)
    }

    /// Advance the simulation by `dt_s`.
    pub fn step(&mut self, dt_s: f64) {
        let (cmd, reference, mode) = self.command();

        let mut omega_rads = cmd.omega_rads;
        if let (ExecMode::PidHeading, Some(r)) = (mode, reference) {
            omega_rads += self.params.heading_gain * wrap_to_pi(r.theta_rad - self.state.theta_rad);
        }
        let omega_rads = clamp_abs(omega_rads, self.params.max_yaw_rate_rads);

        self.speed_ms += clamp_abs(cmd.v_ms - self.speed_ms, self.params.max_accel_mss * dt_s);

        let theta_rad = wrap_to_pi(self.state.theta_rad + omega_rads * dt_s);
        let x_m = self.state.x_m + self.speed_ms * theta_rad.cos() * dt_s;
        let y_m = self.state.y_m + self.speed_ms * theta_rad.sin() * dt_s;

        self.time_s += dt_s;
        self.state = VehicleState::from_body(
            self.time_s,
            x_m,
            y_m,
            theta_rad,
            Vector2::new(self.speed_ms, 0.0),
            omega_rads
        );
    }

    /// Odometry for the current state.
    pub fn odom(&self) -> OdomMsg {
        let vel_ms_b = self.state.body_velocity();

        OdomMsg::planar(
            self.time_s,
            self.state.x_m,
            self.state.y_m,
            self.state.theta_rad,
            vel_ms_b[0],
            vel_ms_b[1],
            self.state.omega_rads
        )
    }

    /// The obstacle observation for the current state.
    pub fn obstacle_reading(&self) -> ObstacleMsg {
        if let Some([x_m, y_m]) = self.params.obstacle_m {
            let obs = Point2::new(x_m, y_m);
            if (obs - self.state.position()).norm() <= self.params.detection_range_m {
                return ObstacleMsg { stamp_s: self.time_s, x_m, y_m };
            }
        }

        ObstacleMsg {
            stamp_s: self.time_s,
            x_m: OUT_OF_RANGE_X_M,
            y_m: 0.0
        }
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Run the simulation in real time until its duration has elapsed or the
/// client has gone.
///
/// `initial_cmd` is sent once the client has had time to receive a state.
/// Events from the script are sent at their scripted simulation time.
pub fn run(
    params: SimParams,
    links: SimLinks,
    mut script: Option<ScriptInterpreter>,
    initial_cmd: Option<ClientCmd>
) {
    let clock = SystemClock::new();
    let dt_s = 1.0 / params.rate_hz;

    let mut vehicle = SimVehicle::new(&params);
    let mut monitor = Dist2Goal::new();
    let mut cmd = initial_cmd;
    let mut last_report_s = 0.0;

    info!("Simulation running at {} Hz for {} s", params.rate_hz, params.duration_s);

    while vehicle.time_s() < params.duration_s {
        let cycle_start_s = clock.now_s();

        // Goals are applied in order so the newest ends up executing
        loop {
            match links.goals.try_recv() {
                Ok(goal) => {
                    monitor.on_goal(&goal);
                    vehicle.accept_goal(goal);
                },
                Err(std::sync::mpsc::TryRecvError::Empty) => break,
                Err(std::sync::mpsc::TryRecvError::Disconnected) => {
                    info!("Client has gone, ending simulation");
                    return;
                }
            }
        }

        while let Ok(p) = links.predicted.try_recv() {
            trace!("Predicted state: ({:.3}, {:.3}) m, {:.3} rad", p.x_m, p.y_m, p.theta_rad);
        }

        vehicle.step(dt_s);

        if let Err(e) = send(&links.inbound, vehicle.odom(), vehicle.obstacle_reading()) {
            warn!("Could not publish simulation data: {}", e);
        }

        if let Some(ref mut s) = script {
            if let PendingEvents::Some(events) = s.get_pending_events(vehicle.time_s()) {
                for event in events {
                    debug!("Scripted event: {:?}", event);
                    if let Err(e) = links.inbound.send(event) {
                        warn!("Could not send scripted event: {}", e);
                    }
                }
            }
        }

        if vehicle.time_s() >= params.cmd_delay_s {
            if let Some(c) = cmd.take() {
                info!("Sending start command {:?}", c);
                if let Err(e) = links.inbound.send_cmd(c) {
                    warn!("Could not send start command: {}", e);
                }
            }
        }

        if vehicle.time_s() - last_report_s >= params.report_period_s {
            last_report_s = vehicle.time_s();
            if let Some(r) = monitor.report(&vehicle.state().position()) {
                info!(
                    "Distance to goal: {:.3} m (x error {:.3} m, y error {:.3} m)",
                    r.dist_m, r.err_x_m, r.err_y_m
                );
            }
        }

        if let Some(d) = time::remaining_in_cycle(dt_s, cycle_start_s, clock.now_s()) {
            clock.sleep(d);
        }
    }

    info!(
        "Simulation finished at ({:.3}, {:.3}) m",
        vehicle.state().x_m, vehicle.state().y_m
    );
}

fn send(tx: &InboxSenders, odom: OdomMsg, obs: ObstacleMsg) -> Result<(), NetError> {
    tx.send_odom(odom)?;
    tx.send_obstacle(obs)
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
