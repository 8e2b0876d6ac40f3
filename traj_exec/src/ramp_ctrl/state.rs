//! Ramp control module state

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, info};
use serde::Serialize;

// Internal
use super::*;
use crate::plan::PlannedTraj;
use comms_if::traj::{ExecMode, Twist, VehicleState};
use util::{
    archive::{Archived, ArchiveError, Archiver},
    session::Session
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

pub struct RampCtrl {
    params: Params,

    /// Controller holding the vehicle on zero heading
    heading_ctrl: HeadingPid,

    reset_pid_on_entry: bool,

    /// Speed accumulator, integrates the acceleration each step
    cur_vel_ms: f64,

    /// Time the current ramp started, `None` when no ramp is running
    start_time_s: Option<f64>,

    /// State at the start of the current ramp
    start_state: VehicleState,

    /// Set once the commanded speed reaches the target
    complete: bool,

    report: StatusReport,

    arch_report: Archiver
}

/// The status report of one ramp step, archived by the client.
#[derive(Debug, Default, Copy, Clone, Serialize)]
pub struct StatusReport {
    pub time_s: f64,
    pub dt_s: f64,
    pub heading_rad: f64,
    pub head_error_rad: f64,
    pub p: f64,
    pub i: f64,
    pub d: f64,
    pub steer_dem_rads: f64,
    pub speed_dem_ms: f64,
    pub complete: bool
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Result of one ramp step.
#[derive(Debug, Clone)]
pub enum RampOutput {
    /// The ramp continues, submit the trajectory.
    Step {
        traj: PlannedTraj,
        report: StatusReport
    },

    /// The ramp has run out of time, the vehicle must be stopped.
    TimedOut {
        elapsed_s: f64
    }
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl RampCtrl {
    pub fn new(params: &Params, pid_params: &PidParams) -> Self {
        Self {
            params: params.clone(),
            heading_ctrl: HeadingPid::new(pid_params),
            reset_pid_on_entry: pid_params.reset_on_ramp_entry,
            cur_vel_ms: params.initial_vel_ms,
            start_time_s: None,
            start_state: VehicleState::default(),
            complete: false,
            report: StatusReport::default(),
            arch_report: Archiver::default()
        }
    }

    /// Start archiving status reports into the session.
    pub fn init_archive(&mut self, session: &Session) -> Result<(), ArchiveError> {
        self.arch_report = Archiver::from_path(session, "ramp_ctrl/status_report.csv")?;
        Ok(())
    }

    /// The report of the last step.
    pub fn report(&self) -> &StatusReport {
        &self.report
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    /// Start a new ramp from `state` at time `now_s`.
    ///
    /// Resets the speed accumulator, the timeout and the completion flag. The
    /// heading controller is only reset if configured to.
    pub fn begin(&mut self, state: &VehicleState, now_s: f64) {
        self.cur_vel_ms = self.params.initial_vel_ms;
        self.start_time_s = Some(now_s);
        self.start_state = *state;
        self.complete = false;

        if self.reset_pid_on_entry {
            self.heading_ctrl.reset();
        }

        info!(
            "Ramp started at ({:.3}, {:.3}) m, target speed {:.3} m/s",
            state.x_m, state.y_m, self.params.target_vel_ms
        );
    }

    /// True if a ramp has been started and hasn't timed out.
    pub fn is_active(&self) -> bool {
        self.start_time_s.is_some()
    }

    /// True once the commanded speed has reached the target.
    pub fn is_complete(&self) -> bool {
        self.complete
    }

    pub fn cur_vel_ms(&self) -> f64 {
        self.cur_vel_ms
    }

    /// Perform one ramp step.
    ///
    /// `prev` is the state received before `cur`, if there was one. If no
    /// ramp has been started one is started from `cur`.
    pub fn step(
        &mut self,
        prev: Option<&VehicleState>,
        cur: &VehicleState,
        now_s: f64
    ) -> RampOutput {
        let start_time_s = match self.start_time_s {
            Some(t) => t,
            None => {
                self.begin(cur, now_s);
                now_s
            }
        };

        let elapsed_s = now_s - start_time_s;
        if elapsed_s >= self.params.timeout_s {
            info!("Ramp timeout exceeded after {:.3} s", elapsed_s);
            self.start_time_s = None;
            return RampOutput::TimedOut { elapsed_s };
        }

        // Timestep between the two latest states
        let dt_s = match prev {
            Some(p) => (cur.stamp_s - p.stamp_s).max(0f64),
            None => self.params.nominal_dt_s
        };

        let terms = self.heading_ctrl.get(cur.theta_rad, dt_s);

        // Integrate the speed, never past the target
        self.cur_vel_ms = (self.cur_vel_ms + self.params.accel_mss * dt_s)
            .min(self.params.target_vel_ms);
        let speed_dem_ms = self.cur_vel_ms;

        if speed_dem_ms >= self.params.target_vel_ms {
            if !self.complete {
                info!("Ramp reached target speed of {:.3} m/s", speed_dem_ms);
            }
            self.complete = true;
        }

        debug!("Ramp: dt = {:.4} s, speed = {:.4} m/s, steer = {:.4} rad/s", 
            dt_s, speed_dem_ms, terms.output);

        let predicted = VehicleState {
            stamp_s: cur.stamp_s,
            x_m: self.start_state.x_m + self.ramp_distance_m(elapsed_s),
            y_m: self.start_state.y_m,
            theta_rad: 0f64,
            vx_ms: speed_dem_ms,
            vy_ms: 0f64,
            omega_rads: 0f64
        };

        let traj = PlannedTraj {
            timestep_s: self.params.nominal_dt_s,
            exec_mode: ExecMode::OpenLoop,
            states: vec![predicted],
            commands: vec![Twist::new(speed_dem_ms, terms.output)]
        };

        let report = StatusReport {
            time_s: now_s,
            dt_s,
            heading_rad: cur.theta_rad,
            head_error_rad: terms.error,
            p: terms.p,
            i: terms.i,
            d: terms.d,
            steer_dem_rads: terms.output,
            speed_dem_ms,
            complete: self.complete
        };
        self.report = report;

        RampOutput::Step { traj, report }
    }

    /// Distance covered along the ramp after `t_s` seconds, accelerating from
    /// the initial speed then cruising at the target.
    fn ramp_distance_m(&self, t_s: f64) -> f64 {
        let v0 = self.params.initial_vel_ms;
        let v1 = self.params.target_vel_ms;
        let a = self.params.accel_mss;
        let t_s = t_s.max(0f64);

        let t_acc = if a > 0f64 && v1 > v0 { (v1 - v0) / a } else { 0f64 };

        if t_s <= t_acc {
            v0 * t_s + 0.5 * a * t_s.powi(2)
        }
        else {
            let v_cruise = if t_acc > 0f64 { v1 } else { v0.min(v1) };
            v0 * t_acc + 0.5 * a * t_acc.powi(2) + v_cruise * (t_s - t_acc)
        }
    }
}

impl Archived for RampCtrl {
    fn write(&mut self) -> Result<(), ArchiveError> {
        self.arch_report.serialise(self.report)
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
