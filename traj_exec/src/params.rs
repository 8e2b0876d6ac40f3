//! # Trajectory Executable Parameters
//!
//! This module provide parameters for the trajectory client executable, one
//! table per module.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::Deserialize;

use crate::{client, mpc, optimiser::RolloutParams, ramp_ctrl};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Deserialize, Debug, Clone)]
pub struct TrajExecParams {

    /// Client settings, frame id and inbox depths
    #[serde(default)]
    pub client: client::Params,

    /// Heading controller gains and limits
    pub pid: ramp_ctrl::PidParams,

    /// Ramp acceleration, target speed and timeout
    pub ramp: ramp_ctrl::Params,

    /// Receding horizon planner settings
    pub mpc: mpc::Params,

    /// Reference optimiser tuning
    #[serde(default)]
    pub rollout: RolloutParams
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use comms_if::traj::ExecMode;
    use crate::optimiser::NonConvergencePolicy;

    #[test]
    fn test_params_parse() {
        let p: TrajExecParams = util::params::from_str(r#"
            [pid]
            k_p = 1.0
            k_i = 0.1
            k_d = 0.05

            [ramp]
            accel_mss = 0.5
            target_vel_ms = 1.0
            timeout_s = 10.0

            [mpc]
            horizon = 50
            timestep_s = 0.1
            destination = [3.0, 0.0, 0.0, 0.0, 0.0, 0.0]
            goal_threshold_m = 0.2
            timeout_s = 20.0
            step_on_last_traj = 2
            replan_rate_hz = 5.0
            exec_mode = "PidHeading"
            non_convergence = "Stop"
        "#).unwrap();

        // Defaults filled in
        assert_eq!(p.client.frame_id, "/base_link");
        assert_eq!(p.pid.integral_limit, 0.25);
        assert_eq!(p.pid.deriv_limit, 0.1);
        assert!(!p.pid.reset_on_ramp_entry);
        assert_eq!(p.ramp.initial_vel_ms, 0.0);
        assert!(!p.mpc.use_extrapolate);
        assert_eq!(p.mpc.init_ctrl_guess, [0.0, 0.0]);

        assert_eq!(p.mpc.exec_mode, ExecMode::PidHeading);
        assert_eq!(p.mpc.non_convergence, NonConvergencePolicy::Stop);
        assert_eq!(p.rollout.cruise_vel_ms, 1.0);
    }

    #[test]
    fn test_shipped_params_parse() {
        let p: TrajExecParams = util::params::from_str(
            include_str!("../../params/traj_client.toml")
        ).unwrap();

        assert!(p.mpc.horizon > 0);
        assert!(p.ramp.target_vel_ms > 0.0);
    }

    #[test]
    fn test_zero_horizon_rejected() {
        let shipped = include_str!("../../params/traj_client.toml");
        assert!(shipped.contains("horizon = 30"));

        let res: Result<TrajExecParams, _> = util::params::from_str(
            &shipped.replace("horizon = 30", "horizon = 0")
        );

        match res {
            Err(util::params::LoadError::DeserialiseError(e)) => {
                assert!(e.to_string().contains("horizon must be at least 1"))
            },
            other => panic!("Expected a deserialise error, got {:?}", other.map(|p| p.mpc.horizon))
        }
    }
}
