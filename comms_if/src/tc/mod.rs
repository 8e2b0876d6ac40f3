//! # Telecommand module
//!
//! Operator commands select which trajectory client routine to run. On the
//! wire they are small integer codes, inside the software they are the
//! [`ClientCmd`] enum.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::{Serialize, Deserialize};
use structopt::StructOpt;
use thiserror::Error;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// A command to the trajectory client.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize, StructOpt)]
pub enum ClientCmd {
    /// Bring the vehicle to a stop and abort any running loop.
    #[structopt(name = "stop")]
    Stop,

    /// Run one step of the ramp-up controller.
    #[structopt(name = "ramp")]
    Ramp,

    /// Plan and submit a single optimised trajectory from the current state.
    #[structopt(name = "plan")]
    Plan,

    /// Ramp up to cruise speed until an obstacle is seen, then hand off to
    /// receding-horizon planning.
    #[structopt(name = "ramp-then-plan")]
    RampThenPlan,

    /// Receding-horizon planning from the current state, replanning as fast
    /// as the optimiser allows.
    #[structopt(name = "mpc")]
    Mpc,

    /// Receding-horizon planning at a fixed maximum replan rate.
    #[structopt(name = "fixed-rate-mpc")]
    FixedRateMpc,
}

/// Possible parsing errors.
#[derive(Debug, Error, PartialEq)]
pub enum TcParseError {
    #[error("{0} is not a recognised client command code")]
    UnknownCode(i64),

    #[error("Client command code {0} is not a whole number")]
    NotInteger(f64)
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl ClientCmd {

    /// Parse a command from its integer code.
    pub fn from_code(code: i64) -> Result<Self, TcParseError> {
        match code {
            0 => Ok(ClientCmd::Stop),
            1 => Ok(ClientCmd::Ramp),
            2 => Ok(ClientCmd::Plan),
            3 => Ok(ClientCmd::RampThenPlan),
            4 => Ok(ClientCmd::Mpc),
            5 => Ok(ClientCmd::FixedRateMpc),
            c => Err(TcParseError::UnknownCode(c))
        }
    }

    /// Parse a command from a floating point code, as carried in point-like
    /// command messages.
    pub fn from_float_code(code: f64) -> Result<Self, TcParseError> {
        if code.fract() != 0.0 || !code.is_finite() {
            return Err(TcParseError::NotInteger(code))
        }

        Self::from_code(code as i64)
    }

    /// The integer code of this command.
    pub fn code(&self) -> i64 {
        match self {
            ClientCmd::Stop => 0,
            ClientCmd::Ramp => 1,
            ClientCmd::Plan => 2,
            ClientCmd::RampThenPlan => 3,
            ClientCmd::Mpc => 4,
            ClientCmd::FixedRateMpc => 5
        }
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
