//! # Scenario script interpreter module
//!
//! This module provides an interpreter for scenario scripts, which feed timed
//! inbound events (odometry, obstacle observations and operator commands)
//! into the trajectory client.
//!
//! A script is a list of entries of the form `<time_s>: <json event>;`, for
//! example:
//!
//! ```text
//! 0.5: {"Cmd": "RampThenPlan"};
//! 4.0: {"Obstacle": {"stamp_s": 4.0, "x_m": 2.5, "y_m": 0.1}};
//! ```

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::fs;
use regex::RegexBuilder;
use thiserror::Error;

// Internal
use comms_if::net::Inbound;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// An event which is scripted to occur at a specific time.
#[derive(Debug, Clone)]
pub struct ScriptedEvent {
    /// The time the event is supposed to be delivered at
    exec_time_s: f64,

    /// The event to deliver
    event: Inbound
}

/// A script interpreter.
///
/// After initialising with the script to run use `.get_pending_events` to
/// acquire a list of events that need delivering.
pub struct ScriptInterpreter {
    _script_path: Option<PathBuf>,
    events: VecDeque<ScriptedEvent>
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("Could not find the script at {0:?}")]
    ScriptNotFound(PathBuf),

    #[error("Could not load the script: {0}")]
    ScriptLoadError(std::io::Error),

    #[error("The script is empty (or is so bad it can't be read)")]
    ScriptEmpty,

    #[error(
        "Script contains an invalid timestamp: {0}. \
        Should be a float (like 1.0)")]
    InvalidTimestamp(String),

    #[error("Script contains an invalid event at {0} s: {1}")]
    InvalidEvent(f64, serde_json::Error),

    #[error("Script events are not in time order (at {0} s)")]
    OutOfOrder(f64)
}

#[derive(Debug)]
pub enum PendingEvents {
    None,
    Some(Vec<Inbound>),
    EndOfScript
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl ScriptInterpreter {

    /// Create a new interpreter from the given script path.
    pub fn new<P: AsRef<Path>>(script_path: P) -> Result<Self, ScriptError> {

        let path = PathBuf::from(script_path.as_ref());
        
        if !path.exists() {
            return Err(ScriptError::ScriptNotFound(path));
        }

        let script = fs::read_to_string(&path)
            .map_err(ScriptError::ScriptLoadError)?;

        let mut si = Self::from_str(&script)?;
        si._script_path = Some(path);

        Ok(si)
    }

    /// Create a new interpreter from the script contents.
    pub fn from_str(script: &str) -> Result<Self, ScriptError> {
        let mut queue: VecDeque<ScriptedEvent> = VecDeque::new();

        // Go through the script executing __the magic regex__.
        let re = match RegexBuilder::new(r"^\s*(\d+(\.\d+)?)\s*:\s*([^;]*);")
            .multi_line(true)
            .build()
        {
            Ok(r) => r,
            Err(_) => return Err(ScriptError::ScriptEmpty)
        };

        for cap in re.captures_iter(script) {
            let (time_str, event_str) = match (cap.get(1), cap.get(3)) {
                (Some(t), Some(e)) => (t.as_str(), e.as_str()),
                _ => continue
            };

            let exec_time_s: f64 = time_str
                .parse()
                .map_err(|e| ScriptError::InvalidTimestamp(format!("{}", e)))?;

            // The scripts contain JSON only.
            let event: Inbound = serde_json::from_str(event_str)
                .map_err(|e| ScriptError::InvalidEvent(exec_time_s, e))?;

            if let Some(last) = queue.back() {
                if last.exec_time_s > exec_time_s {
                    return Err(ScriptError::OutOfOrder(exec_time_s))
                }
            }

            queue.push_back(ScriptedEvent {
                exec_time_s,
                event
            });
        }

        if queue.is_empty() {
            return Err(ScriptError::ScriptEmpty)
        }

        Ok(ScriptInterpreter {
            _script_path: None,
            events: queue
        })
    }

    /// Return the events whose time is at or before `current_time_s`.
    pub fn get_pending_events(&mut self, current_time_s: f64) -> PendingEvents {

        // If the queue is empty the script is over
        if self.events.is_empty() {
            return PendingEvents::EndOfScript
        }

        let mut pending: Vec<Inbound> = vec![];

        while let Some(front) = self.events.front() {
            if front.exec_time_s > current_time_s {
                break;
            }

            if let Some(e) = self.events.pop_front() {
                pending.push(e.event);
            }
        }

        if pending.is_empty() {
            PendingEvents::None
        }
        else {
            PendingEvents::Some(pending)
        }
    }

    /// Get the number of events remaining in the script
    pub fn get_num_events(&self) -> usize {
        self.events.len()
    }

    /// Get the length of the script in seconds
    pub fn get_duration(&self) -> f64 {
        match self.events.back() {
            Some(e) => e.exec_time_s,
            None => 0f64
        }
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
