//! # Network Module
//!
//! This module provides the in-process transport between the trajectory
//! client and its collaborators. The client owns an [`Inbox`] with one
//! bounded queue per inbound channel (odometry, obstacles, commands), and
//! publishes goals and predicted states through plain senders.
//!
//! Any other transport (a bridge to a middleware for example) only needs to
//! push into an [`InboxSenders`] and drain a goal receiver.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};
use std::sync::mpsc::{
    channel, sync_channel, Receiver, Sender, SyncSender, TryRecvError, TrySendError,
};
use thiserror::Error;

use crate::{
    eqpt::{ObstacleMsg, OdomMsg},
    tc::ClientCmd,
    traj::{TrajExecGoal, VehicleState},
};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Default depth of each inbound queue.
pub const DEFAULT_INBOX_DEPTH: usize = 64;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Depths of the inbound queues.
#[derive(Debug, Copy, Clone, Serialize, Deserialize)]
pub struct InboxParams {
    pub odom_depth: usize,
    pub obs_depth: usize,
    pub cmd_depth: usize,
}

/// Receiving side of the client's inbound channels.
pub struct Inbox {
    odom_rx: Receiver<OdomMsg>,
    obs_rx: Receiver<ObstacleMsg>,
    cmd_rx: Receiver<ClientCmd>,
}

/// Sending side of the client's inbound channels.
#[derive(Clone)]
pub struct InboxSenders {
    odom_tx: SyncSender<OdomMsg>,
    obs_tx: SyncSender<ObstacleMsg>,
    cmd_tx: SyncSender<ClientCmd>,
}

/// Sends goals to the execution service.
#[derive(Clone)]
pub struct GoalSender(Sender<TrajExecGoal>);

/// Publishes predicted (extrapolated) states for monitoring.
#[derive(Clone)]
pub struct StateSender(Sender<VehicleState>);

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Any inbound event to the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Inbound {
    Odom(OdomMsg),
    Obstacle(ObstacleMsg),
    Cmd(ClientCmd),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum NetError {
    #[error("The receiving end of the {0} channel has been dropped")]
    Disconnected(&'static str),

    #[error("The {0} queue is full, message dropped")]
    QueueFull(&'static str),
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Create a new inbox and the senders which feed it.
pub fn inbox(params: &InboxParams) -> (InboxSenders, Inbox) {
    let (odom_tx, odom_rx) = sync_channel(params.odom_depth.max(1));
    let (obs_tx, obs_rx) = sync_channel(params.obs_depth.max(1));
    let (cmd_tx, cmd_rx) = sync_channel(params.cmd_depth.max(1));

    (
        InboxSenders {
            odom_tx,
            obs_tx,
            cmd_tx,
        },
        Inbox {
            odom_rx,
            obs_rx,
            cmd_rx,
        },
    )
}

/// Create a goal channel.
pub fn goal_channel() -> (GoalSender, Receiver<TrajExecGoal>) {
    let (tx, rx) = channel();
    (GoalSender(tx), rx)
}

/// Create a predicted state channel.
pub fn state_channel() -> (StateSender, Receiver<VehicleState>) {
    let (tx, rx) = channel();
    (StateSender(tx), rx)
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Default for InboxParams {
    fn default() -> Self {
        Self {
            odom_depth: DEFAULT_INBOX_DEPTH,
            obs_depth: DEFAULT_INBOX_DEPTH,
            cmd_depth: DEFAULT_INBOX_DEPTH,
        }
    }
}

impl Inbox {
    /// Get the next odometry message, `Ok(None)` if the queue is empty.
    pub fn try_recv_odom(&self) -> Result<Option<OdomMsg>, NetError> {
        map_try_recv(self.odom_rx.try_recv(), "odometry")
    }

    /// Get the next obstacle message, `Ok(None)` if the queue is empty.
    pub fn try_recv_obstacle(&self) -> Result<Option<ObstacleMsg>, NetError> {
        map_try_recv(self.obs_rx.try_recv(), "obstacle")
    }

    /// Get the next command, `Ok(None)` if the queue is empty.
    pub fn try_recv_cmd(&self) -> Result<Option<ClientCmd>, NetError> {
        map_try_recv(self.cmd_rx.try_recv(), "command")
    }
}

impl InboxSenders {
    pub fn send_odom(&self, msg: OdomMsg) -> Result<(), NetError> {
        map_try_send(self.odom_tx.try_send(msg), "odometry")
    }

    pub fn send_obstacle(&self, msg: ObstacleMsg) -> Result<(), NetError> {
        map_try_send(self.obs_tx.try_send(msg), "obstacle")
    }

    pub fn send_cmd(&self, cmd: ClientCmd) -> Result<(), NetError> {
        map_try_send(self.cmd_tx.try_send(cmd), "command")
    }

    /// Route an inbound event onto the right channel.
    pub fn send(&self, event: Inbound) -> Result<(), NetError> {
        match event {
            Inbound::Odom(m) => self.send_odom(m),
            Inbound::Obstacle(m) => self.send_obstacle(m),
            Inbound::Cmd(c) => self.send_cmd(c),
        }
    }
}

impl GoalSender {
    pub fn send(&self, goal: TrajExecGoal) -> Result<(), NetError> {
        self.0
            .send(goal)
            .map_err(|_| NetError::Disconnected("goal"))
    }
}

impl StateSender {
    pub fn send(&self, state: VehicleState) -> Result<(), NetError> {
        self.0
            .send(state)
            .map_err(|_| NetError::Disconnected("predicted state"))
    }
}

fn map_try_recv<T>(
    res: Result<T, TryRecvError>,
    channel: &'static str,
) -> Result<Option<T>, NetError> {
    match res {
        Ok(m) => Ok(Some(m)),
        Err(TryRecvError::Empty) => Ok(None),
        Err(TryRecvError::Disconnected) => Err(NetError::Disconnected(channel)),
    }
}

fn map_try_send<T>(res: Result<(), TrySendError<T>>, channel: &'static str) -> Result<(), NetError> {
    match res {
        Ok(()) => Ok(()),
        Err(TrySendError::Full(_)) => Err(NetError::QueueFull(channel)),
        Err(TrySendError::Disconnected(_)) => Err(NetError::Disconnected(channel)),
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
