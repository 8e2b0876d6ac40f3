//! Trajectory client executable entry point.
//!
//! # Architecture
//!
//! The executable runs two threads:
//!
//!     - The client thread (main), which owns the `TrajClient` and all
//!       controller state, spinning on inbound events and running the ramp
//!       and MPC loops.
//!     - The simulation thread, which stands in for the trajectory execution
//!       service. It executes the goals it receives and publishes odometry
//!       and obstacle observations back to the client.
//!
//! The client exits once the simulation has finished and dropped its end of
//! the inbound channels.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use std::path::PathBuf;
use std::thread;
use color_eyre::{Report, eyre::{WrapErr, eyre}};
use log::{info, warn};
use structopt::StructOpt;

// Internal
use comms_if::{net, tc::ClientCmd};
use traj_lib::{
    client::TrajClient,
    optimiser::RolloutOptimiser,
    params::TrajExecParams,
    sim::{self, SimLinks, SimParams}
};
use util::{
    logger::{logger_init, LevelFilter},
    script_interpreter::ScriptInterpreter,
    session::Session
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

#[derive(Debug, StructOpt)]
#[structopt(name = "traj_exec", about = "Receding-horizon trajectory client")]
struct Args {
    /// Client parameter file, relative to $LOCO_SW_ROOT/params
    #[structopt(long, default_value = "traj_client.toml")]
    params: String,

    /// Simulation parameter file, relative to $LOCO_SW_ROOT/params
    #[structopt(long, default_value = "sim.toml")]
    sim_params: String,

    /// Scenario script feeding timed events into the client
    #[structopt(long, parse(from_os_str))]
    script: Option<PathBuf>,

    /// Command to send once the simulation is running, by integer code
    /// (0 stop, 1 ramp, 2 plan, 3 ramp-then-plan, 4 mpc, 5 fixed-rate mpc)
    #[structopt(long)]
    mode: Option<i64>,

    /// Directory sessions are created in
    #[structopt(long, default_value = "sessions")]
    sessions_dir: String,

    /// Command sent once the simulation is running. Defaults to
    /// ramp-then-plan unless a script or mode is given.
    #[structopt(subcommand)]
    cmd: Option<ClientCmd>
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

fn main() -> Result<(), Report> {
    color_eyre::install()?;

    let args = Args::from_args();

    // ---- EARLY INITIALISATION ----

    let session = Session::new("traj_exec", &args.sessions_dir)
        .wrap_err("Failed to create the session")?;

    // The simulated vehicle logs every cycle, keep it out of debug output
    logger_init(LevelFilter::Debug, &["traj_lib::sim"], &session)
        .wrap_err("Failed to initialise logging")?;

    info!("LoCo Trajectory Client\n");
    info!("Session directory: {:?}\n", session.session_root);

    // ---- LOAD PARAMETERS ----

    let params: TrajExecParams = util::params::load(&args.params)
        .wrap_err("Could not load client params")?;
    let sim_params: SimParams = util::params::load(&args.sim_params)
        .wrap_err("Could not load simulation params")?;

    info!("Parameters loaded");

    // ---- SCRIPT ----

    let script = match args.script {
        Some(ref path) => {
            info!("Loading script from {:?}", path);

            let si = ScriptInterpreter::new(path)
                .wrap_err("Failed to load script")?;

            info!(
                "Loaded script lasts {:.02} s and contains {} events\n",
                si.get_duration(),
                si.get_num_events()
            );

            Some(si)
        },
        None => None
    };

    let mode_cmd = match args.mode.map(ClientCmd::from_code) {
        Some(Ok(c)) => Some(c),
        Some(Err(e)) => {
            warn!("Ignoring mode: {}", e);
            None
        },
        None => None
    };

    let initial_cmd = match (args.cmd.or(mode_cmd), &script) {
        (Some(c), _) => Some(c),
        (None, Some(_)) => None,
        (None, None) if args.mode.is_some() => None,
        (None, None) => Some(ClientCmd::RampThenPlan)
    };

    // ---- CHANNELS ----

    let (inbound_tx, inbox) = net::inbox(&params.client.inbox);
    let (goal_tx, goal_rx) = net::goal_channel();
    let (state_tx, state_rx) = net::state_channel();

    // ---- SIMULATION ----

    let links = SimLinks {
        inbound: inbound_tx,
        goals: goal_rx,
        predicted: state_rx
    };

    let sim_handle = thread::Builder::new()
        .name("sim".into())
        .spawn(move || sim::run(sim_params, links, script, initial_cmd))
        .wrap_err("Failed to start the simulation thread")?;

    // ---- CLIENT ----

    let optimiser = RolloutOptimiser::new(params.rollout.clone());

    let mut client = TrajClient::new(
        params,
        inbox,
        Box::new(goal_tx),
        Box::new(optimiser)
    ).with_state_pub(Box::new(state_tx));

    client.init_archives(&session)
        .wrap_err("Failed to initialise the client archives")?;

    info!("Initialisation complete, spinning\n");

    client.spin();

    info!("Client stopped in phase {:?} after {} goals", client.phase(), client.num_goals());

    // Dropping the client closes the goal channel, which ends the simulation
    // if it's still running
    drop(client);

    if sim_handle.join().is_err() {
        warn!("Simulation thread panicked");
        session.exit();
        return Err(eyre!("Simulation thread panicked"));
    }

    session.exit();

    Ok(())
}
