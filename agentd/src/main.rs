// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

#![deny(clippy::all, clippy::pedantic)]
#![deny(unsafe_code, clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod logging;

use agent::{DvrAgent, DvrError};
use args::{CmdArgs, Parser};
use config::{AgentConfig, ConfigError};
use openflow::{Bridge, MemoryBridge, OfctlBridge};
use rpc::{ControlPlane, ControlPlaneSnapshot, SnapshotError, StaticControlPlane};
use std::process::ExitCode;
use tracing::{error, info, warn};

#[derive(Debug, thiserror::Error)]
enum AgentdError {
    #[error("Bad configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("Bad control plane snapshot: {0}")]
    Snapshot(#[from] SnapshotError),
    #[error("Bootstrap failed: {0}")]
    Dvr(#[from] DvrError),
}

fn bootstrap<B: Bridge, C: ControlPlane>(
    config: &AgentConfig,
    open: impl FnMut(&str) -> B,
    control_plane: C,
) -> Result<DvrAgent<B, C>, DvrError> {
    let mut agent = DvrAgent::from_config(config, open, control_plane);
    agent.start()?;
    info!(
        "Agent for {} bootstrapped in {} mode, {} remote DVR MACs",
        agent.host(),
        agent.mode(),
        agent.registered_dvr_macs().len()
    );
    Ok(agent)
}

fn run(args: &CmdArgs) -> Result<(), AgentdError> {
    let config = AgentConfig::from_yaml_file(args.config())?;
    let control_plane = if let Some(path) = args.control_plane() {
        StaticControlPlane::new(ControlPlaneSnapshot::from_yaml_file(path)?)
    } else {
        warn!("No control plane snapshot, running with an empty topology");
        StaticControlPlane::default()
    };

    if args.dry_run() {
        let agent = bootstrap(&config, |name| MemoryBridge::new(name), control_plane)?;
        for bridge in agent.bridges().iter() {
            print!("{bridge}");
        }
    } else {
        bootstrap(&config, |name| OfctlBridge::new(name), control_plane)?;
    }
    Ok(())
}

fn main() -> ExitCode {
    let args = CmdArgs::parse();
    if let Err(e) = logging::init_logging(args.tracing()) {
        eprintln!("{e}");
        return ExitCode::FAILURE;
    }
    info!("Starting DVR agent...");
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}
