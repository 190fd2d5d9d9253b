// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Command line of the DVR agent.

#![deny(
    unsafe_code,
    clippy::all,
    clippy::pedantic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic
)]

pub use clap::Parser;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::level_filters::LevelFilter;

/// Log levels per target, as `target=level` items separated by commas
/// (e.g. `default=info,dvr_agent=debug`).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TracingArg {
    directives: Vec<(String, LevelFilter)>,
}

impl TracingArg {
    /// The level set with `default=level`, if any.
    #[must_use]
    pub fn default_level(&self) -> Option<LevelFilter> {
        self.directives
            .iter()
            .rev()
            .find(|(target, _)| target == "default")
            .map(|(_, level)| *level)
    }

    /// Per-target directives, in `EnvFilter` syntax.
    pub fn target_directives(&self) -> impl Iterator<Item = String> + '_ {
        self.directives
            .iter()
            .filter(|(target, _)| target != "default")
            .map(|(target, level)| format!("{target}={}", level.to_string().to_lowercase()))
    }
}

impl FromStr for TracingArg {
    type Err = String;
    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let mut directives = Vec::new();
        for item in input.split(',') {
            let item = item.trim();
            let Some((target, level)) = item.split_once('=') else {
                return Err(format!("Invalid syntax '{item}': it should be target=loglevel"));
            };
            let level = LevelFilter::from_str(level.trim())
                .map_err(|e| format!("invalid level {}: {e}", level.trim()))?;
            let target = target.trim();
            if target.is_empty() {
                return Err(format!("Missing target in '{item}'"));
            }
            directives.push((target.to_string(), level));
        }
        Ok(Self { directives })
    }
}

#[derive(Debug, Parser)]
#[command(name = "dvr-agentd")]
#[command(version = "0.1.0")]
#[command(about = "Distributed virtual router datapath programming agent", long_about = None)]
pub struct CmdArgs {
    #[arg(long, value_name = "agent configuration (yaml)")]
    config: PathBuf,
    #[arg(
        long,
        value_name = "target=level,...",
        value_parser = TracingArg::from_str
    )]
    tracing: Option<TracingArg>,
    #[arg(
        long,
        default_value_t = false,
        help = "Program in-memory bridges and print the resulting flow tables"
    )]
    dry_run: bool,
    #[arg(long, value_name = "control plane snapshot (yaml)")]
    control_plane: Option<PathBuf>,
}

impl CmdArgs {
    #[must_use]
    pub fn config(&self) -> &Path {
        &self.config
    }
    #[must_use]
    pub fn tracing(&self) -> Option<&TracingArg> {
        self.tracing.as_ref()
    }
    #[must_use]
    pub fn dry_run(&self) -> bool {
        self.dry_run
    }
    #[must_use]
    pub fn control_plane(&self) -> Option<&Path> {
        self.control_plane.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_full_command_line() {
        let args = CmdArgs::try_parse_from([
            "dvr-agentd",
            "--config",
            "/etc/dvr/agent.yaml",
            "--tracing",
            "default=warn, dvr_agent=debug",
            "--dry-run",
            "--control-plane",
            "/tmp/cp.yaml",
        ])
        .unwrap();
        assert_eq!(args.config(), Path::new("/etc/dvr/agent.yaml"));
        assert!(args.dry_run());
        assert_eq!(args.control_plane(), Some(Path::new("/tmp/cp.yaml")));
        let tracing = args.tracing().unwrap();
        assert_eq!(tracing.default_level(), Some(LevelFilter::WARN));
        assert_eq!(
            tracing.target_directives().collect::<Vec<_>>(),
            vec!["dvr_agent=debug"]
        );
    }

    #[test]
    fn config_is_required() {
        assert!(CmdArgs::try_parse_from(["dvr-agentd"]).is_err());
    }

    #[test]
    fn bad_tracing_directives() {
        assert!(TracingArg::from_str("dvr_agent").is_err());
        assert!(TracingArg::from_str("dvr_agent=loud").is_err());
        assert!(TracingArg::from_str("=debug").is_err());
        assert!(
            CmdArgs::try_parse_from(["dvr-agentd", "--config", "a.yaml", "--tracing", "x"])
                .is_err()
        );
    }
}
