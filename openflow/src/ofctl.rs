// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! [`Bridge`] driver backed by the `ovs-ofctl` / `ovs-vsctl` command line tools.

use crate::bridge::{Bridge, BridgeError, VifPort};
use crate::flow::{Flow, FlowMatch};
use crate::table::{OfPort, TableId};
use net::eth::mac::Mac;
use std::process::Command;
use std::str::FromStr;
use tracing::{debug, warn};

const OFCTL: &str = "ovs-ofctl";
const VSCTL: &str = "ovs-vsctl";

#[derive(Clone, Debug)]
pub struct OfctlBridge {
    name: String,
}

impl OfctlBridge {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    fn run(program: &str, args: &[&str]) -> Result<String, BridgeError> {
        let command = format!("{program} {}", args.join(" "));
        debug!("Running {command}");
        let output = Command::new(program)
            .args(args)
            .output()
            .map_err(|source| BridgeError::Exec {
                command: command.clone(),
                source,
            })?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            warn!("{command} failed: {stderr}");
            return Err(BridgeError::CommandFailed { command, stderr });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    fn ports(&self) -> Result<Vec<String>, BridgeError> {
        let out = Self::run(VSCTL, &["list-ports", &self.name])?;
        Ok(out
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect())
    }
}

impl Bridge for OfctlBridge {
    fn name(&self) -> &str {
        &self.name
    }

    fn add_flow(&mut self, flow: &Flow) -> Result<(), BridgeError> {
        Self::run(OFCTL, &["add-flow", &self.name, &flow.to_string()]).map(|_| ())
    }

    fn delete_flows(&mut self, table: TableId, pattern: &FlowMatch) -> Result<(), BridgeError> {
        let spec = if pattern.is_any() {
            format!("table={table}")
        } else {
            format!("table={table},{pattern}")
        };
        Self::run(OFCTL, &["del-flows", &self.name, &spec]).map(|_| ())
    }

    fn remove_all_flows(&mut self) -> Result<(), BridgeError> {
        Self::run(OFCTL, &["del-flows", &self.name]).map(|_| ())
    }

    fn get_vif_port_by_id(&self, vif_id: &str) -> Result<Option<VifPort>, BridgeError> {
        let selector = format!("external_ids:iface-id={vif_id}");
        let args = [
            "--format=csv",
            "--data=bare",
            "--no-headings",
            "--columns=name,ofport,external_ids",
            "find",
            "Interface",
            selector.as_str(),
        ];
        let out = Self::run(VSCTL, &args)?;
        let Some(line) = out.lines().find(|line| !line.trim().is_empty()) else {
            return Ok(None);
        };
        let Some(vif) = parse_interface_row(line, vif_id).map_err(|output| {
            BridgeError::BadOutput {
                command: format!("{VSCTL} {}", args.join(" ")),
                output,
            }
        })?
        else {
            return Ok(None);
        };
        // the interface may exist on the host but be plugged into another bridge
        if !self.ports()?.contains(&vif.port_name) {
            debug!("{} is not on bridge {}", vif.port_name, self.name);
            return Ok(None);
        }
        Ok(Some(vif))
    }
}

/// Parse a `name,ofport,external_ids` row as printed by `ovs-vsctl --format=csv --data=bare`.
///
/// Interfaces without a usable ofport (`-1` or empty while the port is being set up) are
/// reported as absent.
fn parse_interface_row(line: &str, vif_id: &str) -> Result<Option<VifPort>, String> {
    let mut columns = line.trim().splitn(3, ',');
    let (Some(name), Some(ofport), Some(external_ids)) =
        (columns.next(), columns.next(), columns.next())
    else {
        return Err(line.to_string());
    };
    let ofport = ofport.trim();
    if ofport.is_empty() {
        return Ok(None);
    }
    let ofport = OfPort::new(ofport.parse::<i32>().map_err(|_| line.to_string())?);
    if !ofport.is_valid() {
        return Ok(None);
    }
    let mac = external_ids
        .trim_matches('"')
        .split_whitespace()
        .find_map(|kv| kv.strip_prefix("attached-mac="))
        .ok_or_else(|| line.to_string())
        .and_then(|mac| Mac::from_str(mac.trim_matches('"')).map_err(|_| line.to_string()))?;
    Ok(Some(VifPort::new(name.trim(), vif_id, ofport, mac)))
}
