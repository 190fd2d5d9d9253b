// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! The datapath driver interface.

use crate::flow::{Flow, FlowMatch};
use crate::table::{OfPort, TableId};
use net::eth::mac::Mac;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A local virtual interface as seen by the datapath.
#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct VifPort {
    /// Name of the interface on the bridge (e.g. `tap0a1b2c3d`).
    pub port_name: String,
    /// Identifier of the logical port this interface backs.
    pub vif_id: String,
    pub ofport: OfPort,
    pub vif_mac: Mac,
}

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("Failed to run '{command}': {source}")]
    Exec {
        command: String,
        #[source]
        source: std::io::Error,
    },
    #[error("'{command}' failed: {stderr}")]
    CommandFailed { command: String, stderr: String },
    #[error("Unexpected output from '{command}': {output}")]
    BadOutput { command: String, output: String },
    #[error("Bridge {0} is not reachable")]
    Unreachable(String),
}

/// A bridge whose rules can be programmed.
///
/// Every call is synchronous: when it returns `Ok`, the change is in the datapath.
/// There is no transaction spanning several calls.
pub trait Bridge {
    /// Name of the bridge, for logging.
    fn name(&self) -> &str;

    /// Install `flow`, replacing any rule with the same table, priority and match.
    fn add_flow(&mut self, flow: &Flow) -> Result<(), BridgeError>;

    /// Remove every rule of `table` covered by `pattern` (unset fields are wildcards).
    fn delete_flows(&mut self, table: TableId, pattern: &FlowMatch) -> Result<(), BridgeError>;

    /// Remove every rule of every table.
    fn remove_all_flows(&mut self) -> Result<(), BridgeError>;

    /// Look up the interface backing logical port `vif_id`, if it lives on this bridge.
    fn get_vif_port_by_id(&self, vif_id: &str) -> Result<Option<VifPort>, BridgeError>;
}

impl<B: Bridge + ?Sized> Bridge for Box<B> {
    fn name(&self) -> &str {
        (**self).name()
    }
    fn add_flow(&mut self, flow: &Flow) -> Result<(), BridgeError> {
        (**self).add_flow(flow)
    }
    fn delete_flows(&mut self, table: TableId, pattern: &FlowMatch) -> Result<(), BridgeError> {
        (**self).delete_flows(table, pattern)
    }
    fn remove_all_flows(&mut self) -> Result<(), BridgeError> {
        (**self).remove_all_flows()
    }
    fn get_vif_port_by_id(&self, vif_id: &str) -> Result<Option<VifPort>, BridgeError> {
        (**self).get_vif_port_by_id(vif_id)
    }
}

impl VifPort {
    #[must_use]
    pub fn new(
        port_name: impl Into<String>,
        vif_id: impl Into<String>,
        ofport: impl Into<OfPort>,
        vif_mac: Mac,
    ) -> Self {
        Self {
            port_name: port_name.into(),
            vif_id: vif_id.into(),
            ofport: ofport.into(),
            vif_mac,
        }
    }
}
