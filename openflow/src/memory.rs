// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! An in-memory [`Bridge`] which records what it is asked to do.
//!
//! Used for dry runs and throughout the tests: it keeps both the sequence of mutating calls and
//! the flow table those calls would leave behind in a real datapath.

use crate::bridge::{Bridge, BridgeError, VifPort};
use crate::flow::{Flow, FlowMatch};
use crate::table::TableId;
use std::collections::HashMap;
use std::fmt::Display;
use tracing::trace;

/// A mutating call received by a [`MemoryBridge`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum BridgeCall {
    AddFlow(Flow),
    DeleteFlows { table: TableId, pattern: FlowMatch },
    RemoveAllFlows,
}

impl BridgeCall {
    #[must_use]
    pub fn is_add(&self) -> bool {
        matches!(self, BridgeCall::AddFlow(_))
    }
    #[must_use]
    pub fn is_delete(&self) -> bool {
        matches!(self, BridgeCall::DeleteFlows { .. })
    }
}

#[derive(Debug, Default)]
pub struct MemoryBridge {
    name: String,
    flows: Vec<Flow>,
    calls: Vec<BridgeCall>,
    vifs: HashMap<String, VifPort>,
    unreachable: bool,
}

impl MemoryBridge {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Make `vif` resolvable through [`Bridge::get_vif_port_by_id`].
    pub fn add_vif(&mut self, vif: VifPort) {
        self.vifs.insert(vif.vif_id.clone(), vif);
    }

    pub fn remove_vif(&mut self, vif_id: &str) -> Option<VifPort> {
        self.vifs.remove(vif_id)
    }

    /// While unreachable, every mutating call fails (and is not recorded).
    pub fn set_unreachable(&mut self, unreachable: bool) {
        self.unreachable = unreachable;
    }

    /// The rules currently installed, in installation order.
    #[must_use]
    pub fn flows(&self) -> &[Flow] {
        &self.flows
    }

    /// The rules currently installed in `table`.
    pub fn table(&self, table: TableId) -> impl Iterator<Item = &Flow> {
        self.flows.iter().filter(move |flow| flow.table == table)
    }

    /// Returns true iff a rule with exactly this table, priority, match and actions is installed.
    #[must_use]
    pub fn contains(&self, flow: &Flow) -> bool {
        self.flows.iter().any(|installed| installed == flow)
    }

    #[must_use]
    pub fn calls(&self) -> &[BridgeCall] {
        &self.calls
    }

    /// Forget the recorded calls, keeping the installed rules.
    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    fn check_reachable(&self) -> Result<(), BridgeError> {
        if self.unreachable {
            return Err(BridgeError::Unreachable(self.name.clone()));
        }
        Ok(())
    }
}

impl Bridge for MemoryBridge {
    fn name(&self) -> &str {
        &self.name
    }

    fn add_flow(&mut self, flow: &Flow) -> Result<(), BridgeError> {
        self.check_reachable()?;
        trace!("{}: add-flow {flow}", self.name);
        self.calls.push(BridgeCall::AddFlow(flow.clone()));
        match self.flows.iter_mut().find(|f| f.same_slot(flow)) {
            Some(existing) => existing.actions.clone_from(&flow.actions),
            None => self.flows.push(flow.clone()),
        }
        Ok(())
    }

    fn delete_flows(&mut self, table: TableId, pattern: &FlowMatch) -> Result<(), BridgeError> {
        self.check_reachable()?;
        trace!("{}: del-flows table={table},{pattern}", self.name);
        self.calls.push(BridgeCall::DeleteFlows {
            table,
            pattern: pattern.clone(),
        });
        self.flows
            .retain(|flow| !(flow.table == table && pattern.covers(&flow.matches)));
        Ok(())
    }

    fn remove_all_flows(&mut self) -> Result<(), BridgeError> {
        self.check_reachable()?;
        trace!("{}: del-flows", self.name);
        self.calls.push(BridgeCall::RemoveAllFlows);
        self.flows.clear();
        Ok(())
    }

    fn get_vif_port_by_id(&self, vif_id: &str) -> Result<Option<VifPort>, BridgeError> {
        Ok(self.vifs.get(vif_id).cloned())
    }
}

/// Dumps the installed rules, one per line, sorted by table and descending priority, the way
/// `ovs-ofctl dump-flows` lists them.
impl Display for MemoryBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut flows: Vec<&Flow> = self.flows.iter().collect();
        flows.sort_by(|a, b| a.table.cmp(&b.table).then(b.priority.cmp(&a.priority)));
        writeln!(f, "{}:", self.name)?;
        for flow in flows {
            writeln!(f, "  {flow}")?;
        }
        Ok(())
    }
}
