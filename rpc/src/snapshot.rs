// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! A control plane answering from a fixed snapshot of the topology.
//!
//! Serves dry runs of the agent (the snapshot is loaded from YAML) and tests, which can also queue
//! failures to be returned by the next requests.

use crate::client::ControlPlane;
use crate::errors::RpcError;
use crate::types::{DvrMacDetails, HostPort, SubnetId, SubnetInfo};
use serde::{Deserialize, Serialize};
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::path::Path;

/// A port bound to some host.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct HostBinding {
    pub host: String,
    #[serde(flatten)]
    pub port: HostPort,
}

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct ControlPlaneSnapshot {
    #[serde(default)]
    pub dvr_macs: Vec<DvrMacDetails>,
    #[serde(default)]
    pub subnets: Vec<SubnetInfo>,
    #[serde(default)]
    pub ports: Vec<HostBinding>,
}

#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_yaml_ng::Error,
    },
}

impl ControlPlaneSnapshot {
    pub fn from_yaml_file(path: &Path) -> Result<Self, SnapshotError> {
        let text = std::fs::read_to_string(path).map_err(|source| SnapshotError::Io {
            path: path.display().to_string(),
            source,
        })?;
        serde_yaml_ng::from_str(&text).map_err(|source| SnapshotError::Parse {
            path: path.display().to_string(),
            source,
        })
    }
}

/// Which request a queued failure applies to.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Method {
    DvrMacByHost,
    DvrMacList,
    SubnetForDvr,
    PortsOnHostBySubnet,
}

#[derive(Debug, Default)]
pub struct StaticControlPlane {
    snapshot: ControlPlaneSnapshot,
    failures: RefCell<VecDeque<(Method, RpcError)>>,
    requests: Cell<usize>,
}

impl StaticControlPlane {
    #[must_use]
    pub fn new(snapshot: ControlPlaneSnapshot) -> Self {
        Self {
            snapshot,
            ..Default::default()
        }
    }

    #[must_use]
    pub fn snapshot(&self) -> &ControlPlaneSnapshot {
        &self.snapshot
    }

    /// Mutable access to the topology, e.g. to move ports around between requests.
    pub fn snapshot_mut(&mut self) -> &mut ControlPlaneSnapshot {
        &mut self.snapshot
    }

    /// Queue `error` as the answer of the next request to `method`.
    /// Failures for one method are returned in the order they were queued.
    pub fn fail_next(&self, method: Method, error: RpcError) {
        self.failures.borrow_mut().push_back((method, error));
    }

    /// Number of requests answered so far (failed ones included).
    #[must_use]
    pub fn requests(&self) -> usize {
        self.requests.get()
    }

    fn begin(&self, method: Method) -> Result<(), RpcError> {
        self.requests.set(self.requests.get() + 1);
        let mut failures = self.failures.borrow_mut();
        if let Some(pos) = failures.iter().position(|(m, _)| *m == method)
            && let Some((_, error)) = failures.remove(pos)
        {
            return Err(error);
        }
        Ok(())
    }
}

impl ControlPlane for StaticControlPlane {
    fn get_dvr_mac_address_by_host(&self, host: &str) -> Result<DvrMacDetails, RpcError> {
        self.begin(Method::DvrMacByHost)?;
        self.snapshot
            .dvr_macs
            .iter()
            .find(|details| details.host == host)
            .cloned()
            .ok_or_else(|| RpcError::Remote {
                method: "get_dvr_mac_address_by_host",
                message: format!("no DVR MAC allocated for host {host}"),
            })
    }

    fn get_dvr_mac_address_list(&self) -> Result<Vec<DvrMacDetails>, RpcError> {
        self.begin(Method::DvrMacList)?;
        Ok(self.snapshot.dvr_macs.clone())
    }

    fn get_subnet_for_dvr(&self, subnet: &SubnetId) -> Result<Option<SubnetInfo>, RpcError> {
        self.begin(Method::SubnetForDvr)?;
        Ok(self
            .snapshot
            .subnets
            .iter()
            .find(|info| &info.id == subnet)
            .cloned())
    }

    fn get_ports_on_host_by_subnet(
        &self,
        host: &str,
        subnet: &SubnetId,
    ) -> Result<Vec<HostPort>, RpcError> {
        self.begin(Method::PortsOnHostBySubnet)?;
        Ok(self
            .snapshot
            .ports
            .iter()
            .filter(|binding| binding.host == host)
            .filter(|binding| {
                binding
                    .port
                    .fixed_ips
                    .iter()
                    .any(|ip| &ip.subnet_id == subnet)
            })
            .map(|binding| binding.port.clone())
            .collect())
    }
}
