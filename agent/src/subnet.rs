// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Per-subnet routing state of the host.

use openflow::OfPort;
use rpc::{PortId, SubnetId, SubnetInfo};
use std::collections::BTreeMap;
use std::fmt::Display;

/// What the host knows and does about a subnet served by a distributed router.
///
/// A mapping only exists while it is needed, i.e. while a router interface for the subnet is
/// bound locally ([`Self::is_dvr_owned`]) or the subnet's centralized SNAT port lives here.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LocalDvrSubnetMapping {
    subnet: SubnetInfo,
    compute_ports: BTreeMap<PortId, OfPort>,
    csnat_ofport: OfPort,
    dvr_owned: bool,
}

impl LocalDvrSubnetMapping {
    #[must_use]
    pub fn new(subnet: SubnetInfo) -> Self {
        Self {
            subnet,
            compute_ports: BTreeMap::new(),
            csnat_ofport: OfPort::INVALID,
            dvr_owned: false,
        }
    }

    #[must_use]
    pub fn subnet(&self) -> &SubnetInfo {
        &self.subnet
    }

    #[must_use]
    pub fn id(&self) -> &SubnetId {
        &self.subnet.id
    }

    /// Local ports routed on this subnet, with their ofport.
    #[must_use]
    pub fn compute_ports(&self) -> &BTreeMap<PortId, OfPort> {
        &self.compute_ports
    }

    #[must_use]
    pub fn csnat_ofport(&self) -> OfPort {
        self.csnat_ofport
    }

    #[must_use]
    pub fn is_dvr_owned(&self) -> bool {
        self.dvr_owned
    }

    /// Returns false once the mapping can be forgotten.
    #[must_use]
    pub fn is_needed(&self) -> bool {
        self.dvr_owned || self.csnat_ofport.is_valid()
    }

    pub(crate) fn set_dvr_owned(&mut self, owned: bool) {
        self.dvr_owned = owned;
    }

    pub(crate) fn set_csnat_ofport(&mut self, ofport: OfPort) {
        self.csnat_ofport = ofport;
    }

    pub(crate) fn add_compute_ofport(&mut self, port: PortId, ofport: OfPort) {
        self.compute_ports.insert(port, ofport);
    }

    pub(crate) fn remove_compute_ofport(&mut self, port: &PortId) -> Option<OfPort> {
        self.compute_ports.remove(port)
    }

    pub(crate) fn remove_all_compute_ofports(&mut self) -> BTreeMap<PortId, OfPort> {
        std::mem::take(&mut self.compute_ports)
    }
}

impl Display for LocalDvrSubnetMapping {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "subnet {} gateway {} ({}) dvr_owned={} csnat_ofport={} compute_ports={{",
            self.subnet.id,
            self.subnet.gateway_ip,
            self.subnet.gateway_mac,
            self.dvr_owned,
            self.csnat_ofport
        )?;
        for (i, (port, ofport)) in self.compute_ports.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{port}:{ofport}")?;
        }
        write!(f, "}}")
    }
}
