// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Local interfaces taking part in distributed routing.

use net::eth::mac::Mac;
use openflow::OfPort;
use rpc::{PortId, SubnetId};
use std::collections::BTreeSet;
use std::fmt::Display;

pub const DEVICE_OWNER_DVR_INTERFACE: &str = "network:router_interface_distributed";
pub const DEVICE_OWNER_ROUTER_SNAT: &str = "network:router_centralized_snat";
pub const DEVICE_OWNER_DHCP: &str = "network:dhcp";
pub const DEVICE_OWNER_LOADBALANCER: &str = "neutron:LOADBALANCER";
pub const DEVICE_OWNER_COMPUTE_PREFIX: &str = "compute:";

/// The role of a port, as far as distributed routing is concerned.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum DeviceOwner {
    /// A distributed router's interface on a subnet.
    RouterInterface,
    /// A port whose traffic is routed by the local router (VMs, DHCP, load balancers).
    DvrServiced,
    CentralizedSnat,
    Other,
}

impl From<&str> for DeviceOwner {
    fn from(owner: &str) -> Self {
        match owner {
            DEVICE_OWNER_DVR_INTERFACE => DeviceOwner::RouterInterface,
            DEVICE_OWNER_ROUTER_SNAT => DeviceOwner::CentralizedSnat,
            DEVICE_OWNER_DHCP | DEVICE_OWNER_LOADBALANCER => DeviceOwner::DvrServiced,
            owner if owner.starts_with(DEVICE_OWNER_COMPUTE_PREFIX) => DeviceOwner::DvrServiced,
            _ => DeviceOwner::Other,
        }
    }
}

impl Display for DeviceOwner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeviceOwner::RouterInterface => write!(f, "router-interface"),
            DeviceOwner::DvrServiced => write!(f, "dvr-serviced"),
            DeviceOwner::CentralizedSnat => write!(f, "centralized-snat"),
            DeviceOwner::Other => write!(f, "other"),
        }
    }
}

/// A local interface and the subnets it is routed for.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct OvsPort {
    id: PortId,
    ofport: OfPort,
    mac: Mac,
    device_owner: DeviceOwner,
    subnets: BTreeSet<SubnetId>,
}

impl OvsPort {
    #[must_use]
    pub fn new(id: PortId, ofport: OfPort, mac: Mac, device_owner: DeviceOwner) -> Self {
        Self {
            id,
            ofport,
            mac,
            device_owner,
            subnets: BTreeSet::new(),
        }
    }

    #[must_use]
    pub fn id(&self) -> &PortId {
        &self.id
    }
    #[must_use]
    pub fn ofport(&self) -> OfPort {
        self.ofport
    }
    #[must_use]
    pub fn mac(&self) -> Mac {
        self.mac
    }
    #[must_use]
    pub fn device_owner(&self) -> DeviceOwner {
        self.device_owner
    }
    #[must_use]
    pub fn subnets(&self) -> &BTreeSet<SubnetId> {
        &self.subnets
    }

    pub(crate) fn add_subnet(&mut self, subnet: SubnetId) {
        self.subnets.insert(subnet);
    }

    pub(crate) fn remove_subnet(&mut self, subnet: &SubnetId) {
        self.subnets.remove(subnet);
    }
}

impl Display for OvsPort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "OvsPort {} ofport={} mac={} owner={} subnets=[",
            self.id, self.ofport, self.mac, self.device_owner
        )?;
        for (i, subnet) in self.subnets.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{subnet}")?;
        }
        write!(f, "]")
    }
}
