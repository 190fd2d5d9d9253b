// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! How a network is carried on this host.

use crate::tables::{GENEVE_TUN_TO_LV, GRE_TUN_TO_LV, VXLAN_TUN_TO_LV};
use net::vlan::Vid;
use openflow::TableId;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TunnelType {
    Gre,
    Vxlan,
    Geneve,
}

impl TunnelType {
    /// The tunnel bridge table translating tunnel ids of this type to local VLANs.
    #[must_use]
    pub fn tun_to_lv_table(self) -> TableId {
        match self {
            TunnelType::Gre => GRE_TUN_TO_LV,
            TunnelType::Vxlan => VXLAN_TUN_TO_LV,
            TunnelType::Geneve => GENEVE_TUN_TO_LV,
        }
    }
}

impl Display for TunnelType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TunnelType::Gre => write!(f, "gre"),
            TunnelType::Vxlan => write!(f, "vxlan"),
            TunnelType::Geneve => write!(f, "geneve"),
        }
    }
}

impl FromStr for TunnelType {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "gre" => Ok(TunnelType::Gre),
            "vxlan" => Ok(TunnelType::Vxlan),
            "geneve" => Ok(TunnelType::Geneve),
            other => Err(format!("{other} is not a tunnel type")),
        }
    }
}

/// The provider side of a network.
#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(tag = "network_type", rename_all = "lowercase")]
pub enum Segment {
    Vlan {
        physical_network: String,
        /// The provider VLAN (segmentation id).
        vid: Vid,
    },
    Tunnel {
        kind: TunnelType,
        tunnel_id: u32,
    },
    Flat {
        physical_network: String,
    },
    Local,
}

impl Segment {
    /// Only VLAN and tunneled networks are routed by the agent.
    #[must_use]
    pub fn is_routable(&self) -> bool {
        matches!(self, Segment::Vlan { .. } | Segment::Tunnel { .. })
    }

    #[must_use]
    pub fn network_type(&self) -> String {
        match self {
            Segment::Vlan { .. } => "vlan".to_string(),
            Segment::Tunnel { kind, .. } => kind.to_string(),
            Segment::Flat { .. } => "flat".to_string(),
            Segment::Local => "local".to_string(),
        }
    }
}

/// A network as provisioned on this host: the VLAN tagging its traffic on the integration bridge,
/// and how it leaves the host.
#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct LocalVlanMapping {
    pub local_vlan: Vid,
    pub segment: Segment,
}

impl LocalVlanMapping {
    #[must_use]
    pub fn new(local_vlan: Vid, segment: Segment) -> Self {
        Self {
            local_vlan,
            segment,
        }
    }
}

impl Display for LocalVlanMapping {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "lvid={} type={}", self.local_vlan, self.segment.network_type())?;
        match &self.segment {
            Segment::Vlan {
                physical_network,
                vid,
            } => write!(f, " physnet={physical_network} segmentation_id={vid}"),
            Segment::Tunnel { tunnel_id, .. } => write!(f, " segmentation_id={tunnel_id}"),
            Segment::Flat { physical_network } => write!(f, " physnet={physical_network}"),
            Segment::Local => Ok(()),
        }
    }
}
