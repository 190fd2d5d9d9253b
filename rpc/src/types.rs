// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Objects exchanged with the control plane.

use net::eth::mac::Mac;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::net::IpAddr;

/// Identifier of a logical port (a neutron-style uuid, kept opaque).
#[derive(Clone, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct PortId(String);

/// Identifier of a subnet (opaque).
#[derive(Clone, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct SubnetId(String);

macro_rules! opaque_id {
    ($t:ty) => {
        impl $t {
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }
        impl From<&str> for $t {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }
        impl From<String> for $t {
            fn from(value: String) -> Self {
                Self(value)
            }
        }
        impl AsRef<str> for $t {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
        impl Display for $t {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}
opaque_id!(PortId);
opaque_id!(SubnetId);

/// The DVR MAC assigned to a host.
#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct DvrMacDetails {
    pub host: String,
    pub mac_address: Mac,
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum IpVersion {
    V4,
    V6,
}

impl TryFrom<u8> for IpVersion {
    type Error = String;
    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            4 => Ok(IpVersion::V4),
            6 => Ok(IpVersion::V6),
            other => Err(format!("{other} is not an ip version")),
        }
    }
}

impl From<IpVersion> for u8 {
    fn from(value: IpVersion) -> Self {
        match value {
            IpVersion::V4 => 4,
            IpVersion::V6 => 6,
        }
    }
}

/// What the agent needs to know about a subnet routed by a distributed router.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct SubnetInfo {
    pub id: SubnetId,
    pub ip_version: IpVersion,
    #[serde(default)]
    pub cidr: Option<String>,
    pub gateway_ip: IpAddr,
    /// MAC of the router interface serving as gateway of the subnet.
    pub gateway_mac: Mac,
}

#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct FixedIp {
    pub subnet_id: SubnetId,
    pub ip_address: IpAddr,
}

impl FixedIp {
    #[must_use]
    pub fn new(subnet_id: impl Into<SubnetId>, ip_address: IpAddr) -> Self {
        Self {
            subnet_id: subnet_id.into(),
            ip_address,
        }
    }
}

/// A port bound to a host, as reported by the control plane.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct HostPort {
    pub id: PortId,
    pub device_owner: String,
    #[serde(default)]
    pub mac_address: Option<Mac>,
    #[serde(default)]
    pub fixed_ips: Vec<FixedIp>,
}
