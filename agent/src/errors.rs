// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Failures of the DVR agent entry points.

use openflow::BridgeError;
use rpc::{PortId, RpcError, SubnetId};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DvrError {
    #[error(transparent)]
    Bridge(#[from] BridgeError),
    #[error(transparent)]
    Rpc(#[from] RpcError),
    /// A router interface is already bound locally for the subnet.
    #[error("Duplicate DVR router interface detected for subnet {subnet}")]
    DuplicateRouterInterface { subnet: SubnetId },
    #[error("Centralized-SNAT port {port} is already bound to subnet {bound}, refusing subnet {subnet}")]
    CsnatConflict {
        port: PortId,
        subnet: SubnetId,
        bound: SubnetId,
    },
    #[error("Unable to retrieve subnet information for subnet {0}")]
    NoSubnetInfo(SubnetId),
    #[error("Port {0} has no fixed ip")]
    NoFixedIps(PortId),
    #[error("No bridge mapped to physical network {0}")]
    UnknownPhysicalNetwork(String),
}
