// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

use crate::errors::RpcError;
use crate::types::{DvrMacDetails, HostPort, SubnetId, SubnetInfo};

/// The control plane queries the DVR agent depends on.
pub trait ControlPlane {
    /// The DVR MAC assigned to `host`.
    fn get_dvr_mac_address_by_host(&self, host: &str) -> Result<DvrMacDetails, RpcError>;

    /// The DVR MACs of every host of the fleet (including the caller's).
    fn get_dvr_mac_address_list(&self) -> Result<Vec<DvrMacDetails>, RpcError>;

    /// Details of `subnet`, or `None` if the control plane does not know it.
    fn get_subnet_for_dvr(&self, subnet: &SubnetId) -> Result<Option<SubnetInfo>, RpcError>;

    /// The DVR serviced ports bound to `host` with an address on `subnet`.
    fn get_ports_on_host_by_subnet(
        &self,
        host: &str,
        subnet: &SubnetId,
    ) -> Result<Vec<HostPort>, RpcError>;
}

impl<C: ControlPlane + ?Sized> ControlPlane for &C {
    fn get_dvr_mac_address_by_host(&self, host: &str) -> Result<DvrMacDetails, RpcError> {
        (**self).get_dvr_mac_address_by_host(host)
    }
    fn get_dvr_mac_address_list(&self) -> Result<Vec<DvrMacDetails>, RpcError> {
        (**self).get_dvr_mac_address_list()
    }
    fn get_subnet_for_dvr(&self, subnet: &SubnetId) -> Result<Option<SubnetInfo>, RpcError> {
        (**self).get_subnet_for_dvr(subnet)
    }
    fn get_ports_on_host_by_subnet(
        &self,
        host: &str,
        subnet: &SubnetId,
    ) -> Result<Vec<HostPort>, RpcError> {
        (**self).get_ports_on_host_by_subnet(host, subnet)
    }
}
