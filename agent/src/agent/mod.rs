// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! The DVR synchronization engine.

mod binding;
mod bootstrap;

use crate::bridges::{Bridges, TunnelBridge};
use crate::errors::DvrError;
use crate::mode::Mode;
use crate::network::TunnelType;
use crate::port::OvsPort;
use crate::subnet::LocalDvrSubnetMapping;
use crate::tables::{DVR_NOT_LEARN, LEARN_FROM_TUN};
use config::AgentConfig;
use net::eth::mac::Mac;
use net::vlan::Vid;
use openflow::{Action, Bridge, Flow, FlowMatch, OfPort};
use rpc::{ControlPlane, Fixed, Immediate, PortId, RetryPolicy, SubnetId};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Programs the bridges of a host so that traffic between subnets of a distributed router is
/// routed locally.
///
/// Every entry point except [`DvrAgent::process_tunneled_network`] is a no-op until the agent
/// got a DVR MAC from the control plane (see [`DvrAgent::get_dvr_mac_address`]).
#[derive(Debug)]
pub struct DvrAgent<B, C> {
    host: String,
    control_plane: C,
    bridges: Bridges<B>,
    retry: RetryPolicy,
    distributed_routing: bool,
    mode: Mode,
    local_ports: BTreeMap<PortId, OvsPort>,
    local_dvr_map: BTreeMap<SubnetId, LocalDvrSubnetMapping>,
    registered_dvr_macs: BTreeSet<Mac>,
}

impl<B: Bridge, C: ControlPlane> DvrAgent<B, C> {
    /// A new agent for `host`, with distributed routing enabled and the default retry policy.
    #[must_use]
    pub fn new(host: impl Into<String>, bridges: Bridges<B>, control_plane: C) -> Self {
        Self {
            host: host.into(),
            control_plane,
            bridges,
            retry: RetryPolicy::default(),
            distributed_routing: true,
            mode: Mode::NonDistributed,
            local_ports: BTreeMap::new(),
            local_dvr_map: BTreeMap::new(),
            registered_dvr_macs: BTreeSet::new(),
        }
    }

    /// An agent set up after `config`, `open` being handed the name of each bridge to program.
    pub fn from_config(
        config: &AgentConfig,
        open: impl FnMut(&str) -> B,
        control_plane: C,
    ) -> Self {
        let backoff = config.mac_fetch_backoff();
        let retry = if backoff.is_zero() {
            RetryPolicy::new(config.mac_fetch_attempts(), Immediate)
        } else {
            RetryPolicy::new(config.mac_fetch_attempts(), Fixed(backoff))
        };
        Self::new(
            config.host.as_str(),
            Bridges::from_config(config, open),
            control_plane,
        )
        .with_retry_policy(retry)
        .with_distributed_routing(config.enable_distributed_routing)
    }

    #[must_use]
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Without distributed routing, [`DvrAgent::start`] never asks for a DVR MAC.
    #[must_use]
    pub fn with_distributed_routing(mut self, enabled: bool) -> Self {
        self.distributed_routing = enabled;
        self
    }

    /// Fetch the DVR MAC of the host (if distributed routing is enabled) and bootstrap the
    /// bridges.
    pub fn start(&mut self) -> Result<(), DvrError> {
        if self.distributed_routing {
            self.get_dvr_mac_address()?;
        } else {
            debug!("Distributed routing disabled, not fetching a DVR MAC");
        }
        self.setup_dvr_flows()
    }

    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    #[must_use]
    pub fn mode(&self) -> Mode {
        self.mode
    }

    #[must_use]
    pub fn in_distributed_mode(&self) -> bool {
        self.mode.is_distributed()
    }

    #[must_use]
    pub fn local_ports(&self) -> &BTreeMap<PortId, OvsPort> {
        &self.local_ports
    }

    #[must_use]
    pub fn local_port(&self, port: &PortId) -> Option<&OvsPort> {
        self.local_ports.get(port)
    }

    #[must_use]
    pub fn local_dvr_map(&self) -> &BTreeMap<SubnetId, LocalDvrSubnetMapping> {
        &self.local_dvr_map
    }

    #[must_use]
    pub fn subnet_mapping(&self, subnet: &SubnetId) -> Option<&LocalDvrSubnetMapping> {
        self.local_dvr_map.get(subnet)
    }

    /// DVR MACs of the other hosts of the fleet.
    #[must_use]
    pub fn registered_dvr_macs(&self) -> &BTreeSet<Mac> {
        &self.registered_dvr_macs
    }

    #[must_use]
    pub fn bridges(&self) -> &Bridges<B> {
        &self.bridges
    }

    pub fn bridges_mut(&mut self) -> &mut Bridges<B> {
        &mut self.bridges
    }

    #[must_use]
    pub fn control_plane(&self) -> &C {
        &self.control_plane
    }

    pub fn control_plane_mut(&mut self) -> &mut C {
        &mut self.control_plane
    }

    /// Swap the integration and tunnel bridges, e.g. after the switch restarted.
    /// Passing no tunnel bridge disables tunneling.
    pub fn reset_ovs_parameters(
        &mut self,
        int_br: B,
        tun_br: Option<B>,
        patch_int_ofport: OfPort,
        patch_tun_ofport: OfPort,
    ) {
        debug!("Resetting bridges to {}", int_br.name());
        self.bridges.int_br = int_br;
        self.bridges.tun = tun_br.map(|bridge| TunnelBridge {
            bridge,
            patch_int_ofport,
            patch_tun_ofport,
        });
    }

    /// Forget every port, subnet and remote DVR MAC, ahead of a full resync.
    pub fn reset_dvr_parameters(&mut self) {
        debug!(
            "Forgetting {} ports, {} subnets and {} remote DVR MACs",
            self.local_ports.len(),
            self.local_dvr_map.len(),
            self.registered_dvr_macs.len()
        );
        self.local_ports.clear();
        self.local_dvr_map.clear();
        self.registered_dvr_macs.clear();
    }

    /// Steer traffic of tunnel `segmentation_id` to `local_vlan` on the tunnel bridge.
    ///
    /// In distributed mode, the traffic first goes through the table keeping remote DVR MACs
    /// from being learnt.
    pub fn process_tunneled_network(
        &mut self,
        network_type: TunnelType,
        local_vlan: Vid,
        segmentation_id: u32,
    ) -> Result<(), DvrError> {
        let Some(tun) = self.bridges.tun.as_mut() else {
            debug!("No tunnel bridge, ignoring {network_type} network {segmentation_id}");
            return Ok(());
        };
        let next = if self.mode.is_distributed() {
            DVR_NOT_LEARN
        } else {
            LEARN_FROM_TUN
        };
        let flow = Flow::new(
            network_type.tun_to_lv_table(),
            1,
            FlowMatch {
                tun_id: Some(u64::from(segmentation_id)),
                ..Default::default()
            },
            [Action::ModVlanVid(local_vlan), Action::Resubmit(next)],
        );
        debug!(
            "{}: {network_type} network {segmentation_id} on vlan {local_vlan}",
            tun.bridge.name()
        );
        tun.bridge.add_flow(&flow)?;
        Ok(())
    }
}
