// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Binding ports to, and unbinding them from, distributed routers.
//!
//! Every control plane and bridge query happens before the registries are touched, so a
//! rejected or failed query leaves the agent as it was. Failures of the bridges while rules are
//! being installed are not rolled back: the next full resync repairs them.

use super::DvrAgent;
use crate::bridges::Bridges;
use crate::errors::DvrError;
use crate::flows::{self, GuardTables, TUNNEL_GUARD, VLAN_GUARD};
use crate::mode::Mode;
use crate::network::{LocalVlanMapping, Segment};
use crate::port::{DeviceOwner, OvsPort};
use crate::subnet::LocalDvrSubnetMapping;
use crate::tables::{DVR_TO_SRC_MAC, DVR_TO_SRC_MAC_VLAN};
use net::eth::mac::Mac;
use net::vlan::Vid;
use openflow::{Bridge, OfPort, TableId, VifPort};
use rpc::{ControlPlane, FixedIp, PortId, SubnetId, SubnetInfo};
use tracing::{debug, error};

/// Where the rules of a network go.
#[derive(Clone, Debug)]
struct Routing {
    /// Integration bridge table delivering routed frames to local ports.
    mac_table: TableId,
    /// VLAN of routed frames in `mac_table`.
    vlan: Vid,
    local_vlan: Vid,
    guard: Guard,
}

/// The bridge guarding the router interfaces of a network.
#[derive(Clone, Debug)]
enum Guard {
    Physical(String),
    Tunnel,
}

impl Guard {
    fn tables(&self) -> GuardTables {
        match self {
            Guard::Physical(_) => VLAN_GUARD,
            Guard::Tunnel => TUNNEL_GUARD,
        }
    }

    fn bridge<'a, B>(&self, bridges: &'a mut Bridges<B>) -> Option<&'a mut B> {
        match self {
            Guard::Physical(physnet) => bridges.phys.get_mut(physnet).map(|pb| &mut pb.bridge),
            Guard::Tunnel => bridges.tun.as_mut().map(|tun| &mut tun.bridge),
        }
    }
}

impl Routing {
    /// The tables used for `lvm`, whether or not its guard bridge is currently attached.
    fn of(lvm: &LocalVlanMapping) -> Option<Routing> {
        match &lvm.segment {
            Segment::Vlan {
                physical_network,
                vid,
            } => Some(Routing {
                mac_table: DVR_TO_SRC_MAC_VLAN,
                vlan: *vid,
                local_vlan: lvm.local_vlan,
                guard: Guard::Physical(physical_network.clone()),
            }),
            Segment::Tunnel { .. } => Some(Routing {
                mac_table: DVR_TO_SRC_MAC,
                vlan: lvm.local_vlan,
                local_vlan: lvm.local_vlan,
                guard: Guard::Tunnel,
            }),
            Segment::Flat { .. } | Segment::Local => None,
        }
    }
}

fn port_id(port: &VifPort) -> PortId {
    PortId::from(port.vif_id.as_str())
}

impl<B: Bridge, C: ControlPlane> DvrAgent<B, C> {
    /// Route `port` of network `lvm`, according to its `device_owner`.
    ///
    /// Rejections (a second router interface on a subnet, a centralized SNAT port moving to
    /// another subnet) are logged and returned as errors, with nothing changed.
    ///
    /// A router interface is a duplicate when its subnet is already owned by another router
    /// interface. A subnet known only through its centralized SNAT port is taken over, keeping
    /// the SNAT port.
    pub fn bind_port_to_dvr(
        &mut self,
        port: &VifPort,
        lvm: &LocalVlanMapping,
        fixed_ips: &[FixedIp],
        device_owner: &str,
    ) -> Result<(), DvrError> {
        let Mode::Distributed(dvr_mac) = self.mode else {
            return Ok(());
        };
        let Some(routing) = self.routing(lvm)? else {
            return Ok(());
        };
        match DeviceOwner::from(device_owner) {
            DeviceOwner::RouterInterface => {
                self.bind_distributed_router_interface_port(port, &routing, fixed_ips, dvr_mac)
            }
            DeviceOwner::DvrServiced => self.bind_port_on_dvr_subnet(port, &routing, fixed_ips),
            DeviceOwner::CentralizedSnat => {
                self.bind_centralized_snat_port_on_dvr_subnet(port, &routing, fixed_ips)
            }
            DeviceOwner::Other => {
                debug!("Port {} ({device_owner}) is not routed", port.vif_id);
                Ok(())
            }
        }
    }

    /// Undo what binding `port` did. Ports the agent does not know are ignored.
    ///
    /// The registries are always cleaned up. Rules on a bridge which is no longer attached (a
    /// tunnel bridge dropped by [`DvrAgent::reset_ovs_parameters`], an unmapped physical network)
    /// are left alone.
    pub fn unbind_port_from_dvr(
        &mut self,
        port: &VifPort,
        lvm: &LocalVlanMapping,
    ) -> Result<(), DvrError> {
        let Mode::Distributed(dvr_mac) = self.mode else {
            return Ok(());
        };
        let Some(ovs_port) = self.local_ports.get(&port_id(port)).cloned() else {
            debug!("Port {} is not routed, nothing to unbind", port.vif_id);
            return Ok(());
        };
        let routing = Routing::of(lvm);
        if routing.is_none() {
            debug!("No rules to delete for port {} on {lvm}", port.vif_id);
        }
        let routing = routing.as_ref();
        match ovs_port.device_owner() {
            DeviceOwner::RouterInterface => {
                self.unbind_distributed_router_interface_port(&ovs_port, routing, dvr_mac)
            }
            DeviceOwner::DvrServiced | DeviceOwner::Other => {
                self.unbind_port_on_dvr_subnet(&ovs_port, routing)
            }
            DeviceOwner::CentralizedSnat => {
                self.unbind_centralized_snat_port_on_dvr_subnet(&ovs_port, routing)
            }
        }
    }

    /// Where binding a port of `lvm` installs its rules, if the network is routed here.
    fn routing(&self, lvm: &LocalVlanMapping) -> Result<Option<Routing>, DvrError> {
        match &lvm.segment {
            Segment::Vlan {
                physical_network, ..
            } if self.bridges.physical(physical_network).is_none() => {
                error!("No bridge mapped to physical network {physical_network}");
                Err(DvrError::UnknownPhysicalNetwork(physical_network.clone()))
            }
            Segment::Tunnel { .. } if !self.bridges.tunneling() => {
                debug!("Not routing tunnel network ({lvm}), tunneling is disabled");
                Ok(None)
            }
            segment => {
                let routing = Routing::of(lvm);
                if routing.is_none() {
                    debug!("Not routing {} network ({lvm})", segment.network_type());
                }
                Ok(routing)
            }
        }
    }

    fn fetch_subnet(&self, subnet: &SubnetId) -> Result<SubnetInfo, DvrError> {
        if let Some(info) = self.control_plane.get_subnet_for_dvr(subnet)? {
            return Ok(info);
        }
        error!("Unable to retrieve subnet information for subnet {subnet}");
        Err(DvrError::NoSubnetInfo(subnet.clone()))
    }

    /// The serviced ports of `subnet` living on the integration bridge.
    fn local_serviced_ports(&self, subnet: &SubnetId) -> Result<Vec<(PortId, VifPort)>, DvrError> {
        let mut ports = Vec::new();
        for host_port in self
            .control_plane
            .get_ports_on_host_by_subnet(&self.host, subnet)?
        {
            if DeviceOwner::from(host_port.device_owner.as_str()) != DeviceOwner::DvrServiced {
                continue;
            }
            match self.bridges.int_br.get_vif_port_by_id(host_port.id.as_str())? {
                Some(vif) => ports.push((host_port.id, vif)),
                None => debug!(
                    "Port {} is not on {}, skipping",
                    host_port.id,
                    self.bridges.int_br.name()
                ),
            }
        }
        Ok(ports)
    }

    fn bind_distributed_router_interface_port(
        &mut self,
        port: &VifPort,
        routing: &Routing,
        fixed_ips: &[FixedIp],
        dvr_mac: Mac,
    ) -> Result<(), DvrError> {
        let router_id = port_id(port);
        let Some(fixed_ip) = fixed_ips.first() else {
            error!("Router interface {router_id} has no fixed ip");
            return Err(DvrError::NoFixedIps(router_id));
        };
        let subnet_id = &fixed_ip.subnet_id;
        let subnet = match self.local_dvr_map.get(subnet_id) {
            Some(ldm) if ldm.is_dvr_owned() => {
                error!("Duplicate DVR router interface detected for subnet {subnet_id}");
                return Err(DvrError::DuplicateRouterInterface {
                    subnet: subnet_id.clone(),
                });
            }
            Some(ldm) => ldm.subnet().clone(),
            None => self.fetch_subnet(subnet_id)?,
        };
        let serviced = self.local_serviced_ports(subnet_id)?;

        debug!("Binding router interface {router_id} to subnet {subnet_id}");
        let ldm = self
            .local_dvr_map
            .entry(subnet_id.clone())
            .or_insert_with(|| LocalDvrSubnetMapping::new(subnet.clone()));
        ldm.set_dvr_owned(true);
        for (id, vif) in serviced {
            debug!("Routing port {id} (ofport {}) on subnet {subnet_id}", vif.ofport);
            self.local_ports
                .entry(id.clone())
                .or_insert_with(|| {
                    OvsPort::new(id.clone(), vif.ofport, vif.vif_mac, DeviceOwner::DvrServiced)
                })
                .add_subnet(subnet_id.clone());
            ldm.add_compute_ofport(id, vif.ofport);
            self.bridges.int_br.add_flow(&flows::to_local_port(
                routing.mac_table,
                routing.vlan,
                vif.vif_mac,
                subnet.gateway_mac,
                vif.ofport,
            ))?;
        }
        if let Some(br) = routing.guard.bridge(&mut self.bridges) {
            let guards = flows::router_guards(
                routing.guard.tables(),
                routing.local_vlan,
                &subnet,
                port.vif_mac,
                dvr_mac,
            );
            for flow in &guards {
                br.add_flow(flow)?;
            }
        }
        self.local_ports
            .entry(router_id.clone())
            .or_insert_with(|| {
                OvsPort::new(
                    router_id.clone(),
                    port.ofport,
                    port.vif_mac,
                    DeviceOwner::RouterInterface,
                )
            })
            .add_subnet(subnet_id.clone());
        Ok(())
    }

    fn bind_port_on_dvr_subnet(
        &mut self,
        port: &VifPort,
        routing: &Routing,
        fixed_ips: &[FixedIp],
    ) -> Result<(), DvrError> {
        let id = port_id(port);
        for fixed_ip in fixed_ips {
            let subnet_id = &fixed_ip.subnet_id;
            let Some(ldm) = self
                .local_dvr_map
                .get_mut(subnet_id)
                .filter(|ldm| ldm.is_dvr_owned())
            else {
                debug!("Subnet {subnet_id} of port {id} is not routed here");
                continue;
            };
            debug!("Routing port {id} (ofport {}) on subnet {subnet_id}", port.ofport);
            let gateway_mac = ldm.subnet().gateway_mac;
            ldm.add_compute_ofport(id.clone(), port.ofport);
            self.local_ports
                .entry(id.clone())
                .or_insert_with(|| {
                    OvsPort::new(id.clone(), port.ofport, port.vif_mac, DeviceOwner::DvrServiced)
                })
                .add_subnet(subnet_id.clone());
            self.bridges.int_br.add_flow(&flows::to_local_port(
                routing.mac_table,
                routing.vlan,
                port.vif_mac,
                gateway_mac,
                port.ofport,
            ))?;
        }
        Ok(())
    }

    fn bind_centralized_snat_port_on_dvr_subnet(
        &mut self,
        port: &VifPort,
        routing: &Routing,
        fixed_ips: &[FixedIp],
    ) -> Result<(), DvrError> {
        let id = port_id(port);
        let Some(fixed_ip) = fixed_ips.first() else {
            error!("Centralized-SNAT port {id} has no fixed ip");
            return Err(DvrError::NoFixedIps(id));
        };
        let subnet_id = &fixed_ip.subnet_id;
        if let Some(existing) = self.local_ports.get(&id) {
            if existing.subnets().contains(subnet_id) {
                debug!("Centralized-SNAT port {id} already bound to subnet {subnet_id}");
                return Ok(());
            }
            if let Some(bound) = existing.subnets().first() {
                error!("Centralized-SNAT port {id} already seen on a different subnet {bound}");
                return Err(DvrError::CsnatConflict {
                    port: id.clone(),
                    subnet: subnet_id.clone(),
                    bound: bound.clone(),
                });
            }
        }
        let subnet = match self.local_dvr_map.get(subnet_id) {
            Some(ldm) => ldm.subnet().clone(),
            None => self.fetch_subnet(subnet_id)?,
        };

        debug!(
            "Binding centralized-SNAT port {id} (ofport {}) to subnet {subnet_id}",
            port.ofport
        );
        self.local_dvr_map
            .entry(subnet_id.clone())
            .or_insert_with(|| LocalDvrSubnetMapping::new(subnet.clone()))
            .set_csnat_ofport(port.ofport);
        self.local_ports
            .entry(id.clone())
            .or_insert_with(|| {
                OvsPort::new(
                    id.clone(),
                    port.ofport,
                    port.vif_mac,
                    DeviceOwner::CentralizedSnat,
                )
            })
            .add_subnet(subnet_id.clone());
        self.bridges.int_br.add_flow(&flows::to_local_port(
            routing.mac_table,
            routing.vlan,
            port.vif_mac,
            subnet.gateway_mac,
            port.ofport,
        ))?;
        Ok(())
    }

    fn unbind_distributed_router_interface_port(
        &mut self,
        router: &OvsPort,
        routing: Option<&Routing>,
        dvr_mac: Mac,
    ) -> Result<(), DvrError> {
        for subnet_id in router.subnets() {
            let Some(ldm) = self.local_dvr_map.get_mut(subnet_id) else {
                continue;
            };
            debug!("Unbinding router interface {} from subnet {subnet_id}", router.id());
            let subnet = ldm.subnet().clone();
            for (compute_id, _) in ldm.remove_all_compute_ofports() {
                let Some(compute) = self.local_ports.get_mut(&compute_id) else {
                    continue;
                };
                compute.remove_subnet(subnet_id);
                let mac = compute.mac();
                if compute.subnets().is_empty() {
                    self.local_ports.remove(&compute_id);
                }
                if let Some(routing) = routing {
                    self.bridges.int_br.delete_flows(
                        routing.mac_table,
                        &flows::to_local_port_pattern(routing.vlan, mac),
                    )?;
                }
            }
            ldm.set_dvr_owned(false);
            if !ldm.is_needed() {
                debug!("Forgetting subnet {subnet_id}");
                self.local_dvr_map.remove(subnet_id);
            }
            let Some(routing) = routing else {
                continue;
            };
            let Some(br) = routing.guard.bridge(&mut self.bridges) else {
                debug!("Guard bridge of subnet {subnet_id} is gone, leaving its rules");
                continue;
            };
            let guards = flows::router_guards(
                routing.guard.tables(),
                routing.local_vlan,
                &subnet,
                router.mac(),
                dvr_mac,
            );
            for flow in &guards {
                br.delete_flows(flow.table, &flow.matches)?;
            }
        }
        self.local_ports.remove(router.id());
        Ok(())
    }

    fn unbind_port_on_dvr_subnet(
        &mut self,
        port: &OvsPort,
        routing: Option<&Routing>,
    ) -> Result<(), DvrError> {
        for subnet_id in port.subnets() {
            let Some(ldm) = self.local_dvr_map.get_mut(subnet_id) else {
                continue;
            };
            debug!("Unbinding port {} from subnet {subnet_id}", port.id());
            ldm.remove_compute_ofport(port.id());
            if let Some(routing) = routing {
                self.bridges.int_br.delete_flows(
                    routing.mac_table,
                    &flows::to_local_port_pattern(routing.vlan, port.mac()),
                )?;
            }
        }
        self.local_ports.remove(port.id());
        Ok(())
    }

    fn unbind_centralized_snat_port_on_dvr_subnet(
        &mut self,
        port: &OvsPort,
        routing: Option<&Routing>,
    ) -> Result<(), DvrError> {
        for subnet_id in port.subnets() {
            let Some(ldm) = self.local_dvr_map.get_mut(subnet_id) else {
                continue;
            };
            debug!("Unbinding centralized-SNAT port {} from subnet {subnet_id}", port.id());
            ldm.set_csnat_ofport(OfPort::INVALID);
            if let Some(routing) = routing {
                self.bridges.int_br.delete_flows(
                    routing.mac_table,
                    &flows::to_local_port_pattern(routing.vlan, port.mac()),
                )?;
            }
            if !ldm.is_needed() {
                debug!("Forgetting subnet {subnet_id}");
                self.local_dvr_map.remove(subnet_id);
            }
        }
        self.local_ports.remove(port.id());
        Ok(())
    }
}
