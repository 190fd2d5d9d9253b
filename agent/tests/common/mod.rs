// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

#![allow(dead_code)]

use dvr_agent::{Bridges, DvrAgent, LocalVlanMapping, Segment, TunnelType};
use net::eth::mac::Mac;
use net::vlan::Vid;
use openflow::{Flow, MemoryBridge, OfPort, VifPort};
use rpc::{
    ControlPlaneSnapshot, DvrMacDetails, FixedIp, HostBinding, HostPort, IpVersion, PortId,
    StaticControlPlane, SubnetId, SubnetInfo,
};

pub type TestAgent = DvrAgent<MemoryBridge, StaticControlPlane>;

pub const HOST: &str = "compute-1";
pub const OWN_MAC: Mac = Mac([0xfa, 0x16, 0x3f, 0, 0, 1]);
pub const GATEWAY_MAC: Mac = Mac([0xaa; 6]);

pub const PATCH_INT: OfPort = OfPort::new(1);
pub const PATCH_TUN: OfPort = OfPort::new(2);
pub const INT_OFPORT: OfPort = OfPort::new(3);
pub const PHYS_OFPORT: OfPort = OfPort::new(4);

pub fn mac(last: u8) -> Mac {
    Mac([0xfa, 0x16, 0x3e, 0, 0, last])
}

pub fn subnet_v4(id: &str) -> SubnetInfo {
    SubnetInfo {
        id: SubnetId::from(id),
        ip_version: IpVersion::V4,
        cidr: Some("10.0.0.0/24".to_string()),
        gateway_ip: "10.0.0.1".parse().unwrap(),
        gateway_mac: GATEWAY_MAC,
    }
}

pub fn subnet_v6(id: &str) -> SubnetInfo {
    SubnetInfo {
        id: SubnetId::from(id),
        ip_version: IpVersion::V6,
        cidr: Some("2001:db8::/64".to_string()),
        gateway_ip: "2001:db8::1".parse().unwrap(),
        gateway_mac: GATEWAY_MAC,
    }
}

pub fn snapshot() -> ControlPlaneSnapshot {
    ControlPlaneSnapshot {
        dvr_macs: vec![DvrMacDetails {
            host: HOST.to_string(),
            mac_address: OWN_MAC,
        }],
        subnets: vec![subnet_v4("subnet-s"), subnet_v6("subnet-v6")],
        ports: vec![],
    }
}

/// A compute port of `subnet` bound to `host`, as the control plane reports it.
pub fn host_port(host: &str, id: &str, subnet: &str, addr: &str) -> HostBinding {
    HostBinding {
        host: host.to_string(),
        port: HostPort {
            id: PortId::from(id),
            device_owner: "compute:nova".to_string(),
            mac_address: None,
            fixed_ips: vec![FixedIp::new(subnet, addr.parse().unwrap())],
        },
    }
}

/// An agent with a tunnel bridge and one physical network, not started.
pub fn agent_with(snapshot: ControlPlaneSnapshot) -> TestAgent {
    let bridges = Bridges::new(MemoryBridge::new("br-int"))
        .with_tunnel(MemoryBridge::new("br-tun"), PATCH_INT, PATCH_TUN)
        .with_physical(
            "physnet1",
            MemoryBridge::new("br-eth1"),
            INT_OFPORT,
            PHYS_OFPORT,
        );
    DvrAgent::new(HOST, bridges, StaticControlPlane::new(snapshot))
}

/// A started agent, with the bridges' call logs cleared.
pub fn started(snapshot: ControlPlaneSnapshot) -> TestAgent {
    let mut agent = agent_with(snapshot);
    agent.start().unwrap();
    assert!(agent.in_distributed_mode());
    clear_calls(&mut agent);
    agent
}

pub fn clear_calls(agent: &mut TestAgent) {
    let bridges = agent.bridges_mut();
    bridges.int_br.clear_calls();
    if let Some(tun) = bridges.tun.as_mut() {
        tun.bridge.clear_calls();
    }
    for pb in bridges.phys.values_mut() {
        pb.bridge.clear_calls();
    }
}

pub fn call_count(agent: &TestAgent) -> usize {
    agent.bridges().iter().map(|br| br.calls().len()).sum()
}

pub fn int_br(agent: &TestAgent) -> &MemoryBridge {
    &agent.bridges().int_br
}

pub fn tun_br(agent: &TestAgent) -> &MemoryBridge {
    &agent.bridges().tun.as_ref().unwrap().bridge
}

pub fn phys_br(agent: &TestAgent) -> &MemoryBridge {
    &agent.bridges().physical("physnet1").unwrap().bridge
}

/// Installed rules, in a stable order.
pub fn sorted(bridge: &MemoryBridge) -> Vec<Flow> {
    let mut flows = bridge.flows().to_vec();
    flows.sort();
    flows
}

pub fn tunnel_lvm() -> LocalVlanMapping {
    LocalVlanMapping::new(
        Vid::new(5).unwrap(),
        Segment::Tunnel {
            kind: TunnelType::Vxlan,
            tunnel_id: 1001,
        },
    )
}

pub fn vlan_lvm() -> LocalVlanMapping {
    LocalVlanMapping::new(
        Vid::new(6).unwrap(),
        Segment::Vlan {
            physical_network: "physnet1".to_string(),
            vid: Vid::new(100).unwrap(),
        },
    )
}

pub fn vif(id: &str, ofport: i32, mac: Mac) -> VifPort {
    VifPort::new(format!("tap-{id}"), id, ofport, mac)
}

pub fn fixed_ip(subnet: &str, addr: &str) -> Vec<FixedIp> {
    vec![FixedIp::new(subnet, addr.parse().unwrap())]
}
