// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Shapes of the rules installed by the agent.

use crate::tables::{
    CANARY_TABLE, DVR_NOT_LEARN, DVR_NOT_LEARN_VLAN, DVR_PROCESS, DVR_PROCESS_VLAN,
    DVR_TO_SRC_MAC, DVR_TO_SRC_MAC_VLAN, ICMPV6_TYPE_RA, LEARN_FROM_TUN, LOCAL_SWITCHING,
    LOCAL_VLAN_TRANSLATION, PATCH_LV_TO_TUN,
};
use net::eth::mac::Mac;
use net::vlan::Vid;
use openflow::{Action, Flow, FlowMatch, OfPort, Proto, TableId};
use rpc::{IpVersion, SubnetInfo};

fn from_port(in_port: OfPort) -> FlowMatch {
    FlowMatch {
        in_port: Some(in_port),
        ..Default::default()
    }
}

fn from_mac(dl_src: Mac) -> FlowMatch {
    FlowMatch {
        dl_src: Some(dl_src),
        ..Default::default()
    }
}

fn from_port_and_mac(in_port: OfPort, dl_src: Mac) -> FlowMatch {
    FlowMatch {
        in_port: Some(in_port),
        dl_src: Some(dl_src),
        ..Default::default()
    }
}

/// Learning switch behavior of the integration bridge.
pub(crate) fn normal_switching() -> Flow {
    Flow::new(LOCAL_SWITCHING, 1, FlowMatch::any(), [Action::Normal])
}

/// Defaults of the integration bridge, `int_ofports` being its patches to physical bridges.
pub(crate) fn integration_defaults(int_ofports: impl IntoIterator<Item = OfPort>) -> Vec<Flow> {
    let mut flows = vec![
        Flow::new(CANARY_TABLE, 0, FlowMatch::any(), [Action::Drop]),
        Flow::new(DVR_TO_SRC_MAC, 1, FlowMatch::any(), [Action::Drop]),
        Flow::new(DVR_TO_SRC_MAC_VLAN, 1, FlowMatch::any(), [Action::Drop]),
        normal_switching(),
    ];
    flows.extend(
        int_ofports
            .into_iter()
            .map(|ofport| Flow::new(LOCAL_SWITCHING, 2, from_port(ofport), [Action::Drop])),
    );
    flows
}

pub(crate) fn tunnel_defaults(patch_int_ofport: OfPort) -> Vec<Flow> {
    vec![
        Flow::new(
            TableId::DEFAULT,
            1,
            from_port(patch_int_ofport),
            [Action::Resubmit(DVR_PROCESS)],
        ),
        Flow::new(
            DVR_NOT_LEARN,
            0,
            FlowMatch::any(),
            [Action::Resubmit(LEARN_FROM_TUN)],
        ),
        Flow::new(
            DVR_PROCESS,
            0,
            FlowMatch::any(),
            [Action::Resubmit(PATCH_LV_TO_TUN)],
        ),
    ]
}

pub(crate) fn physical_defaults(phys_ofport: OfPort) -> Vec<Flow> {
    vec![
        Flow::new(
            TableId::DEFAULT,
            2,
            from_port(phys_ofport),
            [Action::Resubmit(DVR_PROCESS_VLAN)],
        ),
        Flow::new(
            TableId::DEFAULT,
            1,
            FlowMatch::any(),
            [Action::Resubmit(DVR_NOT_LEARN_VLAN)],
        ),
        Flow::new(
            DVR_PROCESS_VLAN,
            0,
            FlowMatch::any(),
            [Action::Resubmit(LOCAL_VLAN_TRANSLATION)],
        ),
        Flow::new(
            LOCAL_VLAN_TRANSLATION,
            2,
            from_port(phys_ofport),
            [Action::Drop],
        ),
        Flow::new(DVR_NOT_LEARN_VLAN, 1, FlowMatch::any(), [Action::Normal]),
    ]
}

// Rules keeping frames routed by a remote host's DVR away from the learning switches.

/// Integration bridge, frames coming from a physical bridge.
pub(crate) fn remote_mac_from_physical(int_ofport: OfPort, mac: Mac) -> Flow {
    Flow::new(
        LOCAL_SWITCHING,
        4,
        from_port_and_mac(int_ofport, mac),
        [Action::Resubmit(DVR_TO_SRC_MAC_VLAN)],
    )
}

pub(crate) fn remote_mac_on_physical(phys_ofport: OfPort, mac: Mac) -> Flow {
    Flow::new(
        DVR_NOT_LEARN_VLAN,
        2,
        from_mac(mac),
        [Action::Output(phys_ofport)],
    )
}

/// Integration bridge, frames coming from the tunnel bridge.
pub(crate) fn remote_mac_from_tunnel(patch_tun_ofport: OfPort, mac: Mac) -> Flow {
    Flow::new(
        LOCAL_SWITCHING,
        2,
        from_port_and_mac(patch_tun_ofport, mac),
        [Action::Resubmit(DVR_TO_SRC_MAC)],
    )
}

pub(crate) fn remote_mac_on_tunnel(patch_int_ofport: OfPort, mac: Mac) -> Flow {
    Flow::new(
        DVR_NOT_LEARN,
        1,
        from_mac(mac),
        [Action::Output(patch_int_ofport)],
    )
}

/// Delivery of a routed frame to a local port: the frame leaves untagged, as if sent by the
/// subnet's gateway.
pub(crate) fn to_local_port(
    table: TableId,
    vlan: Vid,
    port_mac: Mac,
    gateway_mac: Mac,
    ofport: OfPort,
) -> Flow {
    Flow::new(
        table,
        4,
        to_local_port_pattern(vlan, port_mac),
        [
            Action::StripVlan,
            Action::ModDlSrc(gateway_mac),
            Action::Output(ofport),
        ],
    )
}

pub(crate) fn to_local_port_pattern(vlan: Vid, port_mac: Mac) -> FlowMatch {
    FlowMatch {
        dl_vlan: Some(vlan),
        dl_dst: Some(port_mac),
        ..Default::default()
    }
}

/// Where the rules guarding a router interface live.
#[derive(Clone, Copy, Debug)]
pub(crate) struct GuardTables {
    pub(crate) process: TableId,
    pub(crate) next: TableId,
}

pub(crate) const TUNNEL_GUARD: GuardTables = GuardTables {
    process: DVR_PROCESS,
    next: PATCH_LV_TO_TUN,
};

pub(crate) const VLAN_GUARD: GuardTables = GuardTables {
    process: DVR_PROCESS_VLAN,
    next: LOCAL_VLAN_TRANSLATION,
};

/// Rules guarding the router interface `router_mac` of `subnet`, on the bridge where traffic
/// of the network leaves the host.
///
/// Every host answers for the gateway: its ARP replies (or router advertisements) must not
/// leave the host, nor may frames for the local copy of the interface enter it. Frames the
/// interface routes leave with the host's DVR MAC as source.
pub(crate) fn router_guards(
    tables: GuardTables,
    local_vlan: Vid,
    subnet: &SubnetInfo,
    router_mac: Mac,
    dvr_mac: Mac,
) -> Vec<Flow> {
    let on_vlan = FlowMatch {
        dl_vlan: Some(local_vlan),
        ..Default::default()
    };
    let gateway = match subnet.ip_version {
        IpVersion::V4 => FlowMatch {
            proto: Some(Proto::Arp),
            nw_dst: Some(subnet.gateway_ip),
            ..on_vlan.clone()
        },
        IpVersion::V6 => FlowMatch {
            proto: Some(Proto::Icmp6),
            icmp_type: Some(ICMPV6_TYPE_RA),
            dl_src: Some(subnet.gateway_mac),
            ..on_vlan.clone()
        },
    };
    vec![
        Flow::new(tables.process, 3, gateway, [Action::Drop]),
        Flow::new(
            tables.process,
            2,
            FlowMatch {
                dl_dst: Some(router_mac),
                ..on_vlan.clone()
            },
            [Action::Drop],
        ),
        Flow::new(
            tables.process,
            1,
            FlowMatch {
                dl_src: Some(router_mac),
                ..on_vlan
            },
            [Action::ModDlSrc(dvr_mac), Action::Resubmit(tables.next)],
        ),
    ]
}
