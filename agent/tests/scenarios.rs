// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

mod common;

use common::*;
use dvr_agent::port::{DEVICE_OWNER_DVR_INTERFACE, DEVICE_OWNER_ROUTER_SNAT};
use dvr_agent::tables::{
    DVR_NOT_LEARN, DVR_PROCESS, DVR_PROCESS_VLAN, DVR_TO_SRC_MAC, DVR_TO_SRC_MAC_VLAN,
    ICMPV6_TYPE_RA, LOCAL_SWITCHING, LOCAL_VLAN_TRANSLATION, PATCH_LV_TO_TUN, VXLAN_TUN_TO_LV,
};
use dvr_agent::{DeviceOwner, DvrError, Mode, TunnelType};
use net::vlan::Vid;
use openflow::{Action, Flow, FlowMatch, MemoryBridge, OfPort, Proto};
use pretty_assertions::assert_eq;
use rpc::{DvrMacDetails, PortId, SubnetId};

fn subnet_s() -> SubnetId {
    SubnetId::from("subnet-s")
}

fn bind_router(agent: &mut TestAgent, id: &str, lvm: &dvr_agent::LocalVlanMapping) {
    agent
        .bind_port_to_dvr(
            &vif(id, 10, GATEWAY_MAC),
            lvm,
            &fixed_ip("subnet-s", "10.0.0.1"),
            DEVICE_OWNER_DVR_INTERFACE,
        )
        .unwrap();
}

fn compute_rule(
    table: openflow::TableId,
    vlan: u16,
    port_mac: net::eth::mac::Mac,
    ofport: i32,
) -> Flow {
    Flow::new(
        table,
        4,
        FlowMatch {
            dl_vlan: Some(Vid::new(vlan).unwrap()),
            dl_dst: Some(port_mac),
            ..Default::default()
        },
        [
            Action::StripVlan,
            Action::ModDlSrc(GATEWAY_MAC),
            Action::Output(OfPort::new(ofport)),
        ],
    )
}

#[test]
fn integration_bridge_bootstrap_is_idempotent() {
    let mut agent = started(snapshot());
    agent.setup_dvr_flows_on_integ_br().unwrap();
    let once = sorted(int_br(&agent));
    agent.setup_dvr_flows_on_integ_br().unwrap();
    assert_eq!(sorted(int_br(&agent)), once);
    let rendered: Vec<String> = once.iter().map(ToString::to_string).collect();
    assert_eq!(
        rendered,
        vec![
            "table=0,priority=1,actions=normal",
            "table=0,priority=2,in_port=3,actions=drop",
            "table=1,priority=1,actions=drop",
            "table=2,priority=1,actions=drop",
            "table=23,priority=0,actions=drop",
        ]
    );
}

#[test]
fn tunnel_and_physical_bootstrap() {
    let agent = started(snapshot());
    let tun: Vec<String> = sorted(tun_br(&agent)).iter().map(ToString::to_string).collect();
    assert_eq!(
        tun,
        vec![
            "table=0,priority=1,in_port=1,actions=resubmit(,1)",
            "table=1,priority=0,actions=resubmit(,2)",
            "table=9,priority=0,actions=resubmit(,10)",
        ]
    );
    let phys: Vec<String> = sorted(phys_br(&agent)).iter().map(ToString::to_string).collect();
    assert_eq!(
        phys,
        vec![
            "table=0,priority=1,actions=resubmit(,3)",
            "table=0,priority=2,in_port=4,actions=resubmit(,1)",
            "table=1,priority=0,actions=resubmit(,2)",
            "table=2,priority=2,in_port=4,actions=drop",
            "table=3,priority=1,actions=normal",
        ]
    );
}

#[test]
fn everything_is_a_noop_without_a_dvr_mac() {
    let mut snapshot = snapshot();
    snapshot.dvr_macs.clear();
    snapshot.ports.push(host_port(HOST, "vm-c", "subnet-s", "10.0.0.5"));
    let mut agent = agent_with(snapshot);
    agent.start().unwrap();
    assert_eq!(agent.mode(), Mode::NonDistributed);
    // the fallback learning switch rule
    assert_eq!(
        int_br(&agent).flows(),
        &[Flow::new(LOCAL_SWITCHING, 1, FlowMatch::any(), [Action::Normal])]
    );
    clear_calls(&mut agent);
    let requests = agent.control_plane().requests();

    let lvm = tunnel_lvm();
    bind_router(&mut agent, "ri-r", &lvm);
    agent
        .bind_port_to_dvr(
            &vif("vm-c", 7, mac(0xc)),
            &lvm,
            &fixed_ip("subnet-s", "10.0.0.5"),
            "compute:nova",
        )
        .unwrap();
    agent
        .unbind_port_from_dvr(&vif("ri-r", 10, GATEWAY_MAC), &lvm)
        .unwrap();
    agent.setup_dvr_flows().unwrap();
    agent
        .dvr_mac_address_update(&[DvrMacDetails {
            host: "compute-2".to_string(),
            mac_address: mac(0x22),
        }])
        .unwrap();

    assert_eq!(call_count(&agent), 0);
    assert_eq!(agent.control_plane().requests(), requests);
    assert!(agent.local_ports().is_empty());
    assert!(agent.local_dvr_map().is_empty());
    assert!(agent.registered_dvr_macs().is_empty());
}

#[test]
fn router_interface_on_tunnel_network() {
    let mut agent = started(snapshot());
    bind_router(&mut agent, "ri-r", &tunnel_lvm());

    let ldm = agent.subnet_mapping(&subnet_s()).unwrap();
    assert!(ldm.is_dvr_owned());
    assert!(ldm.compute_ports().is_empty());
    assert!(!ldm.csnat_ofport().is_valid());
    assert!(int_br(&agent).calls().is_empty());

    let lvid = Some(Vid::new(5).unwrap());
    let expected = vec![
        Flow::new(
            DVR_PROCESS,
            3,
            FlowMatch {
                dl_vlan: lvid,
                proto: Some(Proto::Arp),
                nw_dst: Some("10.0.0.1".parse().unwrap()),
                ..Default::default()
            },
            [Action::Drop],
        ),
        Flow::new(
            DVR_PROCESS,
            2,
            FlowMatch {
                dl_vlan: lvid,
                dl_dst: Some(GATEWAY_MAC),
                ..Default::default()
            },
            [Action::Drop],
        ),
        Flow::new(
            DVR_PROCESS,
            1,
            FlowMatch {
                dl_vlan: lvid,
                dl_src: Some(GATEWAY_MAC),
                ..Default::default()
            },
            [Action::ModDlSrc(OWN_MAC), Action::Resubmit(PATCH_LV_TO_TUN)],
        ),
    ];
    for flow in &expected {
        assert!(tun_br(&agent).contains(flow), "missing {flow}");
    }
    assert_eq!(tun_br(&agent).calls().len(), expected.len());
    assert!(phys_br(&agent).calls().is_empty());

    let router = agent.local_port(&PortId::from("ri-r")).unwrap();
    assert_eq!(router.device_owner(), DeviceOwner::RouterInterface);
    assert!(router.subnets().contains(&subnet_s()));
}

#[test]
fn compute_port_on_routed_subnet() {
    let mut agent = started(snapshot());
    let lvm = tunnel_lvm();
    bind_router(&mut agent, "ri-r", &lvm);
    clear_calls(&mut agent);

    agent
        .bind_port_to_dvr(
            &vif("vm-c", 7, mac(0xbb)),
            &lvm,
            &fixed_ip("subnet-s", "10.0.0.5"),
            "compute:nova",
        )
        .unwrap();

    let rule = compute_rule(DVR_TO_SRC_MAC, 5, mac(0xbb), 7);
    assert_eq!(
        int_br(&agent).calls(),
        &[openflow::BridgeCall::AddFlow(rule.clone())]
    );
    assert_eq!(
        rule.to_string(),
        "table=1,priority=4,dl_vlan=5,dl_dst=fa:16:3e:00:00:bb,actions=strip_vlan,mod_dl_src:aa:aa:aa:aa:aa:aa,output:7"
    );
    let ldm = agent.subnet_mapping(&subnet_s()).unwrap();
    assert_eq!(
        ldm.compute_ports().get(&PortId::from("vm-c")),
        Some(&OfPort::new(7))
    );
    let port = agent.local_port(&PortId::from("vm-c")).unwrap();
    assert_eq!(port.device_owner(), DeviceOwner::DvrServiced);
    assert_eq!(port.ofport(), OfPort::new(7));
}

#[test]
fn compute_port_on_unrouted_subnet_waits_for_the_router() {
    let mut snapshot = snapshot();
    snapshot.ports.push(host_port(HOST, "vm-c", "subnet-s", "10.0.0.5"));
    snapshot.ports.push(host_port(HOST, "vm-gone", "subnet-s", "10.0.0.6"));
    snapshot.ports.push(host_port("compute-2", "vm-far", "subnet-s", "10.0.0.7"));
    let mut agent = started(snapshot);
    let lvm = tunnel_lvm();

    agent
        .bind_port_to_dvr(
            &vif("vm-c", 7, mac(0xbb)),
            &lvm,
            &fixed_ip("subnet-s", "10.0.0.5"),
            "compute:nova",
        )
        .unwrap();
    assert!(agent.local_ports().is_empty());
    assert_eq!(call_count(&agent), 0);

    // the router interface picks up the local ports present on the integration bridge
    agent
        .bridges_mut()
        .int_br
        .add_vif(vif("vm-c", 7, mac(0xbb)));
    bind_router(&mut agent, "ri-r", &lvm);
    let ldm = agent.subnet_mapping(&subnet_s()).unwrap();
    let computes: Vec<&str> = ldm.compute_ports().keys().map(PortId::as_str).collect();
    assert_eq!(computes, vec!["vm-c"]);
    assert!(int_br(&agent).contains(&compute_rule(DVR_TO_SRC_MAC, 5, mac(0xbb), 7)));
    assert_eq!(int_br(&agent).calls().len(), 1);
}

#[test]
fn router_interface_bind_then_unbind_restores_registries() {
    let mut agent = started(snapshot());
    let tun_before = sorted(tun_br(&agent));
    let lvm = tunnel_lvm();
    bind_router(&mut agent, "ri-r", &lvm);
    agent
        .unbind_port_from_dvr(&vif("ri-r", 10, GATEWAY_MAC), &lvm)
        .unwrap();
    assert!(agent.subnet_mapping(&subnet_s()).is_none());
    assert!(agent.local_port(&PortId::from("ri-r")).is_none());
    assert!(agent.local_ports().is_empty());
    assert_eq!(sorted(tun_br(&agent)), tun_before);
}

#[test]
fn router_interface_unbind_takes_compute_rules_along() {
    let mut agent = started(snapshot());
    let lvm = tunnel_lvm();
    bind_router(&mut agent, "ri-r", &lvm);
    let int_before = sorted(int_br(&agent));
    for (id, ofport, last) in [("vm-1", 7, 0xb1), ("vm-2", 8, 0xb2)] {
        agent
            .bind_port_to_dvr(
                &vif(id, ofport, mac(last)),
                &lvm,
                &fixed_ip("subnet-s", "10.0.0.5"),
                "compute:nova",
            )
            .unwrap();
    }
    assert_eq!(int_br(&agent).table(DVR_TO_SRC_MAC).count(), 3);

    agent
        .unbind_port_from_dvr(&vif("ri-r", 10, GATEWAY_MAC), &lvm)
        .unwrap();
    assert_eq!(sorted(int_br(&agent)), int_before);
    assert!(agent.local_ports().is_empty());

    // the compute ports are gone already
    clear_calls(&mut agent);
    agent
        .unbind_port_from_dvr(&vif("vm-1", 7, mac(0xb1)), &lvm)
        .unwrap();
    assert_eq!(call_count(&agent), 0);
}

#[test]
fn compute_port_unbind() {
    let mut agent = started(snapshot());
    let lvm = tunnel_lvm();
    bind_router(&mut agent, "ri-r", &lvm);
    let compute = vif("vm-c", 7, mac(0xbb));
    agent
        .bind_port_to_dvr(&compute, &lvm, &fixed_ip("subnet-s", "10.0.0.5"), "compute:nova")
        .unwrap();
    clear_calls(&mut agent);

    agent.unbind_port_from_dvr(&compute, &lvm).unwrap();
    assert_eq!(
        int_br(&agent).calls(),
        &[openflow::BridgeCall::DeleteFlows {
            table: DVR_TO_SRC_MAC,
            pattern: FlowMatch {
                dl_vlan: Some(Vid::new(5).unwrap()),
                dl_dst: Some(mac(0xbb)),
                ..Default::default()
            },
        }]
    );
    assert!(agent.local_port(&PortId::from("vm-c")).is_none());
    let ldm = agent.subnet_mapping(&subnet_s()).unwrap();
    assert!(ldm.is_dvr_owned());
    assert!(ldm.compute_ports().is_empty());
}

#[test]
fn csnat_port_keeps_the_subnet_mapping() {
    let mut agent = started(snapshot());
    let lvm = tunnel_lvm();
    bind_router(&mut agent, "ri-r", &lvm);
    let snat = vif("snat-1", 20, mac(0x5a));
    agent
        .bind_port_to_dvr(&snat, &lvm, &fixed_ip("subnet-s", "10.0.0.3"), DEVICE_OWNER_ROUTER_SNAT)
        .unwrap();
    assert_eq!(
        agent.subnet_mapping(&subnet_s()).unwrap().csnat_ofport(),
        OfPort::new(20)
    );
    assert!(int_br(&agent).contains(&compute_rule(DVR_TO_SRC_MAC, 5, mac(0x5a), 20)));

    agent
        .unbind_port_from_dvr(&vif("ri-r", 10, GATEWAY_MAC), &lvm)
        .unwrap();
    let ldm = agent.subnet_mapping(&subnet_s()).unwrap();
    assert!(!ldm.is_dvr_owned());
    assert_eq!(ldm.csnat_ofport(), OfPort::new(20));
    // the centralized SNAT port is still served
    assert!(int_br(&agent).contains(&compute_rule(DVR_TO_SRC_MAC, 5, mac(0x5a), 20)));

    agent.unbind_port_from_dvr(&snat, &lvm).unwrap();
    assert!(agent.subnet_mapping(&subnet_s()).is_none());
    assert!(agent.local_ports().is_empty());
    assert_eq!(int_br(&agent).table(DVR_TO_SRC_MAC).count(), 1); // the default drop
}

#[test]
fn csnat_then_router_interface() {
    let mut agent = started(snapshot());
    let lvm = tunnel_lvm();
    agent
        .bind_port_to_dvr(
            &vif("snat-1", 20, mac(0x5a)),
            &lvm,
            &fixed_ip("subnet-s", "10.0.0.3"),
            DEVICE_OWNER_ROUTER_SNAT,
        )
        .unwrap();
    let ldm = agent.subnet_mapping(&subnet_s()).unwrap();
    assert!(!ldm.is_dvr_owned());

    // the mapping exists, but no router interface owns it yet
    bind_router(&mut agent, "ri-r", &lvm);
    assert!(agent.subnet_mapping(&subnet_s()).unwrap().is_dvr_owned());

    // now it does
    clear_calls(&mut agent);
    let compute_ports_before = agent.subnet_mapping(&subnet_s()).unwrap().compute_ports().clone();
    let result = agent.bind_port_to_dvr(
        &vif("ri-other", 11, mac(0x11)),
        &lvm,
        &fixed_ip("subnet-s", "10.0.0.1"),
        DEVICE_OWNER_DVR_INTERFACE,
    );
    assert!(matches!(result, Err(DvrError::DuplicateRouterInterface { .. })));
    let ldm = agent.subnet_mapping(&subnet_s()).unwrap();
    assert!(ldm.is_dvr_owned());
    assert_eq!(ldm.compute_ports(), &compute_ports_before);
    assert_eq!(call_count(&agent), 0);
}

#[test]
fn router_interface_on_vlan_network() {
    let mut agent = started(snapshot());
    let lvm = vlan_lvm();
    bind_router(&mut agent, "ri-r", &lvm);
    agent
        .bind_port_to_dvr(
            &vif("vm-c", 7, mac(0xbb)),
            &lvm,
            &fixed_ip("subnet-s", "10.0.0.5"),
            "compute:nova",
        )
        .unwrap();

    // delivery matches the provider VLAN
    assert!(int_br(&agent).contains(&compute_rule(DVR_TO_SRC_MAC_VLAN, 100, mac(0xbb), 7)));
    // the guards match the local VLAN on the physical bridge
    assert!(phys_br(&agent).contains(&Flow::new(
        DVR_PROCESS_VLAN,
        1,
        FlowMatch {
            dl_vlan: Some(Vid::new(6).unwrap()),
            dl_src: Some(GATEWAY_MAC),
            ..Default::default()
        },
        [
            Action::ModDlSrc(OWN_MAC),
            Action::Resubmit(LOCAL_VLAN_TRANSLATION)
        ],
    )));
    assert_eq!(phys_br(&agent).table(DVR_PROCESS_VLAN).count(), 4);
    assert!(tun_br(&agent).table(DVR_PROCESS).all(|flow| flow.matches.is_any()));

    agent
        .unbind_port_from_dvr(&vif("ri-r", 10, GATEWAY_MAC), &lvm)
        .unwrap();
    assert_eq!(phys_br(&agent).table(DVR_PROCESS_VLAN).count(), 1);
    assert_eq!(int_br(&agent).table(DVR_TO_SRC_MAC_VLAN).count(), 1);
}

#[test]
fn ipv6_router_interface_drops_router_advertisements() {
    let mut agent = started(snapshot());
    agent
        .bind_port_to_dvr(
            &vif("ri-6", 10, GATEWAY_MAC),
            &tunnel_lvm(),
            &fixed_ip("subnet-v6", "2001:db8::1"),
            DEVICE_OWNER_DVR_INTERFACE,
        )
        .unwrap();
    assert!(tun_br(&agent).contains(&Flow::new(
        DVR_PROCESS,
        3,
        FlowMatch {
            dl_vlan: Some(Vid::new(5).unwrap()),
            dl_src: Some(GATEWAY_MAC),
            proto: Some(Proto::Icmp6),
            icmp_type: Some(ICMPV6_TYPE_RA),
            ..Default::default()
        },
        [Action::Drop],
    )));
}

#[test]
fn reset_then_resync() {
    let mut agent = started(snapshot());
    let lvm = tunnel_lvm();
    bind_router(&mut agent, "ri-r", &lvm);
    agent.reset_dvr_parameters();
    assert!(agent.local_ports().is_empty());
    assert!(agent.local_dvr_map().is_empty());

    agent.reset_ovs_parameters(
        MemoryBridge::new("br-int"),
        Some(MemoryBridge::new("br-tun")),
        PATCH_INT,
        PATCH_TUN,
    );
    agent.setup_dvr_flows().unwrap();
    bind_router(&mut agent, "ri-r", &lvm);
    assert!(agent.subnet_mapping(&subnet_s()).unwrap().is_dvr_owned());
    assert_eq!(tun_br(&agent).table(DVR_PROCESS).count(), 4);
}

#[test]
fn tunneled_network_in_distributed_mode() {
    let mut agent = started(snapshot());
    agent
        .process_tunneled_network(TunnelType::Vxlan, Vid::new(5).unwrap(), 1001)
        .unwrap();
    assert!(tun_br(&agent).contains(&Flow::new(
        VXLAN_TUN_TO_LV,
        1,
        FlowMatch {
            tun_id: Some(1001),
            ..Default::default()
        },
        [
            Action::ModVlanVid(Vid::new(5).unwrap()),
            Action::Resubmit(DVR_NOT_LEARN)
        ],
    )));
}
