// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! The rules guarding a router interface always name the MAC of that interface, whatever the
//! other ports around it.

mod common;

use common::*;
use dvr_agent::port::DEVICE_OWNER_DVR_INTERFACE;
use dvr_agent::tables::DVR_PROCESS;
use net::eth::mac::Mac;
use openflow::Action;

#[test]
fn router_rules_match_the_interface_under_bind() {
    bolero::check!()
        .with_type::<(Mac, Mac, u8)>()
        .for_each(|(router_mac, compute_mac, ofport)| {
            if router_mac == compute_mac || compute_mac == &GATEWAY_MAC {
                return;
            }
            let mut snapshot = snapshot();
            snapshot
                .ports
                .push(host_port(HOST, "vm-c", "subnet-s", "10.0.0.5"));
            let mut agent = started(snapshot);
            let compute = vif("vm-c", i32::from(*ofport) + 20, *compute_mac);
            agent.bridges_mut().int_br.add_vif(compute);
            let tun_before = sorted(tun_br(&agent));
            let lvm = tunnel_lvm();
            let router = vif("ri-r", 10, *router_mac);

            agent
                .bind_port_to_dvr(
                    &router,
                    &lvm,
                    &fixed_ip("subnet-s", "10.0.0.1"),
                    DEVICE_OWNER_DVR_INTERFACE,
                )
                .unwrap();
            let guards: Vec<_> = tun_br(&agent)
                .table(DVR_PROCESS)
                .filter(|flow| !flow.matches.is_any())
                .cloned()
                .collect();
            assert_eq!(guards.len(), 3);
            for flow in &guards {
                match flow.priority.as_u16() {
                    2 => assert_eq!(flow.matches.dl_dst, Some(*router_mac)),
                    1 => {
                        assert_eq!(flow.matches.dl_src, Some(*router_mac));
                        assert_eq!(flow.actions[0], Action::ModDlSrc(OWN_MAC));
                    }
                    _ => {
                        assert_ne!(flow.matches.dl_src, Some(*compute_mac));
                        assert_ne!(flow.matches.dl_dst, Some(*compute_mac));
                    }
                }
            }

            agent.unbind_port_from_dvr(&router, &lvm).unwrap();
            assert_eq!(sorted(tun_br(&agent)), tun_before);
        });
}
