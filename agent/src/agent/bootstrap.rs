// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Entering distributed mode, default rules and tracking of the fleet's DVR MACs.

use super::DvrAgent;
use crate::bridges::Bridges;
use crate::errors::DvrError;
use crate::flows;
use crate::mode::Mode;
use net::eth::mac::Mac;
use openflow::Bridge;
use rpc::{ControlPlane, DvrMacDetails, RpcError};
use std::collections::BTreeSet;
use tracing::{debug, error, info, warn};

impl<B: Bridge, C: ControlPlane> DvrAgent<B, C> {
    /// Ask the control plane for the DVR MAC of this host, entering distributed mode on success.
    ///
    /// Timeouts are retried according to the retry policy. If no MAC can be obtained, the agent
    /// stays a plain learning switch and the integration bridge gets a catch-all normal rule.
    /// Only a failure of that bridge is reported as an error.
    pub fn get_dvr_mac_address(&mut self) -> Result<(), DvrError> {
        let attempts = self.retry.attempts();
        let fetched = self.retry.run(RpcError::is_retryable, |attempt| {
            debug!("Fetching DVR MAC for host {}, attempt {attempt}/{attempts}", self.host);
            self.control_plane.get_dvr_mac_address_by_host(&self.host)
        });
        match fetched {
            Ok(details) => {
                info!(
                    "L2 agent operating in DVR mode with MAC {}",
                    details.mac_address
                );
                self.mode = Mode::Distributed(details.mac_address);
                Ok(())
            }
            Err(e) => {
                if e.is_retryable() {
                    error!(
                        "Failed to obtain a valid local DVR MAC address after {attempts} attempts, DVR routing disabled: {e}"
                    );
                } else {
                    warn!("DVR MAC request failed, DVR routing disabled: {e}");
                }
                self.mode = Mode::NonDistributed;
                self.bridges.int_br.add_flow(&flows::normal_switching())?;
                Ok(())
            }
        }
    }

    /// Install every default rule set, then the rules for the remote DVR MACs.
    pub fn setup_dvr_flows(&mut self) -> Result<(), DvrError> {
        self.setup_dvr_flows_on_integ_br()?;
        self.setup_dvr_flows_on_tun_br()?;
        self.setup_dvr_flows_on_phys_br()?;
        self.setup_dvr_mac_flows_on_all_brs()
    }

    /// Wipe the integration bridge and install its defaults.
    pub fn setup_dvr_flows_on_integ_br(&mut self) -> Result<(), DvrError> {
        let Mode::Distributed(dvr_mac) = self.mode else {
            return Ok(());
        };
        let Bridges { int_br, phys, .. } = &mut self.bridges;
        debug!("{}: installing DVR defaults, DVR MAC {dvr_mac}", int_br.name());
        int_br.remove_all_flows()?;
        for flow in flows::integration_defaults(phys.values().map(|pb| pb.int_ofport)) {
            int_br.add_flow(&flow)?;
        }
        Ok(())
    }

    pub fn setup_dvr_flows_on_tun_br(&mut self) -> Result<(), DvrError> {
        if !self.mode.is_distributed() {
            return Ok(());
        }
        let Some(tun) = self.bridges.tun.as_mut() else {
            return Ok(());
        };
        debug!("{}: installing DVR defaults", tun.bridge.name());
        for flow in flows::tunnel_defaults(tun.patch_int_ofport) {
            tun.bridge.add_flow(&flow)?;
        }
        Ok(())
    }

    pub fn setup_dvr_flows_on_phys_br(&mut self) -> Result<(), DvrError> {
        if !self.mode.is_distributed() {
            return Ok(());
        }
        for (physnet, pb) in &mut self.bridges.phys {
            debug!("{}: installing DVR defaults for {physnet}", pb.bridge.name());
            for flow in flows::physical_defaults(pb.phys_ofport) {
                pb.bridge.add_flow(&flow)?;
            }
        }
        Ok(())
    }

    /// Keep the learning switches from learning the DVR MACs of the other hosts.
    ///
    /// The registered set is rebuilt from the control plane's current list. Rules of registered
    /// MACs missing from that list are deleted first: only the integration bridge is wiped on
    /// setup, the other bridges still carry them.
    pub fn setup_dvr_mac_flows_on_all_brs(&mut self) -> Result<(), DvrError> {
        let Mode::Distributed(own) = self.mode else {
            return Ok(());
        };
        let macs = remote_macs(&self.control_plane.get_dvr_mac_address_list()?, own);
        let stale: Vec<Mac> = self
            .registered_dvr_macs
            .difference(&macs)
            .copied()
            .collect();
        for mac in stale {
            debug!("Removing rules of departed DVR MAC {mac}");
            self.remove_dvr_mac_flows(mac)?;
            self.registered_dvr_macs.remove(&mac);
        }
        for mac in macs {
            self.add_dvr_mac_flows(mac)?;
            self.registered_dvr_macs.insert(mac);
        }
        Ok(())
    }

    /// Reconcile the rules with a fresh list of the fleet's DVR MACs.
    ///
    /// Rules of MACs which left the list are deleted first, then rules of new MACs installed.
    /// MACs present before and after are not touched.
    pub fn dvr_mac_address_update(&mut self, dvr_macs: &[DvrMacDetails]) -> Result<(), DvrError> {
        let Mode::Distributed(own) = self.mode else {
            debug!("Not in distributed mode, ignoring DVR MAC update");
            return Ok(());
        };
        let dvr_host_macs = remote_macs(dvr_macs, own);
        if dvr_host_macs == self.registered_dvr_macs {
            debug!("DVR MAC list unchanged");
            return Ok(());
        }
        let removed: Vec<Mac> = self
            .registered_dvr_macs
            .difference(&dvr_host_macs)
            .copied()
            .collect();
        let added: Vec<Mac> = dvr_host_macs
            .difference(&self.registered_dvr_macs)
            .copied()
            .collect();
        for mac in removed {
            debug!("Removing rules of DVR MAC {mac}");
            self.remove_dvr_mac_flows(mac)?;
            self.registered_dvr_macs.remove(&mac);
        }
        for mac in added {
            debug!("Adding rules for DVR MAC {mac}");
            self.add_dvr_mac_flows(mac)?;
            self.registered_dvr_macs.insert(mac);
        }
        Ok(())
    }

    fn add_dvr_mac_flows(&mut self, mac: Mac) -> Result<(), DvrError> {
        let Bridges { int_br, tun, phys } = &mut self.bridges;
        for pb in phys.values_mut() {
            int_br.add_flow(&flows::remote_mac_from_physical(pb.int_ofport, mac))?;
            pb.bridge
                .add_flow(&flows::remote_mac_on_physical(pb.phys_ofport, mac))?;
        }
        if let Some(tun) = tun {
            int_br.add_flow(&flows::remote_mac_from_tunnel(tun.patch_tun_ofport, mac))?;
            tun.bridge
                .add_flow(&flows::remote_mac_on_tunnel(tun.patch_int_ofport, mac))?;
        }
        Ok(())
    }

    fn remove_dvr_mac_flows(&mut self, mac: Mac) -> Result<(), DvrError> {
        let Bridges { int_br, tun, phys } = &mut self.bridges;
        for pb in phys.values_mut() {
            let from_physical = flows::remote_mac_from_physical(pb.int_ofport, mac);
            int_br.delete_flows(from_physical.table, &from_physical.matches)?;
            let on_physical = flows::remote_mac_on_physical(pb.phys_ofport, mac);
            pb.bridge
                .delete_flows(on_physical.table, &on_physical.matches)?;
        }
        if let Some(tun) = tun {
            let from_tunnel = flows::remote_mac_from_tunnel(tun.patch_tun_ofport, mac);
            int_br.delete_flows(from_tunnel.table, &from_tunnel.matches)?;
            let on_tunnel = flows::remote_mac_on_tunnel(tun.patch_int_ofport, mac);
            tun.bridge.delete_flows(on_tunnel.table, &on_tunnel.matches)?;
        }
        Ok(())
    }
}

fn remote_macs(dvr_macs: &[DvrMacDetails], own: Mac) -> BTreeSet<Mac> {
    dvr_macs
        .iter()
        .map(|details| details.mac_address)
        .filter(|mac| *mac != own)
        .collect()
}
