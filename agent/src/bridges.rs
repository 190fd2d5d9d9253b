// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! The bridges programmed by the agent and the patch ports linking them.

use config::AgentConfig;
use openflow::{Bridge, OfPort};
use ordermap::OrderMap;

/// The tunnel bridge, patched to the integration bridge.
#[derive(Debug)]
pub struct TunnelBridge<B> {
    pub bridge: B,
    /// Ofport of the patch towards the integration bridge, on the tunnel bridge.
    pub patch_int_ofport: OfPort,
    /// Ofport of the patch towards the tunnel bridge, on the integration bridge.
    pub patch_tun_ofport: OfPort,
}

/// The bridge of a physical network, patched to the integration bridge.
#[derive(Debug)]
pub struct PhysicalBridge<B> {
    pub bridge: B,
    /// Ofport of the patch towards the physical bridge, on the integration bridge.
    pub int_ofport: OfPort,
    /// Ofport of the patch towards the integration bridge, on the physical bridge.
    pub phys_ofport: OfPort,
}

#[derive(Debug)]
pub struct Bridges<B> {
    pub int_br: B,
    /// Present iff tunneling is enabled.
    pub tun: Option<TunnelBridge<B>>,
    /// Physical bridges by physical network name.
    pub phys: OrderMap<String, PhysicalBridge<B>>,
}

impl<B: Bridge> Bridges<B> {
    #[must_use]
    pub fn new(int_br: B) -> Self {
        Self {
            int_br,
            tun: None,
            phys: OrderMap::new(),
        }
    }

    #[must_use]
    pub fn with_tunnel(
        mut self,
        bridge: B,
        patch_int_ofport: OfPort,
        patch_tun_ofport: OfPort,
    ) -> Self {
        self.tun = Some(TunnelBridge {
            bridge,
            patch_int_ofport,
            patch_tun_ofport,
        });
        self
    }

    #[must_use]
    pub fn with_physical(
        mut self,
        physical_network: impl Into<String>,
        bridge: B,
        int_ofport: OfPort,
        phys_ofport: OfPort,
    ) -> Self {
        self.phys.insert(
            physical_network.into(),
            PhysicalBridge {
                bridge,
                int_ofport,
                phys_ofport,
            },
        );
        self
    }

    /// Open the bridges named by `config`, `open` being handed each bridge name.
    pub fn from_config(config: &AgentConfig, mut open: impl FnMut(&str) -> B) -> Self {
        let mut bridges = Self::new(open(&config.integration_bridge));
        if config.enable_tunneling {
            bridges = bridges.with_tunnel(
                open(&config.tunnel_bridge),
                config.patch_int_ofport,
                config.patch_tun_ofport,
            );
        }
        for (physnet, mapping) in &config.bridge_mappings {
            bridges = bridges.with_physical(
                physnet.as_str(),
                open(&mapping.bridge),
                mapping.int_ofport,
                mapping.phys_ofport,
            );
        }
        bridges
    }

    #[must_use]
    pub fn tunneling(&self) -> bool {
        self.tun.is_some()
    }

    #[must_use]
    pub fn physical(&self, physical_network: &str) -> Option<&PhysicalBridge<B>> {
        self.phys.get(physical_network)
    }

    /// All the bridges, integration bridge first.
    pub fn iter(&self) -> impl Iterator<Item = &B> {
        std::iter::once(&self.int_br)
            .chain(self.tun.iter().map(|tun| &tun.bridge))
            .chain(self.phys.values().map(|phys| &phys.bridge))
    }
}
