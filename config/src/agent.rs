// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! The agent configuration model.

use crate::errors::{ConfigError, ConfigResult};
use derive_builder::Builder;
use openflow::OfPort;
use ordermap::OrderMap;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::num::NonZeroU32;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

const DEFAULT_INTEGRATION_BRIDGE: &str = "br-int";
const DEFAULT_TUNNEL_BRIDGE: &str = "br-tun";
const DEFAULT_MAC_FETCH_ATTEMPTS: u32 = 5;

fn default_integration_bridge() -> String {
    DEFAULT_INTEGRATION_BRIDGE.to_string()
}
fn default_tunnel_bridge() -> String {
    DEFAULT_TUNNEL_BRIDGE.to_string()
}
fn default_mac_fetch_attempts() -> u32 {
    DEFAULT_MAC_FETCH_ATTEMPTS
}

/// A physical network and the bridge connecting it to the integration bridge.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PhysicalBridgeConfig {
    /// Name of the physical bridge.
    pub bridge: String,
    /// Ofport, on the integration bridge, of the patch port towards the physical bridge.
    pub int_ofport: OfPort,
    /// Ofport, on the physical bridge, of the patch port towards the integration bridge.
    pub phys_ofport: OfPort,
}

#[derive(Builder, Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[builder(build_fn(private, name = "build_unvalidated", error = "ConfigError"))]
#[serde(deny_unknown_fields)]
pub struct AgentConfig {
    /// Name of this host, as known by the control plane.
    #[builder(setter(into))]
    pub host: String,
    /// Ask the control plane for a DVR MAC at startup. Without it the agent stays a plain
    /// learning switch.
    #[serde(default)]
    #[builder(default)]
    pub enable_distributed_routing: bool,
    #[serde(default)]
    #[builder(default)]
    pub enable_tunneling: bool,
    #[serde(default = "default_integration_bridge")]
    #[builder(setter(into), default = "default_integration_bridge()")]
    pub integration_bridge: String,
    #[serde(default = "default_tunnel_bridge")]
    #[builder(setter(into), default = "default_tunnel_bridge()")]
    pub tunnel_bridge: String,
    /// Ofport, on the tunnel bridge, of the patch port towards the integration bridge.
    #[serde(default)]
    #[builder(setter(into), default)]
    pub patch_int_ofport: OfPort,
    /// Ofport, on the integration bridge, of the patch port towards the tunnel bridge.
    #[serde(default)]
    #[builder(setter(into), default)]
    pub patch_tun_ofport: OfPort,
    /// Physical network name to bridge.
    #[serde(default)]
    #[builder(default)]
    pub bridge_mappings: OrderMap<String, PhysicalBridgeConfig>,
    #[serde(default = "default_mac_fetch_attempts")]
    #[builder(default = "default_mac_fetch_attempts()")]
    pub mac_fetch_attempts: u32,
    /// Pause between two attempts to fetch the DVR MAC, 0 to retry right away.
    #[serde(default)]
    #[builder(default)]
    pub mac_fetch_backoff_ms: u64,
}

impl From<derive_builder::UninitializedFieldError> for ConfigError {
    fn from(value: derive_builder::UninitializedFieldError) -> Self {
        ConfigError::MissingParameter(value.field_name())
    }
}

impl AgentConfigBuilder {
    /// Map `physical_network` to a physical bridge.
    pub fn bridge_mapping(
        &mut self,
        physical_network: impl Into<String>,
        bridge: PhysicalBridgeConfig,
    ) -> &mut Self {
        self.bridge_mappings
            .get_or_insert_with(OrderMap::new)
            .insert(physical_network.into(), bridge);
        self
    }

    /// Build and validate the configuration.
    pub fn build(&self) -> Result<AgentConfig, ConfigError> {
        let config = self.build_unvalidated()?;
        config.validate()?;
        Ok(config)
    }
}

impl AgentConfig {
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let config: AgentConfig = serde_yaml_ng::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml_file(path: &Path) -> Result<Self, ConfigError> {
        debug!("Loading configuration from {}", path.display());
        let yaml = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(path.display().to_string(), e))?;
        Self::from_yaml_str(&yaml)
    }

    pub fn validate(&self) -> ConfigResult {
        if self.host.trim().is_empty() {
            return Err(ConfigError::MissingParameter("host"));
        }
        if self.mac_fetch_attempts == 0 {
            return Err(ConfigError::NoAttempts);
        }
        if self.enable_tunneling {
            if !self.patch_int_ofport.is_valid() {
                return Err(ConfigError::BadPatchPort(
                    "patch_int_ofport",
                    self.patch_int_ofport,
                ));
            }
            if !self.patch_tun_ofport.is_valid() {
                return Err(ConfigError::BadPatchPort(
                    "patch_tun_ofport",
                    self.patch_tun_ofport,
                ));
            }
        }
        let mut bridges = HashSet::new();
        bridges.insert(self.integration_bridge.as_str());
        if self.enable_tunneling && !bridges.insert(self.tunnel_bridge.as_str()) {
            return Err(ConfigError::DuplicateBridge(self.tunnel_bridge.clone()));
        }
        for (physnet, mapping) in &self.bridge_mappings {
            if physnet.is_empty() {
                return Err(ConfigError::Invalid(
                    "empty physical network name".to_string(),
                ));
            }
            if !mapping.int_ofport.is_valid() {
                return Err(ConfigError::BadPhysicalPort(
                    physnet.clone(),
                    "int",
                    mapping.int_ofport,
                ));
            }
            if !mapping.phys_ofport.is_valid() {
                return Err(ConfigError::BadPhysicalPort(
                    physnet.clone(),
                    "phys",
                    mapping.phys_ofport,
                ));
            }
            if !bridges.insert(mapping.bridge.as_str()) {
                return Err(ConfigError::DuplicateBridge(mapping.bridge.clone()));
            }
        }
        Ok(())
    }

    #[must_use]
    pub fn mac_fetch_attempts(&self) -> NonZeroU32 {
        NonZeroU32::new(self.mac_fetch_attempts).unwrap_or(NonZeroU32::MIN)
    }

    #[must_use]
    pub fn mac_fetch_backoff(&self) -> Duration {
        Duration::from_millis(self.mac_fetch_backoff_ms)
    }
}
