// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Type for configuration / validation failures

use openflow::OfPort;
use thiserror::Error;

/// The reasons why we may reject a configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read {0}: {1}")]
    Io(String, #[source] std::io::Error),
    #[error("Malformed configuration: {0}")]
    Parse(#[from] serde_yaml_ng::Error),
    #[error("Missing mandatory parameter: {0}")]
    MissingParameter(&'static str),
    #[error("At least one attempt is needed to fetch the DVR MAC address")]
    NoAttempts,
    #[error("Tunneling is enabled but patch port {0} has invalid ofport {1}")]
    BadPatchPort(&'static str, OfPort),
    #[error("Physical network '{0}' has invalid {1} ofport {2}")]
    BadPhysicalPort(String, &'static str, OfPort),
    #[error("Bridge '{0}' is used more than once")]
    DuplicateBridge(String),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Result-like type for configurations
pub type ConfigResult = Result<(), ConfigError>;
