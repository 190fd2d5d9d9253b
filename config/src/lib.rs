// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Configuration of the DVR agent: which host it runs on, which bridges it programs and how it
//! reaches the control plane at startup.

#![deny(
    unsafe_code,
    clippy::all,
    clippy::pedantic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic
)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::struct_excessive_bools)]

pub mod agent;
pub mod errors;

pub use agent::{AgentConfig, AgentConfigBuilder, PhysicalBridgeConfig}; // re-export
pub use errors::{ConfigError, ConfigResult}; // re-export
