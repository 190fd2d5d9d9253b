// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Distributed virtual router (DVR) datapath programming.
//!
//! [`DvrAgent`] turns the logical topology of a host (router interfaces, centralized SNAT ports
//! and the VM ports on subnets those routers serve) into rules on the integration, tunnel and
//! physical bridges, so that east-west traffic is routed on the host it originates from.
//!
//! The agent is driven by an external event loop which serializes calls to its entry points.

#![deny(
    unsafe_code,
    clippy::all,
    clippy::pedantic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic
)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::module_name_repetitions)]

pub mod agent;
pub mod bridges;
pub mod errors;
mod flows;
pub mod mode;
pub mod network;
pub mod port;
pub mod subnet;
pub mod tables;

pub use agent::DvrAgent; // re-export
pub use bridges::{Bridges, PhysicalBridge, TunnelBridge}; // re-export
pub use errors::DvrError; // re-export
pub use mode::Mode; // re-export
pub use network::{LocalVlanMapping, Segment, TunnelType}; // re-export
pub use port::{DeviceOwner, OvsPort}; // re-export
pub use subnet::LocalDvrSubnetMapping; // re-export
