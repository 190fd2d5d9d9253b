// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Client side of the control plane queries issued by the DVR agent.

#![deny(
    unsafe_code,
    clippy::all,
    clippy::pedantic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic
)]
#![allow(clippy::missing_errors_doc)]

pub mod client;
pub mod errors;
pub mod retry;
pub mod snapshot;
pub mod types;

pub use client::ControlPlane; // re-export
pub use errors::RpcError; // re-export
pub use retry::{Backoff, Fixed, Immediate, RetryPolicy}; // re-export
pub use snapshot::{
    ControlPlaneSnapshot, HostBinding, Method, SnapshotError, StaticControlPlane,
}; // re-export
pub use types::{
    DvrMacDetails, FixedIp, HostPort, IpVersion, PortId, SubnetId, SubnetInfo,
}; // re-export
