// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Forwarding rules for Open vSwitch style bridges and the drivers that install them.
//!
//! The [`Bridge`] trait is the only thing the DVR agent knows about a datapath: add a rule,
//! delete rules matching a (partially wildcarded) pattern, wipe a bridge, and look up the local
//! interface backing a logical port.

#![deny(
    unsafe_code,
    clippy::all,
    clippy::pedantic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic
)]
#![allow(clippy::missing_errors_doc)]

pub mod bridge;
pub mod flow;
pub mod memory;
pub mod ofctl;
pub mod table;

pub use bridge::{Bridge, BridgeError, VifPort}; // re-export
pub use flow::{Action, Flow, FlowMatch, FlowMatchBuilder, Proto}; // re-export
pub use memory::{BridgeCall, MemoryBridge}; // re-export
pub use ofctl::OfctlBridge; // re-export
pub use table::{OfPort, Priority, TableId}; // re-export
