// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Link layer value types shared by the DVR agent crates.

#![deny(
    unsafe_code,
    missing_docs,
    clippy::all,
    clippy::pedantic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic
)]

pub mod eth;
pub mod vlan;
