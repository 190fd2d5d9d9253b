// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

use net::eth::mac::Mac;
use std::fmt::Display;

/// Whether the agent routes east-west traffic locally.
///
/// The agent enters [`Mode::Distributed`] once the control plane has handed it a DVR MAC, which
/// is then used as the source of every frame routed on this host.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum Mode {
    /// Plain learning switch.
    #[default]
    NonDistributed,
    Distributed(Mac),
}

impl Mode {
    #[must_use]
    pub fn dvr_mac(&self) -> Option<Mac> {
        match self {
            Mode::NonDistributed => None,
            Mode::Distributed(mac) => Some(*mac),
        }
    }

    #[must_use]
    pub fn is_distributed(&self) -> bool {
        matches!(self, Mode::Distributed(_))
    }
}

impl Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Mode::NonDistributed => write!(f, "non-distributed"),
            Mode::Distributed(mac) => write!(f, "distributed ({mac})"),
        }
    }
}
