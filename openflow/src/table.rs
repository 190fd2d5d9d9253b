// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Flow table identifiers, rule priorities and datapath port handles.

use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Index of a flow table within a bridge.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
#[repr(transparent)]
pub struct TableId(u8);

impl TableId {
    /// Table 0, where every packet entering the bridge starts.
    pub const DEFAULT: TableId = TableId(0);

    #[must_use]
    pub const fn new(id: u8) -> Self {
        Self(id)
    }

    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self.0
    }
}

impl From<u8> for TableId {
    fn from(value: u8) -> Self {
        Self(value)
    }
}

impl Display for TableId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Priority of a rule within its table. Higher wins.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
#[repr(transparent)]
pub struct Priority(u16);

impl Priority {
    #[must_use]
    pub const fn new(priority: u16) -> Self {
        Self(priority)
    }

    #[must_use]
    pub const fn as_u16(self) -> u16 {
        self.0
    }
}

impl From<u16> for Priority {
    fn from(value: u16) -> Self {
        Self(value)
    }
}

impl Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The handle a bridge uses to reference one of its ports in matches and actions.
///
/// The datapath reports `-1` for ports which exist in the database but have no usable handle
/// (yet); [`OfPort::INVALID`] is that value and doubles as the "unset" marker.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
#[repr(transparent)]
pub struct OfPort(i32);

impl OfPort {
    pub const INVALID: OfPort = OfPort(-1);

    #[must_use]
    pub const fn new(ofport: i32) -> Self {
        Self(ofport)
    }

    #[must_use]
    pub const fn as_i32(self) -> i32 {
        self.0
    }

    /// Valid handles are strictly positive.
    #[must_use]
    pub const fn is_valid(self) -> bool {
        self.0 > 0
    }
}

impl Default for OfPort {
    fn default() -> Self {
        Self::INVALID
    }
}

impl From<i32> for OfPort {
    fn from(value: i32) -> Self {
        Self(value)
    }
}

impl Display for OfPort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
