// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Match fields, actions and complete rules.
//!
//! The [`Display`] impls render the `ovs-ofctl` flow syntax, e.g.
//! `table=1,priority=4,dl_vlan=5,dl_dst=bb:bb:bb:bb:bb:bb,actions=strip_vlan,mod_dl_src:aa:aa:aa:aa:aa:aa,output:7`.

use crate::table::{OfPort, Priority, TableId};
use derive_builder::Builder;
use net::eth::mac::Mac;
use net::vlan::Vid;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Write};
use std::net::IpAddr;

/// Protocol shorthands understood by the datapath.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Proto {
    Arp,
    Icmp6,
}

impl Display for Proto {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Proto::Arp => write!(f, "arp"),
            Proto::Icmp6 => write!(f, "icmp6"),
        }
    }
}

/// The match part of a rule. Unset fields are wildcards.
///
/// The same type is used as a deletion pattern: deleting with a [`FlowMatch`] removes every rule
/// of the table whose match agrees on all the fields set in the pattern.
#[derive(
    Builder, Clone, Debug, Default, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize,
)]
#[builder(default, setter(into, strip_option))]
pub struct FlowMatch {
    pub in_port: Option<OfPort>,
    pub dl_vlan: Option<Vid>,
    pub dl_src: Option<Mac>,
    pub dl_dst: Option<Mac>,
    pub proto: Option<Proto>,
    pub nw_dst: Option<IpAddr>,
    pub icmp_type: Option<u8>,
    pub tun_id: Option<u64>,
}

impl FlowMatch {
    /// The pattern matching every packet.
    #[must_use]
    pub fn any() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn builder() -> FlowMatchBuilder {
        FlowMatchBuilder::default()
    }

    #[must_use]
    pub fn is_any(&self) -> bool {
        self == &Self::default()
    }

    /// Returns true iff every field set in `self` has the same value in `other`.
    #[must_use]
    pub fn covers(&self, other: &FlowMatch) -> bool {
        fn agrees<T: PartialEq>(pattern: Option<&T>, value: Option<&T>) -> bool {
            pattern.is_none_or(|p| value == Some(p))
        }
        agrees(self.in_port.as_ref(), other.in_port.as_ref())
            && agrees(self.dl_vlan.as_ref(), other.dl_vlan.as_ref())
            && agrees(self.dl_src.as_ref(), other.dl_src.as_ref())
            && agrees(self.dl_dst.as_ref(), other.dl_dst.as_ref())
            && agrees(self.proto.as_ref(), other.proto.as_ref())
            && agrees(self.nw_dst.as_ref(), other.nw_dst.as_ref())
            && agrees(self.icmp_type.as_ref(), other.icmp_type.as_ref())
            && agrees(self.tun_id.as_ref(), other.tun_id.as_ref())
    }
}

impl Display for FlowMatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut fields = Vec::with_capacity(8);
        // protocol shorthand goes first, ovs-ofctl wants it before the l3/l4 fields
        if let Some(proto) = self.proto {
            fields.push(proto.to_string());
        }
        if let Some(in_port) = self.in_port {
            fields.push(format!("in_port={in_port}"));
        }
        if let Some(vid) = self.dl_vlan {
            fields.push(format!("dl_vlan={vid}"));
        }
        if let Some(mac) = self.dl_src {
            fields.push(format!("dl_src={mac}"));
        }
        if let Some(mac) = self.dl_dst {
            fields.push(format!("dl_dst={mac}"));
        }
        if let Some(ip) = self.nw_dst {
            match ip {
                IpAddr::V4(_) => fields.push(format!("nw_dst={ip}")),
                IpAddr::V6(_) => fields.push(format!("ipv6_dst={ip}")),
            }
        }
        if let Some(icmp_type) = self.icmp_type {
            fields.push(format!("icmp_type={icmp_type}"));
        }
        if let Some(tun_id) = self.tun_id {
            fields.push(format!("tun_id={tun_id:#x}"));
        }
        write!(f, "{}", fields.join(","))
    }
}

/// A single rule action.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub enum Action {
    Drop,
    /// Hand the packet to the bridge's regular MAC learning switch.
    Normal,
    Output(OfPort),
    StripVlan,
    ModDlSrc(Mac),
    ModVlanVid(Vid),
    Resubmit(TableId),
}

impl Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Action::Drop => write!(f, "drop"),
            Action::Normal => write!(f, "normal"),
            Action::Output(port) => write!(f, "output:{port}"),
            Action::StripVlan => write!(f, "strip_vlan"),
            Action::ModDlSrc(mac) => write!(f, "mod_dl_src:{mac}"),
            Action::ModVlanVid(vid) => write!(f, "mod_vlan_vid:{vid}"),
            Action::Resubmit(table) => write!(f, "resubmit(,{table})"),
        }
    }
}

/// A complete rule: where it lives, what it matches, and what it does.
#[derive(Clone, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct Flow {
    pub table: TableId,
    pub priority: Priority,
    pub matches: FlowMatch,
    pub actions: Vec<Action>,
}

impl Flow {
    #[must_use]
    pub fn new(
        table: TableId,
        priority: impl Into<Priority>,
        matches: FlowMatch,
        actions: impl IntoIterator<Item = Action>,
    ) -> Self {
        Self {
            table,
            priority: priority.into(),
            matches,
            actions: actions.into_iter().collect(),
        }
    }

    /// Two rules occupy the same slot if they share table, priority and match; installing one
    /// replaces the other.
    #[must_use]
    pub fn same_slot(&self, other: &Flow) -> bool {
        self.table == other.table
            && self.priority == other.priority
            && self.matches == other.matches
    }

    /// The action list alone, in ofctl syntax.
    #[must_use]
    pub fn actions_string(&self) -> String {
        let mut out = String::new();
        for (i, action) in self.actions.iter().enumerate() {
            if i > 0 {
                out.push(',');
            }
            let _ = write!(out, "{action}");
        }
        out
    }
}

impl Display for Flow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "table={},priority={}", self.table, self.priority)?;
        if !self.matches.is_any() {
            write!(f, ",{}", self.matches)?;
        }
        write!(f, ",actions={}", self.actions_string())
    }
}
