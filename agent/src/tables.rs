// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Flow table layout of the bridges the agent programs.

use openflow::TableId;

// integration bridge
pub const LOCAL_SWITCHING: TableId = TableId::new(0);
/// Delivery of routed traffic to local ports on tunneled networks.
pub const DVR_TO_SRC_MAC: TableId = TableId::new(1);
/// Delivery of routed traffic to local ports on VLAN networks.
pub const DVR_TO_SRC_MAC_VLAN: TableId = TableId::new(2);
/// Holds a single rule whose disappearance reveals a datapath restart.
pub const CANARY_TABLE: TableId = TableId::new(23);

// tunnel bridge
pub const DVR_PROCESS: TableId = TableId::new(1);
pub const PATCH_LV_TO_TUN: TableId = TableId::new(2);
pub const GRE_TUN_TO_LV: TableId = TableId::new(3);
pub const VXLAN_TUN_TO_LV: TableId = TableId::new(4);
pub const GENEVE_TUN_TO_LV: TableId = TableId::new(6);
/// Traffic from remote DVR MACs must not be learnt, it would flood the fleet's tables.
pub const DVR_NOT_LEARN: TableId = TableId::new(9);
pub const LEARN_FROM_TUN: TableId = TableId::new(10);

// physical bridges
pub const DVR_PROCESS_VLAN: TableId = TableId::new(1);
pub const LOCAL_VLAN_TRANSLATION: TableId = TableId::new(2);
pub const DVR_NOT_LEARN_VLAN: TableId = TableId::new(3);

/// ICMPv6 router advertisement.
pub const ICMPV6_TYPE_RA: u8 = 134;
