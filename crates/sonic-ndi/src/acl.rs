//! Per-device ACL records.
//!
//! These are the records the hardware backend consumes: one per (entity,
//! NPU) pair that needs programming. Every payload is already resolved for
//! the target NPU, so a record never carries logical ids.

use std::fmt;

use crate::types::{NdiPort, NpuId, RawNdiObjectId};

/// Payload of a filter record. Maskable kinds carry a value and a mask.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NdiAclFilterValue {
    NoValue,
    U8 { data: u8, mask: u8 },
    U16 { data: u16, mask: u16 },
    U32 { data: u32, mask: u32 },
    Ipv4 { data: [u8; 4], mask: [u8; 4] },
    Ipv6 { data: [u8; 16], mask: [u8; 16] },
    Mac { data: [u8; 6], mask: [u8; 6] },
    /// IP type code.
    IpType(u32),
    /// IP fragment code.
    IpFrag(u32),
    ObjId(RawNdiObjectId),
    ObjIdList(Vec<RawNdiObjectId>),
    Port(NdiPort),
    /// Ports local to the record's NPU, in configured order.
    PortList(Vec<NdiPort>),
}

impl NdiAclFilterValue {
    /// Returns the value kind tag.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::NoValue => "NO_VALUE",
            Self::U8 { .. } => "U8",
            Self::U16 { .. } => "U16",
            Self::U32 { .. } => "U32",
            Self::Ipv4 { .. } => "IPV4_ADDR",
            Self::Ipv6 { .. } => "IPV6_ADDR",
            Self::Mac { .. } => "MAC_ADDR",
            Self::IpType(_) => "IP_TYPE",
            Self::IpFrag(_) => "IP_FRAG",
            Self::ObjId(_) => "OBJ_ID",
            Self::ObjIdList(_) => "OBJ_ID_LIST",
            Self::Port(_) => "PORT",
            Self::PortList(_) => "PORTLIST",
        }
    }
}

/// Filter (match field) record for one NPU.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NdiAclFilter {
    /// Filter type code.
    pub filter_type: u32,
    /// Resolved payload.
    pub value: NdiAclFilterValue,
}

/// Payload of an action record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NdiAclActionValue {
    NoValue,
    U8(u8),
    U16(u16),
    U32(u32),
    Ipv4([u8; 4]),
    Ipv6([u8; 16]),
    Mac([u8; 6]),
    /// Packet action code.
    PacketAction(u32),
    ObjId(RawNdiObjectId),
    ObjIdList(Vec<RawNdiObjectId>),
    Port(NdiPort),
    /// Ports local to the record's NPU, in configured order.
    PortList(Vec<NdiPort>),
}

impl NdiAclActionValue {
    /// Returns the value kind tag.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::NoValue => "NO_VALUE",
            Self::U8(_) => "U8",
            Self::U16(_) => "U16",
            Self::U32(_) => "U32",
            Self::Ipv4(_) => "IPV4_ADDR",
            Self::Ipv6(_) => "IPV6_ADDR",
            Self::Mac(_) => "MAC_ADDR",
            Self::PacketAction(_) => "PKT_ACTION",
            Self::ObjId(_) => "OBJ_ID",
            Self::ObjIdList(_) => "OBJ_ID_LIST",
            Self::Port(_) => "PORT",
            Self::PortList(_) => "PORTLIST",
        }
    }
}

/// Action record for one NPU.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NdiAclAction {
    /// Action type code.
    pub action_type: u32,
    /// Resolved payload.
    pub value: NdiAclActionValue,
}

/// Entry record for one NPU.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NdiAclEntry {
    /// Target NPU.
    pub npu_id: NpuId,
    /// Hardware id of the parent table on this NPU, if the table has been
    /// programmed there.
    pub table_ndi_id: Option<RawNdiObjectId>,
    /// Entry priority.
    pub priority: u32,
    /// Filters, ordered by filter type.
    pub filters: Vec<NdiAclFilter>,
    /// Actions, ordered by action type.
    pub actions: Vec<NdiAclAction>,
}

impl NdiAclEntry {
    /// Creates an empty record for the NPU.
    pub fn new(npu_id: NpuId, priority: u32) -> Self {
        Self {
            npu_id,
            priority,
            ..Default::default()
        }
    }
}

impl fmt::Display for NdiAclEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "NdiAclEntry(npu={}, priority={}, filters={}, actions={})",
            self.npu_id,
            self.priority,
            self.filters.len(),
            self.actions.len()
        )
    }
}
