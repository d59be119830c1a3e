//! ACL action.
//!
//! An action holds exactly one typed value. The action type decides which
//! cell contract [`AclAction::set_value`] follows (see
//! [`AclActionType::value_spec`]); [`AclAction::get_value`] emits the same
//! cells back.
//!
//! Materialization per NPU:
//!
//! | value        | result                                                 |
//! |--------------|--------------------------------------------------------|
//! | scalar/blob  | copied verbatim                                        |
//! | obj-id       | hardware id of the logical id on the NPU, else failure |
//! | obj-id-list  | every hardware id on the NPU, failure if none          |
//! | port         | only on the port's NPU, skipped elsewhere              |
//! | port-list    | members on the NPU, skipped if none                    |

use log::{debug, warn};
use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};

use sonic_ndi::{IfIndex, InterfaceMapper, NdiAclAction, NdiAclActionValue, NdiPort, NpuId};

use crate::cell::{first_cell, if_index_list, AclDataCell, AclDataList, MacDisplay};
use crate::counter::AclCounter;
use crate::error::{AclError, AclResult};
use crate::obj_map::AclObjIdMap;
use crate::types::{
    AclActionType, AclIfPort, AclPacketAction, AclValueKind, AclValueSpec, ObjId,
    PortListDisplay,
};

/// Value held by an action.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AclActionValue {
    #[default]
    NoValue,
    U8(u8),
    U16(u16),
    U32(u32),
    Ipv4([u8; 4]),
    Ipv6([u8; 16]),
    Mac([u8; 6]),
    PacketAction(AclPacketAction),
    /// Single logical id. The map is empty for counter references.
    ObjId { id: ObjId, ndi_map: AclObjIdMap },
    ObjIdList(AclObjIdMap),
    Port(AclIfPort),
    PortList(Vec<AclIfPort>),
}

impl AclActionValue {
    pub fn kind(&self) -> AclValueKind {
        match self {
            Self::NoValue => AclValueKind::None,
            Self::U8(_) => AclValueKind::U8,
            Self::U16(_) => AclValueKind::U16,
            Self::U32(_) => AclValueKind::U32,
            Self::Ipv4(_) => AclValueKind::Ipv4,
            Self::Ipv6(_) => AclValueKind::Ipv6,
            Self::Mac(_) => AclValueKind::Mac,
            Self::PacketAction(_) => AclValueKind::PacketAction,
            Self::ObjId { .. } => AclValueKind::ObjId,
            Self::ObjIdList(_) => AclValueKind::ObjIdList,
            Self::Port(_) => AclValueKind::Port,
            Self::PortList(_) => AclValueKind::PortList,
        }
    }
}

impl fmt::Display for AclActionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoValue => write!(f, "-"),
            Self::U8(v) => write!(f, "{}", v),
            Self::U16(v) => write!(f, "{}", v),
            Self::U32(v) => write!(f, "{}", v),
            Self::Ipv4(v) => write!(f, "{}", Ipv4Addr::from(*v)),
            Self::Ipv6(v) => write!(f, "{}", Ipv6Addr::from(*v)),
            Self::Mac(v) => write!(f, "{}", MacDisplay(v)),
            Self::PacketAction(v) => write!(f, "{}", v),
            Self::ObjId { id, ndi_map } if ndi_map.is_empty() => write!(f, "id {}", id),
            Self::ObjId { id, ndi_map } => write!(f, "id {} {}", id, ndi_map),
            Self::ObjIdList(map) => write!(f, "{}", map),
            Self::Port(m) => write!(f, "{}", m),
            Self::PortList(ms) => write!(f, "{}", PortListDisplay(ms)),
        }
    }
}

/// One action of an entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AclAction {
    action_type: AclActionType,
    value: AclActionValue,
}

impl AclAction {
    /// Creates an action with no value from a type code.
    pub fn new(type_code: u32) -> AclResult<Self> {
        Ok(Self::from_type(AclActionType::try_from(type_code)?))
    }

    pub fn from_type(action_type: AclActionType) -> Self {
        Self {
            action_type,
            value: AclActionValue::NoValue,
        }
    }

    pub fn action_type(&self) -> AclActionType {
        self.action_type
    }

    pub fn name(&self) -> &'static str {
        self.action_type.name()
    }

    pub fn value(&self) -> &AclActionValue {
        &self.value
    }

    pub fn kind(&self) -> AclValueKind {
        self.value.kind()
    }

    /// Sets the value from protocol cells.
    ///
    /// The new value is fully parsed before it replaces the old one, so a
    /// failure leaves the action unchanged.
    pub fn set_value(&mut self, cells: &[AclDataCell], intf: &dyn InterfaceMapper) -> AclResult<()> {
        self.value = self.parse_value(cells, intf)?;
        Ok(())
    }

    fn parse_value(&self, cells: &[AclDataCell], intf: &dyn InterfaceMapper) -> AclResult<AclActionValue> {
        let what = self.name();
        let spec = self.action_type.value_spec();
        let value = match spec {
            AclValueSpec::NoValue => AclActionValue::NoValue,
            AclValueSpec::U8 => AclActionValue::U8(first_cell(cells, what)?.as_u8()?),
            AclValueSpec::U16 => AclActionValue::U16(first_cell(cells, what)?.as_u16()?),
            AclValueSpec::U32 => AclActionValue::U32(first_cell(cells, what)?.as_u32()?),
            AclValueSpec::Ipv4 => AclActionValue::Ipv4(first_cell(cells, what)?.as_bytes()?),
            AclValueSpec::Ipv6 => AclActionValue::Ipv6(first_cell(cells, what)?.as_bytes()?),
            AclValueSpec::Mac => AclActionValue::Mac(first_cell(cells, what)?.as_bytes()?),
            AclValueSpec::PacketAction => {
                let code = first_cell(cells, what)?.as_u32()?;
                AclActionValue::PacketAction(AclPacketAction::try_from(code)?)
            }
            AclValueSpec::ObjId => AclActionValue::ObjId {
                id: first_cell(cells, what)?.as_obj_id()?,
                ndi_map: AclObjIdMap::new(),
            },
            AclValueSpec::OpaqueData => {
                let ndi_map = AclObjIdMap::from_cells(cells)?;
                let id = ndi_map
                    .first_id()
                    .ok_or_else(|| AclError::missing(format!("{}: no object id", what)))?;
                AclActionValue::ObjId { id, ndi_map }
            }
            AclValueSpec::OpaqueDataList => AclActionValue::ObjIdList(AclObjIdMap::from_cells(cells)?),
            AclValueSpec::IfIndex => {
                let ifindex = first_cell(cells, what)?.as_if_index()?;
                Self::parse_redirect(ifindex, intf, what)?
            }
            AclValueSpec::IfIndexList => {
                let ifindexes = if_index_list(cells, what)?;
                AclActionValue::PortList(AclIfPort::resolve_list(intf, &ifindexes, what)?)
            }
            AclValueSpec::IpType | AclValueSpec::IpFrag => {
                return Err(AclError::invalid(format!(
                    "{}: {:?} is not an action value",
                    what, spec
                )))
            }
        };
        Ok(value)
    }

    /// A LAG redirect is kept as an object id keyed by the LAG's ifindex,
    /// holding the LAG's per-NPU hardware ids.
    fn parse_redirect(ifindex: IfIndex, intf: &dyn InterfaceMapper, what: &str) -> AclResult<AclActionValue> {
        if !intf.is_lag(ifindex) {
            return Ok(AclActionValue::Port(AclIfPort::resolve(intf, ifindex, what)?));
        }

        let lag_ids = intf.lag_ndi_ids(ifindex).map_err(|e| {
            warn!("{}: LAG ifindex {} lookup failed", what, ifindex);
            AclError::from(e)
        })?;
        let id = ObjId::from(ifindex);
        let mut ndi_map = AclObjIdMap::new();
        ndi_map.insert(id, lag_ids);
        Ok(AclActionValue::ObjId { id, ndi_map })
    }

    /// Emits the value as protocol cells.
    pub fn get_value(&self) -> AclDataList {
        match &self.value {
            AclActionValue::NoValue => Vec::new(),
            AclActionValue::U8(v) => vec![AclDataCell::U8(*v)],
            AclActionValue::U16(v) => vec![AclDataCell::U16(*v)],
            AclActionValue::U32(v) => vec![AclDataCell::U32(*v)],
            AclActionValue::Ipv4(v) => vec![AclDataCell::Bytes(v.to_vec())],
            AclActionValue::Ipv6(v) => vec![AclDataCell::Bytes(v.to_vec())],
            AclActionValue::Mac(v) => vec![AclDataCell::Bytes(v.to_vec())],
            AclActionValue::PacketAction(v) => vec![AclDataCell::U32(v.code())],
            AclActionValue::ObjId { id, ndi_map } => match self.action_type.value_spec() {
                AclValueSpec::OpaqueData => ndi_map.to_cells(),
                AclValueSpec::IfIndex => vec![AclDataCell::IfIndex(*id as IfIndex)],
                _ => vec![AclDataCell::ObjId(*id)],
            },
            AclActionValue::ObjIdList(map) => map.to_cells(),
            AclActionValue::Port(m) => vec![AclDataCell::IfIndex(m.ifindex)],
            AclActionValue::PortList(ms) => {
                vec![AclDataCell::IfIndexList(ms.iter().map(|m| m.ifindex).collect())]
            }
        }
    }

    /// Returns true for a counter reference.
    pub fn is_counter(&self) -> bool {
        self.action_type == AclActionType::SetCounter
    }

    /// Referenced counter id, once a counter action has a value.
    pub fn counter_id(&self) -> Option<ObjId> {
        match &self.value {
            AclActionValue::ObjId { id, .. } if self.is_counter() => Some(*id),
            _ => None,
        }
    }

    /// Interfaces the action points at.
    pub fn if_index_list(&self) -> Vec<IfIndex> {
        match &self.value {
            AclActionValue::Port(m) => vec![m.ifindex],
            AclActionValue::PortList(ms) => ms.iter().map(|m| m.ifindex).collect(),
            AclActionValue::ObjId { id, .. } if self.action_type == AclActionType::RedirectPort => {
                vec![*id as IfIndex]
            }
            _ => Vec::new(),
        }
    }

    /// Builds the record for `npu_id`.
    ///
    /// `Ok(None)` means the action does not apply to this NPU. A counter
    /// action needs the referenced counter.
    pub fn copy_for_device(
        &self,
        npu_id: NpuId,
        counter: Option<&AclCounter>,
    ) -> AclResult<Option<NdiAclAction>> {
        let value = match &self.value {
            AclActionValue::NoValue => NdiAclActionValue::NoValue,
            AclActionValue::U8(v) => NdiAclActionValue::U8(*v),
            AclActionValue::U16(v) => NdiAclActionValue::U16(*v),
            AclActionValue::U32(v) => NdiAclActionValue::U32(*v),
            AclActionValue::Ipv4(v) => NdiAclActionValue::Ipv4(*v),
            AclActionValue::Ipv6(v) => NdiAclActionValue::Ipv6(*v),
            AclActionValue::Mac(v) => NdiAclActionValue::Mac(*v),
            AclActionValue::PacketAction(v) => NdiAclActionValue::PacketAction(v.code()),
            AclActionValue::ObjId { id, .. } if self.is_counter() => {
                let counter = counter.filter(|c| c.counter_id() == *id).ok_or_else(|| {
                    AclError::failed(format!(
                        "action {}: counter {} not supplied for npu {}",
                        self.name(),
                        id,
                        npu_id
                    ))
                })?;
                NdiAclActionValue::ObjId(counter.ndi_id(npu_id)?)
            }
            AclActionValue::ObjId { id, ndi_map } => {
                let ndi_id = ndi_map.ndi_id(*id, npu_id).ok_or_else(|| {
                    AclError::failed(format!(
                        "action {}: object {} has no hardware id on npu {}",
                        self.name(),
                        id,
                        npu_id
                    ))
                })?;
                debug!("action {}: object {} is 0x{:x} on npu {}", self.name(), id, ndi_id, npu_id);
                NdiAclActionValue::ObjId(ndi_id)
            }
            AclActionValue::ObjIdList(map) => {
                let ndi_ids = map.ndi_ids_on(npu_id);
                if ndi_ids.is_empty() {
                    return Err(AclError::failed(format!(
                        "action {}: no objects on npu {}",
                        self.name(),
                        npu_id
                    )));
                }
                NdiAclActionValue::ObjIdList(ndi_ids)
            }
            AclActionValue::Port(m) => {
                if !m.port.is_on(npu_id) {
                    debug!("action {}: {} not on npu {}, skipped", self.name(), m, npu_id);
                    return Ok(None);
                }
                NdiAclActionValue::Port(m.port)
            }
            AclActionValue::PortList(ms) => {
                let ports: Vec<NdiPort> = ms
                    .iter()
                    .filter(|m| m.port.is_on(npu_id))
                    .map(|m| m.port)
                    .collect();
                if ports.is_empty() {
                    debug!("action {}: no ports on npu {}, skipped", self.name(), npu_id);
                    return Ok(None);
                }
                NdiAclActionValue::PortList(ports)
            }
        };

        Ok(Some(NdiAclAction {
            action_type: self.action_type.code(),
            value,
        }))
    }

    /// Returns true if programming `other` in place of `self` changes
    /// anything.
    ///
    /// Ports compare by ifindex sequence; object ids compare their full
    /// per-NPU mapping.
    pub fn differs(&self, other: &AclAction) -> bool {
        if self.action_type != other.action_type {
            return true;
        }
        match (&self.value, &other.value) {
            (AclActionValue::Port(a), AclActionValue::Port(b)) => a.ifindex != b.ifindex,
            (AclActionValue::PortList(a), AclActionValue::PortList(b)) => {
                !a.iter().map(|m| m.ifindex).eq(b.iter().map(|m| m.ifindex))
            }
            (a, b) => a != b,
        }
    }

    pub fn dbg_dump(&self) {
        debug!("{}", self);
    }
}

impl fmt::Display for AclAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Action {} ({}): {}",
            self.name(),
            self.kind(),
            self.value
        )
    }
}
