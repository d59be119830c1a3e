//! ACL filter (match field).
//!
//! Filters follow the same value contract as actions, with two
//! differences: maskable values take an optional second cell for the mask
//! and always emit two cells, and interface filters never resolve LAGs.

use log::debug;
use std::collections::BTreeSet;
use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};

use sonic_ndi::{InterfaceMapper, NdiAclFilter, NdiAclFilterValue, NdiPort, NpuId};

use crate::cell::{first_cell, if_index_list, AclDataCell, AclDataList, MacDisplay};
use crate::error::{AclError, AclResult};
use crate::obj_map::AclObjIdMap;
use crate::types::{
    AclIfPort, AclIpFrag, AclIpType, AclMatchType, AclValueKind, AclValueSpec, ObjId,
    PortListDisplay,
};

/// Value held by a filter.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AclFilterValue {
    #[default]
    NoValue,
    U8 { data: u8, mask: u8 },
    U16 { data: u16, mask: u16 },
    U32 { data: u32, mask: u32 },
    Ipv4 { data: [u8; 4], mask: [u8; 4] },
    Ipv6 { data: [u8; 16], mask: [u8; 16] },
    Mac { data: [u8; 6], mask: [u8; 6] },
    IpType(AclIpType),
    IpFrag(AclIpFrag),
    ObjId { id: ObjId, ndi_map: AclObjIdMap },
    ObjIdList(AclObjIdMap),
    Port(AclIfPort),
    PortList(Vec<AclIfPort>),
}

impl AclFilterValue {
    pub fn kind(&self) -> AclValueKind {
        match self {
            Self::NoValue => AclValueKind::None,
            Self::U8 { .. } => AclValueKind::U8,
            Self::U16 { .. } => AclValueKind::U16,
            Self::U32 { .. } => AclValueKind::U32,
            Self::Ipv4 { .. } => AclValueKind::Ipv4,
            Self::Ipv6 { .. } => AclValueKind::Ipv6,
            Self::Mac { .. } => AclValueKind::Mac,
            Self::IpType(_) => AclValueKind::IpType,
            Self::IpFrag(_) => AclValueKind::IpFrag,
            Self::ObjId { .. } => AclValueKind::ObjId,
            Self::ObjIdList(_) => AclValueKind::ObjIdList,
            Self::Port(_) => AclValueKind::Port,
            Self::PortList(_) => AclValueKind::PortList,
        }
    }
}

impl fmt::Display for AclFilterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoValue => write!(f, "-"),
            Self::U8 { data, mask } => write!(f, "{} mask 0x{:x}", data, mask),
            Self::U16 { data, mask } => write!(f, "{} mask 0x{:x}", data, mask),
            Self::U32 { data, mask } => write!(f, "{} mask 0x{:x}", data, mask),
            Self::Ipv4 { data, mask } => {
                write!(f, "{} mask {}", Ipv4Addr::from(*data), Ipv4Addr::from(*mask))
            }
            Self::Ipv6 { data, mask } => {
                write!(f, "{} mask {}", Ipv6Addr::from(*data), Ipv6Addr::from(*mask))
            }
            Self::Mac { data, mask } => write!(f, "{} mask {}", MacDisplay(data), MacDisplay(mask)),
            Self::IpType(v) => write!(f, "{}", v),
            Self::IpFrag(v) => write!(f, "{}", v),
            Self::ObjId { id, ndi_map } if ndi_map.is_empty() => write!(f, "id {}", id),
            Self::ObjId { id, ndi_map } => write!(f, "id {} {}", id, ndi_map),
            Self::ObjIdList(map) => write!(f, "{}", map),
            Self::Port(m) => write!(f, "{}", m),
            Self::PortList(ms) => write!(f, "{}", PortListDisplay(ms)),
        }
    }
}

/// One match field of an entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AclFilter {
    filter_type: AclMatchType,
    value: AclFilterValue,
}

/// Reads the data cell and the optional mask cell.
fn data_and_mask<T: Default>(
    cells: &[AclDataCell],
    what: &str,
    get: impl Fn(&AclDataCell) -> AclResult<T>,
) -> AclResult<(T, T)> {
    let data = get(first_cell(cells, what)?)?;
    let mask = match cells.get(1) {
        Some(cell) => get(cell)?,
        None => T::default(),
    };
    Ok((data, mask))
}

impl AclFilter {
    /// Creates a filter with no value from a type code.
    pub fn new(type_code: u32) -> AclResult<Self> {
        Ok(Self::from_type(AclMatchType::try_from(type_code)?))
    }

    pub fn from_type(filter_type: AclMatchType) -> Self {
        Self {
            filter_type,
            value: AclFilterValue::NoValue,
        }
    }

    pub fn filter_type(&self) -> AclMatchType {
        self.filter_type
    }

    pub fn name(&self) -> &'static str {
        self.filter_type.name()
    }

    pub fn value(&self) -> &AclFilterValue {
        &self.value
    }

    pub fn kind(&self) -> AclValueKind {
        self.value.kind()
    }

    /// Sets the value from protocol cells. A failure leaves the filter
    /// unchanged.
    pub fn set_value(&mut self, cells: &[AclDataCell], intf: &dyn InterfaceMapper) -> AclResult<()> {
        self.value = self.parse_value(cells, intf)?;
        Ok(())
    }

    fn parse_value(&self, cells: &[AclDataCell], intf: &dyn InterfaceMapper) -> AclResult<AclFilterValue> {
        let what = self.name();
        let spec = self.filter_type.value_spec();
        let value = match spec {
            AclValueSpec::NoValue => AclFilterValue::NoValue,
            AclValueSpec::U8 => {
                let (data, mask) = data_and_mask(cells, what, AclDataCell::as_u8)?;
                AclFilterValue::U8 { data, mask }
            }
            AclValueSpec::U16 => {
                let (data, mask) = data_and_mask(cells, what, AclDataCell::as_u16)?;
                AclFilterValue::U16 { data, mask }
            }
            AclValueSpec::U32 => {
                let (data, mask) = data_and_mask(cells, what, AclDataCell::as_u32)?;
                AclFilterValue::U32 { data, mask }
            }
            AclValueSpec::Ipv4 => {
                let (data, mask) = data_and_mask(cells, what, AclDataCell::as_bytes::<4>)?;
                AclFilterValue::Ipv4 { data, mask }
            }
            AclValueSpec::Ipv6 => {
                let (data, mask) = data_and_mask(cells, what, AclDataCell::as_bytes::<16>)?;
                AclFilterValue::Ipv6 { data, mask }
            }
            AclValueSpec::Mac => {
                let (data, mask) = data_and_mask(cells, what, AclDataCell::as_bytes::<6>)?;
                AclFilterValue::Mac { data, mask }
            }
            AclValueSpec::IpType => {
                let code = first_cell(cells, what)?.as_u32()?;
                AclFilterValue::IpType(AclIpType::try_from(code)?)
            }
            AclValueSpec::IpFrag => {
                let code = first_cell(cells, what)?.as_u32()?;
                AclFilterValue::IpFrag(AclIpFrag::try_from(code)?)
            }
            AclValueSpec::ObjId => AclFilterValue::ObjId {
                id: first_cell(cells, what)?.as_obj_id()?,
                ndi_map: AclObjIdMap::new(),
            },
            AclValueSpec::OpaqueData => {
                let ndi_map = AclObjIdMap::from_cells(cells)?;
                let id = ndi_map
                    .first_id()
                    .ok_or_else(|| AclError::missing(format!("{}: no object id", what)))?;
                AclFilterValue::ObjId { id, ndi_map }
            }
            AclValueSpec::OpaqueDataList => AclFilterValue::ObjIdList(AclObjIdMap::from_cells(cells)?),
            AclValueSpec::IfIndex => {
                let ifindex = first_cell(cells, what)?.as_if_index()?;
                AclFilterValue::Port(AclIfPort::resolve(intf, ifindex, what)?)
            }
            AclValueSpec::IfIndexList => {
                let ifindexes = if_index_list(cells, what)?;
                AclFilterValue::PortList(AclIfPort::resolve_all(intf, &ifindexes, what)?)
            }
            AclValueSpec::PacketAction => {
                return Err(AclError::invalid(format!(
                    "{}: {:?} is not a filter value",
                    what, spec
                )))
            }
        };
        Ok(value)
    }

    /// Emits the value as protocol cells. Maskable values emit value then
    /// mask.
    pub fn get_value(&self) -> AclDataList {
        match &self.value {
            AclFilterValue::NoValue => Vec::new(),
            AclFilterValue::U8 { data, mask } => vec![AclDataCell::U8(*data), AclDataCell::U8(*mask)],
            AclFilterValue::U16 { data, mask } => {
                vec![AclDataCell::U16(*data), AclDataCell::U16(*mask)]
            }
            AclFilterValue::U32 { data, mask } => {
                vec![AclDataCell::U32(*data), AclDataCell::U32(*mask)]
            }
            AclFilterValue::Ipv4 { data, mask } => {
                vec![AclDataCell::Bytes(data.to_vec()), AclDataCell::Bytes(mask.to_vec())]
            }
            AclFilterValue::Ipv6 { data, mask } => {
                vec![AclDataCell::Bytes(data.to_vec()), AclDataCell::Bytes(mask.to_vec())]
            }
            AclFilterValue::Mac { data, mask } => {
                vec![AclDataCell::Bytes(data.to_vec()), AclDataCell::Bytes(mask.to_vec())]
            }
            AclFilterValue::IpType(v) => vec![AclDataCell::U32(v.code())],
            AclFilterValue::IpFrag(v) => vec![AclDataCell::U32(v.code())],
            AclFilterValue::ObjId { id, ndi_map } => match self.filter_type.value_spec() {
                AclValueSpec::OpaqueData => ndi_map.to_cells(),
                _ => vec![AclDataCell::ObjId(*id)],
            },
            AclFilterValue::ObjIdList(map) => map.to_cells(),
            AclFilterValue::Port(m) => vec![AclDataCell::IfIndex(m.ifindex)],
            AclFilterValue::PortList(ms) => {
                vec![AclDataCell::IfIndexList(ms.iter().map(|m| m.ifindex).collect())]
            }
        }
    }

    /// Returns true if the filter only applies to the NPUs of its ports.
    pub fn is_npu_specific(&self) -> bool {
        matches!(self.value, AclFilterValue::Port(_) | AclFilterValue::PortList(_))
    }

    /// NPUs the filter's ports live on. Empty for filters that are not
    /// NPU specific.
    pub fn npu_list(&self) -> BTreeSet<NpuId> {
        match &self.value {
            AclFilterValue::Port(m) => BTreeSet::from([m.port.npu_id]),
            AclFilterValue::PortList(ms) => ms.iter().map(|m| m.port.npu_id).collect(),
            _ => BTreeSet::new(),
        }
    }

    /// Builds the record for `npu_id`. `Ok(None)` means the filter has no
    /// ports on this NPU.
    pub fn copy_for_device(&self, npu_id: NpuId) -> AclResult<Option<NdiAclFilter>> {
        let value = match &self.value {
            AclFilterValue::NoValue => NdiAclFilterValue::NoValue,
            AclFilterValue::U8 { data, mask } => NdiAclFilterValue::U8 { data: *data, mask: *mask },
            AclFilterValue::U16 { data, mask } => NdiAclFilterValue::U16 { data: *data, mask: *mask },
            AclFilterValue::U32 { data, mask } => NdiAclFilterValue::U32 { data: *data, mask: *mask },
            AclFilterValue::Ipv4 { data, mask } => NdiAclFilterValue::Ipv4 { data: *data, mask: *mask },
            AclFilterValue::Ipv6 { data, mask } => NdiAclFilterValue::Ipv6 { data: *data, mask: *mask },
            AclFilterValue::Mac { data, mask } => NdiAclFilterValue::Mac { data: *data, mask: *mask },
            AclFilterValue::IpType(v) => NdiAclFilterValue::IpType(v.code()),
            AclFilterValue::IpFrag(v) => NdiAclFilterValue::IpFrag(v.code()),
            AclFilterValue::ObjId { id, ndi_map } => {
                let ndi_id = ndi_map.ndi_id(*id, npu_id).ok_or_else(|| {
                    AclError::failed(format!(
                        "filter {}: object {} has no hardware id on npu {}",
                        self.name(),
                        id,
                        npu_id
                    ))
                })?;
                NdiAclFilterValue::ObjId(ndi_id)
            }
            AclFilterValue::ObjIdList(map) => {
                let ndi_ids = map.ndi_ids_on(npu_id);
                if ndi_ids.is_empty() {
                    return Err(AclError::failed(format!(
                        "filter {}: no objects on npu {}",
                        self.name(),
                        npu_id
                    )));
                }
                NdiAclFilterValue::ObjIdList(ndi_ids)
            }
            AclFilterValue::Port(m) => {
                if !m.port.is_on(npu_id) {
                    debug!("filter {}: {} not on npu {}, skipped", self.name(), m, npu_id);
                    return Ok(None);
                }
                NdiAclFilterValue::Port(m.port)
            }
            AclFilterValue::PortList(ms) => {
                let ports: Vec<NdiPort> = ms
                    .iter()
                    .filter(|m| m.port.is_on(npu_id))
                    .map(|m| m.port)
                    .collect();
                if ports.is_empty() {
                    debug!("filter {}: no ports on npu {}, skipped", self.name(), npu_id);
                    return Ok(None);
                }
                NdiAclFilterValue::PortList(ports)
            }
        };

        Ok(Some(NdiAclFilter {
            filter_type: self.filter_type.code(),
            value,
        }))
    }

    /// Returns true if programming `other` in place of `self` changes
    /// anything.
    pub fn differs(&self, other: &AclFilter) -> bool {
        if self.filter_type != other.filter_type {
            return true;
        }
        match (&self.value, &other.value) {
            (AclFilterValue::Port(a), AclFilterValue::Port(b)) => a.ifindex != b.ifindex,
            (AclFilterValue::PortList(a), AclFilterValue::PortList(b)) => {
                !a.iter().map(|m| m.ifindex).eq(b.iter().map(|m| m.ifindex))
            }
            (a, b) => a != b,
        }
    }

    pub fn dbg_dump(&self) {
        debug!("{}", self);
    }
}

impl fmt::Display for AclFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Filter {} ({}): {}",
            self.name(),
            self.kind(),
            self.value
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AclErrorKind;
    use pretty_assertions::assert_eq;
    use sonic_ndi::{NdiObjIdTable, StaticInterfaceMap};

    fn intf() -> StaticInterfaceMap {
        let mut intf = StaticInterfaceMap::new();
        intf.add_port(1, NdiPort::new(0, 1));
        intf.add_port(2, NdiPort::new(2, 2));
        intf.add_port(3, NdiPort::new(0, 3));
        intf.add_port(4, NdiPort::new(2, 4));
        intf.add_lag(100, NdiObjIdTable::from([(0, 0xa0)]));
        intf
    }

    fn filter(filter_type: AclMatchType, cells: Vec<AclDataCell>) -> AclFilter {
        let mut f = AclFilter::from_type(filter_type);
        f.set_value(&cells, &intf()).unwrap();
        f
    }

    #[test]
    fn test_new_validates_type() {
        assert!(AclFilter::new(AclMatchType::Dscp.code()).is_ok());
        let err = AclFilter::new(500).unwrap_err();
        assert_eq!(err.kind(), AclErrorKind::InvalidArgument);
    }

    #[test]
    fn test_maskable_round_trip() {
        for v in [0u8, 255] {
            let cells = vec![AclDataCell::U8(v), AclDataCell::U8(0x3f)];
            assert_eq!(filter(AclMatchType::Dscp, cells.clone()).get_value(), cells);
        }

        let cells = vec![
            AclDataCell::Bytes(vec![255; 4]),
            AclDataCell::Bytes(vec![255, 255, 255, 0]),
        ];
        assert_eq!(filter(AclMatchType::SrcIp, cells.clone()).get_value(), cells);

        let cells = vec![AclDataCell::Bytes(vec![0; 6]), AclDataCell::Bytes(vec![0xff; 6])];
        assert_eq!(filter(AclMatchType::DstMac, cells.clone()).get_value(), cells);
    }

    #[test]
    fn test_mask_defaults_to_zero() {
        let f = filter(AclMatchType::L4DstPort, vec![AclDataCell::U16(443)]);
        assert_eq!(f.value(), &AclFilterValue::U16 { data: 443, mask: 0 });
        assert_eq!(
            f.get_value(),
            vec![AclDataCell::U16(443), AclDataCell::U16(0)]
        );

        let f = filter(AclMatchType::SrcIpv6, vec![AclDataCell::Bytes(vec![1; 16])]);
        assert_eq!(
            f.value(),
            &AclFilterValue::Ipv6 {
                data: [1; 16],
                mask: [0; 16]
            }
        );
    }

    #[test]
    fn test_bad_mask_keeps_value() {
        let mut f = filter(AclMatchType::Ttl, vec![AclDataCell::U8(64)]);
        let err = f
            .set_value(&[AclDataCell::U8(1), AclDataCell::U16(1)], &intf())
            .unwrap_err();
        assert_eq!(err.kind(), AclErrorKind::InvalidArgument);
        assert_eq!(f.value(), &AclFilterValue::U8 { data: 64, mask: 0 });
    }

    #[test]
    fn test_missing_value() {
        let mut f = AclFilter::from_type(AclMatchType::EtherType);
        let err = f.set_value(&[], &intf()).unwrap_err();
        assert_eq!(err.kind(), AclErrorKind::MissingAttribute);
    }

    #[test]
    fn test_ip_type_and_frag() {
        let f = filter(
            AclMatchType::IpType,
            vec![AclDataCell::U32(AclIpType::ArpReply.code())],
        );
        assert_eq!(f.value(), &AclFilterValue::IpType(AclIpType::ArpReply));
        assert_eq!(f.kind(), AclValueKind::IpType);

        let mut f = AclFilter::from_type(AclMatchType::IpType);
        assert_eq!(
            f.set_value(&[AclDataCell::U32(0)], &intf()).unwrap_err().kind(),
            AclErrorKind::InvalidArgument
        );

        let f = filter(
            AclMatchType::IpFrag,
            vec![AclDataCell::U32(AclIpFrag::NonHead.code())],
        );
        let rec = f.copy_for_device(0).unwrap().unwrap();
        assert_eq!(rec.value, NdiAclFilterValue::IpFrag(5));

        let mut f = AclFilter::from_type(AclMatchType::IpFrag);
        assert!(f.set_value(&[AclDataCell::U32(6)], &intf()).is_err());
    }

    #[test]
    fn test_port_list_materialization() {
        let f = filter(
            AclMatchType::InPorts,
            vec![AclDataCell::IfIndexList(vec![4, 1, 2, 3])],
        );
        assert!(f.is_npu_specific());
        assert_eq!(f.npu_list(), BTreeSet::from([0, 2]));

        assert!(f.copy_for_device(1).unwrap().is_none());

        let rec = f.copy_for_device(0).unwrap().unwrap();
        assert_eq!(
            rec.value,
            NdiAclFilterValue::PortList(vec![NdiPort::new(0, 1), NdiPort::new(0, 3)])
        );
        let rec = f.copy_for_device(2).unwrap().unwrap();
        assert_eq!(
            rec.value,
            NdiAclFilterValue::PortList(vec![NdiPort::new(2, 4), NdiPort::new(2, 2)])
        );
    }

    #[test]
    fn test_port_list_rejects_lag() {
        let mut f = filter(AclMatchType::OutPorts, vec![AclDataCell::IfIndexList(vec![3])]);
        let err = f
            .set_value(&[AclDataCell::IfIndexList(vec![100, 1])], &intf())
            .unwrap_err();
        assert_eq!(err.kind(), AclErrorKind::InvalidArgument);
        assert_eq!(f.get_value(), vec![AclDataCell::IfIndexList(vec![3])]);
    }

    #[test]
    fn test_port_list_spans_cells() {
        let f = filter(
            AclMatchType::InPorts,
            vec![
                AclDataCell::IfIndexList(vec![1]),
                AclDataCell::IfIndexList(vec![2, 3]),
            ],
        );
        assert_eq!(f.get_value(), vec![AclDataCell::IfIndexList(vec![1, 2, 3])]);
        assert_eq!(f.npu_list(), BTreeSet::from([0, 2]));

        let mut f = AclFilter::from_type(AclMatchType::InPorts);
        let err = f.set_value(&[], &intf()).unwrap_err();
        assert_eq!(err.kind(), AclErrorKind::MissingAttribute);
    }

    #[test]
    fn test_in_port_rejects_lag() {
        let mut f = AclFilter::from_type(AclMatchType::InPort);
        let err = f.set_value(&[AclDataCell::IfIndex(100)], &intf()).unwrap_err();
        assert_eq!(err.kind(), AclErrorKind::InvalidArgument);

        let f = filter(AclMatchType::InPort, vec![AclDataCell::IfIndex(2)]);
        assert!(f.copy_for_device(0).unwrap().is_none());
        assert_eq!(
            f.copy_for_device(2).unwrap().unwrap().value,
            NdiAclFilterValue::Port(NdiPort::new(2, 2))
        );
    }

    #[test]
    fn test_opaque_filter() {
        let cells = vec![
            AclDataCell::ObjId(12),
            AclDataCell::NdiObjIdTable(NdiObjIdTable::from([(0, 0x120)])),
        ];
        let f = filter(AclMatchType::SrcIntf, cells.clone());
        assert_eq!(f.get_value(), cells);
        assert!(!f.is_npu_specific());
        assert_eq!(
            f.copy_for_device(0).unwrap().unwrap().value,
            NdiAclFilterValue::ObjId(0x120)
        );

        let err = f.copy_for_device(2).unwrap_err();
        assert_eq!(err.kind(), AclErrorKind::OperationFailed);
        assert!(err.to_string().contains("SRC_INTF"));
    }

    #[test]
    fn test_differs() {
        let a = filter(AclMatchType::Dscp, vec![AclDataCell::U8(10)]);
        let b = filter(AclMatchType::Dscp, vec![AclDataCell::U8(10), AclDataCell::U8(0x3f)]);
        assert!(!a.differs(&a.clone()));
        assert!(a.differs(&b));

        let p1 = filter(AclMatchType::InPorts, vec![AclDataCell::IfIndexList(vec![1, 3])]);
        let p2 = filter(AclMatchType::InPorts, vec![AclDataCell::IfIndexList(vec![3, 1])]);
        assert!(p1.differs(&p2));
    }

    #[test]
    fn test_display() {
        let f = filter(
            AclMatchType::SrcIp,
            vec![
                AclDataCell::Bytes(vec![10, 1, 0, 0]),
                AclDataCell::Bytes(vec![255, 255, 0, 0]),
            ],
        );
        assert_eq!(
            f.to_string(),
            "Filter SRC_IP (IPV4_ADDR): 10.1.0.0 mask 255.255.0.0"
        );
    }
}
