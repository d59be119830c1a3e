//! Value cells exchanged with the protocol layer.
//!
//! An attribute arrives as an ordered list of cells. Each filter or action
//! type documents how many cells it reads and in which order; the typed
//! accessors below do the per-cell shape checks.

use serde::{Deserialize, Serialize};
use std::fmt;

use sonic_ndi::{IfIndex, NdiObjIdTable};

use crate::error::{AclError, AclResult};
use crate::types::ObjId;

/// One decoded value cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AclDataCell {
    U8(u8),
    U16(u16),
    U32(u32),
    /// Fixed-width byte blob (IPv4, IPv6 or MAC address).
    Bytes(Vec<u8>),
    IfIndex(IfIndex),
    IfIndexList(Vec<IfIndex>),
    /// Logical id.
    ObjId(ObjId),
    /// Per-NPU hardware ids.
    NdiObjIdTable(NdiObjIdTable),
}

/// Ordered cell list for one attribute.
pub type AclDataList = Vec<AclDataCell>;

impl AclDataCell {
    /// Short tag naming the variant, used in error messages.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::U8(_) => "u8",
            Self::U16(_) => "u16",
            Self::U32(_) => "u32",
            Self::Bytes(_) => "bytes",
            Self::IfIndex(_) => "ifindex",
            Self::IfIndexList(_) => "ifindex-list",
            Self::ObjId(_) => "obj-id",
            Self::NdiObjIdTable(_) => "npu-map",
        }
    }

    pub fn as_u8(&self) -> AclResult<u8> {
        match self {
            Self::U8(v) => Ok(*v),
            other => Err(mismatch("u8", other)),
        }
    }

    pub fn as_u16(&self) -> AclResult<u16> {
        match self {
            Self::U16(v) => Ok(*v),
            other => Err(mismatch("u16", other)),
        }
    }

    pub fn as_u32(&self) -> AclResult<u32> {
        match self {
            Self::U32(v) => Ok(*v),
            other => Err(mismatch("u32", other)),
        }
    }

    /// Copies a byte blob of exactly `N` bytes.
    pub fn as_bytes<const N: usize>(&self) -> AclResult<[u8; N]> {
        match self {
            Self::Bytes(v) => <[u8; N]>::try_from(v.as_slice()).map_err(|_| {
                AclError::invalid(format!("expected {} bytes, got {}", N, v.len()))
            }),
            other => Err(mismatch("bytes", other)),
        }
    }

    pub fn as_if_index(&self) -> AclResult<IfIndex> {
        match self {
            Self::IfIndex(v) => Ok(*v),
            other => Err(mismatch("ifindex", other)),
        }
    }

    pub fn as_if_index_list(&self) -> AclResult<&[IfIndex]> {
        match self {
            Self::IfIndexList(v) => Ok(v),
            other => Err(mismatch("ifindex-list", other)),
        }
    }

    pub fn as_obj_id(&self) -> AclResult<ObjId> {
        match self {
            Self::ObjId(v) => Ok(*v),
            other => Err(mismatch("obj-id", other)),
        }
    }

    pub fn as_ndi_obj_id_table(&self) -> AclResult<&NdiObjIdTable> {
        match self {
            Self::NdiObjIdTable(v) => Ok(v),
            other => Err(mismatch("npu-map", other)),
        }
    }
}

fn mismatch(expected: &str, got: &AclDataCell) -> AclError {
    AclError::invalid(format!("expected {} cell, got {}", expected, got.tag()))
}

/// Returns the first cell, or `MissingAttribute` naming `what`.
pub(crate) fn first_cell<'a>(cells: &'a [AclDataCell], what: &str) -> AclResult<&'a AclDataCell> {
    cells
        .first()
        .ok_or_else(|| AclError::missing(format!("{}: no value cell", what)))
}

/// Concatenates the interface lists of every cell, in order.
pub(crate) fn if_index_list(cells: &[AclDataCell], what: &str) -> AclResult<Vec<IfIndex>> {
    first_cell(cells, what)?;
    let mut ifindexes = Vec::new();
    for cell in cells {
        ifindexes.extend_from_slice(cell.as_if_index_list()?);
    }
    Ok(ifindexes)
}

/// Formats a MAC address as `aa:bb:cc:dd:ee:ff`.
pub(crate) struct MacDisplay<'a>(pub &'a [u8; 6]);

impl fmt::Display for MacDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let m = self.0;
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            m[0], m[1], m[2], m[3], m[4], m[5]
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AclErrorKind;

    #[test]
    fn test_scalar_accessors() {
        assert_eq!(AclDataCell::U8(255).as_u8().unwrap(), 255);
        assert_eq!(AclDataCell::U16(4094).as_u16().unwrap(), 4094);
        assert_eq!(AclDataCell::U32(7).as_u32().unwrap(), 7);

        let err = AclDataCell::U16(1).as_u8().unwrap_err();
        assert_eq!(err.kind(), AclErrorKind::InvalidArgument);
        assert!(err.to_string().contains("expected u8 cell, got u16"));
    }

    #[test]
    fn test_bytes_width() {
        let cell = AclDataCell::Bytes(vec![10, 0, 0, 1]);
        assert_eq!(cell.as_bytes::<4>().unwrap(), [10, 0, 0, 1]);
        assert!(cell.as_bytes::<6>().is_err());
        assert!(AclDataCell::U8(0).as_bytes::<4>().is_err());
    }

    #[test]
    fn test_first_cell_missing() {
        let err = first_cell(&[], "SET_TC").unwrap_err();
        assert_eq!(err.kind(), AclErrorKind::MissingAttribute);
        assert!(err.to_string().contains("SET_TC"));
    }

    #[test]
    fn test_mac_display() {
        let mac = [0x00, 0x1b, 0x21, 0xff, 0x0a, 0x01];
        assert_eq!(MacDisplay(&mac).to_string(), "00:1b:21:ff:0a:01");
    }

    #[test]
    fn test_cell_serde() {
        let cells: AclDataList = vec![
            AclDataCell::ObjId(5),
            AclDataCell::NdiObjIdTable(NdiObjIdTable::from([(0, 0x50), (1, 0x51)])),
        ];
        let json = serde_json::to_string(&cells).unwrap();
        let back: AclDataList = serde_json::from_str(&json).unwrap();
        assert_eq!(back, cells);
    }

    #[test]
    fn test_if_index_list_spans_cells() {
        let cells = vec![
            AclDataCell::IfIndexList(vec![3, 1]),
            AclDataCell::IfIndexList(vec![]),
            AclDataCell::IfIndexList(vec![2]),
        ];
        assert_eq!(if_index_list(&cells, "IN_PORTS").unwrap(), vec![3, 1, 2]);

        let err = if_index_list(&[], "IN_PORTS").unwrap_err();
        assert_eq!(err.kind(), AclErrorKind::MissingAttribute);

        let mixed = [AclDataCell::IfIndexList(vec![1]), AclDataCell::IfIndex(2)];
        let err = if_index_list(&mixed, "IN_PORTS").unwrap_err();
        assert_eq!(err.kind(), AclErrorKind::InvalidArgument);
    }
}
