//! Logical id to per-NPU hardware id mapping.
//!
//! Opaque action and filter values (next hops, policers, mirror sessions,
//! router interfaces) are created elsewhere and handed to this subsystem
//! already resolved per NPU. The mapping is pure lookup data.

use std::collections::BTreeMap;
use std::fmt;

use sonic_ndi::{NdiObjIdTable, NpuId, RawNdiObjectId};

use crate::cell::{AclDataCell, AclDataList};
use crate::error::{AclError, AclResult};
use crate::types::ObjId;

/// `logical id -> (npu -> hardware id)`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AclObjIdMap {
    map: BTreeMap<ObjId, NdiObjIdTable>,
}

impl AclObjIdMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a mapping from `(logical id, npu map)` cell pairs.
    ///
    /// Pairs are read from the start of the list; a trailing unpaired cell
    /// is ignored. Later pairs for the same logical id replace earlier ones.
    pub fn from_cells(cells: &[AclDataCell]) -> AclResult<Self> {
        if cells.len() < 2 {
            return Err(AclError::missing(format!(
                "opaque value needs (id, npu map) pairs, got {} cell(s)",
                cells.len()
            )));
        }

        let mut map = Self::new();
        for pair in cells.chunks_exact(2) {
            let id = pair[0].as_obj_id()?;
            let ndi_ids = pair[1].as_ndi_obj_id_table()?;
            map.insert(id, ndi_ids.clone());
        }
        Ok(map)
    }

    /// Emits `(logical id, npu map)` pairs in ascending id order.
    pub fn to_cells(&self) -> AclDataList {
        self.map
            .iter()
            .flat_map(|(id, ndi_ids)| {
                [
                    AclDataCell::ObjId(*id),
                    AclDataCell::NdiObjIdTable(ndi_ids.clone()),
                ]
            })
            .collect()
    }

    /// Inserts or replaces the NPU map of a logical id.
    pub fn insert(&mut self, id: ObjId, ndi_ids: NdiObjIdTable) {
        self.map.insert(id, ndi_ids);
    }

    /// Hardware id of `id` on `npu_id`.
    pub fn ndi_id(&self, id: ObjId, npu_id: NpuId) -> Option<RawNdiObjectId> {
        self.map.get(&id)?.get(&npu_id).copied()
    }

    /// Hardware ids present on `npu_id`, across all logical ids.
    pub fn ndi_ids_on(&self, npu_id: NpuId) -> Vec<RawNdiObjectId> {
        self.map
            .values()
            .filter_map(|ndi_ids| ndi_ids.get(&npu_id).copied())
            .collect()
    }

    /// Lowest logical id, if any.
    pub fn first_id(&self) -> Option<ObjId> {
        self.map.keys().next().copied()
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

impl fmt::Display for AclObjIdMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (id, ndi_ids)) in self.map.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}: [", id)?;
            for (j, (npu, ndi_id)) in ndi_ids.iter().enumerate() {
                if j > 0 {
                    write!(f, " ")?;
                }
                write!(f, "npu{}=0x{:x}", npu, ndi_id)?;
            }
            write!(f, "]")?;
        }
        write!(f, "}}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AclErrorKind;
    use pretty_assertions::assert_eq;

    fn table(entries: &[(NpuId, RawNdiObjectId)]) -> NdiObjIdTable {
        entries.iter().copied().collect()
    }

    #[test]
    fn test_from_cells_pairs() {
        let cells = vec![
            AclDataCell::ObjId(9),
            AclDataCell::NdiObjIdTable(table(&[(0, 0x90)])),
            AclDataCell::ObjId(3),
            AclDataCell::NdiObjIdTable(table(&[(0, 0x30), (1, 0x31)])),
        ];
        let map = AclObjIdMap::from_cells(&cells).unwrap();

        assert_eq!(map.len(), 2);
        assert_eq!(map.ndi_id(3, 1), Some(0x31));
        assert_eq!(map.ndi_id(9, 1), None);
        assert_eq!(map.first_id(), Some(3));
        assert_eq!(map.ndi_ids_on(0), vec![0x30, 0x90]);
    }

    #[test]
    fn test_later_pair_overwrites() {
        let cells = vec![
            AclDataCell::ObjId(1),
            AclDataCell::NdiObjIdTable(table(&[(0, 0x10)])),
            AclDataCell::ObjId(1),
            AclDataCell::NdiObjIdTable(table(&[(0, 0x11)])),
        ];
        let map = AclObjIdMap::from_cells(&cells).unwrap();
        assert_eq!(map.len(), 1);
        assert_eq!(map.ndi_id(1, 0), Some(0x11));
    }

    #[test]
    fn test_trailing_cell_ignored() {
        let cells = vec![
            AclDataCell::ObjId(1),
            AclDataCell::NdiObjIdTable(table(&[(0, 0x10)])),
            AclDataCell::ObjId(2),
        ];
        let map = AclObjIdMap::from_cells(&cells).unwrap();
        assert_eq!(map.len(), 1);
        assert_eq!(map.ndi_id(2, 0), None);
    }

    #[test]
    fn test_too_few_cells() {
        let err = AclObjIdMap::from_cells(&[AclDataCell::ObjId(1)]).unwrap_err();
        assert_eq!(err.kind(), AclErrorKind::MissingAttribute);
    }

    #[test]
    fn test_wrong_cell_shape() {
        let cells = vec![AclDataCell::U32(1), AclDataCell::ObjId(1)];
        let err = AclObjIdMap::from_cells(&cells).unwrap_err();
        assert_eq!(err.kind(), AclErrorKind::InvalidArgument);
    }

    #[test]
    fn test_to_cells_sorted_by_id() {
        let mut map = AclObjIdMap::new();
        map.insert(7, table(&[(0, 0x70)]));
        map.insert(2, table(&[(1, 0x21)]));

        assert_eq!(
            map.to_cells(),
            vec![
                AclDataCell::ObjId(2),
                AclDataCell::NdiObjIdTable(table(&[(1, 0x21)])),
                AclDataCell::ObjId(7),
                AclDataCell::NdiObjIdTable(table(&[(0, 0x70)])),
            ]
        );
    }

    #[test]
    fn test_display() {
        let mut map = AclObjIdMap::new();
        map.insert(4, table(&[(0, 0x40), (1, 0x41)]));
        map.insert(5, table(&[]));
        assert_eq!(map.to_string(), "{4: [npu0=0x40 npu1=0x41], 5: []}");
    }

    #[test]
    fn test_ndi_ids_on() {
        let mut map = AclObjIdMap::new();
        map.insert(1, table(&[(0, 0x10), (2, 0x12)]));
        map.insert(2, table(&[(0, 0x20)]));

        assert_eq!(map.ndi_ids_on(0), vec![0x10, 0x20]);
        assert_eq!(map.ndi_ids_on(2), vec![0x12]);
        assert!(map.ndi_ids_on(1).is_empty());
    }
}
