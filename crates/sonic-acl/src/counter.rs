//! ACL counter.
//!
//! A counter is owned by a table and referenced from entries through the
//! SET_COUNTER action. It carries its own per-NPU hardware ids; a counter
//! action materializes with those ids instead of an object mapping.

use log::debug;
use std::collections::BTreeSet;
use std::fmt;

use sonic_ndi::{NdiObjIdTable, NpuId, RawNdiObjectId};

use crate::error::{AclError, AclResult};
use crate::types::{AclCounterType, ObjId, SwitchId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AclCounter {
    switch_id: SwitchId,
    table_id: ObjId,
    counter_id: ObjId,
    types: BTreeSet<AclCounterType>,
    ndi_ids: NdiObjIdTable,
}

impl AclCounter {
    pub fn new(switch_id: SwitchId, table_id: ObjId, counter_id: ObjId) -> Self {
        Self {
            switch_id,
            table_id,
            counter_id,
            types: BTreeSet::new(),
            ndi_ids: NdiObjIdTable::new(),
        }
    }

    /// Builder-style counter type.
    pub fn with_type(mut self, counter_type: AclCounterType) -> Self {
        self.types.insert(counter_type);
        self
    }

    pub fn switch_id(&self) -> SwitchId {
        self.switch_id
    }

    pub fn table_id(&self) -> ObjId {
        self.table_id
    }

    pub fn counter_id(&self) -> ObjId {
        self.counter_id
    }

    /// Adds a counter type by code.
    pub fn add_type(&mut self, code: u32) -> AclResult<()> {
        self.types.insert(AclCounterType::try_from(code)?);
        Ok(())
    }

    pub fn types(&self) -> &BTreeSet<AclCounterType> {
        &self.types
    }

    pub fn counts(&self, counter_type: AclCounterType) -> bool {
        self.types.contains(&counter_type)
    }

    /// Records the hardware id created on `npu_id`.
    pub fn set_ndi_id(&mut self, npu_id: NpuId, ndi_id: RawNdiObjectId) {
        self.ndi_ids.insert(npu_id, ndi_id);
    }

    /// Hardware id on `npu_id`.
    pub fn ndi_id(&self, npu_id: NpuId) -> AclResult<RawNdiObjectId> {
        self.ndi_ids.get(&npu_id).copied().ok_or_else(|| {
            AclError::failed(format!(
                "counter {} in table {} not created on npu {}",
                self.counter_id, self.table_id, npu_id
            ))
        })
    }

    pub fn ndi_ids(&self) -> &NdiObjIdTable {
        &self.ndi_ids
    }

    /// Forgets every hardware id, e.g. after the counter was deleted from
    /// hardware.
    pub fn clear_ndi_ids(&mut self) {
        self.ndi_ids.clear();
    }

    /// Returns true if the configured counter types differ.
    pub fn differs(&self, other: &AclCounter) -> bool {
        self.types != other.types
    }

    pub fn dbg_dump(&self) {
        for line in self.to_string().lines() {
            debug!("{}", line);
        }
    }
}

impl fmt::Display for AclCounter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Counter {} (switch {}, table {})",
            self.counter_id, self.switch_id, self.table_id
        )?;
        let types: Vec<&str> = self.types.iter().map(|t| t.name()).collect();
        writeln!(f, "  types: [{}]", types.join(", "))?;
        for (npu, ndi_id) in &self.ndi_ids {
            writeln!(f, "  npu {}: ndi id 0x{:x}", npu, ndi_id)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AclErrorKind;

    #[test]
    fn test_counter_types() {
        let mut counter = AclCounter::new(0, 1, 2);
        counter.add_type(AclCounterType::Packet.code()).unwrap();
        assert!(counter.counts(AclCounterType::Packet));
        assert!(!counter.counts(AclCounterType::Byte));

        let err = counter.add_type(9).unwrap_err();
        assert_eq!(err.kind(), AclErrorKind::InvalidArgument);
    }

    #[test]
    fn test_ndi_ids() {
        let mut counter = AclCounter::new(0, 1, 2);
        counter.set_ndi_id(0, 0xc0);
        assert_eq!(counter.ndi_id(0).unwrap(), 0xc0);

        let err = counter.ndi_id(1).unwrap_err();
        assert_eq!(err.kind(), AclErrorKind::OperationFailed);
        assert!(err.to_string().contains("npu 1"));

        counter.clear_ndi_ids();
        assert!(counter.ndi_ids().is_empty());
    }

    #[test]
    fn test_differs() {
        let a = AclCounter::new(0, 1, 2).with_type(AclCounterType::Byte);
        let mut b = a.clone();
        b.set_ndi_id(0, 0xc0);
        assert!(!a.differs(&b));

        let c = a.clone().with_type(AclCounterType::Packet);
        assert!(a.differs(&c));
    }

    #[test]
    fn test_display() {
        let mut counter = AclCounter::new(0, 1, 2).with_type(AclCounterType::Packet);
        counter.set_ndi_id(0, 0x1f);
        let text = counter.to_string();
        assert!(text.starts_with("Counter 2 (switch 0, table 1)"));
        assert!(text.contains("types: [PACKET]"));
        assert!(text.contains("npu 0: ndi id 0x1f"));
    }
}
