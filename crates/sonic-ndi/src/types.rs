//! Core device-layer types.
//!
//! Hardware object ids are only meaningful on the NPU that issued them, so
//! anything that must be programmed into more than one NPU carries an
//! [`NdiObjIdTable`] rather than a single id.

use std::collections::BTreeMap;
use std::fmt;

/// NPU (hardware forwarding engine) identifier.
pub type NpuId = u32;

/// Raw hardware object ID, as returned by the backend for one NPU.
pub type RawNdiObjectId = u64;

/// Kernel-style interface index used by the control plane to name ports
/// and LAGs.
pub type IfIndex = u32;

/// Per-NPU hardware ids of one logical object.
///
/// At most one hardware id per NPU. Ordered so that iteration and dumps are
/// deterministic.
pub type NdiObjIdTable = BTreeMap<NpuId, RawNdiObjectId>;

/// A port local to one NPU.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct NdiPort {
    /// NPU the port belongs to.
    pub npu_id: NpuId,
    /// Port number local to that NPU.
    pub port_id: u32,
}

impl NdiPort {
    /// Creates a new device-local port.
    pub const fn new(npu_id: NpuId, port_id: u32) -> Self {
        Self { npu_id, port_id }
    }

    /// Returns true if the port lives on the given NPU.
    pub const fn is_on(&self, npu_id: NpuId) -> bool {
        self.npu_id == npu_id
    }
}

impl fmt::Display for NdiPort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "npu{}/port{}", self.npu_id, self.port_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_port_is_on() {
        let port = NdiPort::new(2, 17);
        assert!(port.is_on(2));
        assert!(!port.is_on(0));
    }

    #[test]
    fn test_port_display() {
        assert_eq!(NdiPort::new(1, 5).to_string(), "npu1/port5");
    }

    #[test]
    fn test_obj_id_table_is_ordered() {
        let mut tbl = NdiObjIdTable::new();
        tbl.insert(3, 0x30);
        tbl.insert(0, 0x10);
        tbl.insert(1, 0x20);

        let npus: Vec<NpuId> = tbl.keys().copied().collect();
        assert_eq!(npus, vec![0, 1, 3]);
    }
}
