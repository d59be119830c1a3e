//! Interface mapping.
//!
//! The control plane names interfaces by ifindex. Programming an ACL needs
//! the NPU and device-local port behind a physical interface, or the
//! per-NPU hardware ids of a LAG. The interface manager owns that mapping;
//! the ACL object model only queries it through [`InterfaceMapper`].

use log::debug;
use std::collections::HashMap;

use crate::error::{NdiError, NdiResult};
use crate::types::{IfIndex, NdiObjIdTable, NdiPort};

/// Read-only view of the interface manager.
pub trait InterfaceMapper {
    /// Returns true if the ifindex denotes a LAG (link aggregation group).
    fn is_lag(&self, ifindex: IfIndex) -> bool;

    /// Resolves a physical interface to its NPU and device-local port.
    fn port_of(&self, ifindex: IfIndex) -> NdiResult<NdiPort>;

    /// Returns the per-NPU hardware ids of a LAG.
    fn lag_ndi_ids(&self, ifindex: IfIndex) -> NdiResult<NdiObjIdTable>;
}

/// In-memory interface mapping.
///
/// Suitable for simulations and tests, or for callers that mirror the
/// interface manager's state locally.
#[derive(Debug, Clone, Default)]
pub struct StaticInterfaceMap {
    ports: HashMap<IfIndex, NdiPort>,
    lags: HashMap<IfIndex, NdiObjIdTable>,
}

impl StaticInterfaceMap {
    /// Creates an empty mapping.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a physical interface.
    pub fn add_port(&mut self, ifindex: IfIndex, port: NdiPort) {
        self.lags.remove(&ifindex);
        self.ports.insert(ifindex, port);
    }

    /// Registers a LAG with its per-NPU hardware ids.
    pub fn add_lag(&mut self, ifindex: IfIndex, ndi_ids: NdiObjIdTable) {
        self.ports.remove(&ifindex);
        self.lags.insert(ifindex, ndi_ids);
    }

}

impl InterfaceMapper for StaticInterfaceMap {
    fn is_lag(&self, ifindex: IfIndex) -> bool {
        self.lags.contains_key(&ifindex)
    }

    fn port_of(&self, ifindex: IfIndex) -> NdiResult<NdiPort> {
        if self.lags.contains_key(&ifindex) {
            debug!("ifindex {} is a LAG, no single port", ifindex);
            return Err(NdiError::UnknownInterface { ifindex });
        }
        self.ports
            .get(&ifindex)
            .copied()
            .ok_or(NdiError::UnknownInterface { ifindex })
    }

    fn lag_ndi_ids(&self, ifindex: IfIndex) -> NdiResult<NdiObjIdTable> {
        match self.lags.get(&ifindex) {
            Some(ids) => Ok(ids.clone()),
            None if self.ports.contains_key(&ifindex) => Err(NdiError::NotALag { ifindex }),
            None => Err(NdiError::UnknownInterface { ifindex }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> StaticInterfaceMap {
        let mut intf = StaticInterfaceMap::new();
        intf.add_port(1, NdiPort::new(0, 1));
        intf.add_port(2, NdiPort::new(1, 7));
        intf.add_lag(100, NdiObjIdTable::from([(0, 0xa0), (1, 0xa1)]));
        intf
    }

    #[test]
    fn test_port_lookup() {
        let intf = sample();
        assert_eq!(intf.port_of(2).unwrap(), NdiPort::new(1, 7));
        assert!(!intf.is_lag(2));
        assert_eq!(
            intf.port_of(9).unwrap_err(),
            NdiError::UnknownInterface { ifindex: 9 }
        );
    }

    #[test]
    fn test_lag_lookup() {
        let intf = sample();
        assert!(intf.is_lag(100));
        assert_eq!(intf.lag_ndi_ids(100).unwrap().get(&1), Some(&0xa1));
        assert!(intf.port_of(100).is_err());
        assert_eq!(intf.lag_ndi_ids(1).unwrap_err(), NdiError::NotALag { ifindex: 1 });
    }

    #[test]
    fn test_re_register_changes_kind() {
        let mut intf = sample();
        intf.add_port(100, NdiPort::new(1, 3));
        assert!(!intf.is_lag(100));
        assert_eq!(intf.port_of(100).unwrap(), NdiPort::new(1, 3));

        intf.add_lag(1, NdiObjIdTable::from([(0, 0xb0)]));
        assert!(intf.is_lag(1));
        assert!(intf.port_of(1).is_err());
    }
}
