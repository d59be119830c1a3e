//! ACL control-plane object model.
//!
//! Holds the logical copy of every ACL table, entry, filter, action and
//! counter of a switch, and turns them into per-NPU records for the
//! hardware backend.
//!
//! # Architecture
//!
//! - [`id_gen`]: bounded-range id allocation with reservation and reuse
//! - [`types`]: closed enumerations and the filter/action capability table
//! - [`cell`]: value cells exchanged with the protocol layer
//! - [`obj_map`]: logical id to per-NPU hardware id mapping
//! - [`action`], [`filter`]: typed values, per-NPU materialization, diff
//! - [`entry`], [`table`], [`counter`]: the entities that own them
//! - [`switch`]: the object store
//! - [`config`]: id ranges and NPU set
//!
//! # Example
//!
//! ```
//! use sonic_acl::{AclAction, AclActionType, AclDataCell, AclEntry, AclStage, AclSwitch, AclTable};
//! use sonic_ndi::StaticInterfaceMap;
//!
//! let mut sw = AclSwitch::new(0);
//! let table_id = sw.alloc_table_id().unwrap();
//! sw.save_table(AclTable::new(0, table_id, AclStage::Ingress).with_npus([0]));
//!
//! let entry_id = sw.alloc_entry_id_in_table(table_id).unwrap();
//! let mut entry = AclEntry::new(0, table_id, entry_id).with_priority(10);
//! let mut tc = AclAction::from_type(AclActionType::SetTc);
//! tc.set_value(&[AclDataCell::U8(3)], &StaticInterfaceMap::new()).unwrap();
//! entry.add_action(tc);
//! sw.save_entry(entry).unwrap();
//!
//! let rec = sw.materialize_entry(table_id, entry_id, 0).unwrap().unwrap();
//! assert_eq!(rec.actions.len(), 1);
//! ```

pub mod action;
pub mod cell;
pub mod config;
pub mod counter;
pub mod entry;
pub mod error;
pub mod filter;
pub mod id_gen;
pub mod obj_map;
pub mod switch;
pub mod table;
pub mod types;

pub use action::{AclAction, AclActionValue};
pub use cell::{AclDataCell, AclDataList};
pub use config::AclSwitchConfig;
pub use counter::AclCounter;
pub use entry::{AclEntry, AclEntryDiff};
pub use error::{AclError, AclErrorKind, AclResult};
pub use filter::{AclFilter, AclFilterValue};
pub use id_gen::IdGenerator;
pub use obj_map::AclObjIdMap;
pub use switch::AclSwitch;
pub use table::AclTable;
pub use types::{
    AclActionType, AclCounterType, AclIfPort, AclIpFrag, AclIpType, AclMatchType,
    AclPacketAction, AclPriority, AclStage, AclValueKind, AclValueSpec, ObjId, SwitchId,
};
