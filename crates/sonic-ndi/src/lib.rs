//! Device-layer (NDI) vocabulary for the ACL control plane.
//!
//! A switch is built from several hardware forwarding engines (NPUs). The
//! ACL object model keeps one logical copy of every table, entry, filter and
//! action, and asks each of them to materialize a device-specific record for
//! every NPU that needs programming. This crate defines those records and the
//! collaborators the object model consults while building them.
//!
//! # Architecture
//!
//! - [`types`]: device ids, hardware object ids, device-local ports and the
//!   per-device id table
//! - [`acl`]: per-device filter, action and entry records handed to the
//!   hardware backend
//! - [`error`]: collaborator error type
//! - [`api`]: interface-mapping collaborator (ifindex to NPU/port, LAG
//!   membership)
//!
//! # Example
//!
//! ```
//! use sonic_ndi::{InterfaceMapper, NdiPort, StaticInterfaceMap};
//!
//! let mut intf = StaticInterfaceMap::new();
//! intf.add_port(10, NdiPort::new(0, 1));
//! assert_eq!(intf.port_of(10).unwrap(), NdiPort::new(0, 1));
//! ```

pub mod acl;
pub mod api;
pub mod error;
pub mod types;

pub use acl::{NdiAclAction, NdiAclActionValue, NdiAclEntry, NdiAclFilter, NdiAclFilterValue};
pub use api::{InterfaceMapper, StaticInterfaceMap};
pub use error::{NdiError, NdiResult};
pub use types::{IfIndex, NdiObjIdTable, NdiPort, NpuId, RawNdiObjectId};
