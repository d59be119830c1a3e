//! Collaborators consulted by the ACL object model.
//!
//! - [`interface`]: ifindex to NPU/port resolution and LAG membership

pub mod interface;

pub use interface::{InterfaceMapper, StaticInterfaceMap};
