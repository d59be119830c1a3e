//! Error type for device-layer collaborators.
//!
//! Collaborators of the ACL object model (interface mapping, LAG lookups)
//! report failures with this type. The object model converts them into
//! its own error taxonomy at the boundary.

use thiserror::Error;

use crate::types::IfIndex;

/// Error type for backend collaborators.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NdiError {
    /// The interface index is not known to the interface mapping.
    #[error("Unknown interface: ifindex {ifindex}")]
    UnknownInterface { ifindex: IfIndex },

    /// The interface exists but is not a LAG.
    #[error("Interface {ifindex} is not a LAG")]
    NotALag { ifindex: IfIndex },
}

/// Result type for backend collaborators.
pub type NdiResult<T> = Result<T, NdiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_interface_message() {
        let err = NdiError::UnknownInterface { ifindex: 42 };
        assert_eq!(err.to_string(), "Unknown interface: ifindex 42");
        assert_eq!(
            NdiError::NotALag { ifindex: 3 }.to_string(),
            "Interface 3 is not a LAG"
        );
    }
}
