//! VM lifecycle: the creation transaction and the read-only operations.
//!
//! - [`launch`]: the multi-phase create-and-start transaction with
//!   compensation at every phase boundary
//! - [`grants`]: the per-transaction access-grant ledger
//! - [`lifecycle`]: open/stop/kill/enumerate/properties (no compensation;
//!   nothing is mutated that would need undoing)

pub mod grants;
pub mod launch;
pub mod lifecycle;

pub use grants::GrantLedger;
pub use launch::create_and_start;
pub use lifecycle::{enumerate, kill_vm, open_vm, properties, stop_vm, SystemEntry};

use uuid::Uuid;

/// Identity of a virtual machine inside the compute service.
///
/// This is the correlation key for every grant, the creation call, and all
/// later lifecycle operations, distinct from any transient handle to the
/// machine. A fresh identity is minted once per creation attempt.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VmId(String);

impl VmId {
    /// Wrap a caller-supplied identity (e.g. from the command line).
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Mint a fresh, globally unique identity. The service expects a bare
    /// GUID without braces.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Get the identity as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for VmId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for VmId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_ids_are_bare_guids() {
        let id = VmId::generate();
        let s = id.as_str();
        assert_eq!(s.len(), 36, "bare GUID form, no braces: {s}");
        assert!(!s.contains('{') && !s.contains('}'));
        assert_eq!(s.matches('-').count(), 4);
    }

    #[test]
    fn test_generated_ids_are_unique() {
        assert_ne!(VmId::generate(), VmId::generate());
    }
}
