//! The access-grant ledger for one creation transaction.

use crate::error::{Error, Result};
use crate::hcs::ComputeService;
use crate::vm::VmId;

/// Tracks which host paths have been granted to a VM during one creation
/// attempt, so a failure at any later phase can revoke exactly what was
/// granted.
///
/// The ledger records a path only after the service accepted the grant.
/// Revocation is best-effort: a revoke failure is logged and swallowed so it
/// never masks the error that triggered the rollback. On overall success the
/// ledger is dropped as-is; the running VM keeps its grants.
pub struct GrantLedger<'a> {
    svc: &'a dyn ComputeService,
    vm_id: &'a VmId,
    granted: Vec<String>,
}

impl<'a> GrantLedger<'a> {
    /// A fresh ledger for one transaction.
    pub fn new(svc: &'a dyn ComputeService, vm_id: &'a VmId) -> Self {
        Self {
            svc,
            vm_id,
            granted: Vec::new(),
        }
    }

    /// Grant the VM access to one host path and record it.
    pub fn grant(&mut self, path: &str) -> Result<()> {
        self.svc
            .grant_access(self.vm_id.as_str(), path)
            .map_err(|source| Error::AccessGrant {
                path: path.to_string(),
                source,
            })?;
        self.granted.push(path.to_string());
        Ok(())
    }

    /// Paths granted so far, in grant order.
    pub fn granted(&self) -> &[String] {
        &self.granted
    }

    /// Revoke every recorded grant. Best-effort.
    pub fn revoke_all(&mut self) {
        for path in self.granted.drain(..) {
            if let Err(e) = self.svc.revoke_access(self.vm_id.as_str(), &path) {
                tracing::warn!(path = %path, error = %e, "failed to revoke access during rollback");
            }
        }
    }
}
