//! Read-only and single-step lifecycle operations.
//!
//! These share the operation-channel protocol with the creation transaction
//! but mutate at most one thing, so there is nothing to compensate: a
//! failure is simply reported.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::hcs::hresult::HCS_E_SYSTEM_NOT_FOUND;
use crate::hcs::{ComputeService, ComputeSystem, Operation, Timeout, TERMINATE_TIMEOUT};

/// One entry of the service's enumeration result. Only the subset we display
/// is typed; the service may attach more.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SystemEntry {
    #[serde(rename = "Id", default)]
    pub id: String,

    #[serde(rename = "SystemType", default)]
    pub system_type: String,

    #[serde(rename = "RuntimeOsType", default, skip_serializing_if = "String::is_empty")]
    pub runtime_os_type: String,

    #[serde(rename = "State", default)]
    pub state: String,

    #[serde(rename = "Name", default, skip_serializing_if = "String::is_empty")]
    pub name: String,

    #[serde(rename = "Owner", default, skip_serializing_if = "String::is_empty")]
    pub owner: String,
}

/// Resolve an identity to a live compute system handle.
pub fn open_vm<'a>(svc: &'a dyn ComputeService, id: &str) -> Result<ComputeSystem<'a>> {
    ComputeSystem::open(svc, id).map_err(|e| {
        if e.hr == HCS_E_SYSTEM_NOT_FOUND {
            Error::NotFound(id.to_string())
        } else {
            Error::Service(e)
        }
    })
}

/// Gracefully shut a compute system down, waiting up to `timeout`.
///
/// On timeout or service failure the machine is left in whatever state the
/// service reports; escalation to a forced terminate is a separate, explicit
/// operation ([`kill_vm`]), never automatic.
pub fn stop_vm(svc: &dyn ComputeService, sys: &ComputeSystem<'_>, timeout: Timeout) -> Result<()> {
    let op = Operation::start(svc)?;
    svc.shutdown_system(sys.id(), op.id())?;
    op.wait(timeout)?;
    Ok(())
}

/// Forcibly terminate a compute system, with a fixed bounded wait.
pub fn kill_vm(svc: &dyn ComputeService, sys: &ComputeSystem<'_>) -> Result<()> {
    let op = Operation::start(svc)?;
    svc.terminate_system(sys.id(), op.id())?;
    op.wait(TERMINATE_TIMEOUT)?;
    Ok(())
}

/// List all compute systems known to the service.
pub fn enumerate(svc: &dyn ComputeService) -> Result<Vec<SystemEntry>> {
    let op = Operation::start(svc)?;
    svc.enumerate_systems(op.id())?;
    let doc = op.wait(Timeout::Infinite)?.unwrap_or_default();
    if doc.trim().is_empty() {
        return Ok(Vec::new());
    }
    serde_json::from_str(&doc).map_err(|e| {
        Error::MalformedResult(format!("enumeration: {e}\n  raw: {doc}"))
    })
}

/// Fetch a compute system's properties document.
///
/// `query` is a service-format property query; `None` asks for the default
/// property set. The document is returned verbatim for display.
pub fn properties(
    svc: &dyn ComputeService,
    sys: &ComputeSystem<'_>,
    query: Option<&str>,
) -> Result<String> {
    let op = Operation::start(svc)?;
    svc.get_properties(sys.id(), query, op.id())?;
    Ok(op.wait(Timeout::Infinite)?.unwrap_or_default())
}
