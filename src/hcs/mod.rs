//! Compute service access.
//!
//! This module provides the call protocol against the host compute service:
//! - [`ComputeService`]: trait over the raw service API (the production
//!   implementation lives in [`compute_core`] and binds computecore.dll)
//! - [`Operation`]: RAII guard for one service operation, the
//!   open → submit → wait → close protocol used by every mutating call
//! - [`ComputeSystem`]: RAII guard for a compute system handle
//!
//! Every `open` is paired with exactly one `close` on every exit path; the
//! guards enforce this through `Drop`, so early returns and panics cannot
//! leak a service-side handle.

pub mod hresult;

#[cfg(windows)]
pub mod compute_core;

use std::time::Duration;

use crate::error::Result;
use hresult::ServiceError;

/// Opaque identifier for an in-flight or completed service operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OperationId(pub u64);

/// Opaque identifier for a compute system handle.
///
/// Distinct from the VM's identity string: closing a system handle only
/// drops our reference and does not stop the machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SystemId(pub u64);

/// Wait bound for [`ComputeService::wait_for_result`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timeout {
    /// Block until the service signals completion.
    Infinite,

    /// Block for at most this many milliseconds.
    Millis(u32),
}

impl Timeout {
    /// The sentinel the service uses for "no timeout".
    pub const INFINITE_MILLIS: u32 = u32::MAX;

    /// A bounded timeout from whole seconds.
    pub fn from_secs(secs: u32) -> Self {
        Timeout::Millis(secs.saturating_mul(1000))
    }

    /// The raw millisecond value passed to the service.
    pub fn as_millis(self) -> u32 {
        match self {
            Timeout::Infinite => Self::INFINITE_MILLIS,
            Timeout::Millis(ms) => ms,
        }
    }
}

impl From<Duration> for Timeout {
    fn from(d: Duration) -> Self {
        Timeout::Millis(u32::try_from(d.as_millis()).unwrap_or(Self::INFINITE_MILLIS - 1))
    }
}

/// Default wait for a graceful shutdown.
pub const DEFAULT_STOP_TIMEOUT: Timeout = Timeout::Millis(30_000);

/// Wait for an explicit forced terminate.
pub const TERMINATE_TIMEOUT: Timeout = Timeout::Millis(10_000);

/// Bounded wait for the forced terminate issued during rollback.
pub const ROLLBACK_TERMINATE_TIMEOUT: Timeout = Timeout::Millis(5_000);

/// Raw interface to the host compute service.
///
/// Mutating calls follow the operation protocol: create an operation, issue
/// exactly one submission against it, wait for the result, close the
/// operation. `grant_access`/`revoke_access` are synchronous and take no
/// operation. All methods block the calling thread.
pub trait ComputeService {
    /// Open a new operation handle. Must be paired with exactly one
    /// [`close_operation`](Self::close_operation).
    fn create_operation(&self) -> std::result::Result<OperationId, ServiceError>;

    /// Release an operation handle. Idempotent: closing an unknown or
    /// already-closed operation is a no-op, never an error.
    fn close_operation(&self, op: OperationId);

    /// Block until the operation completes or the timeout elapses, returning
    /// the result document if the service produced one. The document is
    /// copied out before this returns; on failure it rides inside the
    /// [`ServiceError`].
    fn wait_for_result(
        &self,
        op: OperationId,
        timeout: Timeout,
    ) -> std::result::Result<Option<String>, ServiceError>;

    /// Submit a create-compute-system request. Returns the new system handle;
    /// completion is observed through [`wait_for_result`](Self::wait_for_result).
    fn create_system(
        &self,
        id: &str,
        config_json: &str,
        op: OperationId,
    ) -> std::result::Result<SystemId, ServiceError>;

    /// Resolve an identity to a system handle with full access rights.
    fn open_system(&self, id: &str) -> std::result::Result<SystemId, ServiceError>;

    /// Release a system handle. Does NOT stop the machine. Idempotent like
    /// [`close_operation`](Self::close_operation).
    fn close_system(&self, sys: SystemId);

    /// Submit a start request.
    fn start_system(&self, sys: SystemId, op: OperationId) -> std::result::Result<(), ServiceError>;

    /// Submit a graceful-shutdown request.
    fn shutdown_system(&self, sys: SystemId, op: OperationId)
        -> std::result::Result<(), ServiceError>;

    /// Submit a forced-terminate request.
    fn terminate_system(
        &self,
        sys: SystemId,
        op: OperationId,
    ) -> std::result::Result<(), ServiceError>;

    /// Submit an enumerate-all-systems query.
    fn enumerate_systems(&self, op: OperationId) -> std::result::Result<(), ServiceError>;

    /// Submit a properties query. `query` is a service-format property query
    /// document; `None` requests the service's default property set.
    fn get_properties(
        &self,
        sys: SystemId,
        query: Option<&str>,
        op: OperationId,
    ) -> std::result::Result<(), ServiceError>;

    /// Grant the VM identified by `vm_id` access to a host file. Synchronous.
    fn grant_access(&self, vm_id: &str, path: &str) -> std::result::Result<(), ServiceError>;

    /// Revoke a previously granted file access. Synchronous.
    fn revoke_access(&self, vm_id: &str, path: &str) -> std::result::Result<(), ServiceError>;
}

/// RAII guard for one service operation.
///
/// Closes the operation exactly once when dropped, whichever way the scope
/// exits.
pub struct Operation<'a> {
    svc: &'a dyn ComputeService,
    id: OperationId,
}

impl<'a> Operation<'a> {
    /// Open a fresh operation.
    pub fn start(svc: &'a dyn ComputeService) -> std::result::Result<Self, ServiceError> {
        let id = svc.create_operation()?;
        Ok(Self { svc, id })
    }

    /// The raw id, for submission calls.
    pub fn id(&self) -> OperationId {
        self.id
    }

    /// Wait for the submitted request to complete.
    pub fn wait(&self, timeout: Timeout) -> std::result::Result<Option<String>, ServiceError> {
        self.svc.wait_for_result(self.id, timeout)
    }
}

impl Drop for Operation<'_> {
    fn drop(&mut self) {
        self.svc.close_operation(self.id);
    }
}

/// RAII guard for a compute system handle.
///
/// Dropping the guard releases our reference to the system; it does not stop
/// the machine. The failure path of the creation transaction instead calls
/// [`terminate_and_release`](Self::terminate_and_release), which forces the
/// machine down before releasing, so a half-started VM is never left running
/// unsupervised.
pub struct ComputeSystem<'a> {
    svc: &'a dyn ComputeService,
    id: SystemId,
}

impl<'a> std::fmt::Debug for ComputeSystem<'a> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComputeSystem").field("id", &self.id).finish()
    }
}

impl<'a> ComputeSystem<'a> {
    /// Wrap a system handle returned by a service call.
    pub fn from_raw(svc: &'a dyn ComputeService, id: SystemId) -> Self {
        Self { svc, id }
    }

    /// Open an existing compute system by identity.
    pub fn open(svc: &'a dyn ComputeService, vm_id: &str) -> std::result::Result<Self, ServiceError> {
        let id = svc.open_system(vm_id)?;
        Ok(Self { svc, id })
    }

    /// The raw id, for submission calls.
    pub fn id(&self) -> SystemId {
        self.id
    }

    /// Release the handle. The machine keeps running independently.
    pub fn release(self) {
        // Drop does the close.
    }

    /// Forcibly stop the machine, then release the handle. Best-effort: used
    /// only during rollback, so its own failures are logged and swallowed to
    /// keep the causal error visible.
    pub fn terminate_and_release(self) {
        match Operation::start(self.svc) {
            Ok(op) => {
                if let Err(e) = self.svc.terminate_system(self.id, op.id()) {
                    tracing::warn!(error = %e, "rollback terminate submission failed");
                } else if let Err(e) = op.wait(ROLLBACK_TERMINATE_TIMEOUT) {
                    tracing::warn!(error = %e, "rollback terminate did not complete");
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "could not open operation for rollback terminate");
            }
        }
        // Drop closes the system handle.
    }
}

impl Drop for ComputeSystem<'_> {
    fn drop(&mut self) {
        self.svc.close_system(self.id);
    }
}

/// Get the compute service for this host.
///
/// On Windows this binds the real host compute service; elsewhere there is
/// nothing to bind and every command fails up front.
pub fn default_service() -> Result<Box<dyn ComputeService>> {
    #[cfg(windows)]
    {
        Ok(Box::new(compute_core::HostComputeService::new()))
    }
    #[cfg(not(windows))]
    {
        Err(crate::error::Error::service_unavailable(
            "the host compute service requires Windows with Hyper-V",
        ))
    }
}
