//! The creation transaction: parse → transform → grant → create → start.
//!
//! Every phase after the first grant can fail with service-side state
//! already in place, so each failure point applies the single compensation
//! primitive (terminate the system object if it exists, then revoke the
//! recorded grants) and aborts with the first, causal error. Nothing here
//! retries: the service's failure modes are not transient-by-default.

use crate::error::{Error, Result};
use crate::gpu::GpuDiscovery;
use crate::hcs::{ComputeService, ComputeSystem, Operation, Timeout};
use crate::spec::ComputeSystemSpec;
use crate::vm::{GrantLedger, VmId};

/// Create and start a VM from a JSON document.
///
/// On success the minted identity is returned and the VM keeps running
/// independently of this process; its file-access grants are intentionally
/// left standing. On any failure the attempt is fully unwound: grants
/// revoked, and the system object (if it was created) forcibly terminated
/// and released.
pub fn create_and_start(
    svc: &dyn ComputeService,
    discovery: Option<&dyn GpuDiscovery>,
    spec_json: &str,
    name: Option<&str>,
    add_gpu: bool,
) -> Result<VmId> {
    let mut spec = ComputeSystemSpec::from_json(spec_json)?;
    spec.default_owner();
    spec.resolve_disk_paths()?;

    if add_gpu {
        let discovery = discovery
            .ok_or_else(|| Error::gpu_discovery("no discovery collaborator available"))?;
        let gpus = discovery.list_gpu_devices()?;
        if gpus.is_empty() {
            return Err(Error::NoGpuFound);
        }
        eprintln!("Found {} GPU(s) for passthrough:", gpus.len());
        for gpu in &gpus {
            eprintln!("  {} ({})", gpu.name, gpu.instance_path);
        }
        spec.inject_gpus(&gpus);
    }

    // Final wire form, after all mutation.
    let final_json = spec.to_json()?;

    let vm_id = VmId::generate();
    match name {
        Some(name) => eprintln!("Creating VM {name:?} (ID: {vm_id})..."),
        None => eprintln!("Creating VM (ID: {vm_id})..."),
    }
    tracing::debug!(vm_id = %vm_id, gpu = add_gpu, "starting creation transaction");

    // Grant phase. The ledger records exactly what succeeded, so the first
    // failure revokes precisely the earlier grants of this attempt.
    let disk_paths = spec.disk_paths();
    let mut ledger = GrantLedger::new(svc, &vm_id);
    for path in &disk_paths {
        eprintln!("  Granting VM access to {path}");
        if let Err(e) = ledger.grant(path) {
            ledger.revoke_all();
            return Err(e);
        }
    }

    // Create phase.
    let sys = match create_system(svc, &vm_id, &final_json) {
        Ok(sys) => sys,
        Err(e) => {
            ledger.revoke_all();
            return Err(Error::Create(e));
        }
    };

    // Start phase. The system object now exists, so the compensation order
    // is: force it down first, then revoke the grants.
    if let Err(e) = start_system(svc, &sys) {
        sys.terminate_and_release();
        ledger.revoke_all();
        return Err(Error::Start(e));
    }

    // Success: drop our reference, the VM keeps running.
    sys.release();
    tracing::info!(vm_id = %vm_id, "VM started");
    Ok(vm_id)
}

/// Submit the create call and wait for it, returning the system guard.
fn create_system<'a>(
    svc: &'a dyn ComputeService,
    vm_id: &VmId,
    config_json: &str,
) -> std::result::Result<ComputeSystem<'a>, crate::hcs::hresult::ServiceError> {
    let op = Operation::start(svc)?;
    let sys = ComputeSystem::from_raw(svc, svc.create_system(vm_id.as_str(), config_json, op.id())?);
    // The failure carries the service's result document for diagnostics.
    op.wait(Timeout::Infinite)?;
    Ok(sys)
}

/// Submit the start call and wait for it.
fn start_system(
    svc: &dyn ComputeService,
    sys: &ComputeSystem<'_>,
) -> std::result::Result<(), crate::hcs::hresult::ServiceError> {
    let op = Operation::start(svc)?;
    svc.start_system(sys.id(), op.id())?;
    op.wait(Timeout::Infinite)?;
    Ok(())
}
