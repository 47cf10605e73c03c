//! End-to-end tests for the creation transaction and lifecycle operations,
//! driven through a scripted fake compute service.
//!
//! The fake records every call in order and can be told to fail any single
//! step, which is what the compensation logic is all about: after a failure
//! at step k, exactly the state built by steps 1..k must be unwound, in the
//! right order, with every operation handle closed exactly once.

use std::cell::RefCell;
use std::collections::HashMap;

use serde_json::json;

use hcsvm::gpu::{GpuDevice, GpuDiscovery};
use hcsvm::hcs::hresult::{
    HResult, ServiceError, E_WAIT_TIMEOUT, HCS_E_INVALID_JSON, HCS_E_SYSTEM_NOT_FOUND,
};
use hcsvm::hcs::{ComputeService, OperationId, SystemId, Timeout};
use hcsvm::vm::{create_and_start, enumerate, kill_vm, open_vm, properties, stop_vm};
use hcsvm::Error;

#[derive(Debug, Clone, PartialEq)]
enum Call {
    CreateOperation(u64),
    CloseOperation(u64),
    Wait { op: u64, timeout_ms: u32 },
    CreateSystem { vm_id: String, config: String },
    OpenSystem(String),
    CloseSystem(u64),
    SubmitStart,
    SubmitShutdown,
    SubmitTerminate,
    SubmitEnumerate,
    SubmitProperties(Option<String>),
    Grant { vm_id: String, path: String },
    Revoke { vm_id: String, path: String },
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Request {
    Create,
    Start,
    Shutdown,
    Terminate,
    Enumerate,
    Properties,
}

/// Failure switches. Everything defaults to "succeed".
#[derive(Debug, Default)]
struct Faults {
    /// Fail the grant with this 0-based index.
    fail_grant_at: Option<usize>,
    fail_create_submit: bool,
    fail_create_wait: bool,
    /// Diagnostic document attached to the failed create wait.
    create_result_doc: Option<String>,
    fail_start_submit: bool,
    fail_start_wait: bool,
    /// Every revoke fails (rollback must shrug this off).
    fail_revoke: bool,
    open_not_found: bool,
    fail_shutdown_wait: bool,
    enumerate_doc: Option<String>,
    properties_doc: Option<String>,
}

#[derive(Debug, Default)]
struct Inner {
    calls: Vec<Call>,
    next_op: u64,
    next_sys: u64,
    opened_ops: Vec<u64>,
    closed_ops: Vec<u64>,
    closed_systems: Vec<u64>,
    submitted: HashMap<u64, Request>,
    grants_attempted: usize,
}

#[derive(Debug, Default)]
struct FakeService {
    inner: RefCell<Inner>,
    faults: Faults,
}

impl FakeService {
    fn new() -> Self {
        Self::default()
    }

    fn with_faults(faults: Faults) -> Self {
        Self {
            inner: RefCell::default(),
            faults,
        }
    }

    fn calls(&self) -> Vec<Call> {
        self.inner.borrow().calls.clone()
    }

    fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.inner.borrow().calls.iter().filter(|c| pred(c)).count()
    }

    fn granted_paths(&self) -> Vec<String> {
        self.inner
            .borrow()
            .calls
            .iter()
            .filter_map(|c| match c {
                Call::Grant { path, .. } => Some(path.clone()),
                _ => None,
            })
            .collect()
    }

    fn revoked_paths(&self) -> Vec<String> {
        self.inner
            .borrow()
            .calls
            .iter()
            .filter_map(|c| match c {
                Call::Revoke { path, .. } => Some(path.clone()),
                _ => None,
            })
            .collect()
    }

    fn submitted_config(&self) -> Option<String> {
        self.inner.borrow().calls.iter().find_map(|c| match c {
            Call::CreateSystem { config, .. } => Some(config.clone()),
            _ => None,
        })
    }

    /// Every opened operation closed exactly once, and no close without an
    /// open. Same for system handles.
    fn assert_handles_balanced(&self) {
        let inner = self.inner.borrow();
        let mut opened = inner.opened_ops.clone();
        let mut closed = inner.closed_ops.clone();
        opened.sort_unstable();
        closed.sort_unstable();
        assert_eq!(opened, closed, "operation opens and closes must pair up");
        let mut distinct = closed.clone();
        distinct.dedup();
        assert_eq!(distinct.len(), closed.len(), "no operation closed twice");

        let mut sys_closed = inner.closed_systems.clone();
        sys_closed.sort_unstable();
        let mut sys_distinct = sys_closed.clone();
        sys_distinct.dedup();
        assert_eq!(sys_distinct.len(), sys_closed.len(), "no system handle closed twice");
    }
}

impl ComputeService for FakeService {
    fn create_operation(&self) -> Result<OperationId, ServiceError> {
        let mut inner = self.inner.borrow_mut();
        inner.next_op += 1;
        let id = inner.next_op;
        inner.opened_ops.push(id);
        inner.calls.push(Call::CreateOperation(id));
        Ok(OperationId(id))
    }

    fn close_operation(&self, op: OperationId) {
        let mut inner = self.inner.borrow_mut();
        inner.closed_ops.push(op.0);
        inner.calls.push(Call::CloseOperation(op.0));
    }

    fn wait_for_result(
        &self,
        op: OperationId,
        timeout: Timeout,
    ) -> Result<Option<String>, ServiceError> {
        let request = {
            let mut inner = self.inner.borrow_mut();
            inner.calls.push(Call::Wait {
                op: op.0,
                timeout_ms: timeout.as_millis(),
            });
            inner.submitted.get(&op.0).copied()
        };
        match request {
            Some(Request::Create) => {
                if self.faults.fail_create_wait {
                    Err(ServiceError::new("HcsWaitForOperationResult", HCS_E_INVALID_JSON)
                        .with_result(self.faults.create_result_doc.clone()))
                } else {
                    Ok(None)
                }
            }
            Some(Request::Start) => {
                if self.faults.fail_start_wait {
                    Err(ServiceError::new(
                        "HcsWaitForOperationResult",
                        HResult(0x8000_4005),
                    ))
                } else {
                    Ok(None)
                }
            }
            Some(Request::Shutdown) => {
                if self.faults.fail_shutdown_wait {
                    Err(ServiceError::new("HcsWaitForOperationResult", E_WAIT_TIMEOUT))
                } else {
                    Ok(None)
                }
            }
            Some(Request::Terminate) => Ok(None),
            Some(Request::Enumerate) => Ok(self.faults.enumerate_doc.clone()),
            Some(Request::Properties) => Ok(self.faults.properties_doc.clone()),
            None => Ok(None),
        }
    }

    fn create_system(
        &self,
        id: &str,
        config_json: &str,
        op: OperationId,
    ) -> Result<SystemId, ServiceError> {
        let mut inner = self.inner.borrow_mut();
        inner.calls.push(Call::CreateSystem {
            vm_id: id.to_string(),
            config: config_json.to_string(),
        });
        if self.faults.fail_create_submit {
            return Err(ServiceError::new(
                "HcsCreateComputeSystem",
                HResult(0x8000_4005),
            ));
        }
        inner.submitted.insert(op.0, Request::Create);
        inner.next_sys += 1;
        Ok(SystemId(inner.next_sys))
    }

    fn open_system(&self, id: &str) -> Result<SystemId, ServiceError> {
        let mut inner = self.inner.borrow_mut();
        inner.calls.push(Call::OpenSystem(id.to_string()));
        if self.faults.open_not_found {
            return Err(ServiceError::new(
                "HcsOpenComputeSystem",
                HCS_E_SYSTEM_NOT_FOUND,
            ));
        }
        inner.next_sys += 1;
        Ok(SystemId(inner.next_sys))
    }

    fn close_system(&self, sys: SystemId) {
        let mut inner = self.inner.borrow_mut();
        inner.closed_systems.push(sys.0);
        inner.calls.push(Call::CloseSystem(sys.0));
    }

    fn start_system(&self, _sys: SystemId, op: OperationId) -> Result<(), ServiceError> {
        let mut inner = self.inner.borrow_mut();
        inner.calls.push(Call::SubmitStart);
        if self.faults.fail_start_submit {
            return Err(ServiceError::new(
                "HcsStartComputeSystem",
                HResult(0x8000_4005),
            ));
        }
        inner.submitted.insert(op.0, Request::Start);
        Ok(())
    }

    fn shutdown_system(&self, _sys: SystemId, op: OperationId) -> Result<(), ServiceError> {
        let mut inner = self.inner.borrow_mut();
        inner.calls.push(Call::SubmitShutdown);
        inner.submitted.insert(op.0, Request::Shutdown);
        Ok(())
    }

    fn terminate_system(&self, _sys: SystemId, op: OperationId) -> Result<(), ServiceError> {
        let mut inner = self.inner.borrow_mut();
        inner.calls.push(Call::SubmitTerminate);
        inner.submitted.insert(op.0, Request::Terminate);
        Ok(())
    }

    fn enumerate_systems(&self, op: OperationId) -> Result<(), ServiceError> {
        let mut inner = self.inner.borrow_mut();
        inner.calls.push(Call::SubmitEnumerate);
        inner.submitted.insert(op.0, Request::Enumerate);
        Ok(())
    }

    fn get_properties(
        &self,
        _sys: SystemId,
        query: Option<&str>,
        op: OperationId,
    ) -> Result<(), ServiceError> {
        let mut inner = self.inner.borrow_mut();
        inner
            .calls
            .push(Call::SubmitProperties(query.map(str::to_string)));
        inner.submitted.insert(op.0, Request::Properties);
        Ok(())
    }

    fn grant_access(&self, vm_id: &str, path: &str) -> Result<(), ServiceError> {
        let mut inner = self.inner.borrow_mut();
        let index = inner.grants_attempted;
        inner.grants_attempted += 1;
        if self.faults.fail_grant_at == Some(index) {
            return Err(ServiceError::new(
                format!("HcsGrantVmAccess({path})"),
                HResult(0x8007_0005),
            ));
        }
        inner.calls.push(Call::Grant {
            vm_id: vm_id.to_string(),
            path: path.to_string(),
        });
        Ok(())
    }

    fn revoke_access(&self, vm_id: &str, path: &str) -> Result<(), ServiceError> {
        let mut inner = self.inner.borrow_mut();
        inner.calls.push(Call::Revoke {
            vm_id: vm_id.to_string(),
            path: path.to_string(),
        });
        if self.faults.fail_revoke {
            return Err(ServiceError::new(
                format!("HcsRevokeVmAccess({path})"),
                HResult(0x8007_0005),
            ));
        }
        Ok(())
    }
}

struct FakeDiscovery {
    gpus: Vec<GpuDevice>,
}

impl GpuDiscovery for FakeDiscovery {
    fn list_gpu_devices(&self) -> hcsvm::Result<Vec<GpuDevice>> {
        Ok(self.gpus.clone())
    }
}

/// A spec with `n` SCSI attachments at relative paths, plus the absolute
/// forms the transaction is expected to grant.
fn disk_spec(n: usize) -> (String, Vec<String>) {
    assert!(n < 10, "single-digit slots keep map order obvious");
    let mut attachments = serde_json::Map::new();
    for i in 0..n {
        attachments.insert(
            i.to_string(),
            json!({ "Type": "VirtualDisk", "Path": format!("disks/disk-{i}.vhdx") }),
        );
    }
    let spec = json!({
        "SchemaVersion": { "Major": 2, "Minor": 1 },
        "VirtualMachine": {
            "Devices": { "Scsi": { "primary": { "Attachments": attachments } } }
        }
    });
    let expected = (0..n)
        .map(|i| {
            std::path::absolute(format!("disks/disk-{i}.vhdx"))
                .unwrap()
                .to_string_lossy()
                .into_owned()
        })
        .collect();
    (spec.to_string(), expected)
}

fn index_of(calls: &[Call], pred: impl Fn(&Call) -> bool) -> Option<usize> {
    calls.iter().position(pred)
}

// --- Creation transaction ---

#[test]
fn successful_transaction_leaves_grants_standing() {
    let (spec, expected_paths) = disk_spec(2);
    let svc = FakeService::new();

    let vm_id = create_and_start(&svc, None, &spec, Some("demo"), false).unwrap();

    // A well-formed bare GUID comes back.
    assert_eq!(vm_id.as_str().len(), 36);
    assert_eq!(vm_id.as_str().matches('-').count(), 4);

    assert_eq!(svc.granted_paths(), expected_paths);
    assert!(svc.revoked_paths().is_empty(), "success must leave grants standing");
    assert_eq!(svc.count(|c| matches!(c, Call::SubmitTerminate)), 0);
    assert_eq!(svc.count(|c| matches!(c, Call::CloseSystem(_))), 1);
    svc.assert_handles_balanced();

    // Grants and creation all used the same freshly minted identity.
    for call in svc.calls() {
        match call {
            Call::Grant { vm_id: id, .. } | Call::CreateSystem { vm_id: id, .. } => {
                assert_eq!(id, vm_id.as_str());
            }
            _ => {}
        }
    }
}

#[test]
fn grant_failure_revokes_exactly_the_prior_grants() {
    // 4 disks, the third grant (index 2) fails: exactly 2 revokes.
    let (spec, expected_paths) = disk_spec(4);
    let svc = FakeService::with_faults(Faults {
        fail_grant_at: Some(2),
        ..Faults::default()
    });

    let err = create_and_start(&svc, None, &spec, None, false).unwrap_err();
    match err {
        Error::AccessGrant { path, .. } => assert_eq!(path, expected_paths[2]),
        other => panic!("expected AccessGrant, got {other}"),
    }

    let mut revoked = svc.revoked_paths();
    revoked.sort();
    let mut expected = expected_paths[..2].to_vec();
    expected.sort();
    assert_eq!(revoked, expected, "each granted path revoked exactly once");

    assert_eq!(svc.count(|c| matches!(c, Call::CreateSystem { .. })), 0);
    assert_eq!(svc.count(|c| matches!(c, Call::SubmitStart)), 0);
    svc.assert_handles_balanced();
}

#[test]
fn create_submit_failure_revokes_all_grants() {
    let (spec, expected_paths) = disk_spec(2);
    let svc = FakeService::with_faults(Faults {
        fail_create_submit: true,
        ..Faults::default()
    });

    let err = create_and_start(&svc, None, &spec, None, false).unwrap_err();
    assert!(matches!(err, Error::Create(_)), "got {err}");

    let mut revoked = svc.revoked_paths();
    revoked.sort();
    let mut expected = expected_paths;
    expected.sort();
    assert_eq!(revoked, expected);

    assert_eq!(svc.count(|c| matches!(c, Call::SubmitStart)), 0);
    // Submission failed, so there was nothing to wait for and no system
    // handle to close.
    assert_eq!(svc.count(|c| matches!(c, Call::Wait { .. })), 0);
    assert_eq!(svc.count(|c| matches!(c, Call::CloseSystem(_))), 0);
    svc.assert_handles_balanced();
}

#[test]
fn create_wait_failure_revokes_and_carries_result_document() {
    let (spec, _) = disk_spec(1);
    let svc = FakeService::with_faults(Faults {
        fail_create_wait: true,
        create_result_doc: Some(r#"{"Error":-1070137341}"#.to_string()),
        ..Faults::default()
    });

    let err = create_and_start(&svc, None, &spec, None, false).unwrap_err();
    match &err {
        Error::Create(se) => {
            assert_eq!(se.result.as_deref(), Some(r#"{"Error":-1070137341}"#));
        }
        other => panic!("expected Create, got {other}"),
    }
    // The diagnostic document rides up into the rendered error.
    assert!(err.to_string().contains("-1070137341"));

    assert_eq!(svc.count(|c| matches!(c, Call::SubmitStart)), 0);
    assert_eq!(svc.count(|c| matches!(c, Call::SubmitTerminate)), 0);
    assert_eq!(svc.revoked_paths().len(), 1);
    // The handle returned by the create submission is still released.
    assert_eq!(svc.count(|c| matches!(c, Call::CloseSystem(_))), 1);
    svc.assert_handles_balanced();
}

#[test]
fn start_failure_terminates_before_revoking() {
    let (spec, expected_paths) = disk_spec(3);
    let svc = FakeService::with_faults(Faults {
        fail_start_wait: true,
        ..Faults::default()
    });

    let err = create_and_start(&svc, None, &spec, None, false).unwrap_err();
    assert!(matches!(err, Error::Start(_)), "got {err}");

    let calls = svc.calls();
    assert_eq!(svc.count(|c| matches!(c, Call::SubmitTerminate)), 1);

    let terminate_at = index_of(&calls, |c| matches!(c, Call::SubmitTerminate)).unwrap();
    let first_revoke_at = index_of(&calls, |c| matches!(c, Call::Revoke { .. })).unwrap();
    let close_sys_at = index_of(&calls, |c| matches!(c, Call::CloseSystem(_))).unwrap();
    assert!(
        terminate_at < first_revoke_at,
        "the created object is forced down before any grant is revoked"
    );
    assert!(terminate_at < close_sys_at, "terminate goes through our still-open handle");

    // The rollback terminate uses the bounded 5s wait.
    let rollback_wait = calls.iter().skip(terminate_at).find_map(|c| match c {
        Call::Wait { timeout_ms, .. } => Some(*timeout_ms),
        _ => None,
    });
    assert_eq!(rollback_wait, Some(5_000));

    assert_eq!(svc.revoked_paths().len(), expected_paths.len());
    svc.assert_handles_balanced();
}

#[test]
fn start_submit_failure_compensates_the_same_way() {
    let (spec, _) = disk_spec(1);
    let svc = FakeService::with_faults(Faults {
        fail_start_submit: true,
        ..Faults::default()
    });

    let err = create_and_start(&svc, None, &spec, None, false).unwrap_err();
    assert!(matches!(err, Error::Start(_)), "got {err}");

    let calls = svc.calls();
    let terminate_at = index_of(&calls, |c| matches!(c, Call::SubmitTerminate)).unwrap();
    let first_revoke_at = index_of(&calls, |c| matches!(c, Call::Revoke { .. })).unwrap();
    assert!(terminate_at < first_revoke_at);
    svc.assert_handles_balanced();
}

#[test]
fn revoke_failures_never_mask_the_causal_error() {
    let (spec, expected_paths) = disk_spec(2);
    let svc = FakeService::with_faults(Faults {
        fail_start_wait: true,
        fail_revoke: true,
        ..Faults::default()
    });

    let err = create_and_start(&svc, None, &spec, None, false).unwrap_err();
    // Still the start failure, not a revoke failure.
    assert!(matches!(err, Error::Start(_)), "got {err}");
    // Every grant was still attempted for revocation.
    assert_eq!(svc.revoked_paths().len(), expected_paths.len());
    svc.assert_handles_balanced();
}

#[test]
fn invalid_document_fails_before_any_service_call() {
    let svc = FakeService::new();
    let err = create_and_start(&svc, None, "{ not json", None, false).unwrap_err();
    assert!(matches!(err, Error::InvalidSpec(_)));
    assert!(svc.calls().is_empty());
}

// --- GPU scenarios ---

#[test]
fn no_gpus_aborts_before_any_mutation() {
    let (spec, _) = disk_spec(2);
    let svc = FakeService::new();
    let discovery = FakeDiscovery { gpus: Vec::new() };

    let err = create_and_start(&svc, Some(&discovery), &spec, None, true).unwrap_err();
    assert!(matches!(err, Error::NoGpuFound));
    assert!(svc.calls().is_empty(), "no grant or create may be issued");
}

#[test]
fn gpu_injection_reaches_the_submitted_document() {
    let (spec, expected_paths) = disk_spec(1);
    let svc = FakeService::new();
    let discovery = FakeDiscovery {
        gpus: vec![
            GpuDevice {
                name: "GPU A".to_string(),
                instance_path: "PCI\\VEN_10DE&DEV_1F82".to_string(),
            },
            GpuDevice {
                name: "GPU B".to_string(),
                instance_path: "PCI\\VEN_1002&DEV_731F".to_string(),
            },
        ],
    };

    create_and_start(&svc, Some(&discovery), &spec, None, true).unwrap();

    let config: serde_json::Value =
        serde_json::from_str(&svc.submitted_config().unwrap()).unwrap();
    let pci = &config["VirtualMachine"]["Devices"]["VirtualPci"];
    assert_eq!(pci.as_object().unwrap().len(), 2);
    assert_eq!(pci["gpu-0"]["DeviceInstancePath"], "PCI\\VEN_10DE&DEV_1F82");
    assert_eq!(pci["gpu-1"]["DeviceInstancePath"], "PCI\\VEN_1002&DEV_731F");
    assert_eq!(pci["gpu-0"]["VirtualFunction"], 0xFFFF);
    assert_eq!(pci["gpu-1"]["VirtualFunction"], 0xFFFF);

    // The disk was granted and also resolved in the submitted document.
    assert_eq!(svc.granted_paths(), expected_paths);
}

#[test]
fn relative_paths_are_absolute_in_the_submitted_document() {
    let (spec, expected_paths) = disk_spec(1);
    let svc = FakeService::new();

    create_and_start(&svc, None, &spec, None, false).unwrap();

    let config: serde_json::Value =
        serde_json::from_str(&svc.submitted_config().unwrap()).unwrap();
    let path = config["VirtualMachine"]["Devices"]["Scsi"]["primary"]["Attachments"]["0"]["Path"]
        .as_str()
        .unwrap();
    assert_eq!(path, expected_paths[0]);
    assert!(std::path::Path::new(path).is_absolute());
    // No GPU was requested: no virtual PCI section appears.
    assert!(config["VirtualMachine"]["Devices"].get("VirtualPci").is_none());
}

// --- Read-only lifecycle operations ---

#[test]
fn open_maps_unknown_identity_to_not_found() {
    let svc = FakeService::with_faults(Faults {
        open_not_found: true,
        ..Faults::default()
    });
    let err = open_vm(&svc, "59e5e6a1-0e4b-4a2f-8c4e-aaaaaaaaaaaa").unwrap_err();
    match err {
        Error::NotFound(id) => assert!(id.starts_with("59e5e6a1")),
        other => panic!("expected NotFound, got {other}"),
    }
}

#[test]
fn stop_uses_caller_timeout_and_never_escalates() {
    let svc = FakeService::with_faults(Faults {
        fail_shutdown_wait: true,
        ..Faults::default()
    });
    let sys = open_vm(&svc, "some-vm").unwrap();
    let err = stop_vm(&svc, &sys, Timeout::from_secs(7)).unwrap_err();
    assert!(matches!(err, Error::Service(_)), "got {err}");
    sys.release();

    let calls = svc.calls();
    assert_eq!(svc.count(|c| matches!(c, Call::SubmitShutdown)), 1);
    // A stop timeout is reported, not escalated to terminate.
    assert_eq!(svc.count(|c| matches!(c, Call::SubmitTerminate)), 0);
    let wait_ms = calls.iter().find_map(|c| match c {
        Call::Wait { timeout_ms, .. } => Some(*timeout_ms),
        _ => None,
    });
    assert_eq!(wait_ms, Some(7_000));
    svc.assert_handles_balanced();
}

#[test]
fn kill_uses_the_fixed_bounded_wait() {
    let svc = FakeService::new();
    let sys = open_vm(&svc, "some-vm").unwrap();
    kill_vm(&svc, &sys).unwrap();
    sys.release();

    assert_eq!(svc.count(|c| matches!(c, Call::SubmitTerminate)), 1);
    let wait_ms = svc.calls().iter().find_map(|c| match c {
        Call::Wait { timeout_ms, .. } => Some(*timeout_ms),
        _ => None,
    });
    assert_eq!(wait_ms, Some(10_000));
    svc.assert_handles_balanced();
}

#[test]
fn enumerate_parses_the_displayed_subset() {
    let doc = json!([
        {
            "Id": "aaaa-1111",
            "SystemType": "VirtualMachine",
            "State": "Running",
            "Owner": "hcsvm",
            "ObscureServiceField": { "x": 1 }
        },
        { "Id": "bbbb-2222", "SystemType": "Container", "State": "SavedAsTemplate" }
    ])
    .to_string();
    let svc = FakeService::with_faults(Faults {
        enumerate_doc: Some(doc),
        ..Faults::default()
    });

    let entries = enumerate(&svc).unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].id, "aaaa-1111");
    assert_eq!(entries[0].owner, "hcsvm");
    assert_eq!(entries[1].state, "SavedAsTemplate");
    assert!(entries[1].owner.is_empty());
    svc.assert_handles_balanced();

    // The enumeration query uses the infinite wait.
    let wait_ms = svc.calls().iter().find_map(|c| match c {
        Call::Wait { timeout_ms, .. } => Some(*timeout_ms),
        _ => None,
    });
    assert_eq!(wait_ms, Some(u32::MAX));
}

#[test]
fn enumerate_with_no_systems_is_empty() {
    let svc = FakeService::new();
    assert!(enumerate(&svc).unwrap().is_empty());
}

#[test]
fn enumerate_rejects_garbage_results() {
    let svc = FakeService::with_faults(Faults {
        enumerate_doc: Some("certainly not json".to_string()),
        ..Faults::default()
    });
    let err = enumerate(&svc).unwrap_err();
    assert!(matches!(err, Error::MalformedResult(_)));
}

#[test]
fn properties_returns_the_document_verbatim() {
    let svc = FakeService::with_faults(Faults {
        properties_doc: Some(r#"{"Memory":{"VirtualMachineMemory":{}}}"#.to_string()),
        ..Faults::default()
    });
    let sys = open_vm(&svc, "some-vm").unwrap();
    let doc = properties(&svc, &sys, Some(r#"{"PropertyTypes":["Memory"]}"#)).unwrap();
    assert_eq!(doc, r#"{"Memory":{"VirtualMachineMemory":{}}}"#);
    sys.release();

    assert_eq!(
        svc.count(|c| matches!(c, Call::SubmitProperties(Some(q)) if q.contains("Memory"))),
        1
    );
    svc.assert_handles_balanced();
}
