//! Production [`ComputeService`] bound to computecore.dll.
//!
//! All calls are synchronous: we pass no completion callback when creating
//! operations, and block in `HcsWaitForOperationResult`. A result document
//! is owned by its operation and valid only while the operation is open, so
//! it is copied into an owned `String` before this module returns; callers
//! never see service-owned memory.

use std::ptr;

use windows_sys::core::PWSTR;
use windows_sys::Win32::Foundation::{CloseHandle, GENERIC_ALL, HANDLE};
use windows_sys::Win32::Security::{
    GetTokenInformation, TokenElevation, TOKEN_ELEVATION, TOKEN_QUERY,
};
use windows_sys::Win32::System::HostComputeSystem::{
    HcsCloseComputeSystem, HcsCloseOperation, HcsCreateComputeSystem, HcsCreateOperation,
    HcsEnumerateComputeSystems, HcsGetComputeSystemProperties, HcsGrantVmAccess,
    HcsOpenComputeSystem, HcsRevokeVmAccess, HcsShutDownComputeSystem, HcsStartComputeSystem,
    HcsTerminateComputeSystem, HcsWaitForOperationResult, HCS_OPERATION, HCS_SYSTEM,
};
use windows_sys::Win32::System::Threading::{GetCurrentProcess, OpenProcessToken};

use super::hresult::{HResult, ServiceError};
use super::{ComputeService, OperationId, SystemId, Timeout};

/// The host compute service, reached through computecore.dll.
#[derive(Debug, Default)]
pub struct HostComputeService;

impl HostComputeService {
    /// Create a service binding. The DLL is resolved at link time; on hosts
    /// without the Hyper-V feature every call fails with a service HRESULT.
    pub fn new() -> Self {
        Self
    }
}

/// NUL-terminated UTF-16 for a service string argument.
fn wide(op: &'static str, s: &str) -> Result<Vec<u16>, ServiceError> {
    if s.contains('\0') {
        // E_INVALIDARG: the service string APIs cannot carry interior NULs.
        return Err(ServiceError::new(op, HResult(0x8007_0057)));
    }
    Ok(s.encode_utf16().chain(std::iter::once(0)).collect())
}

/// Copy a result document out of its operation-owned buffer.
///
/// # Safety
/// `ptr` must be NULL or a NUL-terminated UTF-16 buffer that stays valid for
/// the duration of this call.
unsafe fn copy_result_document(ptr: PWSTR) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    let mut len = 0usize;
    while *ptr.add(len) != 0 {
        len += 1;
    }
    let text = String::from_utf16_lossy(std::slice::from_raw_parts(ptr, len));
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

fn check(op: &'static str, hr: i32) -> Result<(), ServiceError> {
    let hr = HResult(hr as u32);
    if hr.is_success() {
        Ok(())
    } else {
        Err(ServiceError::new(op, hr))
    }
}

impl ComputeService for HostComputeService {
    fn create_operation(&self) -> Result<OperationId, ServiceError> {
        // No context, no callback: synchronous usage throughout.
        let op = unsafe { HcsCreateOperation(ptr::null(), None) };
        if op == 0 {
            // The API signals allocation failure with a null handle, not an HRESULT.
            return Err(ServiceError::new("HcsCreateOperation", HResult(0x8000_4005)));
        }
        Ok(OperationId(op as u64))
    }

    fn close_operation(&self, op: OperationId) {
        if op.0 != 0 {
            unsafe { HcsCloseOperation(op.0 as HCS_OPERATION) };
        }
    }

    fn wait_for_result(
        &self,
        op: OperationId,
        timeout: Timeout,
    ) -> Result<Option<String>, ServiceError> {
        let mut result: PWSTR = ptr::null_mut();
        let hr = unsafe {
            HcsWaitForOperationResult(op.0 as HCS_OPERATION, timeout.as_millis(), &mut result)
        };
        let document = unsafe { copy_result_document(result) };
        let hr = HResult(hr as u32);
        if !hr.is_success() {
            return Err(ServiceError::new("HcsWaitForOperationResult", hr).with_result(document));
        }
        Ok(document)
    }

    fn create_system(
        &self,
        id: &str,
        config_json: &str,
        op: OperationId,
    ) -> Result<SystemId, ServiceError> {
        let id_w = wide("HcsCreateComputeSystem", id)?;
        let config_w = wide("HcsCreateComputeSystem", config_json)?;
        let mut sys: HCS_SYSTEM = 0;
        let hr = unsafe {
            HcsCreateComputeSystem(
                id_w.as_ptr(),
                config_w.as_ptr(),
                op.0 as HCS_OPERATION,
                ptr::null(), // default security descriptor
                &mut sys,
            )
        };
        check("HcsCreateComputeSystem", hr)?;
        Ok(SystemId(sys as u64))
    }

    fn open_system(&self, id: &str) -> Result<SystemId, ServiceError> {
        let id_w = wide("HcsOpenComputeSystem", id)?;
        let mut sys: HCS_SYSTEM = 0;
        let hr = unsafe { HcsOpenComputeSystem(id_w.as_ptr(), GENERIC_ALL, &mut sys) };
        check("HcsOpenComputeSystem", hr)?;
        Ok(SystemId(sys as u64))
    }

    fn close_system(&self, sys: SystemId) {
        if sys.0 != 0 {
            unsafe { HcsCloseComputeSystem(sys.0 as HCS_SYSTEM) };
        }
    }

    fn start_system(&self, sys: SystemId, op: OperationId) -> Result<(), ServiceError> {
        let hr = unsafe {
            HcsStartComputeSystem(sys.0 as HCS_SYSTEM, op.0 as HCS_OPERATION, ptr::null())
        };
        check("HcsStartComputeSystem", hr)
    }

    fn shutdown_system(&self, sys: SystemId, op: OperationId) -> Result<(), ServiceError> {
        let hr = unsafe {
            HcsShutDownComputeSystem(sys.0 as HCS_SYSTEM, op.0 as HCS_OPERATION, ptr::null())
        };
        check("HcsShutDownComputeSystem", hr)
    }

    fn terminate_system(&self, sys: SystemId, op: OperationId) -> Result<(), ServiceError> {
        let hr = unsafe {
            HcsTerminateComputeSystem(sys.0 as HCS_SYSTEM, op.0 as HCS_OPERATION, ptr::null())
        };
        check("HcsTerminateComputeSystem", hr)
    }

    fn enumerate_systems(&self, op: OperationId) -> Result<(), ServiceError> {
        // NULL query lists every compute system.
        let hr = unsafe { HcsEnumerateComputeSystems(ptr::null(), op.0 as HCS_OPERATION) };
        check("HcsEnumerateComputeSystems", hr)
    }

    fn get_properties(
        &self,
        sys: SystemId,
        query: Option<&str>,
        op: OperationId,
    ) -> Result<(), ServiceError> {
        let query_w = match query {
            Some(q) => Some(wide("HcsGetComputeSystemProperties", q)?),
            None => None,
        };
        let query_ptr = query_w.as_ref().map_or(ptr::null(), |q| q.as_ptr());
        let hr = unsafe {
            HcsGetComputeSystemProperties(sys.0 as HCS_SYSTEM, op.0 as HCS_OPERATION, query_ptr)
        };
        check("HcsGetComputeSystemProperties", hr)
    }

    fn grant_access(&self, vm_id: &str, path: &str) -> Result<(), ServiceError> {
        let id_w = wide("HcsGrantVmAccess", vm_id)?;
        let path_w = wide("HcsGrantVmAccess", path)?;
        let hr = unsafe { HcsGrantVmAccess(id_w.as_ptr(), path_w.as_ptr()) };
        let hr = HResult(hr as u32);
        if !hr.is_success() {
            return Err(ServiceError::new(format!("HcsGrantVmAccess({path})"), hr));
        }
        Ok(())
    }

    fn revoke_access(&self, vm_id: &str, path: &str) -> Result<(), ServiceError> {
        let id_w = wide("HcsRevokeVmAccess", vm_id)?;
        let path_w = wide("HcsRevokeVmAccess", path)?;
        let hr = unsafe { HcsRevokeVmAccess(id_w.as_ptr(), path_w.as_ptr()) };
        let hr = HResult(hr as u32);
        if !hr.is_success() {
            return Err(ServiceError::new(format!("HcsRevokeVmAccess({path})"), hr));
        }
        Ok(())
    }
}

/// Whether the current process token is elevated. Service mutations require
/// elevation; callers warn up front instead of failing halfway through.
pub fn is_elevated() -> bool {
    unsafe {
        let mut token: HANDLE = 0;
        if OpenProcessToken(GetCurrentProcess(), TOKEN_QUERY, &mut token) == 0 {
            return false;
        }
        let mut elevation = TOKEN_ELEVATION { TokenIsElevated: 0 };
        let mut len = 0u32;
        let ok = GetTokenInformation(
            token,
            TokenElevation,
            (&mut elevation as *mut TOKEN_ELEVATION).cast(),
            std::mem::size_of::<TOKEN_ELEVATION>() as u32,
            &mut len,
        );
        CloseHandle(token);
        ok != 0 && elevation.TokenIsElevated != 0
    }
}
