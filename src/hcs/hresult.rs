//! HRESULT classification for compute service calls.
//!
//! Every call against the service reports an HRESULT. The only decision made
//! here is success versus failure plus a human-readable annotation for a
//! handful of well-known codes; retry policy is deliberately absent (a failed
//! service call is never retried, it is compensated).

use std::fmt;

/// A raw HRESULT status code as returned by the compute service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HResult(pub u32);

/// Exact success.
pub const S_OK: HResult = HResult(0);

/// Success with caveats.
pub const S_FALSE: HResult = HResult(1);

/// The compute system does not exist.
pub const HCS_E_SYSTEM_NOT_FOUND: HResult = HResult(0xC037_010E);

/// A compute system with the same identity already exists.
pub const HCS_E_SYSTEM_ALREADY_EXISTS: HResult = HResult(0xC037_010F);

/// The compute system is already stopped.
pub const HCS_E_SYSTEM_ALREADY_STOPPED: HResult = HResult(0xC037_0110);

/// The configuration document was rejected as malformed.
pub const HCS_E_INVALID_JSON: HResult = HResult(0xC037_010D);

/// The requested operation is not valid in the system's current state.
pub const HCS_E_INVALID_STATE: HResult = HResult(0xC037_0105);

/// The hypervisor is not running on this host.
pub const HCS_E_HYPERVISOR_NOT_PRESENT: HResult = HResult(0xC035_1000);

/// Access denied.
pub const E_ACCESS_DENIED: HResult = HResult(0x8007_0005);

/// The bounded wait elapsed before the operation completed.
pub const E_WAIT_TIMEOUT: HResult = HResult(0x8007_05B4);

impl HResult {
    /// Whether this code indicates success (S_OK or S_FALSE).
    pub fn is_success(self) -> bool {
        self == S_OK || self == S_FALSE
    }

    /// Human-readable annotation for well-known codes.
    pub fn message(self) -> Option<&'static str> {
        match self {
            HCS_E_SYSTEM_NOT_FOUND => Some("compute system not found"),
            HCS_E_SYSTEM_ALREADY_EXISTS => Some("compute system already exists"),
            HCS_E_SYSTEM_ALREADY_STOPPED => Some("compute system is already stopped"),
            HCS_E_INVALID_JSON => Some("configuration document rejected as invalid JSON"),
            HCS_E_INVALID_STATE => Some("operation not valid in the current system state"),
            HCS_E_HYPERVISOR_NOT_PRESENT => Some("hypervisor is not present — enable Hyper-V"),
            E_ACCESS_DENIED => Some("access denied — run as Administrator"),
            E_WAIT_TIMEOUT => Some("timed out waiting for the operation"),
            _ => None,
        }
    }
}

impl fmt::Display for HResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#010x}", self.0)
    }
}

/// A service call failure: the operation name, the raw HRESULT, and the
/// result document the service attached to the failure, if any.
///
/// The result document is diagnostic payload and is carried verbatim, never
/// parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceError {
    /// Name of the failed service call, e.g. `HcsStartComputeSystem`.
    pub op: String,

    /// The raw status code.
    pub hr: HResult,

    /// Service-provided result document, verbatim.
    pub result: Option<String>,
}

impl ServiceError {
    /// Create a service error with no result document.
    pub fn new(op: impl Into<String>, hr: HResult) -> Self {
        Self {
            op: op.into(),
            hr,
            result: None,
        }
    }

    /// Attach the result document returned alongside the failure.
    pub fn with_result(mut self, result: Option<String>) -> Self {
        self.result = result.filter(|r| !r.is_empty());
        self
    }
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: HRESULT {}", self.op, self.hr)?;
        if let Some(msg) = self.hr.message() {
            write!(f, " ({msg})")?;
        }
        if let Some(result) = &self.result {
            write!(f, "\n  result: {result}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ServiceError {}
