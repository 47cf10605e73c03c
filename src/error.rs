//! Error types for hcsvm.

use std::path::PathBuf;
use thiserror::Error;

use crate::hcs::hresult::ServiceError;

/// Result type alias using hcsvm's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in hcsvm operations.
///
/// Each creation-transaction phase has its own variant so that a failure
/// always names the phase that caused it. Compensation failures (revokes,
/// rollback terminates) are logged and swallowed, never surfaced here.
#[derive(Error, Debug)]
pub enum Error {
    /// The input document is not a valid compute system spec.
    #[error("invalid spec: {0}")]
    InvalidSpec(String),

    /// A disk path in the spec could not be resolved to absolute form.
    #[error("cannot resolve path {path:?}: {reason}")]
    PathResolution {
        /// The offending path, verbatim from the spec.
        path: String,
        /// Why resolution failed.
        reason: String,
    },

    /// The boot disk for quick-create mode does not exist.
    #[error("virtual disk not found: {}", path.display())]
    DiskNotFound {
        /// Path that was not found.
        path: PathBuf,
    },

    /// GPU enumeration itself failed (not "no devices").
    #[error("gpu discovery failed: {0}")]
    GpuDiscovery(String),

    /// GPU passthrough was requested but the host has no GPUs.
    #[error("no GPUs found for passthrough")]
    NoGpuFound,

    /// Granting the VM access to a host file failed.
    #[error("grant access to {path:?}: {source}")]
    AccessGrant {
        /// The path whose grant failed.
        path: String,
        /// The service failure.
        source: ServiceError,
    },

    /// The create-compute-system call failed.
    #[error("create compute system: {0}")]
    Create(ServiceError),

    /// The start call failed after the system was created.
    #[error("start compute system: {0}")]
    Start(ServiceError),

    /// The given identity does not resolve to a live compute system.
    #[error("compute system not found: {0}")]
    NotFound(String),

    /// The host compute service cannot be reached on this host.
    #[error("host compute service unavailable: {0}")]
    ServiceUnavailable(String),

    /// A service result document could not be decoded.
    #[error("malformed service result: {0}")]
    MalformedResult(String),

    /// Any other service-reported failure (read paths, stop, kill).
    #[error(transparent)]
    Service(#[from] ServiceError),

    /// IO error wrapper.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create an invalid-spec error with a message.
    pub fn invalid_spec(msg: impl Into<String>) -> Self {
        Self::InvalidSpec(msg.into())
    }

    /// Create a gpu-discovery error with a message.
    pub fn gpu_discovery(msg: impl Into<String>) -> Self {
        Self::GpuDiscovery(msg.into())
    }

    /// Create a service-unavailable error with a message.
    pub fn service_unavailable(msg: impl Into<String>) -> Self {
        Self::ServiceUnavailable(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hcs::hresult::HResult;

    /// Error messages should name the failed phase and carry enough context
    /// to act on. These tests pin the message content.

    #[test]
    fn test_path_resolution_includes_path() {
        let err = Error::PathResolution {
            path: "disks/boot.vhdx".to_string(),
            reason: "empty current directory".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("disks/boot.vhdx"), "message should include the path");
    }

    #[test]
    fn test_create_names_the_phase() {
        let err = Error::Create(ServiceError::new("HcsCreateComputeSystem", HResult(0x8007_0005)));
        let msg = err.to_string();
        assert!(msg.starts_with("create compute system"), "message should name the phase");
        assert!(msg.contains("0x80070005"), "message should include the status code");
    }

    #[test]
    fn test_grant_includes_path_and_code() {
        let err = Error::AccessGrant {
            path: "C:\\vms\\boot.vhdx".to_string(),
            source: ServiceError::new("HcsGrantVmAccess", HResult(0x8007_0005)),
        };
        let msg = err.to_string();
        assert!(msg.contains("C:\\vms\\boot.vhdx"));
        assert!(msg.contains("0x80070005"));
    }

    #[test]
    fn test_not_found_includes_id() {
        let err = Error::NotFound("2fbd81e6-1f6c-4b2b-9d0c-3c3d7f1f2a10".to_string());
        assert!(err.to_string().contains("2fbd81e6"));
    }
}
