//! hcsvm: lifecycle tooling for Hyper-V Host Compute System VMs.
//!
//! The core of the crate is a single multi-phase transaction against the
//! compute service: load or build an HCS v2 document, grant the VM access to
//! its backing disks, create the compute system, start it, and unwind every
//! completed phase if a later one fails. The service is reached through the
//! [`hcs::ComputeService`] trait; on Windows that binds computecore.dll,
//! and in tests it is a scripted fake.

pub mod error;
pub mod gpu;
pub mod hcs;
pub mod spec;
pub mod vm;

pub use error::{Error, Result};
pub use gpu::GpuDevice;
pub use spec::ComputeSystemSpec;
pub use vm::VmId;

/// Crate version, for diagnostics.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
