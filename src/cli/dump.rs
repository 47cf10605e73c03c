//! Dump command implementation.

use clap::Args;
use hcsvm::{hcs, vm};

/// Property query asking the service for everything it will report about a
/// virtual machine.
const DUMP_QUERY: &str = r#"{"PropertyTypes":["Memory","Statistics","ProcessList"]}"#;

/// Dump all available properties of a compute system.
#[derive(Args, Debug)]
pub struct DumpCmd {
    /// Compute system identity.
    pub id: String,
}

impl DumpCmd {
    /// Execute the dump command.
    pub fn run(&self) -> hcsvm::Result<()> {
        let svc = hcs::default_service()?;
        let sys = vm::open_vm(svc.as_ref(), &self.id)?;
        let doc = vm::properties(svc.as_ref(), &sys, Some(DUMP_QUERY))?;
        super::inspect::print_document(&doc);
        Ok(())
    }
}
