//! Kill command implementation.

use clap::Args;
use hcsvm::{hcs, vm};

/// Forcibly terminate a compute system.
#[derive(Args, Debug)]
pub struct KillCmd {
    /// Compute system identity.
    pub id: String,
}

impl KillCmd {
    /// Execute the kill command.
    pub fn run(&self) -> hcsvm::Result<()> {
        let svc = hcs::default_service()?;
        let sys = vm::open_vm(svc.as_ref(), &self.id)?;
        vm::kill_vm(svc.as_ref(), &sys)?;
        eprintln!("Compute system terminated.");
        Ok(())
    }
}
