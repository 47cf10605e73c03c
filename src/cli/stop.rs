//! Stop command implementation.

use clap::Args;
use hcsvm::hcs::Timeout;
use hcsvm::{hcs, vm};

/// Gracefully shut down a compute system.
#[derive(Args, Debug)]
pub struct StopCmd {
    /// Compute system identity.
    pub id: String,

    /// Shutdown timeout in seconds.
    #[arg(long, default_value = "30")]
    pub timeout: u32,
}

impl StopCmd {
    /// Execute the stop command.
    pub fn run(&self) -> hcsvm::Result<()> {
        let svc = hcs::default_service()?;
        let sys = vm::open_vm(svc.as_ref(), &self.id)?;
        // On timeout the machine stays in whatever state the service
        // reports; escalation to kill is the operator's call.
        vm::stop_vm(svc.as_ref(), &sys, Timeout::from_secs(self.timeout))?;
        eprintln!("Compute system shut down successfully.");
        Ok(())
    }
}
