//! Inspect command implementation.

use clap::Args;
use hcsvm::{hcs, vm};

/// Show basic properties of a compute system.
#[derive(Args, Debug)]
pub struct InspectCmd {
    /// Compute system identity.
    pub id: String,
}

impl InspectCmd {
    /// Execute the inspect command.
    pub fn run(&self) -> hcsvm::Result<()> {
        let svc = hcs::default_service()?;
        let sys = vm::open_vm(svc.as_ref(), &self.id)?;
        // No query: the service's default property set.
        let doc = vm::properties(svc.as_ref(), &sys, None)?;
        print_document(&doc);
        Ok(())
    }
}

/// Pretty-print a service document, falling back to raw text if it is not
/// valid JSON.
pub(crate) fn print_document(doc: &str) {
    match serde_json::from_str::<serde_json::Value>(doc) {
        Ok(value) => match serde_json::to_string_pretty(&value) {
            Ok(pretty) => println!("{pretty}"),
            Err(_) => println!("{doc}"),
        },
        Err(_) => println!("{doc}"),
    }
}
