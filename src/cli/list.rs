//! List command implementation.

use clap::Args;
use hcsvm::{hcs, vm};

/// List all compute systems.
#[derive(Args, Debug)]
pub struct ListCmd {
    /// Output as JSON.
    #[arg(long)]
    pub json: bool,
}

impl ListCmd {
    /// Execute the list command.
    pub fn run(&self) -> hcsvm::Result<()> {
        let svc = hcs::default_service()?;
        let entries = vm::enumerate(svc.as_ref())?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&entries).unwrap_or_else(|_| "[]".into()));
            return Ok(());
        }

        if entries.is_empty() {
            println!("No compute systems found.");
            return Ok(());
        }

        // Table output
        println!(
            "{:<38} {:<16} {:<10} {:<12} {:<20}",
            "ID", "TYPE", "STATE", "OWNER", "NAME"
        );
        for entry in entries {
            println!(
                "{:<38} {:<16} {:<10} {:<12} {:<20}",
                entry.id,
                entry.system_type,
                entry.state,
                dash_if_empty(&entry.owner),
                dash_if_empty(&entry.name),
            );
        }

        Ok(())
    }
}

fn dash_if_empty(s: &str) -> &str {
    if s.is_empty() {
        "-"
    } else {
        s
    }
}
