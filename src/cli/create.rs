//! Create command implementation.

use std::path::PathBuf;

use clap::Args;
use hcsvm::spec::ComputeSystemSpec;
use hcsvm::{gpu, hcs, vm, Error};

/// Create and start a VM from a JSON spec or VHDX file.
#[derive(Args, Debug)]
pub struct CreateCmd {
    /// Path to an HCS v2 JSON spec file.
    #[arg(long)]
    pub spec: Option<PathBuf>,

    /// Path to a bootable VHDX file (quick-create mode).
    #[arg(long)]
    pub vhdx: Option<PathBuf>,

    /// Memory in MB (quick-create mode).
    #[arg(long, default_value = "2048")]
    pub memory: u32,

    /// Number of virtual CPUs (quick-create mode).
    #[arg(long, default_value = "2")]
    pub cpus: u32,

    /// Enable GPU passthrough.
    #[arg(long)]
    pub gpu: bool,

    /// Friendly name for the VM (diagnostics only).
    #[arg(long)]
    pub name: Option<String>,

    /// Print the generated spec without creating the VM.
    #[arg(long)]
    pub dry_run: bool,
}

impl CreateCmd {
    /// Execute the create command.
    pub fn run(self) -> hcsvm::Result<()> {
        // Quick-create injects GPUs while building the document; spec-file
        // mode leaves injection to the transaction.
        let (spec_json, inject_in_transaction) = match (&self.spec, &self.vhdx) {
            (Some(_), Some(_)) => {
                return Err(Error::invalid_spec("--spec and --vhdx are mutually exclusive"));
            }
            (None, None) => {
                return Err(Error::invalid_spec("specify either --spec or --vhdx"));
            }
            (Some(spec_path), None) => (read_spec_file(spec_path)?, self.gpu),
            (None, Some(vhdx)) => (self.build_quick_spec(vhdx)?, false),
        };

        if self.dry_run {
            print_spec(&spec_json);
            return Ok(());
        }

        let svc = hcs::default_service()?;
        let discovery = if inject_in_transaction {
            Some(gpu::default_discovery()?)
        } else {
            None
        };

        let vm_id = vm::create_and_start(
            svc.as_ref(),
            discovery.as_deref(),
            &spec_json,
            self.name.as_deref(),
            inject_in_transaction,
        )?;

        // The identity goes to stdout for scripting; everything else is stderr.
        println!("{vm_id}");
        eprintln!("VM started successfully.");
        Ok(())
    }

    /// Build the quick-create document from flags.
    fn build_quick_spec(&self, vhdx: &PathBuf) -> hcsvm::Result<String> {
        let mut spec = ComputeSystemSpec::minimal(vhdx, self.memory, self.cpus)?;
        if self.gpu {
            let discovery = gpu::default_discovery()?;
            let gpus = discovery.list_gpu_devices()?;
            if gpus.is_empty() {
                return Err(Error::NoGpuFound);
            }
            eprintln!("Found {} GPU(s) for passthrough:", gpus.len());
            for gpu in &gpus {
                eprintln!("  {} ({})", gpu.name, gpu.instance_path);
            }
            spec.inject_gpus(&gpus);
        }
        spec.to_json_pretty()
    }
}

/// Read a spec file and check that it is valid JSON. The text itself is
/// passed through; the transaction does the full parse.
fn read_spec_file(path: &PathBuf) -> hcsvm::Result<String> {
    let text = std::fs::read_to_string(path)?;
    serde_json::from_str::<serde_json::Value>(&text)
        .map_err(|e| Error::InvalidSpec(format!("{}: {e}", path.display())))?;
    Ok(text)
}

/// Print a spec to stderr for inspection, prettified when possible.
fn print_spec(spec_json: &str) {
    match serde_json::from_str::<serde_json::Value>(spec_json) {
        Ok(value) => match serde_json::to_string_pretty(&value) {
            Ok(pretty) => eprintln!("{pretty}"),
            Err(_) => eprintln!("{spec_json}"),
        },
        Err(_) => eprintln!("{spec_json}"),
    }
}
