//! HCS v2 configuration documents.
//!
//! The document model is partially typed: only the fields the transformer
//! touches (owner, SCSI attachments, virtual PCI devices) get real types;
//! everything else rides in flattened [`Map`]s so an operator-supplied spec
//! round-trips through parse → mutate → serialize with its unrecognized
//! fields intact. The same document text is what the compute service
//! ultimately receives.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::error::{Error, Result};
use crate::gpu::GpuDevice;

/// Owner string stamped on documents that don't carry one.
pub const DEFAULT_OWNER: &str = "hcsvm";

/// VirtualFunction sentinel meaning "auto-assign a GPU partition".
pub const VIRTUAL_FUNCTION_AUTO: u16 = 0xFFFF;

/// Top-level HCS v2 compute system document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ComputeSystemSpec {
    /// Owning component, for display in enumerations.
    #[serde(rename = "Owner", default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,

    /// Document schema version.
    #[serde(rename = "SchemaVersion", default, skip_serializing_if = "Option::is_none")]
    pub schema_version: Option<SchemaVersion>,

    /// Whether the service tears the VM down when the last handle closes.
    /// Kept false so the machine outlives this process.
    #[serde(rename = "ShouldTerminateOnLastHandleClosed", default)]
    pub should_terminate_on_last_handle_closed: bool,

    /// The virtual machine section.
    #[serde(rename = "VirtualMachine", default, skip_serializing_if = "Option::is_none")]
    pub virtual_machine: Option<VirtualMachineSpec>,

    /// Pass-through fields.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// HCS v2 schema version pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaVersion {
    #[serde(rename = "Major")]
    pub major: u32,
    #[serde(rename = "Minor")]
    pub minor: u32,
}

/// The VirtualMachine section: chipset/boot, compute topology, devices.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VirtualMachineSpec {
    #[serde(rename = "StopOnReset", default)]
    pub stop_on_reset: bool,

    /// Chipset and boot configuration, uninterpreted.
    #[serde(rename = "Chipset", default, skip_serializing_if = "Option::is_none")]
    pub chipset: Option<Value>,

    /// Memory and processor topology, uninterpreted.
    #[serde(rename = "ComputeTopology", default, skip_serializing_if = "Option::is_none")]
    pub compute_topology: Option<Value>,

    #[serde(rename = "Devices", default, skip_serializing_if = "Option::is_none")]
    pub devices: Option<DevicesSpec>,

    /// Pass-through fields.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// The device section. Maps are ordered so that path extraction walks the
/// same sequence as path rewriting within one transaction.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DevicesSpec {
    /// Controller-name → SCSI controller.
    #[serde(rename = "Scsi", default, skip_serializing_if = "BTreeMap::is_empty")]
    pub scsi: BTreeMap<String, ScsiController>,

    /// Slot-name → virtual PCI device (GPU passthrough).
    #[serde(rename = "VirtualPci", default, skip_serializing_if = "BTreeMap::is_empty")]
    pub virtual_pci: BTreeMap<String, VirtualPciDevice>,

    /// Pass-through fields (video, keyboard, guest interface, …).
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One SCSI controller with its slot → attachment mapping.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScsiController {
    #[serde(rename = "Attachments", default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attachments: BTreeMap<String, ScsiAttachment>,

    /// Pass-through fields.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A disk attached to a SCSI controller slot.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScsiAttachment {
    /// Attachment type, e.g. `VirtualDisk`.
    #[serde(rename = "Type", default)]
    pub kind: String,

    /// Host path of the backing file. Must be absolute by the time the
    /// document is submitted for creation.
    #[serde(rename = "Path", default)]
    pub path: String,

    /// Pass-through fields.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A host device exposed to the guest over virtual PCI.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VirtualPciDevice {
    /// Host device instance path, e.g. `PCI\VEN_10DE&DEV_...`.
    #[serde(rename = "DeviceInstancePath", default)]
    pub device_instance_path: String,

    /// Virtual function selector; [`VIRTUAL_FUNCTION_AUTO`] requests a
    /// service-assigned partition.
    #[serde(rename = "VirtualFunction", default)]
    pub virtual_function: u16,
}

impl ComputeSystemSpec {
    /// Parse a document from JSON text.
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| Error::InvalidSpec(e.to_string()))
    }

    /// Serialize to the wire form submitted to the service.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| Error::InvalidSpec(e.to_string()))
    }

    /// Serialize for display.
    pub fn to_json_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| Error::InvalidSpec(e.to_string()))
    }

    /// Stamp the default owner if the document doesn't name one.
    pub fn default_owner(&mut self) {
        if self.owner.as_deref().map_or(true, str::is_empty) {
            self.owner = Some(DEFAULT_OWNER.to_string());
        }
    }

    /// Rewrite every SCSI attachment path to absolute form, relative to the
    /// process working directory. Already-absolute paths pass through
    /// unchanged; empty paths are skipped.
    pub fn resolve_disk_paths(&mut self) -> Result<()> {
        let Some(devices) = self.virtual_machine.as_mut().and_then(|vm| vm.devices.as_mut())
        else {
            return Ok(());
        };
        for ctrl in devices.scsi.values_mut() {
            for att in ctrl.attachments.values_mut() {
                if att.path.is_empty() {
                    continue;
                }
                let abs = std::path::absolute(&att.path).map_err(|e| Error::PathResolution {
                    path: att.path.clone(),
                    reason: e.to_string(),
                })?;
                att.path = abs
                    .into_os_string()
                    .into_string()
                    .map_err(|_| Error::PathResolution {
                        path: att.path.clone(),
                        reason: "resolved path is not valid UTF-8".to_string(),
                    })?;
            }
        }
        Ok(())
    }

    /// Every non-empty SCSI attachment path, in stable map order. The grant
    /// and revoke phases both operate on this sequence.
    pub fn disk_paths(&self) -> Vec<String> {
        let Some(devices) = self.virtual_machine.as_ref().and_then(|vm| vm.devices.as_ref())
        else {
            return Vec::new();
        };
        devices
            .scsi
            .values()
            .flat_map(|ctrl| ctrl.attachments.values())
            .filter(|att| !att.path.is_empty())
            .map(|att| att.path.clone())
            .collect()
    }

    /// Replace the virtual PCI section with one entry per discovered GPU,
    /// keyed `gpu-0`, `gpu-1`, …, each set to auto-assign a partition.
    /// Destructive: pre-existing virtual PCI entries are discarded.
    pub fn inject_gpus(&mut self, gpus: &[GpuDevice]) {
        let devices = self
            .virtual_machine
            .get_or_insert_with(Default::default)
            .devices
            .get_or_insert_with(Default::default);
        devices.virtual_pci = gpus
            .iter()
            .enumerate()
            .map(|(i, gpu)| {
                (
                    format!("gpu-{i}"),
                    VirtualPciDevice {
                        device_instance_path: gpu.instance_path.clone(),
                        virtual_function: VIRTUAL_FUNCTION_AUTO,
                    },
                )
            })
            .collect();
    }

    /// Quick-create document: UEFI boot from a single SCSI-attached virtual
    /// disk, with the given memory and processor count. The disk must exist.
    pub fn minimal(vhdx: &Path, memory_mb: u32, cpus: u32) -> Result<Self> {
        let abs = std::path::absolute(vhdx).map_err(|e| Error::PathResolution {
            path: vhdx.display().to_string(),
            reason: e.to_string(),
        })?;
        if !abs.exists() {
            return Err(Error::DiskNotFound { path: abs });
        }
        let abs_str = abs
            .to_str()
            .ok_or_else(|| Error::PathResolution {
                path: vhdx.display().to_string(),
                reason: "path is not valid UTF-8".to_string(),
            })?
            .to_string();

        let mut attachments = BTreeMap::new();
        attachments.insert(
            "0".to_string(),
            ScsiAttachment {
                kind: "VirtualDisk".to_string(),
                path: abs_str,
                extra: Map::new(),
            },
        );
        let mut scsi = BTreeMap::new();
        scsi.insert(
            "Primary".to_string(),
            ScsiController {
                attachments,
                extra: Map::new(),
            },
        );

        Ok(ComputeSystemSpec {
            owner: Some(DEFAULT_OWNER.to_string()),
            schema_version: Some(SchemaVersion { major: 2, minor: 1 }),
            should_terminate_on_last_handle_closed: false,
            virtual_machine: Some(VirtualMachineSpec {
                stop_on_reset: true,
                chipset: Some(json!({
                    "Uefi": {
                        "BootThis": {
                            "DevicePath": "Primary",
                            "DeviceType": "ScsiDrive",
                            "DiskNumber": 0
                        }
                    }
                })),
                compute_topology: Some(json!({
                    "Memory": {
                        "SizeInMB": memory_mb,
                        "AllowOvercommit": true
                    },
                    "Processor": {
                        "Count": cpus
                    }
                })),
                devices: Some(DevicesSpec {
                    scsi,
                    virtual_pci: BTreeMap::new(),
                    extra: Map::new(),
                }),
                extra: Map::new(),
            }),
            extra: Map::new(),
        })
    }
}
