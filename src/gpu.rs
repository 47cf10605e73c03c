//! Host GPU discovery for passthrough.
//!
//! The creation transaction never enumerates devices itself; it consults a
//! [`GpuDiscovery`] collaborator. "No devices" is an empty list, not an
//! error; only a genuine enumeration failure is an error.

use crate::error::Result;

/// A host GPU suitable for passthrough.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GpuDevice {
    /// Friendly device name, for diagnostics.
    pub name: String,

    /// Device instance path, e.g. `PCI\VEN_10DE&DEV_...`.
    pub instance_path: String,
}

/// Source of GPU descriptors.
pub trait GpuDiscovery {
    /// List the host's present GPUs. An empty list means "no devices".
    fn list_gpu_devices(&self) -> Result<Vec<GpuDevice>>;
}

/// Get the GPU discovery collaborator for this host.
pub fn default_discovery() -> Result<Box<dyn GpuDiscovery>> {
    #[cfg(windows)]
    {
        Ok(Box::new(setup_api::SetupApiDiscovery::new()))
    }
    #[cfg(not(windows))]
    {
        Err(crate::error::Error::service_unavailable(
            "GPU discovery requires Windows",
        ))
    }
}

#[cfg(windows)]
mod setup_api {
    //! Display-class device enumeration through SetupAPI.

    use windows_sys::Win32::Devices::DeviceAndDriverInstallation::{
        SetupDiDestroyDeviceInfoList, SetupDiEnumDeviceInfo, SetupDiGetClassDevsW,
        SetupDiGetDeviceInstanceIdW, SetupDiGetDeviceRegistryPropertyW, DIGCF_PRESENT,
        GUID_DEVCLASS_DISPLAY, HDEVINFO, SPDRP_DEVICEDESC, SPDRP_FRIENDLYNAME, SP_DEVINFO_DATA,
    };
    use windows_sys::Win32::Foundation::INVALID_HANDLE_VALUE;

    use super::{GpuDevice, GpuDiscovery};
    use crate::error::{Error, Result};

    /// Enumerates present display adapters.
    #[derive(Debug, Default)]
    pub struct SetupApiDiscovery;

    impl SetupApiDiscovery {
        pub fn new() -> Self {
            Self
        }
    }

    impl GpuDiscovery for SetupApiDiscovery {
        fn list_gpu_devices(&self) -> Result<Vec<GpuDevice>> {
            let dev_info: HDEVINFO = unsafe {
                SetupDiGetClassDevsW(
                    &GUID_DEVCLASS_DISPLAY,
                    std::ptr::null(),
                    0,
                    DIGCF_PRESENT,
                )
            };
            if dev_info == INVALID_HANDLE_VALUE as HDEVINFO {
                return Err(Error::GpuDiscovery(format!(
                    "SetupDiGetClassDevs failed: {}",
                    std::io::Error::last_os_error()
                )));
            }

            let mut gpus = Vec::new();
            let mut index = 0u32;
            loop {
                let mut data: SP_DEVINFO_DATA = unsafe { std::mem::zeroed() };
                data.cbSize = std::mem::size_of::<SP_DEVINFO_DATA>() as u32;
                let ok = unsafe { SetupDiEnumDeviceInfo(dev_info, index, &mut data) };
                if ok == 0 {
                    break; // no more devices
                }
                index += 1;

                let Some(instance_path) = instance_id(dev_info, &data) else {
                    continue;
                };
                // Friendly name, falling back to the device description.
                let name = registry_string(dev_info, &data, SPDRP_FRIENDLYNAME)
                    .or_else(|| registry_string(dev_info, &data, SPDRP_DEVICEDESC))
                    .unwrap_or_else(|| "Unknown GPU".to_string());

                gpus.push(GpuDevice { name, instance_path });
            }

            unsafe { SetupDiDestroyDeviceInfoList(dev_info) };
            Ok(gpus)
        }
    }

    fn instance_id(dev_info: HDEVINFO, data: &SP_DEVINFO_DATA) -> Option<String> {
        let mut buf = [0u16; 512];
        let mut required = 0u32;
        let ok = unsafe {
            SetupDiGetDeviceInstanceIdW(
                dev_info,
                data,
                buf.as_mut_ptr(),
                buf.len() as u32,
                &mut required,
            )
        };
        if ok == 0 {
            return None;
        }
        Some(decode_utf16z(&buf)).filter(|s| !s.is_empty())
    }

    fn registry_string(dev_info: HDEVINFO, data: &SP_DEVINFO_DATA, property: u32) -> Option<String> {
        let mut buf = [0u16; 256];
        let mut data_type = 0u32;
        let mut required = 0u32;
        let ok = unsafe {
            SetupDiGetDeviceRegistryPropertyW(
                dev_info,
                data,
                property,
                &mut data_type,
                buf.as_mut_ptr().cast(),
                (buf.len() * 2) as u32, // size in bytes
                &mut required,
            )
        };
        if ok == 0 {
            return None;
        }
        Some(decode_utf16z(&buf)).filter(|s| !s.is_empty())
    }

    fn decode_utf16z(buf: &[u16]) -> String {
        let len = buf.iter().position(|&c| c == 0).unwrap_or(buf.len());
        String::from_utf16_lossy(&buf[..len])
    }
}
