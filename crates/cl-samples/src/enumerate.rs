//! Platform / device inventory, serialized as YAML by `enumopencl`.

use opencl3::{
    device::{
        Device, CL_DEVICE_TYPE_ACCELERATOR, CL_DEVICE_TYPE_CPU, CL_DEVICE_TYPE_CUSTOM,
        CL_DEVICE_TYPE_DEFAULT, CL_DEVICE_TYPE_GPU,
    },
    platform::Platform,
    types::cl_device_type,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{select, ClError};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub vendor: String,
    pub version: String,
    pub profile: String,
    pub driver_version: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformInfo {
    pub name: String,
    pub vendor: String,
    pub version: String,
    pub devices: Vec<DeviceInfo>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inventory {
    pub platforms: Vec<PlatformInfo>,
}

const TYPE_FLAGS: [(cl_device_type, &str); 5] = [
    (CL_DEVICE_TYPE_DEFAULT, "DEFAULT"),
    (CL_DEVICE_TYPE_CPU, "CPU"),
    (CL_DEVICE_TYPE_GPU, "GPU"),
    (CL_DEVICE_TYPE_ACCELERATOR, "ACCELERATOR"),
    (CL_DEVICE_TYPE_CUSTOM, "CUSTOM"),
];

/// Human-readable form of a `CL_DEVICE_TYPE` bitfield, e.g. `"DEFAULT GPU"`.
pub fn device_type_label(ty: cl_device_type) -> String {
    let names: Vec<&str> = TYPE_FLAGS
        .iter()
        .filter(|(bit, _)| ty & bit != 0)
        .map(|(_, name)| *name)
        .collect();
    if names.is_empty() {
        "UNKNOWN".to_owned()
    } else {
        names.join(" ")
    }
}

impl DeviceInfo {
    pub fn query(device: &Device) -> Result<Self, ClError> {
        Ok(Self {
            name: device.name()?,
            kind: device_type_label(device.dev_type()?),
            vendor: device.vendor()?,
            version: device.version()?,
            profile: device.profile()?,
            driver_version: device.driver_version()?,
        })
    }
}

impl PlatformInfo {
    pub fn query(platform: &Platform) -> Result<Self, ClError> {
        let devices = select::devices(platform)?
            .iter()
            .map(DeviceInfo::query)
            .collect::<Result<Vec<_>, _>>()?;
        let info = Self {
            name: platform.name()?,
            vendor: platform.vendor()?,
            version: platform.version()?,
            devices,
        };
        debug!(platform = %info.name, devices = info.devices.len(), "queried platform");
        Ok(info)
    }
}

impl Inventory {
    /// Queries every installed platform and its devices.
    pub fn query() -> Result<Self, ClError> {
        let platforms = select::platforms()?
            .iter()
            .map(PlatformInfo::query)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { platforms })
    }

    pub fn device_count(&self) -> usize {
        self.platforms.iter().map(|p| p.devices.len()).sum()
    }

    pub fn to_yaml(&self) -> Result<String, ClError> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn from_yaml(text: &str) -> Result<Self, ClError> {
        Ok(serde_yaml::from_str(text)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn device(name: &str, kind: &str) -> DeviceInfo {
        DeviceInfo {
            name: name.into(),
            kind: kind.into(),
            vendor: "Acme".into(),
            version: "OpenCL 3.0".into(),
            profile: "FULL_PROFILE".into(),
            driver_version: "1.2.3".into(),
        }
    }

    #[test]
    fn type_labels() {
        assert_eq!(device_type_label(CL_DEVICE_TYPE_GPU), "GPU");
        assert_eq!(
            device_type_label(CL_DEVICE_TYPE_DEFAULT | CL_DEVICE_TYPE_CPU),
            "DEFAULT CPU"
        );
        assert_eq!(device_type_label(0), "UNKNOWN");
    }

    #[test]
    fn yaml_keeps_platform_and_device_layout() {
        let inv = Inventory {
            platforms: vec![
                PlatformInfo {
                    name: "First".into(),
                    vendor: "Acme".into(),
                    version: "OpenCL 3.0".into(),
                    devices: vec![device("gpu0", "GPU"), device("cpu0", "CPU")],
                },
                PlatformInfo {
                    name: "Second".into(),
                    vendor: "Other".into(),
                    version: "OpenCL 1.2".into(),
                    devices: vec![],
                },
            ],
        };

        let yaml = inv.to_yaml().unwrap();
        assert!(yaml.starts_with("platforms:"));
        assert!(yaml.contains("type: GPU"));
        assert!(yaml.contains("driver_version:"));

        let back = Inventory::from_yaml(&yaml).unwrap();
        assert_eq!(back, inv);
        assert_eq!(back.platforms[0].devices.len(), 2);
        assert!(back.platforms[1].devices.is_empty());
        assert_eq!(back.device_count(), 2);
    }

    #[test]
    fn empty_inventory_is_an_empty_list() {
        let yaml = Inventory::default().to_yaml().unwrap();
        assert_eq!(Inventory::from_yaml(&yaml).unwrap().platforms.len(), 0);
    }
}
