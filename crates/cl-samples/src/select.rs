use opencl3::{
    command_queue::CommandQueue,
    context::Context,
    device::{Device, CL_DEVICE_TYPE_ALL},
    error_codes::CL_DEVICE_NOT_FOUND,
    platform::{get_platforms, Platform},
};
use tracing::debug;

use crate::ClError;

/// `CL_PLATFORM_NOT_FOUND_KHR`: the ICD loader found no installed platform.
pub(crate) const PLATFORM_NOT_FOUND_KHR: i32 = -1001;

/// Which list an index was resolved against.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IndexKind {
    Platform,
    Device,
}

/// Resolves `index` into `items`, failing with the matching index error.
pub fn pick<T>(mut items: Vec<T>, index: usize, kind: IndexKind) -> Result<T, ClError> {
    let count = items.len();
    if index >= count {
        return Err(match kind {
            IndexKind::Platform => ClError::InvalidPlatformIndex { index, count },
            IndexKind::Device => ClError::InvalidDeviceIndex { index, count },
        });
    }
    Ok(items.swap_remove(index))
}

/// All installed platforms; a missing ICD yields an empty list.
pub fn platforms() -> Result<Vec<Platform>, ClError> {
    match get_platforms() {
        Ok(list) => Ok(list),
        Err(e) if e.0 == PLATFORM_NOT_FOUND_KHR => Ok(Vec::new()),
        Err(e) => Err(e.into()),
    }
}

/// Devices of every type exposed by `platform`; none found yields an empty list.
pub fn devices(platform: &Platform) -> Result<Vec<Device>, ClError> {
    let ids = match platform.get_devices(CL_DEVICE_TYPE_ALL) {
        Ok(ids) => ids,
        Err(e) if e.0 == CL_DEVICE_NOT_FOUND => Vec::new(),
        Err(e) => return Err(e.into()),
    };
    Ok(ids.into_iter().map(Device::new).collect())
}

/// Platform and device chosen by `-p`/`-d`. No OpenCL objects are created yet.
pub struct Selection {
    pub platform: Platform,
    pub device: Device,
}

impl Selection {
    pub fn resolve(platform_index: usize, device_index: usize) -> Result<Self, ClError> {
        let platform = pick(platforms()?, platform_index, IndexKind::Platform)?;
        let device = pick(devices(&platform)?, device_index, IndexKind::Device)?;
        debug!(platform_index, device_index, "resolved platform and device");
        Ok(Self { platform, device })
    }

    /// Prints the chosen platform and device names.
    pub fn announce(&self) -> Result<(), ClError> {
        println!("Running on platform: {}", self.platform.name()?);
        println!("Running on device: {}", self.device.name()?);
        Ok(())
    }

    /// Creates the context and an in-order command queue for the device.
    pub fn open(self) -> Result<Session, ClError> {
        let context = Context::from_device(&self.device)?;
        #[allow(deprecated, unused_unsafe)]
        // SAFETY: the device belongs to `context`, no queue properties are requested.
        let queue = unsafe { CommandQueue::create(&context, self.device.id(), 0)? };
        debug!("created context and command queue");
        Ok(Session {
            queue,
            context,
            device: self.device,
        })
    }
}

/// Context and queue owned by one run; released when dropped.
pub struct Session {
    pub queue: CommandQueue,
    pub context: Context,
    pub device: Device,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pick_in_range() {
        assert_eq!(pick(vec!['a', 'b', 'c'], 0, IndexKind::Platform).unwrap(), 'a');
        assert_eq!(pick(vec!['a', 'b', 'c'], 2, IndexKind::Device).unwrap(), 'c');
    }

    #[test]
    fn pick_out_of_range_platform() {
        let err = pick(vec![1, 2], 2, IndexKind::Platform).unwrap_err();
        assert!(matches!(err, ClError::InvalidPlatformIndex { index: 2, count: 2 }));
    }

    #[test]
    fn pick_from_empty_device_list() {
        let err = pick(Vec::<u8>::new(), 0, IndexKind::Device).unwrap_err();
        assert!(matches!(err, ClError::InvalidDeviceIndex { index: 0, count: 0 }));
    }
}
