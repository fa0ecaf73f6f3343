//! Inventory-side instance records

use std::collections::{BTreeMap, HashMap};

use crate::block_device::BlockDevice;
use crate::device::DeviceName;

/// Instances keyed by instance ID
pub type InventoryMap = HashMap<String, Instance>;

/// An EC2 instance as reported by the inventory
///
/// Each device carries the volume ID, delete-on-termination flag, instance
/// ID and availability zone; the rest of the record is left empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Instance {
    /// Instance ID
    pub id: String,
    /// Attached devices by canonical name
    pub block_devices: BTreeMap<DeviceName, BlockDevice>,
}

impl Instance {
    /// Create an instance without devices
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            block_devices: BTreeMap::new(),
        }
    }

    /// Record an attached volume
    ///
    /// A later attachment on the same device name replaces an earlier one.
    pub fn attach(
        &mut self,
        device: &str,
        volume_id: impl Into<String>,
        delete_on_termination: bool,
        availability_zone: impl Into<String>,
    ) {
        let device_name = DeviceName::new(device);
        let dev = BlockDevice {
            volume_id: volume_id.into(),
            delete_on_termination: delete_on_termination.to_string(),
            device_name: device_name.clone(),
            instance_id: self.id.clone(),
            availability_zone: availability_zone.into(),
            ..BlockDevice::default()
        };
        self.block_devices.insert(device_name, dev);
    }

    /// Look up a device
    #[inline]
    #[must_use]
    pub fn device(&self, name: &DeviceName) -> Option<&BlockDevice> {
        self.block_devices.get(name)
    }
}
