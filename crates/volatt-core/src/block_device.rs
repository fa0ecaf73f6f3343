//! Merged block device records
//!
//! A [`BlockDevice`] starts life half-filled from one source: the state side
//! knows size, type, flags and the owning instance resource; the inventory
//! side knows the volume, instance and availability zone. [`merge`] joins
//! the two after checking the fields both sides report, and [`validate`]
//! decides whether the result is complete enough to become resources.

use std::collections::BTreeMap;

use crate::address::ResourceAddress;
use crate::config::VolumeTypePolicy;
use crate::device::DeviceName;
use crate::error::{ReconcileError, ReconcileResult};
use crate::schema::{ATTACHMENT_TYPE, VOLUME_TYPE};

/// One EBS attachment, merged from state and inventory
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlockDevice {
    /// EBS volume ID (inventory)
    pub volume_id: String,
    /// Volume size in GiB (state)
    pub size: u64,
    /// Volume type, e.g. `gp2` (state)
    pub volume_type: String,
    /// `"true"` or `"false"` (both)
    pub delete_on_termination: String,
    /// Device path (both)
    pub device_name: DeviceName,
    /// `"true"` or `"false"` (state)
    pub encrypted: String,
    /// Provisioned IOPS (state)
    pub iops: u64,
    /// Source snapshot, may be empty (state)
    pub snapshot_id: String,
    /// Owning instance ID (inventory)
    pub instance_id: String,
    /// Instance availability zone (inventory)
    pub availability_zone: String,
    /// Address of the owning `aws_instance` resource (state)
    pub owner: Option<ResourceAddress>,
}

impl BlockDevice {
    /// Build the state-side record from one expanded `ebs_block_device` element
    ///
    /// `resource` is only used for error reporting.
    ///
    /// # Errors
    /// Returns [`ReconcileError::ExpansionFailure`] if `volume_size` is missing
    /// or not numeric, or `iops` is present but not numeric.
    pub fn from_state_attributes(
        resource: &str,
        attrs: &BTreeMap<String, String>,
        owner: ResourceAddress,
    ) -> ReconcileResult<Self> {
        let get = |key: &str| attrs.get(key).cloned().unwrap_or_default();
        let numeric = |key: &str, required: bool| -> ReconcileResult<u64> {
            match attrs.get(key).map(String::as_str) {
                None | Some("") if !required => Ok(0),
                None => Err(ReconcileError::expansion(
                    resource,
                    crate::schema::BLOCK_DEVICE_ATTR,
                    format!("device is missing {key}"),
                )),
                Some(raw) => raw.parse().map_err(|e| {
                    ReconcileError::expansion(
                        resource,
                        crate::schema::BLOCK_DEVICE_ATTR,
                        format!("{key} '{raw}': {e}"),
                    )
                }),
            }
        };

        Ok(Self {
            size: numeric("volume_size", true)?,
            volume_type: get("volume_type"),
            delete_on_termination: get("delete_on_termination"),
            device_name: DeviceName::new(get("device_name")),
            encrypted: get("encrypted"),
            iops: numeric("iops", false)?,
            snapshot_id: get("snapshot_id"),
            owner: Some(owner),
            ..Self::default()
        })
    }

    /// Name of the owning instance resource, empty if unknown
    #[inline]
    #[must_use]
    pub fn owner_name(&self) -> &str {
        self.owner.as_ref().map_or("", ResourceAddress::name)
    }

    /// Count index of the owning instance resource
    #[inline]
    #[must_use]
    pub fn owner_index(&self) -> Option<u32> {
        self.owner.as_ref().and_then(ResourceAddress::index)
    }

    /// `<instance>-<short device>`, shared by every count index
    #[must_use]
    pub fn name_without_index(&self) -> String {
        format!("{}-{}", self.owner_name(), self.device_name.short_name())
    }

    /// Unique resource name: `<instance>-<short device>[.<index>]`
    #[must_use]
    pub fn resource_name(&self) -> String {
        match self.owner_index() {
            Some(index) => format!("{}.{index}", self.name_without_index()),
            None => self.name_without_index(),
        }
    }

    /// State key of the generated `aws_ebs_volume`
    #[must_use]
    pub fn volume_address(&self) -> String {
        format!("{VOLUME_TYPE}.{}", self.resource_name())
    }

    /// State key of the generated `aws_volume_attachment`
    #[must_use]
    pub fn attachment_address(&self) -> String {
        format!("{ATTACHMENT_TYPE}.{}", self.resource_name())
    }

    /// Synthesized attachment ID for this device
    #[must_use]
    pub fn attachment_id(&self) -> String {
        crate::attachment::synthesize(self.device_name.long_name(), &self.instance_id, &self.volume_id)
    }
}

/// Check the fields both sources report
///
/// Only the device name and delete-on-termination flag come from both the
/// state and the inventory; everything else has a single source.
#[must_use]
pub fn cross_validate(from_state: &BlockDevice, from_inventory: &BlockDevice) -> bool {
    let names_match = from_state.device_name.short_name() == from_inventory.device_name.short_name();
    let deletes_match = from_state.delete_on_termination == from_inventory.delete_on_termination;
    names_match && deletes_match
}

/// Completeness check on a merged record
///
/// The short name is checked rather than the long one, which is never empty.
#[must_use]
pub fn validate(dev: &BlockDevice, policy: VolumeTypePolicy) -> bool {
    let name_valid = !dev.device_name.short_name().is_empty();
    let id_valid = !dev.volume_id.is_empty();
    let az_valid = !dev.availability_zone.is_empty();
    let size_valid = dev.size != 0;
    let instance_valid = !dev.instance_id.is_empty();
    let type_valid = match policy {
        VolumeTypePolicy::Lenient => true,
        VolumeTypePolicy::Strict => !dev.volume_type.is_empty(),
    };
    name_valid && id_valid && az_valid && size_valid && instance_valid && type_valid
}

/// Merge an inventory record into a state record
///
/// # Errors
/// Returns [`ReconcileError::SourceDiscrepancy`] if [`cross_validate`] fails.
/// No partial merge is produced.
pub fn merge(from_state: &BlockDevice, from_inventory: &BlockDevice) -> ReconcileResult<BlockDevice> {
    if !cross_validate(from_state, from_inventory) {
        return Err(ReconcileError::discrepancy(from_state.clone(), from_inventory.clone()));
    }

    Ok(BlockDevice {
        volume_id: from_inventory.volume_id.clone(),
        instance_id: from_inventory.instance_id.clone(),
        availability_zone: from_inventory.availability_zone.clone(),
        ..from_state.clone()
    })
}

/// [`merge`], then [`validate`] the result
///
/// # Errors
/// Returns [`ReconcileError::SourceDiscrepancy`] or
/// [`ReconcileError::IncompleteRecord`].
pub fn merge_and_validate(
    from_state: &BlockDevice,
    from_inventory: &BlockDevice,
    policy: VolumeTypePolicy,
) -> ReconcileResult<BlockDevice> {
    let dev = merge(from_state, from_inventory)?;
    if !validate(&dev, policy) {
        return Err(ReconcileError::IncompleteRecord(Box::new(dev)));
    }
    Ok(dev)
}
