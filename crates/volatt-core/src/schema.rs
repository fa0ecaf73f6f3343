//! Terraform resource shapes handled by the reconciler
//!
//! Attribute sets are taken from the AWS provider schemas for the resources
//! involved. A few attributes (the size, notably) are named differently
//! depending on where they are declared.

/// Resource type of monitored instances
pub const INSTANCE_TYPE: &str = "aws_instance";

/// Resource type of generated volumes
pub const VOLUME_TYPE: &str = "aws_ebs_volume";

/// Resource type of generated attachments
pub const ATTACHMENT_TYPE: &str = "aws_volume_attachment";

/// Nested list attribute on `aws_instance` holding the EBS devices
pub const BLOCK_DEVICE_ATTR: &str = "ebs_block_device";

/// Declarable `aws_ebs_volume` attributes
pub const VOLUME_ATTRS: &[&str] = &[
    "availability_zone",
    "encrypted",
    "iops",
    "kms_key_id",
    "size",
    "snapshot_id",
    "type",
    "tags",
];

/// Declarable `aws_volume_attachment` attributes
pub const ATTACHMENT_ATTRS: &[&str] = &[
    "device_name",
    "instance_id",
    "volume_id",
    "force_detach",
    "skip_destroy",
];

/// Attributes of one `aws_instance.ebs_block_device` element
pub const INSTANCE_BLOCK_DEVICE_ATTRS: &[&str] = &[
    "delete_on_termination",
    "device_name",
    "encrypted",
    "iops",
    "snapshot_id",
    "volume_size",
    "volume_type",
];

/// Meta-argument accepted on every resource block
pub const COUNT_ATTR: &str = "count";

/// Declarable attribute names for a generated resource type
///
/// Returns an empty slice for types the reconciler never generates.
#[must_use]
pub fn declarable_attrs(resource_type: &str) -> &'static [&'static str] {
    match resource_type {
        VOLUME_TYPE => VOLUME_ATTRS,
        ATTACHMENT_TYPE => ATTACHMENT_ATTRS,
        _ => &[],
    }
}

/// Whether `attr` may appear in a config block of `resource_type`
#[must_use]
pub fn is_declarable(resource_type: &str, attr: &str) -> bool {
    attr == COUNT_ATTR || declarable_attrs(resource_type).contains(&attr)
}
