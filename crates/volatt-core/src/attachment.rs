//! Attachment ID synthesis
//!
//! Terraform's AWS provider never asks EC2 for an attachment identifier; it
//! derives one locally from the device name, instance and volume. A state
//! entry whose ID does not match that derivation is treated as a different
//! resource on the next plan, so this has to be bit-exact.

/// Prefix of every synthesized attachment ID
pub const ATTACHMENT_ID_PREFIX: &str = "vai-";

/// Terraform's `hashcode.String`
///
/// CRC-32 (IEEE) of the input. Terraform converts it to a Go `int`, which is
/// 64 bits on every platform it ships for, so the value is never negative
/// and needs no folding.
#[inline]
#[must_use]
pub fn hashcode(s: &str) -> u32 {
    crc32fast::hash(s.as_bytes())
}

/// Derive the attachment ID for a device/instance/volume triple
///
/// The hashed string keeps the trailing `-`, as the provider builds it.
#[must_use]
pub fn synthesize(device_long_name: &str, instance_id: &str, volume_id: &str) -> String {
    let key = format!("{device_long_name}-{instance_id}-{volume_id}-");
    format!("{ATTACHMENT_ID_PREFIX}{}", hashcode(&key))
}
