//! Error types for reconciliation
//!
//! Every variant is fatal for the run: the reconciler stops at the first one
//! and nothing is handed to the state writer.

use crate::address::AddressError;
use crate::block_device::BlockDevice;
use crate::device::DeviceName;

/// Reconciliation errors
#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    /// Resource key does not parse as `type.name[.index]`
    #[error("malformed address: {0}")]
    MalformedAddress(#[from] AddressError),

    /// Nested device list missing, not list-shaped, or holding bad values
    #[error("could not expand {attribute} for {resource}: {reason}")]
    ExpansionFailure {
        resource: String,
        attribute: String,
        reason: String,
    },

    /// Inventory and state disagree on a field both report
    #[error(
        "EC2 and TF state discrepancy for {}:\nfrom inventory:\n{from_inventory:#?}\nfrom state:\n{from_state:#?}",
        .from_state.device_name
    )]
    SourceDiscrepancy {
        from_state: Box<BlockDevice>,
        from_inventory: Box<BlockDevice>,
    },

    /// Merged record failed the completeness check
    #[error("invalid block device field detected:\n{0:#?}")]
    IncompleteRecord(Box<BlockDevice>),

    /// Device present in state has no inventory entry
    #[error("could not find corresponding block device in inventory for {device} on {resource}")]
    MissingInventoryCounterpart { resource: String, device: DeviceName },
}

impl ReconcileError {
    /// Create expansion failure
    pub fn expansion(
        resource: impl Into<String>,
        attribute: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::ExpansionFailure {
            resource: resource.into(),
            attribute: attribute.into(),
            reason: reason.into(),
        }
    }

    /// Create source discrepancy
    #[must_use]
    pub fn discrepancy(from_state: BlockDevice, from_inventory: BlockDevice) -> Self {
        Self::SourceDiscrepancy {
            from_state: Box::new(from_state),
            from_inventory: Box::new(from_inventory),
        }
    }
}

/// Result type alias for reconciliation
pub type ReconcileResult<T> = Result<T, ReconcileError>;
