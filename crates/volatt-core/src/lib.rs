//! volatt Core
//!
//! Reconciles EC2 block device attachments with the `ebs_block_device`
//! blocks of Terraform `aws_instance` resources, producing standalone
//! `aws_ebs_volume` / `aws_volume_attachment` state entries and a matching
//! configuration fragment.
//!
//! # Core Concepts
//!
//! - [`DeviceName`]: Canonical `/dev/`-prefixed device path, the merge key
//! - [`ResourceAddress`]: Parsed `type.name[.index]` resource key
//! - [`BlockDevice`]: One attachment, merged from state and inventory
//! - [`attachment::synthesize`]: Terraform-compatible attachment IDs
//! - [`Reconciler`]: Drives a full pass over a state module
//!
//! # Example
//!
//! ```rust,ignore
//! use volatt_core::{Reconciler, ReconcileConfig};
//!
//! let reconciler = Reconciler::new(ReconcileConfig::new());
//! let result = reconciler.reconcile(&resources, &inventory)?;
//!
//! println!("{}", result.config);
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod address;
pub mod attachment;
pub mod block_device;
pub mod config;
pub mod device;
pub mod error;
pub mod flatmap;
pub mod generator;
pub mod instance;
pub mod reconcile;
pub mod resource;
pub mod schema;

// Re-exports
pub use address::{AddressError, ResourceAddress};
pub use block_device::{cross_validate, merge, merge_and_validate, validate, BlockDevice};
pub use config::{ConfigError, ReconcileConfig, VolumeTypePolicy};
pub use device::DeviceName;
pub use error::{ReconcileError, ReconcileResult};
pub use flatmap::FlatmapError;
pub use instance::{Instance, InventoryMap};
pub use reconcile::{Reconciler, ReconcileReport, Reconciliation};
pub use resource::{InstanceState, ResourceMap, ResourceState};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
