//! Reconciliation orchestrator
//!
//! One pass over a state module's resources:
//!
//! ```text
//! aws_instance ──► in inventory? ──no──► skip
//!                       │yes
//!                       ▼
//!      expand ebs_block_device ──► parse address
//!                       │
//!                       ▼ per device
//!      inventory counterpart ──► merge ──► validate ──► volume + attachment
//! ```
//!
//! The first error aborts the pass. The input map is never modified; a
//! caller only sees the updated map when every device reconciled.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::address::ResourceAddress;
use crate::block_device::{self, BlockDevice};
use crate::config::ReconcileConfig;
use crate::device::DeviceName;
use crate::error::{ReconcileError, ReconcileResult};
use crate::flatmap;
use crate::generator;
use crate::instance::{Instance, InventoryMap};
use crate::resource::{ResourceMap, ResourceState};
use crate::schema::{BLOCK_DEVICE_ATTR, INSTANCE_BLOCK_DEVICE_ATTRS, INSTANCE_TYPE};

/// Counters for one reconciliation pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    /// `aws_instance` resources in the state
    pub instances_seen: usize,
    /// Instances whose devices were reconciled
    pub instances_reconciled: usize,
    /// Instances absent from the inventory
    pub instances_skipped: usize,
    /// Devices turned into volume/attachment pairs
    pub devices_reconciled: usize,
}

/// Output of a successful pass
#[derive(Debug, Clone)]
pub struct Reconciliation {
    /// Input resources plus the generated entries
    pub resources: ResourceMap,
    /// Suggested `.tf` configuration
    pub config: String,
    /// Reconciled devices, in generation order
    pub devices: Vec<BlockDevice>,
    /// Pass counters
    pub report: ReconcileReport,
}

/// Drives reconciliation of a state module against an inventory
#[derive(Debug, Clone, Default)]
pub struct Reconciler {
    config: ReconcileConfig,
}

impl Reconciler {
    /// Create reconciler with configuration
    #[inline]
    #[must_use]
    pub fn new(config: ReconcileConfig) -> Self {
        Self { config }
    }

    /// Active configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &ReconcileConfig {
        &self.config
    }

    /// Reconcile `resources` against `inventory`
    ///
    /// # Errors
    /// Returns the first [`ReconcileError`] hit; no partial result is returned.
    pub fn reconcile(&self, resources: &ResourceMap, inventory: &InventoryMap) -> ReconcileResult<Reconciliation> {
        let mut out = resources.clone();
        let mut generated = ResourceMap::new();
        let mut devices = Vec::new();
        let mut report = ReconcileReport::default();

        for (name, res) in resources {
            if res.resource_type != INSTANCE_TYPE {
                continue;
            }
            report.instances_seen += 1;

            let Some(inst) = inventory.get(res.id()) else {
                tracing::debug!("Skipping {} ({}): not in inventory", name, res.id());
                report.instances_skipped += 1;
                continue;
            };

            let reconciled = self.reconcile_instance(name, res, inst)?;
            tracing::debug!("Reconciled {} device(s) on {}", reconciled.len(), name);

            for dev in reconciled {
                generated.insert(dev.volume_address(), generator::make_volume_resource(&dev));
                generated.insert(dev.attachment_address(), generator::make_attachment_resource(&dev));
                devices.push(dev);
            }

            if self.config.strip_instance_devices {
                if let Some(instance) = out.get_mut(name) {
                    flatmap::delete(&mut instance.primary.attributes, BLOCK_DEVICE_ATTR);
                }
            }
            report.instances_reconciled += 1;
        }

        report.devices_reconciled = devices.len();
        out.extend(generated);
        let config = generator::generate_config(&devices);

        tracing::info!(
            "Reconciled {} device(s) across {} instance(s), skipped {} instance(s) outside the inventory",
            report.devices_reconciled,
            report.instances_reconciled,
            report.instances_skipped
        );

        Ok(Reconciliation {
            resources: out,
            config,
            devices,
            report,
        })
    }

    /// Merge every state-side device of one instance with its inventory record
    fn reconcile_instance(&self, name: &str, res: &ResourceState, inst: &Instance) -> ReconcileResult<Vec<BlockDevice>> {
        let elements = flatmap::expand_list_of_maps(res.attributes(), BLOCK_DEVICE_ATTR)
            .map_err(|e| ReconcileError::expansion(name, BLOCK_DEVICE_ATTR, e.to_string()))?;

        let address: ResourceAddress = name.parse()?;

        let mut from_state: BTreeMap<DeviceName, BlockDevice> = BTreeMap::new();
        for element in &elements {
            for key in element.keys() {
                if !INSTANCE_BLOCK_DEVICE_ATTRS.contains(&key.as_str()) {
                    tracing::debug!("Ignoring unrecognized {} attribute '{}' on {}", BLOCK_DEVICE_ATTR, key, name);
                }
            }
            let dev = BlockDevice::from_state_attributes(name, element, address.clone())?;
            from_state.insert(dev.device_name.clone(), dev);
        }

        from_state
            .into_iter()
            .map(|(device_name, dev)| {
                let Some(counterpart) = inst.device(&device_name) else {
                    return Err(ReconcileError::MissingInventoryCounterpart {
                        resource: name.to_string(),
                        device: device_name,
                    });
                };
                block_device::merge_and_validate(&dev, counterpart, self.config.volume_type_policy)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::InstanceState;

    fn instance_resource(id: &str, devices: &[(&str, &str)]) -> ResourceState {
        let mut attrs = BTreeMap::from([
            ("id".to_string(), id.to_string()),
            (format!("{BLOCK_DEVICE_ATTR}.#"), devices.len().to_string()),
        ]);
        for (i, (device, delete)) in devices.iter().enumerate() {
            let prefix = format!("{BLOCK_DEVICE_ATTR}.{}", 1000 + i);
            attrs.insert(format!("{prefix}.device_name"), (*device).to_string());
            attrs.insert(format!("{prefix}.delete_on_termination"), (*delete).to_string());
            attrs.insert(format!("{prefix}.volume_size"), "10".to_string());
            attrs.insert(format!("{prefix}.volume_type"), "gp2".to_string());
            attrs.insert(format!("{prefix}.encrypted"), "false".to_string());
            attrs.insert(format!("{prefix}.iops"), "100".to_string());
            attrs.insert(format!("{prefix}.snapshot_id"), String::new());
        }
        ResourceState::new(INSTANCE_TYPE, InstanceState::new(id, attrs))
    }

    fn inventory(id: &str, devices: &[(&str, &str)]) -> InventoryMap {
        let mut inst = Instance::new(id);
        for (device, volume) in devices {
            inst.attach(device, *volume, false, "us-east-1a");
        }
        InventoryMap::from([(id.to_string(), inst)])
    }

    #[test]
    fn non_instances_pass_through() {
        let resources = ResourceMap::from([(
            "aws_eip.ip".to_string(),
            ResourceState::new("aws_eip", InstanceState::new("eip-1", BTreeMap::new())),
        )]);
        let result = Reconciler::default().reconcile(&resources, &InventoryMap::new()).unwrap();
        assert_eq!(result.resources, resources);
        assert_eq!(result.report.instances_seen, 0);
        assert!(result.config.is_empty());
    }

    #[test]
    fn instance_outside_inventory_is_skipped() {
        let resources = ResourceMap::from([(
            "aws_instance.web".to_string(),
            instance_resource("i-1", &[("xvdb", "false")]),
        )]);
        let result = Reconciler::default().reconcile(&resources, &InventoryMap::new()).unwrap();
        assert_eq!(result.resources, resources);
        assert_eq!(result.report.instances_skipped, 1);
    }

    #[test]
    fn strip_removes_nested_devices() {
        let resources = ResourceMap::from([(
            "aws_instance.web".to_string(),
            instance_resource("i-1", &[("xvdb", "false")]),
        )]);
        let reconciler = Reconciler::new(ReconcileConfig::new().with_strip_instance_devices(true));
        let result = reconciler
            .reconcile(&resources, &inventory("i-1", &[("/dev/xvdb", "vol-1")]))
            .unwrap();
        let attrs = result.resources["aws_instance.web"].attributes();
        assert!(attrs.keys().all(|k| !k.starts_with("ebs_block_device")));
        assert_eq!(attrs["id"], "i-1");
    }

    #[test]
    fn default_keeps_nested_devices() {
        let resources = ResourceMap::from([(
            "aws_instance.web".to_string(),
            instance_resource("i-1", &[("xvdb", "false")]),
        )]);
        let result = Reconciler::default()
            .reconcile(&resources, &inventory("i-1", &[("/dev/xvdb", "vol-1")]))
            .unwrap();
        assert_eq!(result.resources["aws_instance.web"], resources["aws_instance.web"]);
    }

    #[test]
    fn missing_device_list_is_fatal() {
        let resources = ResourceMap::from([(
            "aws_instance.web".to_string(),
            ResourceState::new(INSTANCE_TYPE, InstanceState::new("i-1", BTreeMap::new())),
        )]);
        let err = Reconciler::default()
            .reconcile(&resources, &inventory("i-1", &[]))
            .unwrap_err();
        assert!(matches!(err, ReconcileError::ExpansionFailure { .. }));
    }

    #[test]
    fn malformed_address_is_fatal() {
        let resources = ResourceMap::from([(
            "aws_instance".to_string(),
            instance_resource("i-1", &[("xvdb", "false")]),
        )]);
        let err = Reconciler::default()
            .reconcile(&resources, &inventory("i-1", &[("xvdb", "vol-1")]))
            .unwrap_err();
        assert!(matches!(err, ReconcileError::MalformedAddress(_)));
    }

    #[test]
    fn missing_counterpart_is_fatal() {
        let resources = ResourceMap::from([(
            "aws_instance.web".to_string(),
            instance_resource("i-1", &[("xvdb", "false"), ("xvdc", "false")]),
        )]);
        let err = Reconciler::default()
            .reconcile(&resources, &inventory("i-1", &[("xvdb", "vol-1")]))
            .unwrap_err();
        match err {
            ReconcileError::MissingInventoryCounterpart { resource, device } => {
                assert_eq!(resource, "aws_instance.web");
                assert_eq!(device, DeviceName::new("xvdc"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn delete_flag_discrepancy_is_fatal() {
        let resources = ResourceMap::from([(
            "aws_instance.web".to_string(),
            instance_resource("i-1", &[("xvdb", "true")]),
        )]);
        let err = Reconciler::default()
            .reconcile(&resources, &inventory("i-1", &[("xvdb", "vol-1")]))
            .unwrap_err();
        assert!(matches!(err, ReconcileError::SourceDiscrepancy { .. }));
    }

    #[test]
    fn inventory_only_devices_are_ignored() {
        let resources = ResourceMap::from([(
            "aws_instance.web".to_string(),
            instance_resource("i-1", &[("xvdb", "false")]),
        )]);
        let result = Reconciler::default()
            .reconcile(&resources, &inventory("i-1", &[("/dev/sda1", "vol-root"), ("xvdb", "vol-1")]))
            .unwrap();
        assert_eq!(result.report.devices_reconciled, 1);
        assert_eq!(result.resources.len(), 3);
    }
}
