//! `DescribeInstances` response model
//!
//! Only the fields reconciliation needs are modelled; everything else in
//! the response is ignored.

use serde::{Deserialize, Serialize};
use volatt_core::{Instance, InventoryMap};

use crate::filter::NameFilter;
use crate::InventoryError;

/// Tag carrying the instance's display name
pub const NAME_TAG: &str = "Name";

/// Top-level response
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DescribeInstancesDocument {
    /// Reservations, each holding one or more instances
    #[serde(default)]
    pub reservations: Vec<Reservation>,
}

/// A reservation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Reservation {
    /// Instances launched together
    #[serde(default)]
    pub instances: Vec<Ec2Instance>,
}

/// One instance
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Ec2Instance {
    /// Instance ID
    pub instance_id: String,
    /// Placement
    #[serde(default)]
    pub placement: Placement,
    /// Tags
    #[serde(default)]
    pub tags: Vec<Tag>,
    /// Attached devices
    #[serde(default)]
    pub block_device_mappings: Vec<BlockDeviceMapping>,
}

/// Instance placement
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Placement {
    /// Availability zone
    #[serde(default)]
    pub availability_zone: String,
}

/// Resource tag
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Tag {
    /// Tag key
    pub key: String,
    /// Tag value
    #[serde(default)]
    pub value: String,
}

/// Device mapping; instance-store mappings carry no `Ebs` block
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct BlockDeviceMapping {
    /// Device name as reported, e.g. `/dev/xvdb`
    pub device_name: String,
    /// EBS details
    #[serde(default)]
    pub ebs: Option<EbsDevice>,
}

/// EBS volume behind a mapping
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct EbsDevice {
    /// Volume ID
    pub volume_id: String,
    /// Whether the volume is deleted with the instance
    #[serde(default)]
    pub delete_on_termination: bool,
}

impl Ec2Instance {
    /// Value of the `Name` tag
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.tags.iter().find(|t| t.key == NAME_TAG).map(|t| t.value.as_str())
    }

    /// Convert to an inventory record
    #[must_use]
    pub fn to_instance(&self) -> Instance {
        let mut inst = Instance::new(&self.instance_id);
        for mapping in &self.block_device_mappings {
            let Some(ebs) = &mapping.ebs else {
                tracing::trace!("{}: skipping non-EBS mapping {}", self.instance_id, mapping.device_name);
                continue;
            };
            inst.attach(
                &mapping.device_name,
                &ebs.volume_id,
                ebs.delete_on_termination,
                &self.placement.availability_zone,
            );
        }
        inst
    }
}

impl DescribeInstancesDocument {
    /// Parse a response
    ///
    /// # Errors
    /// Returns [`InventoryError::Json`] on malformed input
    pub fn from_json(json: &str) -> Result<Self, InventoryError> {
        Ok(serde_json::from_str(json)?)
    }

    /// All instances across reservations
    pub fn instances(&self) -> impl Iterator<Item = &Ec2Instance> {
        self.reservations.iter().flat_map(|r| r.instances.iter())
    }

    /// Build the inventory, keeping instances whose name matches `filter`
    ///
    /// Instances without a `Name` tag never match a filter.
    #[must_use]
    pub fn to_inventory(&self, filter: Option<&NameFilter>) -> InventoryMap {
        self.instances()
            .filter(|inst| match filter {
                Some(f) => inst.name().is_some_and(|name| f.matches(name)),
                None => true,
            })
            .map(|inst| (inst.instance_id.clone(), inst.to_instance()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use volatt_core::DeviceName;

    const RESPONSE: &str = r#"{
        "Reservations": [
            {
                "ReservationId": "r-0001",
                "Instances": [
                    {
                        "InstanceId": "i-1d7683bd",
                        "InstanceType": "t2.micro",
                        "Placement": {"AvailabilityZone": "us-east-1a", "Tenancy": "default"},
                        "Tags": [{"Key": "Name", "Value": "kafka-1"}, {"Key": "env", "Value": "prod"}],
                        "BlockDeviceMappings": [
                            {"DeviceName": "/dev/sda1", "Ebs": {"VolumeId": "vol-root", "DeleteOnTermination": true, "Status": "attached"}},
                            {"DeviceName": "/dev/xvdb", "Ebs": {"VolumeId": "v-abcd", "DeleteOnTermination": false}},
                            {"DeviceName": "/dev/xvdz"}
                        ]
                    }
                ]
            },
            {
                "Instances": [
                    {
                        "InstanceId": "i-2",
                        "Placement": {"AvailabilityZone": "us-east-1b"},
                        "BlockDeviceMappings": []
                    }
                ]
            }
        ]
    }"#;

    #[test]
    fn parses_instances_and_devices() {
        let doc = DescribeInstancesDocument::from_json(RESPONSE).unwrap();
        let inventory = doc.to_inventory(None);
        assert_eq!(inventory.len(), 2);

        let inst = &inventory["i-1d7683bd"];
        assert_eq!(inst.block_devices.len(), 2);
        let dev = inst.device(&DeviceName::new("xvdb")).unwrap();
        assert_eq!(dev.volume_id, "v-abcd");
        assert_eq!(dev.delete_on_termination, "false");
        assert_eq!(dev.availability_zone, "us-east-1a");
        assert_eq!(dev.instance_id, "i-1d7683bd");
        assert_eq!(inst.device(&DeviceName::new("sda1")).unwrap().delete_on_termination, "true");
        assert!(inst.device(&DeviceName::new("xvdz")).is_none());
    }

    #[test]
    fn filter_uses_name_tag() {
        let doc = DescribeInstancesDocument::from_json(RESPONSE).unwrap();
        let filter = NameFilter::new("kafka-*").unwrap();
        let inventory = doc.to_inventory(Some(&filter));
        assert_eq!(inventory.len(), 1);
        assert!(inventory.contains_key("i-1d7683bd"));

        let none = NameFilter::new("zookeeper-*").unwrap();
        assert!(doc.to_inventory(Some(&none)).is_empty());
    }

    #[test]
    fn empty_response() {
        let doc = DescribeInstancesDocument::from_json("{}").unwrap();
        assert!(doc.to_inventory(None).is_empty());
    }

    #[test]
    fn malformed_response() {
        let err = DescribeInstancesDocument::from_json(r#"{"Reservations": 5}"#).unwrap_err();
        assert!(matches!(err, InventoryError::Json(_)));
    }
}
