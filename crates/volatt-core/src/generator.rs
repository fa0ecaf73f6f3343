//! Resource and configuration generation
//!
//! Turns validated [`BlockDevice`]s into `aws_ebs_volume` /
//! `aws_volume_attachment` state entries and into a `.tf` fragment the
//! operator can commit alongside the rewritten state.
//!
//! Devices belonging to instances declared with `count` are grouped by their
//! name without index. A group of one renders as a plain pair of blocks; a
//! larger group renders once, with a count variable defaulting to the group
//! size and `element(...)` lookups in place of single-resource references.

use std::collections::BTreeMap;

use crate::block_device::BlockDevice;
use crate::resource::{InstanceState, ResourceState};
use crate::schema::{self, ATTACHMENT_TYPE, COUNT_ATTR, INSTANCE_TYPE, VOLUME_TYPE};

/// Volume attributes shared by the state entry and the config block
fn volume_attrs(dev: &BlockDevice) -> BTreeMap<String, String> {
    BTreeMap::from([
        ("size".to_string(), dev.size.to_string()),
        ("type".to_string(), dev.volume_type.clone()),
        ("id".to_string(), dev.volume_id.clone()),
        ("encrypted".to_string(), dev.encrypted.clone()),
        ("availability_zone".to_string(), dev.availability_zone.clone()),
        ("snapshot_id".to_string(), dev.snapshot_id.clone()),
    ])
}

/// Build the `aws_ebs_volume` state entry for a device
#[must_use]
pub fn make_volume_resource(dev: &BlockDevice) -> ResourceState {
    ResourceState::new(VOLUME_TYPE, InstanceState::new(dev.volume_id.clone(), volume_attrs(dev)))
}

/// Build the `aws_volume_attachment` state entry for a device
#[must_use]
pub fn make_attachment_resource(dev: &BlockDevice) -> ResourceState {
    let attachment_id = dev.attachment_id();
    let attrs = BTreeMap::from([
        ("device_name".to_string(), dev.device_name.long_name().to_string()),
        ("instance_id".to_string(), dev.instance_id.clone()),
        ("volume_id".to_string(), dev.volume_id.clone()),
        ("id".to_string(), attachment_id.clone()),
    ]);
    ResourceState::new(ATTACHMENT_TYPE, InstanceState::new(attachment_id, attrs))
}

/// Render one `resource` block
///
/// `id` and anything else the resource type does not declare is skipped.
#[must_use]
pub fn resource_block(resource_type: &str, name: &str, attrs: &BTreeMap<String, String>) -> String {
    let mut out = format!("resource \"{resource_type}\" \"{name}\" {{");
    for (key, value) in attrs {
        if schema::is_declarable(resource_type, key) {
            out.push_str(&format!("\n\t{key} = \"{value}\""));
        }
    }
    out.push_str("\n}");
    out
}

/// Render a count variable declaration
#[must_use]
pub fn count_variable(name: &str, count: usize) -> String {
    format!("variable \"{name}\" {{\n\tdefault = {count}\n}}\n")
}

/// Interpolation referencing a count variable
#[must_use]
pub fn count_reference(name: &str) -> String {
    format!("${{var.{name}}}")
}

/// How a config block refers to another resource's ID
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Reference {
    Single,
    Element,
}

impl Reference {
    fn for_count(count: usize) -> Self {
        if count > 1 {
            Self::Element
        } else {
            Self::Single
        }
    }

    fn render(self, resource_type: &str, name: &str) -> String {
        match self {
            Self::Single => format!("${{{resource_type}.{name}.id}}"),
            Self::Element => format!("${{element({resource_type}.{name}.*.id, count.index)}}"),
        }
    }
}

/// Group devices by name without index, members ordered by index
#[must_use]
pub fn group_devices(devices: &[BlockDevice]) -> BTreeMap<String, Vec<&BlockDevice>> {
    let mut groups: BTreeMap<String, Vec<&BlockDevice>> = BTreeMap::new();
    for dev in devices {
        groups.entry(dev.name_without_index()).or_default().push(dev);
    }
    for members in groups.values_mut() {
        members.sort_by_key(|dev| dev.owner_index());
    }
    groups
}

/// Name of the count variable for an instance resource
#[must_use]
pub fn count_variable_name(instance_name: &str) -> String {
    format!("num_{instance_name}")
}

/// Count variable for a group of `count` devices on `instance_name`
///
/// Groups of the same size on one instance share `num_<instance>`. A group
/// whose size differs from the one already declared under that name gets
/// `num_<group>` instead. Returns the name and whether it still needs a
/// declaration.
fn group_count_variable(
    instance_name: &str,
    group_name: &str,
    count: usize,
    declared: &mut BTreeMap<String, usize>,
) -> (String, bool) {
    let shared = count_variable_name(instance_name);
    let name = match declared.get(&shared) {
        Some(&existing) if existing != count => count_variable_name(group_name),
        _ => shared,
    };
    let needs_declaration = !declared.contains_key(&name);
    declared.insert(name.clone(), count);
    (name, needs_declaration)
}

/// Render the config for one group of devices sharing a name
///
/// The first member stands in for the group; count-indexed members only
/// differ in the IDs that `element(...)` resolves.
fn group_config(group_name: &str, members: &[&BlockDevice], declared: &mut BTreeMap<String, usize>) -> String {
    let Some(dev) = members.first() else {
        return String::new();
    };
    let count = members.len();
    let reference = Reference::for_count(count);

    let mut volume = volume_attrs(dev);
    let mut attachment = BTreeMap::from([
        ("device_name".to_string(), dev.device_name.long_name().to_string()),
        ("instance_id".to_string(), reference.render(INSTANCE_TYPE, dev.owner_name())),
        ("volume_id".to_string(), reference.render(VOLUME_TYPE, group_name)),
    ]);

    let mut out = String::new();
    if count > 1 {
        let (count_var, needs_declaration) = group_count_variable(dev.owner_name(), group_name, count, declared);
        volume.insert(COUNT_ATTR.to_string(), count_reference(&count_var));
        attachment.insert(COUNT_ATTR.to_string(), count_reference(&count_var));
        if needs_declaration {
            out.push_str(&count_variable(&count_var, count));
        }
    }

    out.push_str(&resource_block(VOLUME_TYPE, group_name, &volume));
    out.push('\n');
    out.push_str(&resource_block(ATTACHMENT_TYPE, group_name, &attachment));
    out
}

/// Render the suggested `.tf` configuration for all reconciled devices
#[must_use]
pub fn generate_config(devices: &[BlockDevice]) -> String {
    let mut declared = BTreeMap::new();
    let mut out = String::new();
    for (name, members) in &group_devices(devices) {
        out.push_str(&group_config(name, members, &mut declared));
        out.push('\n');
    }
    out
}
