use std::fs;
use std::path::Path;

use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use volatt_cli::{run_reconcile, ReconcileOptions, SUCCESS_BANNER};

fn state(volume_type: &str) -> Value {
    json!({
        "version": 3,
        "terraform_version": "0.8.5",
        "serial": 4,
        "lineage": "a1b2c3",
        "modules": [{
            "path": ["root"],
            "outputs": {},
            "resources": {
                "aws_instance.web": {
                    "type": "aws_instance",
                    "depends_on": [],
                    "primary": {
                        "id": "i-1d7683bd",
                        "attributes": {
                            "id": "i-1d7683bd",
                            "ebs_block_device.#": "1",
                            "ebs_block_device.2576023345.delete_on_termination": "false",
                            "ebs_block_device.2576023345.device_name": "/dev/xvdb",
                            "ebs_block_device.2576023345.encrypted": "false",
                            "ebs_block_device.2576023345.iops": "300",
                            "ebs_block_device.2576023345.snapshot_id": "",
                            "ebs_block_device.2576023345.volume_size": "100",
                            "ebs_block_device.2576023345.volume_type": volume_type
                        },
                        "meta": {"schema_version": "1"},
                        "tainted": false
                    },
                    "deposed": [],
                    "provider": ""
                }
            },
            "depends_on": []
        }]
    })
}

fn inventory(device: &str) -> Value {
    json!({
        "Reservations": [{"Instances": [{
            "InstanceId": "i-1d7683bd",
            "Placement": {"AvailabilityZone": "us-east-1c"},
            "Tags": [{"Key": "Name", "Value": "web"}],
            "BlockDeviceMappings": [
                {"DeviceName": device, "Ebs": {"VolumeId": "v-abcd", "DeleteOnTermination": false}}
            ]
        }]}]
    })
}

fn setup(dir: &Path, state_json: &Value, inventory_json: &Value) -> ReconcileOptions {
    let state_path = dir.join("terraform.tfstate");
    let inventory_path = dir.join("inventory.json");
    fs::write(&state_path, state_json.to_string()).unwrap();
    fs::write(&inventory_path, inventory_json.to_string()).unwrap();
    ReconcileOptions::new(inventory_path, state_path)
}

#[test]
fn prints_config_and_resources() {
    let dir = tempfile::tempdir().unwrap();
    let opts = setup(dir.path(), &state("gp2"), &inventory("/dev/xvdb"));

    let mut stdout = Vec::new();
    let report = run_reconcile(&opts, &mut stdout).unwrap();
    let text = String::from_utf8(stdout).unwrap();

    assert!(text.starts_with(SUCCESS_BANNER));
    assert!(text.contains("resource \"aws_volume_attachment\" \"web-xvdb\""));
    assert!(text.contains("\"vai-3194341925\""));
    assert_eq!(report.devices_reconciled, 1);

    // without --write the state is untouched
    let on_disk: Value = serde_json::from_str(&fs::read_to_string(&opts.state).unwrap()).unwrap();
    assert_eq!(on_disk, state("gp2"));
}

#[test]
fn write_in_place_bumps_serial() {
    let dir = tempfile::tempdir().unwrap();
    let mut opts = setup(dir.path(), &state("gp2"), &inventory("xvdb"));
    opts.write = true;
    opts.config_out = Some(dir.path().join("volumes.tf"));

    run_reconcile(&opts, &mut Vec::new()).unwrap();

    let written: Value = serde_json::from_str(&fs::read_to_string(&opts.state).unwrap()).unwrap();
    assert_eq!(written["serial"], 5);
    assert_eq!(written["lineage"], "a1b2c3");
    let resources = &written["modules"][0]["resources"];
    assert_eq!(resources["aws_ebs_volume.web-xvdb"]["primary"]["id"], "v-abcd");
    assert_eq!(resources["aws_ebs_volume.web-xvdb"]["primary"]["attributes"]["availability_zone"], "us-east-1c");
    assert!(resources["aws_instance.web"]["primary"]["attributes"]
        .get("ebs_block_device.#")
        .is_some());

    let config = fs::read_to_string(dir.path().join("volumes.tf")).unwrap();
    assert!(config.contains("resource \"aws_ebs_volume\" \"web-xvdb\""));
}

#[test]
fn write_to_separate_output() {
    let dir = tempfile::tempdir().unwrap();
    let mut opts = setup(dir.path(), &state("gp2"), &inventory("xvdb"));
    opts.write = true;
    opts.out = Some(dir.path().join("new.tfstate"));
    opts.strip_instance_devices = true;

    run_reconcile(&opts, &mut Vec::new()).unwrap();

    let original: Value = serde_json::from_str(&fs::read_to_string(&opts.state).unwrap()).unwrap();
    assert_eq!(original, state("gp2"));
    let written: Value =
        serde_json::from_str(&fs::read_to_string(dir.path().join("new.tfstate")).unwrap()).unwrap();
    let attrs = written["modules"][0]["resources"]["aws_instance.web"]["primary"]["attributes"]
        .as_object()
        .unwrap();
    assert!(attrs.keys().all(|k| !k.starts_with("ebs_block_device")));
}

#[test]
fn failed_reconciliation_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let mut opts = setup(dir.path(), &state("gp2"), &inventory("/dev/xvdc"));
    opts.write = true;
    opts.config_out = Some(dir.path().join("volumes.tf"));

    let mut stdout = Vec::new();
    let err = run_reconcile(&opts, &mut stdout).unwrap_err();
    assert!(format!("{err:#}").contains("reconciliation failed"));
    assert!(stdout.is_empty());

    let on_disk: Value = serde_json::from_str(&fs::read_to_string(&opts.state).unwrap()).unwrap();
    assert_eq!(on_disk, state("gp2"));
    assert!(!dir.path().join("volumes.tf").exists());
}

#[test]
fn strict_settings_file() {
    let dir = tempfile::tempdir().unwrap();
    let mut opts = setup(dir.path(), &state(""), &inventory("xvdb"));
    assert!(run_reconcile(&opts, &mut Vec::new()).is_ok());

    let settings = dir.path().join("volatt.toml");
    fs::write(&settings, "volume_type_policy = \"strict\"\n").unwrap();
    opts.config = Some(settings);
    assert!(run_reconcile(&opts, &mut Vec::new()).is_err());
}

#[test]
fn name_filter_excludes_instances() {
    let dir = tempfile::tempdir().unwrap();
    // the device mismatch would fail if the instance were in the inventory
    let mut opts = setup(dir.path(), &state("gp2"), &inventory("xvdc"));
    opts.name_pattern = Some("db-*".to_string());

    let report = run_reconcile(&opts, &mut Vec::new()).unwrap();
    assert_eq!(report.instances_skipped, 1);
    assert_eq!(report.devices_reconciled, 0);
}

#[test]
fn failed_state_write_prints_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let mut opts = setup(dir.path(), &state("gp2"), &inventory("xvdb"));
    opts.write = true;
    opts.out = Some(dir.path().join("missing").join("new.tfstate"));
    opts.config_out = Some(dir.path().join("volumes.tf"));

    let mut stdout = Vec::new();
    let err = run_reconcile(&opts, &mut stdout).unwrap_err();
    assert!(format!("{err:#}").contains("failed to write state"));
    assert!(stdout.is_empty());
    assert!(!dir.path().join("volumes.tf").exists());
}
