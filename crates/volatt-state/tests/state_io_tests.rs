use serde_json::Value;
use volatt_state::{StateError, StateFile};

const STATE: &str = r#"{
    "version": 3,
    "terraform_version": "0.8.5",
    "serial": 2,
    "lineage": "a1b2",
    "modules": [
        {
            "path": ["root"],
            "outputs": {},
            "resources": {
                "aws_eip.ip": {
                    "type": "aws_eip",
                    "depends_on": [],
                    "primary": {"id": "eip-1", "attributes": {"id": "eip-1"}, "meta": {}, "tainted": false},
                    "deposed": [],
                    "provider": ""
                }
            },
            "depends_on": []
        }
    ]
}"#;

#[test]
fn write_bumps_serial_and_preserves_content() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("terraform.tfstate");
    std::fs::write(&path, STATE).unwrap();

    let mut state = StateFile::from_path(&path).unwrap();
    state.write_to_path(&path).unwrap();
    assert_eq!(state.serial, 3);

    let written: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    let mut expected: Value = serde_json::from_str(STATE).unwrap();
    expected["serial"] = Value::from(3);
    assert_eq!(written, expected);
}

#[test]
fn write_to_separate_output_leaves_input() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("in.tfstate");
    let output = dir.path().join("out.tfstate");
    std::fs::write(&input, STATE).unwrap();

    let mut state = StateFile::from_path(&input).unwrap();
    state.write_to_path(&output).unwrap();

    assert_eq!(std::fs::read_to_string(&input).unwrap(), STATE);
    assert_eq!(StateFile::from_path(&output).unwrap().serial, 3);
}

#[test]
fn missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = StateFile::from_path(dir.path().join("nope.tfstate")).unwrap_err();
    assert!(matches!(err, StateError::Io { .. }));
}

#[test]
fn garbage_is_json_error() {
    let err = StateFile::from_json("not json").unwrap_err();
    assert!(matches!(err, StateError::Json(_)));
}
