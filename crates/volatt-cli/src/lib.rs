//! volatt command-line pipeline
//!
//! The binary in `main.rs` only parses arguments and sets up logging; the
//! work happens here so it can be driven from tests.

#![warn(missing_docs)]
#![warn(unreachable_pub)]

use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use tracing_subscriber::EnvFilter;
use volatt_core::{attachment, DeviceName, ReconcileConfig, ReconcileReport, Reconciler, VolumeTypePolicy};
use volatt_inventory::{DescribeInstancesFile, InventorySource, NameFilter};
use volatt_state::StateFile;

/// Line printed before the generated output
pub const SUCCESS_BANNER: &str = "Successfully generated new state";

/// Build the `volatt` command
#[must_use]
pub fn command() -> Command {
    Command::new("volatt")
        .version(volatt_core::VERSION)
        .about("Move EC2 ebs_block_device entries into aws_ebs_volume / aws_volume_attachment state")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("log-level")
                .long("log-level")
                .global(true)
                .help("Log filter, e.g. 'debug' or 'volatt_core=trace' (defaults to RUST_LOG)"),
        )
        .subcommand(
            Command::new("reconcile")
                .about("Generate volume and attachment resources for instances in the state")
                .arg(
                    Arg::new("inventory")
                        .long("inventory")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("Saved `aws ec2 describe-instances` JSON"),
                )
                .arg(
                    Arg::new("state")
                        .long("state")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("Terraform state file (version 3)"),
                )
                .arg(
                    Arg::new("name")
                        .long("name")
                        .help("Only instances whose Name tag matches; '*' is a wildcard"),
                )
                .arg(
                    Arg::new("write")
                        .long("write")
                        .action(ArgAction::SetTrue)
                        .help("Write the new state (in place unless --out is given)"),
                )
                .arg(
                    Arg::new("out")
                        .long("out")
                        .value_parser(value_parser!(PathBuf))
                        .requires("write")
                        .help("Write the new state here instead of over --state"),
                )
                .arg(
                    Arg::new("config-out")
                        .long("config-out")
                        .value_parser(value_parser!(PathBuf))
                        .help("Also write the suggested configuration to this file"),
                )
                .arg(
                    Arg::new("config")
                        .long("config")
                        .value_parser(value_parser!(PathBuf))
                        .help("TOML file with reconciliation settings"),
                )
                .arg(
                    Arg::new("strict-volume-type")
                        .long("strict-volume-type")
                        .action(ArgAction::SetTrue)
                        .help("Reject devices whose volume type is empty"),
                )
                .arg(
                    Arg::new("strip-instance-devices")
                        .long("strip-instance-devices")
                        .action(ArgAction::SetTrue)
                        .help("Remove ebs_block_device from reconciled instances"),
                ),
        )
        .subcommand(
            Command::new("attachment-id")
                .about("Print the attachment ID Terraform would compute")
                .arg(Arg::new("device").required(true).help("Device name, with or without /dev/"))
                .arg(Arg::new("instance-id").required(true))
                .arg(Arg::new("volume-id").required(true)),
        )
}

/// Inputs of a `reconcile` run
#[derive(Debug, Clone, Default)]
pub struct ReconcileOptions {
    /// Inventory file
    pub inventory: PathBuf,
    /// State file
    pub state: PathBuf,
    /// `Name` tag pattern
    pub name_pattern: Option<String>,
    /// Write the new state
    pub write: bool,
    /// Alternate state output path
    pub out: Option<PathBuf>,
    /// Config text output path
    pub config_out: Option<PathBuf>,
    /// TOML settings file
    pub config: Option<PathBuf>,
    /// Force [`VolumeTypePolicy::Strict`]
    pub strict_volume_type: bool,
    /// Force stripping of nested devices
    pub strip_instance_devices: bool,
}

impl ReconcileOptions {
    /// Options with just the two inputs
    #[must_use]
    pub fn new(inventory: impl Into<PathBuf>, state: impl Into<PathBuf>) -> Self {
        Self {
            inventory: inventory.into(),
            state: state.into(),
            ..Self::default()
        }
    }

    /// Read options from parsed `reconcile` arguments
    ///
    /// # Errors
    /// Returns error if a required argument is absent
    pub fn from_matches(args: &ArgMatches) -> Result<Self> {
        Ok(Self {
            inventory: args.get_one::<PathBuf>("inventory").cloned().context("--inventory is required")?,
            state: args.get_one::<PathBuf>("state").cloned().context("--state is required")?,
            name_pattern: args.get_one::<String>("name").cloned(),
            write: args.get_flag("write"),
            out: args.get_one::<PathBuf>("out").cloned(),
            config_out: args.get_one::<PathBuf>("config-out").cloned(),
            config: args.get_one::<PathBuf>("config").cloned(),
            strict_volume_type: args.get_flag("strict-volume-type"),
            strip_instance_devices: args.get_flag("strip-instance-devices"),
        })
    }

    /// Settings file (or defaults) with command-line overrides applied
    ///
    /// # Errors
    /// Returns error if the settings file cannot be loaded
    pub fn reconcile_config(&self) -> Result<ReconcileConfig> {
        let mut config = match &self.config {
            Some(path) => ReconcileConfig::from_path(path)
                .with_context(|| format!("failed to load settings from {}", path.display()))?,
            None => ReconcileConfig::new(),
        };
        if self.strict_volume_type {
            config = config.with_volume_type_policy(VolumeTypePolicy::Strict);
        }
        if self.strip_instance_devices {
            config = config.with_strip_instance_devices(true);
        }
        Ok(config)
    }
}

/// Run a reconciliation, printing the result to `out`
///
/// Nothing is written to disk unless every instance reconciled. The state
/// is written before the config file, and output is only printed once both
/// writes succeeded.
///
/// # Errors
/// Returns error on any load, reconciliation or write failure
pub fn run_reconcile(opts: &ReconcileOptions, out: &mut impl Write) -> Result<ReconcileReport> {
    let config = opts.reconcile_config()?;

    let mut state = StateFile::from_path(&opts.state)
        .with_context(|| format!("failed to read state {}", opts.state.display()))?;

    let mut source = DescribeInstancesFile::new(&opts.inventory);
    if let Some(pattern) = &opts.name_pattern {
        source = source.with_filter(NameFilter::new(pattern)?);
    }
    let inventory = source
        .instances()
        .with_context(|| format!("failed to load inventory {}", opts.inventory.display()))?;

    let result = Reconciler::new(config)
        .reconcile(&state.root_module()?.resources, &inventory)
        .context("reconciliation failed")?;
    state.root_module_mut()?.resources = result.resources;

    if opts.write {
        let target = opts.out.as_ref().unwrap_or(&opts.state);
        state
            .write_to_path(target)
            .with_context(|| format!("failed to write state {}", target.display()))?;
    }

    if let Some(path) = &opts.config_out {
        std::fs::write(path, &result.config)
            .with_context(|| format!("failed to write config {}", path.display()))?;
        tracing::info!("Wrote config {}", path.display());
    }

    writeln!(out, "{SUCCESS_BANNER}")?;
    writeln!(out, "{}", result.config)?;
    writeln!(out, "{}", state.resources_json()?)?;

    Ok(result.report)
}

/// Filter used when neither `--log-level` nor `RUST_LOG` is usable
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Log filter from `--log-level`, falling back to `RUST_LOG`
///
/// # Errors
/// Returns error if `level` is given but is not a valid filter
pub fn log_filter(level: Option<&str>) -> Result<EnvFilter> {
    match level {
        Some(level) => EnvFilter::try_new(level).with_context(|| format!("invalid --log-level '{level}'")),
        None => Ok(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER))),
    }
}

/// Attachment ID for a device/instance/volume triple
#[must_use]
pub fn attachment_id(device: &str, instance_id: &str, volume_id: &str) -> String {
    attachment::synthesize(DeviceName::new(device).long_name(), instance_id, volume_id)
}
