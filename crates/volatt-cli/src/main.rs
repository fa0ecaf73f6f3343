use std::process::ExitCode;

use anyhow::Result;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;
use volatt_cli::{attachment_id, command, log_filter, run_reconcile, ReconcileOptions, DEFAULT_LOG_FILTER};

fn init_tracing(filter: EnvFilter) {
    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .init();
}

fn run() -> Result<()> {
    let matches = command().get_matches();
    let filter = log_filter(matches.get_one::<String>("log-level").map(String::as_str));
    match filter {
        Ok(filter) => init_tracing(filter),
        Err(err) => {
            init_tracing(EnvFilter::new(DEFAULT_LOG_FILTER));
            return Err(err);
        }
    }

    match matches.subcommand() {
        Some(("reconcile", args)) => {
            let opts = ReconcileOptions::from_matches(args)?;
            let report = run_reconcile(&opts, &mut std::io::stdout().lock())?;
            tracing::debug!(?report, "Run complete");
        }
        Some(("attachment-id", args)) => {
            let arg = |name: &str| args.get_one::<String>(name).map_or("", String::as_str);
            println!("{}", attachment_id(arg("device"), arg("instance-id"), arg("volume-id")));
        }
        _ => {
            command().print_help()?;
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!("{err:#}");
            ExitCode::FAILURE
        }
    }
}
