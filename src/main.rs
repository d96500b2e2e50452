use clap::Parser;
use pogocal::config::DEFAULT_CONFIG_FILE;
use pogocal::error::sync_error;
use pogocal::startup::{self, RunOptions};
use std::path::PathBuf;
use tracing::info;

/// Sync Pokémon GO events from LeekDuck into Google Calendar
#[derive(Parser, Debug)]
#[clap(version, about, long_about = None)]
struct Args {
    /// Path to config file
    #[clap(short, long, value_parser, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Authorize with Google again before syncing
    #[clap(long)]
    reauth: bool,

    /// Sync every new or changed event without prompting
    #[clap(short, long)]
    yes: bool,

    /// Only print what would be synced
    #[clap(long)]
    dry_run: bool,

    /// Only include events of this type (repeatable)
    #[clap(short = 't', long = "type", value_name = "TYPE")]
    types: Vec<String>,
}

#[tokio::main]
async fn main() -> miette::Result<()> {
    let args = Args::parse();

    // Initialize logging
    startup::init_logging()?;

    info!("Starting pogocal");

    // Load configuration
    let config = startup::load_config(&args.config)?;

    let options = RunOptions {
        reauth: args.reauth,
        yes: args.yes,
        dry_run: args.dry_run,
        only_types: args.types,
    };

    let Some(mut report) = startup::run(&config, &options).await? else {
        return Ok(());
    };

    print!("{}", report);
    if let Some(e) = report.aborted.take() {
        return Err(e.into());
    }
    if report.has_failures() {
        return Err(sync_error(&format!(
            "{} event(s) could not be synced",
            report.failed.len()
        ))
        .into());
    }
    Ok(())
}
