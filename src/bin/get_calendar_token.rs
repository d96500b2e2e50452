use clap::Parser;
use pogocal::components::google_calendar::{authorize, Credentials};
use pogocal::config::DEFAULT_CONFIG_FILE;
use pogocal::startup;
use std::path::PathBuf;

/// Authorize pogocal with Google Calendar and save the token
#[derive(Parser, Debug)]
#[clap(version, about, long_about = None)]
struct Args {
    /// Path to config file
    #[clap(short, long, value_parser, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> miette::Result<()> {
    let args = Args::parse();
    startup::init_logging()?;

    // Load configuration
    let config = startup::load_config(&args.config)?;
    let credentials = Credentials::load(&config.credentials_path)?;

    authorize(&config, &credentials).await?;

    println!(
        "Token successfully saved to {}! Syncing into calendar '{}'.",
        config.token_path.display(),
        credentials.calendar_id(&config)
    );

    Ok(())
}
