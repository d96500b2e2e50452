use crate::components::events::parse_all;
use crate::components::google_calendar::{
    authorize, CalendarApi, Credentials, GoogleCalendarClient, TokenManager,
};
use crate::components::scraper::Scraper;
use crate::components::selection::{
    accept_all, filter_types, print_plan, prompt_selection, sort_chronologically,
};
use crate::components::sync::{commit, commit_with_reauth, plan, SyncReport};
use crate::config::Config;
use crate::error::{AppResult, Error};
use chrono::Utc;
use std::path::Path;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Initialize logging with environment-based configuration
pub fn init_logging() -> miette::Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,reqwest=warn,hyper=warn")),
        )
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| Error::Other(format!("Failed to set up logging: {}", e)))?;

    Ok(())
}

/// Load the application config
pub fn load_config(path: &Path) -> miette::Result<Config> {
    match Config::load(path) {
        Ok(config) => Ok(config),
        Err(e) => {
            error!("Failed to load configuration: {:?}", e);
            Err(e.into())
        }
    }
}

/// What a run should do besides scraping and planning
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Authorize again before touching the calendar
    pub reauth: bool,
    /// Sync every actionable event without prompting
    pub yes: bool,
    /// Print the plan and stop
    pub dry_run: bool,
    /// Event type names to keep; empty keeps all
    pub only_types: Vec<String>,
}

/// Scrape, plan, select and sync. Returns the report of the commit, or
/// `None` when nothing was written. A commit stopped by an authentication
/// failure still returns its report, with the error in `aborted`.
pub async fn run(config: &Config, options: &RunOptions) -> AppResult<Option<SyncReport>> {
    let tz = config.tz()?;
    let credentials = Credentials::load(&config.credentials_path)?;
    let mut reauthorized = false;

    if options.reauth {
        authorize(config, &credentials).await?;
        reauthorized = true;
    }

    let scraper = Scraper::new(config)?;
    let raws = scraper.scrape().await?;
    let today = Utc::now().with_timezone(&tz).date_naive();
    let events = parse_all(&raws, today);
    info!("Parsed {} of {} scraped events", events.len(), raws.len());

    let token_manager = TokenManager::new(
        &config.token_path,
        &config.oauth_token_url,
        credentials.secret.clone(),
    );
    let client = GoogleCalendarClient::new(config, credentials.calendar_id(config), token_manager);
    info!("Using calendar {}", client.calendar_id());

    let entries = match client.list_entries().await {
        Err(e) if e.is_auth() && !reauthorized => {
            warn!("{}; authorizing again", e);
            authorize(config, &credentials).await?;
            reauthorized = true;
            client.list_entries().await?
        }
        result => result?,
    };

    let mut planned = filter_types(plan(events, &entries, tz), &options.only_types);
    sort_chronologically(&mut planned);

    if options.dry_run {
        print_plan(&planned, config.ui.width);
        return Ok(None);
    }

    let selected = if options.yes {
        accept_all(planned)
    } else {
        prompt_selection(planned, &config.ui)?
    };
    if selected.is_empty() {
        info!("No events selected");
        return Ok(None);
    }

    let report = if reauthorized {
        commit(&client, &selected, config).await
    } else {
        let credentials = &credentials;
        commit_with_reauth(&client, selected, config, tz, move || async move {
            authorize(config, credentials).await.map(|_| ())
        })
        .await
    };

    Ok(Some(report))
}
