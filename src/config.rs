use crate::error::{config_error, AppResult};
use chrono_tz::Tz;
use dotenvy::dotenv;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use url::Url;

/// Default events listing page
pub const DEFAULT_SOURCE_URL: &str = "https://leekduck.com/events/";

/// Browser-like user agent; the site rejects obvious bots
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// Default config file name looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "pogocal.toml";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Events listing page to scrape
    pub source_url: String,
    /// User agent sent with every page request
    pub user_agent: String,
    /// Google Calendar ID to write to; falls back to the client secret file, then `primary`
    pub calendar_id: Option<String>,
    /// OAuth client secret file downloaded from the Google console
    pub credentials_path: PathBuf,
    /// Where the authorization token is persisted between runs
    pub token_path: PathBuf,
    /// Timezone the site's "Local Time" values are interpreted in
    pub timezone: String,
    /// Popup reminder offsets in minutes; empty uses the calendar default
    pub reminder_minutes: Vec<i64>,
    /// Event type display name to Google Calendar colorId
    pub event_colors: HashMap<String, String>,
    /// Terminal selection layout
    pub ui: UiConfig,
    /// How far back existing calendar entries are listed
    pub lookback_days: i64,
    /// Retries for rate-limited or failing calendar API calls
    pub max_retries: u32,
    /// Local port for the OAuth redirect listener
    pub redirect_port: u16,
    /// Google Calendar REST base URL
    pub calendar_api_base: String,
    /// OAuth consent page
    pub oauth_auth_url: String,
    /// OAuth token endpoint
    pub oauth_token_url: String,
}

/// Layout of the terminal selection prompt
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    /// Maximum label width in characters
    pub width: usize,
    /// Number of rows shown at once
    pub height: usize,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            width: 100,
            height: 20,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            source_url: DEFAULT_SOURCE_URL.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            calendar_id: None,
            credentials_path: PathBuf::from("credentials.json"),
            token_path: PathBuf::from("token.json"),
            timezone: "America/New_York".to_string(),
            reminder_minutes: vec![60, 10],
            event_colors: default_event_colors(),
            ui: UiConfig::default(),
            lookback_days: 7,
            max_retries: 2,
            redirect_port: 8080,
            calendar_api_base: "https://www.googleapis.com/calendar/v3".to_string(),
            oauth_auth_url: "https://accounts.google.com/o/oauth2/v2/auth".to_string(),
            oauth_token_url: "https://oauth2.googleapis.com/token".to_string(),
        }
    }
}

/// Google Calendar colorIds closest to the site's event card colors
fn default_event_colors() -> HashMap<String, String> {
    [
        ("Raid", "11"),
        ("Community Day", "10"),
        ("Spotlight", "9"),
        ("Battle", "6"),
        ("Hatch Day", "3"),
        ("Mega", "4"),
        ("General", "8"),
        ("Ticket", "7"),
        ("Shadow", "8"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

impl Config {
    /// Load configuration from the config file and environment
    pub fn load(path: &Path) -> AppResult<Self> {
        // Load .env file if it exists
        dotenv().ok();

        let mut config = if path.exists() {
            info!("Loading configuration from {}", path.display());
            let content = fs::read_to_string(path)?;
            toml::from_str::<Config>(&content)?
        } else {
            debug!("No config file at {}, using defaults", path.display());
            Config::default()
        };

        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    /// Override fields from `POGOCAL_*` environment variables
    fn apply_env(&mut self) {
        if let Ok(value) = env::var("POGOCAL_SOURCE_URL") {
            self.source_url = value;
        }
        if let Ok(value) = env::var("POGOCAL_USER_AGENT") {
            self.user_agent = value;
        }
        if let Ok(value) = env::var("POGOCAL_CALENDAR_ID") {
            self.calendar_id = Some(value);
        }
        if let Ok(value) = env::var("POGOCAL_CREDENTIALS") {
            self.credentials_path = PathBuf::from(value);
        }
        if let Ok(value) = env::var("POGOCAL_TOKEN") {
            self.token_path = PathBuf::from(value);
        }
        if let Ok(value) = env::var("POGOCAL_TIMEZONE") {
            self.timezone = value;
        }
    }

    /// Reject values the rest of the pipeline cannot work with
    pub fn validate(&self) -> AppResult<()> {
        self.tz()?;
        Url::parse(&self.source_url)
            .map_err(|e| config_error(&format!("Invalid source_url '{}': {}", self.source_url, e)))?;
        if self.ui.width < 20 {
            return Err(config_error("ui.width must be at least 20"));
        }
        if self.ui.height == 0 {
            return Err(config_error("ui.height must be at least 1"));
        }
        if self.lookback_days < 0 {
            return Err(config_error("lookback_days cannot be negative"));
        }
        Ok(())
    }

    /// Parsed timezone
    pub fn tz(&self) -> AppResult<Tz> {
        self.timezone
            .parse::<Tz>()
            .map_err(|_| config_error(&format!("Invalid timezone: {}", self.timezone)))
    }

    /// Google Calendar colorId for an event type, if one is configured
    pub fn color_for(&self, event_type: &str) -> Option<&str> {
        self.event_colors
            .iter()
            .find(|(name, _)| name.trim().eq_ignore_ascii_case(event_type.trim()))
            .map(|(_, color)| color.as_str())
    }
}
