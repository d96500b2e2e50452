use super::token::{StoredToken, TokenManager};
use crate::config::Config;
use crate::error::{auth_error, config_error, AppResult};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};
use url::Url;

/// Read/write access to calendars
pub const CALENDAR_SCOPE: &str = "https://www.googleapis.com/auth/calendar";

/// OAuth client registered in the Google Cloud console
#[derive(Debug, Clone, Deserialize)]
pub struct ClientSecret {
    pub client_id: String,
    pub client_secret: String,
}

#[derive(Debug, Deserialize)]
struct ClientSecretFile {
    installed: Option<ClientSecret>,
    web: Option<ClientSecret>,
    calendar_id: Option<String>,
}

/// Contents of the client secret file
#[derive(Debug, Clone)]
pub struct Credentials {
    pub secret: ClientSecret,
    /// Calendar named next to the secret, used when the config names none
    pub calendar_id: Option<String>,
}

impl Credentials {
    pub fn load(path: &Path) -> AppResult<Self> {
        if !path.exists() {
            return Err(config_error(&format!(
                "Client secret not found at {}. Download an OAuth desktop client JSON from the Google Cloud console.",
                path.display()
            )));
        }
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> AppResult<Self> {
        let file: ClientSecretFile = serde_json::from_str(content)?;
        let secret = file
            .installed
            .or(file.web)
            .ok_or_else(|| config_error("Client secret file has no 'installed' or 'web' section"))?;
        Ok(Self {
            secret,
            calendar_id: file.calendar_id,
        })
    }

    /// Calendar to sync into: config first, then the secret file, then `primary`
    pub fn calendar_id(&self, config: &Config) -> String {
        config
            .calendar_id
            .clone()
            .or_else(|| self.calendar_id.clone())
            .unwrap_or_else(|| "primary".to_string())
    }
}

pub fn redirect_uri(config: &Config) -> String {
    format!("http://localhost:{}", config.redirect_port)
}

/// Consent page URL for the installed-app flow
pub fn authorization_url(config: &Config, secret: &ClientSecret, state: &str) -> AppResult<Url> {
    let mut url = Url::parse(&config.oauth_auth_url)
        .map_err(|e| config_error(&format!("Invalid oauth_auth_url: {}", e)))?;
    url.query_pairs_mut()
        .append_pair("client_id", &secret.client_id)
        .append_pair("redirect_uri", &redirect_uri(config))
        .append_pair("response_type", "code")
        .append_pair("access_type", "offline")
        .append_pair("prompt", "consent")
        .append_pair("scope", CALENDAR_SCOPE)
        .append_pair("state", state);
    Ok(url)
}

/// Pull the authorization code out of the redirect request path, checking
/// that it answers our own consent request
pub fn parse_callback(request_path: &str, expected_state: &str) -> AppResult<String> {
    let url = Url::parse(&format!("http://localhost{}", request_path))
        .map_err(|e| auth_error(&format!("Malformed callback URL: {}", e)))?;

    let mut code = None;
    let mut state = None;
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "code" => code = Some(value.into_owned()),
            "state" => state = Some(value.into_owned()),
            "error" => return Err(auth_error(&format!("Authorization denied: {}", value))),
            _ => {}
        }
    }

    if state.as_deref() != Some(expected_state) {
        return Err(auth_error("State mismatch in authorization callback"));
    }
    code.ok_or_else(|| auth_error("No authorization code found in callback"))
}

/// Block until the browser is redirected back with the authorization code
fn wait_for_code(port: u16, state: &str) -> AppResult<String> {
    let server = tiny_http::Server::http(("127.0.0.1", port))
        .map_err(|e| auth_error(&format!("Failed to listen on port {}: {}", port, e)))?;
    println!("Waiting for authorization callback...");
    serve_callback(&server, state)
}

/// Answer requests on `server` until one carries the callback query
fn serve_callback(server: &tiny_http::Server, state: &str) -> AppResult<String> {
    loop {
        let request = server.recv()?;
        let path = request.url().to_string();

        // Browsers also ask for /favicon.ico and the like
        if !path.contains("code=") && !path.contains("error=") {
            if let Err(e) = request.respond(tiny_http::Response::empty(404)) {
                debug!("Could not answer {}: {}", path, e);
            }
            continue;
        }

        let result = parse_callback(&path, state);
        let message = match &result {
            Ok(_) => "Authorization successful! You can close this window.".to_string(),
            Err(e) => format!("Authorization failed: {}", e),
        };
        request.respond(tiny_http::Response::from_string(message))?;
        return result;
    }
}

/// Run the installed-app consent flow and save the resulting token
pub async fn authorize(config: &Config, credentials: &Credentials) -> AppResult<StoredToken> {
    let token_manager = TokenManager::new(
        &config.token_path,
        &config.oauth_token_url,
        credentials.secret.clone(),
    );

    // Generate random state for security
    let state = uuid::Uuid::new_v4().to_string();
    let auth_url = authorization_url(config, &credentials.secret, &state)?;

    println!("Opening browser for Google Calendar authorization...");
    if let Err(e) = webbrowser::open(auth_url.as_str()) {
        warn!("Could not open a browser: {}", e);
        println!("Open this URL to continue:\n{}", auth_url);
    }

    let port = config.redirect_port;
    let code = tokio::task::spawn_blocking(move || wait_for_code(port, &state))
        .await
        .map_err(|e| auth_error(&format!("Callback listener failed: {}", e)))??;

    let token = token_manager
        .exchange_code(&code, &redirect_uri(config))
        .await?;
    info!("Token saved to {}", token_manager.path().display());
    Ok(token)
}
