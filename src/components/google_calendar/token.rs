use super::auth::ClientSecret;
use crate::error::{auth_error, network_error, AppResult};
use chrono::Utc;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Tokens this close to expiry are refreshed before use
const EXPIRY_MARGIN_SECS: i64 = 60;

/// Token data persisted between runs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredToken {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Unix timestamp after which the access token is no longer valid
    pub expires_at: i64,
}

impl StoredToken {
    /// Build from a token endpoint response, keeping the previous refresh
    /// token when the response does not carry a new one
    pub fn from_response(response: &Value, previous_refresh: Option<&str>) -> AppResult<Self> {
        let access_token = response
            .get("access_token")
            .and_then(|v| v.as_str())
            .ok_or_else(|| auth_error("Token response missing 'access_token' field"))?
            .to_string();

        let refresh_token = response
            .get("refresh_token")
            .and_then(|v| v.as_str())
            .or(previous_refresh)
            .map(|s| s.to_string());

        let expires_in = response
            .get("expires_in")
            .and_then(|v| v.as_i64())
            .unwrap_or(3600);

        Ok(Self {
            access_token,
            refresh_token,
            expires_at: Utc::now().timestamp() + expires_in,
        })
    }

    pub fn is_expired(&self) -> bool {
        self.expires_at <= Utc::now().timestamp() + EXPIRY_MARGIN_SECS
    }
}

/// Reads, refreshes and saves the OAuth token kept in a JSON file
#[derive(Debug, Clone)]
pub struct TokenManager {
    path: PathBuf,
    token_url: String,
    secret: ClientSecret,
    client: Client,
}

impl TokenManager {
    pub fn new(path: impl Into<PathBuf>, token_url: impl Into<String>, secret: ClientSecret) -> Self {
        Self {
            path: path.into(),
            token_url: token_url.into(),
            secret,
            client: Client::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Stored token, if one has been saved
    pub fn load(&self) -> AppResult<Option<StoredToken>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&self.path)?;
        let token = serde_json::from_str(&content)?;
        Ok(Some(token))
    }

    /// Get a usable token, refreshing it when it has expired
    pub async fn get_token(&self) -> AppResult<StoredToken> {
        let token = self.load()?.ok_or_else(|| {
            auth_error(&format!(
                "No token found at {}. Authorization is required.",
                self.path.display()
            ))
        })?;

        if !token.is_expired() {
            return Ok(token);
        }

        debug!("Access token expired, refreshing");
        self.refresh_token(&token).await
    }

    /// Access token string for a bearer header
    pub async fn access_token(&self) -> AppResult<String> {
        Ok(self.get_token().await?.access_token)
    }

    /// Refresh an expired token and save the result
    async fn refresh_token(&self, token: &StoredToken) -> AppResult<StoredToken> {
        let refresh_token = token
            .refresh_token
            .as_deref()
            .ok_or_else(|| auth_error("No refresh token in token data"))?;

        let params = [
            ("client_id", self.secret.client_id.as_str()),
            ("client_secret", self.secret.client_secret.as_str()),
            ("refresh_token", refresh_token),
            ("grant_type", "refresh_token"),
        ];

        let new_token = self.request_token(&params, Some(refresh_token)).await?;
        info!("Access token refreshed");
        Ok(new_token)
    }

    /// Exchange an authorization code from the consent flow for a token and save it
    pub async fn exchange_code(&self, code: &str, redirect_uri: &str) -> AppResult<StoredToken> {
        let params = [
            ("client_id", self.secret.client_id.as_str()),
            ("client_secret", self.secret.client_secret.as_str()),
            ("code", code),
            ("redirect_uri", redirect_uri),
            ("grant_type", "authorization_code"),
        ];
        self.request_token(&params, None).await
    }

    async fn request_token(
        &self,
        params: &[(&str, &str)],
        previous_refresh: Option<&str>,
    ) -> AppResult<StoredToken> {
        let response = self
            .client
            .post(&self.token_url)
            .form(params)
            .send()
            .await
            .map_err(|e| network_error(&format!("Failed to reach token endpoint: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "Could not read error response".to_string());
            return Err(auth_error(&format!(
                "Token request rejected: HTTP {} - {}",
                status, error_body
            )));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| auth_error(&format!("Failed to parse token response: {}", e)))?;

        let token = StoredToken::from_response(&body, previous_refresh)?;
        self.set_token(&token)?;
        Ok(token)
    }

    /// Save a token, replacing any previous one
    pub fn set_token(&self, token: &StoredToken) -> AppResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, serde_json::to_string_pretty(token)?)?;
        debug!("Token saved to {}", self.path.display());
        Ok(())
    }
}
