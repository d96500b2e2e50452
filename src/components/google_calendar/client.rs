use super::models::{CalendarEntry, NewEntry};
use super::token::TokenManager;
use crate::config::Config;
use crate::error::{auth_error, config_error, sync_error, AppResult};
use async_trait::async_trait;
use chrono::{Duration, Utc};
use reqwest::{Client, Method, StatusCode};
use serde_json::Value;
use std::time::Duration as StdDuration;
use tracing::{debug, error, warn};
use url::Url;

/// Largest page the events endpoint hands out
const PAGE_SIZE: &str = "2500";

/// Base delay between retries; multiplied by the attempt number
const RETRY_BACKOFF_MS: u64 = 500;

/// Operations the sync needs from a calendar
#[async_trait]
pub trait CalendarApi: Send + Sync {
    /// Entries from `lookback_days` ago onwards
    async fn list_entries(&self) -> AppResult<Vec<CalendarEntry>>;

    async fn insert_entry(&self, entry: &NewEntry) -> AppResult<CalendarEntry>;

    /// Overwrite the rendered fields of an existing entry
    async fn update_entry(&self, id: &str, entry: &NewEntry) -> AppResult<CalendarEntry>;
}

/// Google Calendar v3 REST client
#[derive(Debug, Clone)]
pub struct GoogleCalendarClient {
    client: Client,
    api_base: String,
    calendar_id: String,
    token_manager: TokenManager,
    lookback_days: i64,
    max_retries: u32,
}

impl GoogleCalendarClient {
    pub fn new(config: &Config, calendar_id: String, token_manager: TokenManager) -> Self {
        Self {
            client: Client::new(),
            api_base: config.calendar_api_base.clone(),
            calendar_id,
            token_manager,
            lookback_days: config.lookback_days,
            max_retries: config.max_retries,
        }
    }

    pub fn calendar_id(&self) -> &str {
        &self.calendar_id
    }

    /// `.../calendars/{calendarId}/events[/{eventId}]`
    fn events_url(&self, entry_id: Option<&str>) -> AppResult<Url> {
        let mut url = Url::parse(&self.api_base)
            .map_err(|e| config_error(&format!("Invalid calendar_api_base: {}", e)))?;
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| config_error("calendar_api_base cannot be a base URL"))?;
            segments
                .pop_if_empty()
                .extend(["calendars", self.calendar_id.as_str(), "events"]);
            if let Some(id) = entry_id {
                segments.push(id);
            }
        }
        Ok(url)
    }

    /// Send one request, retrying rate limits and server errors
    async fn execute(&self, method: Method, url: Url, body: Option<&Value>) -> AppResult<Value> {
        let mut attempt = 0;
        loop {
            let access_token = self.token_manager.access_token().await?;

            let mut request = self
                .client
                .request(method.clone(), url.clone())
                .bearer_auth(access_token);
            if let Some(body) = body {
                request = request.json(body);
            }

            let retryable = match request.send().await {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        return response.json().await.map_err(|e| {
                            sync_error(&format!("Failed to parse calendar response: {}", e))
                        });
                    }

                    let error_body = response
                        .text()
                        .await
                        .unwrap_or_else(|_| "Could not read error response".to_string());

                    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
                        return Err(auth_error(&format!(
                            "Calendar rejected credentials: HTTP {} - {}",
                            status, error_body
                        )));
                    }
                    if status != StatusCode::TOO_MANY_REQUESTS && !status.is_server_error() {
                        error!("{} {} failed: HTTP {}", method, url.path(), status);
                        return Err(sync_error(&format!("HTTP {} - {}", status, error_body)));
                    }
                    format!("HTTP {} - {}", status, error_body)
                }
                Err(e) => format!("Request failed: {}", e),
            };

            if attempt >= self.max_retries {
                error!("{} {} failed after {} attempts", method, url.path(), attempt + 1);
                return Err(sync_error(&retryable));
            }
            attempt += 1;
            warn!(
                "{} {} failed ({}), retrying ({}/{})",
                method,
                url.path(),
                retryable,
                attempt,
                self.max_retries
            );
            tokio::time::sleep(StdDuration::from_millis(RETRY_BACKOFF_MS * u64::from(attempt))).await;
        }
    }
}

#[async_trait]
impl CalendarApi for GoogleCalendarClient {
    async fn list_entries(&self) -> AppResult<Vec<CalendarEntry>> {
        let time_min = (Utc::now() - Duration::days(self.lookback_days)).to_rfc3339();
        let mut entries = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut url = self.events_url(None)?;
            {
                let mut query = url.query_pairs_mut();
                query
                    .append_pair("timeMin", &time_min)
                    .append_pair("singleEvents", "true")
                    .append_pair("orderBy", "startTime")
                    .append_pair("maxResults", PAGE_SIZE);
                if let Some(token) = &page_token {
                    query.append_pair("pageToken", token);
                }
            }

            let page = self.execute(Method::GET, url, None).await?;
            if let Some(items) = page.get("items").and_then(|i| i.as_array()) {
                entries.extend(items.iter().map(CalendarEntry::from_api));
            }

            page_token = page
                .get("nextPageToken")
                .and_then(|t| t.as_str())
                .map(|t| t.to_string());
            if page_token.is_none() {
                break;
            }
        }

        debug!("Listed {} entries from {}", entries.len(), self.calendar_id);
        Ok(entries)
    }

    async fn insert_entry(&self, entry: &NewEntry) -> AppResult<CalendarEntry> {
        let url = self.events_url(None)?;
        let body = serde_json::to_value(entry)?;
        let created = self.execute(Method::POST, url, Some(&body)).await?;
        Ok(CalendarEntry::from_api(&created))
    }

    async fn update_entry(&self, id: &str, entry: &NewEntry) -> AppResult<CalendarEntry> {
        let url = self.events_url(Some(id))?;
        let body = entry.patch_body()?;
        let updated = self.execute(Method::PATCH, url, Some(&body)).await?;
        Ok(CalendarEntry::from_api(&updated))
    }
}
