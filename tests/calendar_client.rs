use chrono::Utc;
use pogocal::components::google_calendar::auth::ClientSecret;
use pogocal::components::google_calendar::models::{EventDateTime, Reminders};
use pogocal::components::google_calendar::{
    CalendarApi, GoogleCalendarClient, NewEntry, StoredToken, TokenManager,
};
use pogocal::config::Config;
use pogocal::error::Error;
use serde_json::json;
use std::net::TcpListener;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use tempfile::TempDir;
use wiremock::matchers::{body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const EVENTS_PATH: &str = "/calendars/primary/events";

fn secret() -> ClientSecret {
    ClientSecret {
        client_id: "client-id".to_string(),
        client_secret: "client-secret".to_string(),
    }
}

/// Token manager backed by a temporary token file
fn token_manager(dir: &TempDir, server: &MockServer, token: Option<StoredToken>) -> TokenManager {
    let manager = TokenManager::new(
        dir.path().join("token.json"),
        format!("{}/token", server.uri()),
        secret(),
    );
    if let Some(token) = token {
        manager.set_token(&token).unwrap();
    }
    manager
}

fn valid_token() -> StoredToken {
    StoredToken {
        access_token: "valid-token".to_string(),
        refresh_token: Some("refresh-me".to_string()),
        expires_at: Utc::now().timestamp() + 3600,
    }
}

fn client(server: &MockServer, manager: TokenManager) -> GoogleCalendarClient {
    let config = Config {
        calendar_api_base: server.uri(),
        max_retries: 2,
        ..Default::default()
    };
    GoogleCalendarClient::new(&config, "primary".to_string(), manager)
}

fn new_entry() -> NewEntry {
    NewEntry {
        summary: "Raid Hour".to_string(),
        description: "Source: https://leekduck.com/events/raid-hour/".to_string(),
        start: EventDateTime {
            date_time: Some("2024-06-05T18:00:00-04:00".to_string()),
            time_zone: Some("America/New_York".to_string()),
            ..Default::default()
        },
        end: EventDateTime {
            date_time: Some("2024-06-05T19:00:00-04:00".to_string()),
            time_zone: Some("America/New_York".to_string()),
            ..Default::default()
        },
        reminders: Reminders {
            use_default: true,
            overrides: vec![],
        },
        color_id: Some("11".to_string()),
    }
}

#[tokio::test]
async fn test_list_entries_follows_pages() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path(EVENTS_PATH))
        .and(header("authorization", "Bearer valid-token"))
        .and(query_param("singleEvents", "true"))
        .and(query_param("maxResults", "2500"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [{ "id": "a", "summary": "First" }],
            "nextPageToken": "p2"
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(EVENTS_PATH))
        .and(query_param("pageToken", "p2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [{ "id": "b", "summary": "Second" }]
        })))
        .with_priority(1)
        .expect(1)
        .mount(&server)
        .await;

    let api = client(&server, token_manager(&dir, &server, Some(valid_token())));
    let entries = api.list_entries().await.unwrap();

    let ids: Vec<&str> = entries.iter().map(|e| e.id.as_str()).collect();
    assert_eq!(ids, vec!["a", "b"]);
}

#[tokio::test]
async fn test_unauthorized_is_auth_error() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path(EVENTS_PATH))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid credentials"))
        .expect(1)
        .mount(&server)
        .await;

    let api = client(&server, token_manager(&dir, &server, Some(valid_token())));
    let err = api.list_entries().await.unwrap_err();
    assert!(err.is_auth());
}

#[tokio::test]
async fn test_server_error_is_retried() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    Mock::given(method("POST"))
        .and(path(EVENTS_PATH))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path(EVENTS_PATH))
        .and(body_string_contains("Raid Hour"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "created1",
            "summary": "Raid Hour"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let api = client(&server, token_manager(&dir, &server, Some(valid_token())));
    let created = api.insert_entry(&new_entry()).await.unwrap();
    assert_eq!(created.id, "created1");
}

#[tokio::test]
async fn test_rate_limit_is_retried() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path(EVENTS_PATH))
        .respond_with(ResponseTemplate::new(429).set_body_string("rateLimitExceeded"))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(EVENTS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [{ "id": "a", "summary": "First" }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let api = client(&server, token_manager(&dir, &server, Some(valid_token())));
    let entries = api.list_entries().await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].id, "a");
}

#[tokio::test]
async fn test_transport_failure_is_retried() {
    // Accepts connections and drops them before answering
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let address = listener.local_addr().unwrap();
    let connections = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&connections);
    thread::spawn(move || {
        for stream in listener.incoming() {
            counter.fetch_add(1, Ordering::SeqCst);
            drop(stream);
        }
    });

    let token_server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let config = Config {
        calendar_api_base: format!("http://{}", address),
        max_retries: 1,
        ..Default::default()
    };
    let api = GoogleCalendarClient::new(
        &config,
        "primary".to_string(),
        token_manager(&dir, &token_server, Some(valid_token())),
    );

    let err = api.insert_entry(&new_entry()).await.unwrap_err();
    match err {
        Error::Sync(message) => assert!(message.contains("Request failed")),
        other => panic!("expected sync error, got {:?}", other),
    }
    assert!(connections.load(Ordering::SeqCst) >= 2);
}

#[tokio::test]
async fn test_bad_request_is_not_retried() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    Mock::given(method("PATCH"))
        .and(path(format!("{}/e1", EVENTS_PATH)))
        .respond_with(ResponseTemplate::new(400).set_body_string("bad colorId"))
        .expect(1)
        .mount(&server)
        .await;

    let api = client(&server, token_manager(&dir, &server, Some(valid_token())));
    let err = api.update_entry("e1", &new_entry()).await.unwrap_err();
    match err {
        Error::Sync(message) => assert!(message.contains("bad colorId")),
        other => panic!("expected sync error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_update_uses_patch() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    Mock::given(method("PATCH"))
        .and(path(format!("{}/e1", EVENTS_PATH)))
        .and(body_string_contains("\"colorId\":\"11\""))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "e1",
            "summary": "Raid Hour",
            "start": { "dateTime": "2024-06-05T18:00:00-04:00" }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let api = client(&server, token_manager(&dir, &server, Some(valid_token())));
    let updated = api.update_entry("e1", &new_entry()).await.unwrap();
    assert_eq!(updated.id, "e1");
    assert_eq!(
        updated.start_date_time.as_deref(),
        Some("2024-06-05T18:00:00-04:00")
    );
}

#[tokio::test]
async fn test_update_to_all_day_clears_date_time() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    Mock::given(method("PATCH"))
        .and(path(format!("{}/e1", EVENTS_PATH)))
        .and(body_string_contains("\"date\":\"2024-06-05\""))
        .and(body_string_contains("\"dateTime\":null"))
        .and(body_string_contains("\"timeZone\":null"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "e1",
            "summary": "Raid Hour",
            "start": { "date": "2024-06-05" },
            "end": { "date": "2024-06-06" }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let all_day = NewEntry {
        start: EventDateTime {
            date: Some("2024-06-05".to_string()),
            ..Default::default()
        },
        end: EventDateTime {
            date: Some("2024-06-06".to_string()),
            ..Default::default()
        },
        ..new_entry()
    };

    let api = client(&server, token_manager(&dir, &server, Some(valid_token())));
    let updated = api.update_entry("e1", &all_day).await.unwrap();
    assert_eq!(updated.start_date.as_deref(), Some("2024-06-05"));
    assert_eq!(updated.start_date_time, None);
}

#[tokio::test]
async fn test_valid_token_is_returned() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    let manager = token_manager(&dir, &server, Some(valid_token()));
    assert_eq!(manager.access_token().await.unwrap(), "valid-token");
}

#[tokio::test]
async fn test_missing_token_is_auth_error() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    let manager = token_manager(&dir, &server, None);
    let err = manager.get_token().await.unwrap_err();
    assert!(err.is_auth());
}

#[tokio::test]
async fn test_expired_token_is_refreshed_and_saved() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("grant_type=refresh_token"))
        .and(body_string_contains("refresh_token=refresh-me"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "fresh-token",
            "expires_in": 3599,
            "token_type": "Bearer"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let expired = StoredToken {
        expires_at: Utc::now().timestamp() - 10,
        ..valid_token()
    };
    let manager = token_manager(&dir, &server, Some(expired));

    assert_eq!(manager.access_token().await.unwrap(), "fresh-token");

    // Saved with the old refresh token kept
    let saved = manager.load().unwrap().unwrap();
    assert_eq!(saved.access_token, "fresh-token");
    assert_eq!(saved.refresh_token.as_deref(), Some("refresh-me"));
    assert!(!saved.is_expired());

    // The saved token is used without another refresh
    assert_eq!(manager.access_token().await.unwrap(), "fresh-token");
}

#[tokio::test]
async fn test_rejected_refresh_is_auth_error() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({ "error": "invalid_grant" })))
        .mount(&server)
        .await;

    let expired = StoredToken {
        expires_at: Utc::now().timestamp() - 10,
        ..valid_token()
    };
    let manager = token_manager(&dir, &server, Some(expired));
    assert!(manager.get_token().await.unwrap_err().is_auth());
}
