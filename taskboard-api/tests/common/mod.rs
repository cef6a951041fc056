//! Common test utilities for integration tests
//!
//! Builds the real router over an in-memory store and a recording calendar
//! mock, and mints identity tokens the session middleware accepts.

#![allow(dead_code)]

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::response::Response;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;
use std::sync::Arc;
use taskboard_api::app::{build_router, AppState};
use taskboard_api::config::{ApiConfig, AuthConfig, CalendarConfig, Config, LogFormat};
use taskboard_shared::auth::jwt::{create_token, Claims};
use taskboard_shared::calendar::google::GOOGLE_EVENTS_URL;
use taskboard_shared::calendar::mock::MockCalendar;
use taskboard_shared::db::pool::DatabaseConfig;
use taskboard_shared::models::{NewTask, Task, TaskFields};
use taskboard_shared::store::memory::MemoryTaskStore;
use taskboard_shared::store::TaskStore;
use taskboard_shared::sync::DeletePolicy;
use tower::ServiceExt;
use uuid::Uuid;

pub const JWT_SECRET: &str = "test-secret-key-at-least-32-bytes-long";
pub const CALENDAR_TOKEN: &str = "ya29.calendar-token";
pub const DATE: &str = "2024-01-01";

/// Test context containing all necessary resources
pub struct TestContext {
    pub store: Arc<MemoryTaskStore>,
    pub calendar: Arc<MockCalendar>,
    pub app: axum::Router,
    pub user_id: Uuid,
}

impl TestContext {
    pub fn new() -> Self {
        Self::with_policy(DeletePolicy::Proceed)
    }

    pub fn with_policy(delete_policy: DeletePolicy) -> Self {
        let store = Arc::new(MemoryTaskStore::new());
        let calendar = Arc::new(MockCalendar::new());
        let state = AppState::new(store.clone(), calendar.clone(), test_config(delete_policy));

        TestContext {
            store,
            calendar,
            app: build_router(state),
            user_id: Uuid::new_v4(),
        }
    }

    /// Token for this context's user signed in through `provider`
    pub fn token(&self, provider: &str) -> String {
        token_for(self.user_id, provider, chrono::Duration::hours(1))
    }

    /// Request from a user who signed in with the calendar provider
    pub fn calendar_request(&self, method: &str, uri: &str, body: Option<Value>) -> Request<Body> {
        builder(method, uri)
            .header("authorization", format!("Bearer {}", self.token("google")))
            .header("x-provider-token", CALENDAR_TOKEN)
            .body(json_body(body))
            .unwrap()
    }

    /// Request from a user who signed in with email (no calendar token)
    pub fn email_request(&self, method: &str, uri: &str, body: Option<Value>) -> Request<Body> {
        builder(method, uri)
            .header("authorization", format!("Bearer {}", self.token("email")))
            .body(json_body(body))
            .unwrap()
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.call(request).await;
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if body.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body).unwrap_or_else(|_| {
                panic!("non-JSON body ({}): {}", status, String::from_utf8_lossy(&body))
            })
        };
        (status, json)
    }

    pub async fn call(&self, request: Request<Body>) -> Response {
        self.app.clone().oneshot(request).await.unwrap()
    }

    /// Inserts a row directly, bypassing the API
    pub async fn seed_task(
        &self,
        title: &str,
        reminder_time: DateTime<Utc>,
        event_id: Option<&str>,
    ) -> Task {
        self.store
            .insert(NewTask {
                user_id: self.user_id,
                fields: TaskFields {
                    title: title.to_string(),
                    description: "Seeded task description".to_string(),
                    reminder_time,
                    completed: false,
                },
                event_id: event_id.map(str::to_string),
            })
            .await
            .unwrap()
    }
}

pub fn token_for(user_id: Uuid, provider: &str, expires_in: chrono::Duration) -> String {
    let claims = Claims::with_expiration(
        user_id,
        Some("user@example.com".to_string()),
        Some(provider.to_string()),
        "authenticated",
        expires_in,
    );
    create_token(&claims, JWT_SECRET).unwrap()
}

pub fn at(hour: u32, minute: u32, second: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, hour, minute, second).unwrap()
}

pub fn task_form(title: &str, reminder_time: DateTime<Utc>) -> Value {
    serde_json::json!({
        "title": title,
        "description": "Prepare the agenda at https://notes.example.com",
        "reminder_time": reminder_time,
        "completed": false
    })
}

fn builder(method: &str, uri: &str) -> axum::http::request::Builder {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
}

fn json_body(body: Option<Value>) -> Body {
    match body {
        Some(value) => Body::from(value.to_string()),
        None => Body::empty(),
    }
}

fn test_config(delete_policy: DeletePolicy) -> Config {
    Config {
        api: ApiConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            cors_origins: vec!["*".to_string()],
            production: false,
        },
        database: DatabaseConfig::with_url("postgresql://localhost/unused"),
        auth: AuthConfig {
            jwt_secret: JWT_SECRET.to_string(),
            audience: "authenticated".to_string(),
            calendar_provider: "google".to_string(),
            default_time_zone: chrono_tz::UTC,
        },
        calendar: CalendarConfig {
            events_url: GOOGLE_EVENTS_URL.to_string(),
            timeout: None,
        },
        delete_policy,
        log_format: LogFormat::Text,
    }
}
