/// Calendar client
///
/// A thin wrapper over a remote calendar's events endpoint. A task maps to
/// a one-hour event whose start is the task's reminder time.
///
/// # Implementations
///
/// - [`google::GoogleCalendarClient`]: Google Calendar v3 REST API
/// - [`mock::MockCalendar`]: records calls in memory, for tests
///
/// # Example
///
/// ```no_run
/// use taskboard_shared::calendar::{google::GoogleCalendarClient, CalendarApi, EventRequest};
/// use taskboard_shared::models::TaskFields;
/// use chrono::Utc;
///
/// # async fn example() -> Result<(), taskboard_shared::calendar::CalendarError> {
/// let client = GoogleCalendarClient::new(None)?;
/// let fields = TaskFields {
///     title: "Read".to_string(),
///     description: "Read ten pages".to_string(),
///     reminder_time: Utc::now(),
///     completed: false,
/// };
/// let event = client
///     .create_event("provider-token", &EventRequest::from_fields(&fields, chrono_tz::UTC))
///     .await?;
/// println!("created {}", event.id);
/// # Ok(())
/// # }
/// ```

pub mod google;
pub mod mock;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::TaskFields;

/// Length of every mirrored event
pub const EVENT_DURATION_MINUTES: i64 = 60;

/// Calendar call errors
#[derive(Debug, Error)]
pub enum CalendarError {
    /// Provider answered with a non-2xx status
    #[error("{message}")]
    Api { status: u16, message: String },

    /// Request never produced a response (DNS, TLS, timeout, ...)
    #[error("Calendar request failed: {0}")]
    Transport(String),

    /// Response body did not have the expected shape
    #[error("Invalid calendar response: {0}")]
    InvalidResponse(String),
}

impl CalendarError {
    /// HTTP status reported by the provider, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            CalendarError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for CalendarError {
    fn from(err: reqwest::Error) -> Self {
        CalendarError::Transport(err.to_string())
    }
}

/// Event start or end
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDateTime {
    pub date_time: DateTime<Utc>,
    pub time_zone: String,
}

/// Body of an event create or update
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRequest {
    pub summary: String,
    pub description: String,
    pub start: EventDateTime,
    pub end: EventDateTime,
}

impl EventRequest {
    /// Maps task fields to an event ending one hour after it starts
    pub fn from_fields(fields: &TaskFields, time_zone: Tz) -> Self {
        let start = fields.reminder_time;
        let end = start + Duration::minutes(EVENT_DURATION_MINUTES);
        let time_zone = time_zone.name().to_string();

        Self {
            summary: fields.title.clone(),
            description: fields.description.clone(),
            start: EventDateTime {
                date_time: start,
                time_zone: time_zone.clone(),
            },
            end: EventDateTime {
                date_time: end,
                time_zone,
            },
        }
    }
}

/// Start or end of an event as returned by the provider
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventTime {
    #[serde(default)]
    pub date_time: Option<String>,
    #[serde(default)]
    pub time_zone: Option<String>,
}

/// Event as returned by the provider
///
/// Only `id` is relied upon; other fields are kept for logging.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventResource {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub html_link: Option<String>,
    #[serde(default)]
    pub start: Option<EventTime>,
    #[serde(default)]
    pub end: Option<EventTime>,
}

/// Event operations against the user's primary calendar
///
/// `token` is the calendar-scoped bearer token from the session.
#[async_trait]
pub trait CalendarApi: Send + Sync {
    async fn create_event(
        &self,
        token: &str,
        event: &EventRequest,
    ) -> Result<EventResource, CalendarError>;

    async fn update_event(
        &self,
        token: &str,
        event_id: &str,
        event: &EventRequest,
    ) -> Result<EventResource, CalendarError>;

    async fn delete_event(&self, token: &str, event_id: &str) -> Result<(), CalendarError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields() -> TaskFields {
        TaskFields {
            title: "Read".to_string(),
            description: "Read ten pages".to_string(),
            reminder_time: "2024-01-01T10:00:00Z".parse().unwrap(),
            completed: false,
        }
    }

    #[test]
    fn test_event_spans_one_hour() {
        let event = EventRequest::from_fields(&fields(), chrono_tz::Europe::Paris);
        assert_eq!(event.end.date_time - event.start.date_time, Duration::hours(1));
        assert_eq!(event.start.time_zone, "Europe/Paris");
        assert_eq!(event.end.time_zone, "Europe/Paris");
    }

    #[test]
    fn test_event_wire_format() {
        let event = EventRequest::from_fields(&fields(), chrono_tz::UTC);
        let json = serde_json::to_value(&event).unwrap();

        assert_eq!(json["summary"], "Read");
        assert_eq!(json["description"], "Read ten pages");
        assert_eq!(json["start"]["dateTime"], "2024-01-01T10:00:00Z");
        assert_eq!(json["end"]["dateTime"], "2024-01-01T11:00:00Z");
        assert_eq!(json["start"]["timeZone"], "UTC");
    }

    #[test]
    fn test_event_resource_is_lenient() {
        let event: EventResource =
            serde_json::from_str(r#"{"id":"evt-1","kind":"calendar#event","status":"confirmed"}"#)
                .unwrap();
        assert_eq!(event.id, "evt-1");
        assert!(event.start.is_none());
    }
}
