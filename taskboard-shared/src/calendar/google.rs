/// Google Calendar v3 client
///
/// Issues bearer-authenticated JSON requests against the primary calendar's
/// events collection:
///
/// ```text
/// POST   {events_url}
/// PUT    {events_url}/{event_id}
/// DELETE {events_url}/{event_id}
/// ```
///
/// Error responses look like `{"error":{"code":401,"message":"..."}}`; the
/// message is surfaced as [`CalendarError::Api`].

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::Deserialize;

use super::{CalendarApi, CalendarError, EventRequest, EventResource};

/// Events collection of the signed-in user's primary calendar
pub const GOOGLE_EVENTS_URL: &str =
    "https://www.googleapis.com/calendar/v3/calendars/primary/events";

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
}

/// HTTP client for the Google Calendar events API
#[derive(Debug, Clone)]
pub struct GoogleCalendarClient {
    http: Client,
    events_url: String,
}

impl GoogleCalendarClient {
    /// Creates a client for the default Google endpoint
    ///
    /// With `timeout` unset, requests wait as long as the provider takes.
    pub fn new(timeout: Option<Duration>) -> Result<Self, CalendarError> {
        Self::with_events_url(GOOGLE_EVENTS_URL, timeout)
    }

    /// Creates a client for a custom events collection URL
    pub fn with_events_url(
        events_url: impl Into<String>,
        timeout: Option<Duration>,
    ) -> Result<Self, CalendarError> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build()?;

        Ok(Self {
            http,
            events_url: events_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn events_url(&self) -> &str {
        &self.events_url
    }

    fn event_url(&self, event_id: &str) -> String {
        format!("{}/{}", self.events_url, event_id)
    }

    async fn check(response: Response) -> Result<Response, CalendarError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorEnvelope>(&body)
            .ok()
            .map(|e| e.error.message)
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| format!("Calendar request failed with status {}", status.as_u16()));

        tracing::warn!(status = status.as_u16(), message = %message, "Calendar API error");
        Err(CalendarError::Api {
            status: status.as_u16(),
            message,
        })
    }

    async fn parse_event(response: Response) -> Result<EventResource, CalendarError> {
        let event: EventResource = response
            .json()
            .await
            .map_err(|e| CalendarError::InvalidResponse(e.to_string()))?;
        if event.id.is_empty() {
            return Err(CalendarError::InvalidResponse(
                "event has no id".to_string(),
            ));
        }
        Ok(event)
    }
}

#[async_trait]
impl CalendarApi for GoogleCalendarClient {
    async fn create_event(
        &self,
        token: &str,
        event: &EventRequest,
    ) -> Result<EventResource, CalendarError> {
        let response = self
            .http
            .post(&self.events_url)
            .bearer_auth(token)
            .json(event)
            .send()
            .await?;

        let created = Self::parse_event(Self::check(response).await?).await?;
        tracing::debug!(event_id = %created.id, "Calendar event created");
        Ok(created)
    }

    async fn update_event(
        &self,
        token: &str,
        event_id: &str,
        event: &EventRequest,
    ) -> Result<EventResource, CalendarError> {
        let response = self
            .http
            .put(self.event_url(event_id))
            .bearer_auth(token)
            .json(event)
            .send()
            .await?;

        let updated = Self::parse_event(Self::check(response).await?).await?;
        tracing::debug!(event_id = %updated.id, "Calendar event updated");
        Ok(updated)
    }

    async fn delete_event(&self, token: &str, event_id: &str) -> Result<(), CalendarError> {
        let response = self
            .http
            .delete(self.event_url(event_id))
            .bearer_auth(token)
            .send()
            .await?;

        Self::check(response).await?;
        tracing::debug!(event_id = %event_id, "Calendar event deleted");
        Ok(())
    }
}
