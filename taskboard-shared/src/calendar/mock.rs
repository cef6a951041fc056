/// Mock calendar for testing
///
/// Records every call and answers with generated event ids. Failures can be
/// queued with [`MockCalendar::fail_next`].

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use super::{CalendarApi, CalendarError, EventRequest, EventResource, EventTime};

/// A recorded calendar call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CalendarCall {
    Create {
        token: String,
        event: EventRequest,
    },
    Update {
        token: String,
        event_id: String,
        event: EventRequest,
    },
    Delete {
        token: String,
        event_id: String,
    },
}

#[derive(Debug, Default)]
pub struct MockCalendar {
    calls: Mutex<Vec<CalendarCall>>,
    failures: Mutex<VecDeque<CalendarError>>,
    next_id: AtomicU64,
}

impl MockCalendar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next calendar call fail with `error`
    pub fn fail_next(&self, error: CalendarError) {
        if let Ok(mut failures) = self.failures.lock() {
            failures.push_back(error);
        }
    }

    /// Calls received so far, oldest first
    pub fn calls(&self) -> Vec<CalendarCall> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    fn record(&self, call: CalendarCall) -> Result<(), CalendarError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(call);
        }
        match self.failures.lock().ok().and_then(|mut f| f.pop_front()) {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn resource(id: String, event: &EventRequest) -> EventResource {
        EventResource {
            id,
            summary: Some(event.summary.clone()),
            html_link: None,
            start: Some(EventTime {
                date_time: Some(event.start.date_time.to_rfc3339()),
                time_zone: Some(event.start.time_zone.clone()),
            }),
            end: Some(EventTime {
                date_time: Some(event.end.date_time.to_rfc3339()),
                time_zone: Some(event.end.time_zone.clone()),
            }),
        }
    }
}

#[async_trait]
impl CalendarApi for MockCalendar {
    async fn create_event(
        &self,
        token: &str,
        event: &EventRequest,
    ) -> Result<EventResource, CalendarError> {
        self.record(CalendarCall::Create {
            token: token.to_string(),
            event: event.clone(),
        })?;

        let n = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(Self::resource(format!("evt-{n}"), event))
    }

    async fn update_event(
        &self,
        token: &str,
        event_id: &str,
        event: &EventRequest,
    ) -> Result<EventResource, CalendarError> {
        self.record(CalendarCall::Update {
            token: token.to_string(),
            event_id: event_id.to_string(),
            event: event.clone(),
        })?;

        Ok(Self::resource(event_id.to_string(), event))
    }

    async fn delete_event(&self, token: &str, event_id: &str) -> Result<(), CalendarError> {
        self.record(CalendarCall::Delete {
            token: token.to_string(),
            event_id: event_id.to_string(),
        })
    }
}
