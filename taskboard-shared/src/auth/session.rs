/// Request session
///
/// A [`Session`] is the explicit context handed to the sync coordinator and
/// the dashboard controller: who the user is, how they signed in, the
/// calendar-scoped bearer token (if any), and the time zone events are
/// tagged with.
///
/// A user who signed in through the calendar provider must also carry that
/// provider's token. Without it the session is invalid and the client is
/// expected to sign out.

use chrono_tz::Tz;
use serde::Serialize;
use uuid::Uuid;

use super::jwt::Claims;

/// Session resolution errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    /// Signed in through the calendar provider but no provider token was sent
    #[error("Signed in with {provider} but no provider token is present; sign in again")]
    MissingProviderToken { provider: String },

    /// `X-Time-Zone` is not an IANA time zone name
    #[error("Unknown time zone: {0}")]
    InvalidTimeZone(String),
}

/// Authenticated user context
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user_id: Uuid,
    pub email: Option<String>,
    pub provider: Option<String>,
    pub provider_token: Option<String>,
    pub time_zone: Tz,
}

/// Public view of a session, without the token itself
#[derive(Debug, Clone, Serialize)]
pub struct SessionInfo {
    pub user_id: Uuid,
    pub email: Option<String>,
    pub provider: Option<String>,
    pub calendar_linked: bool,
    pub time_zone: String,
}

impl Session {
    /// Session without a calendar token, in UTC
    pub fn new(user_id: Uuid) -> Self {
        Self {
            user_id,
            email: None,
            provider: None,
            provider_token: None,
            time_zone: chrono_tz::UTC,
        }
    }

    pub fn with_provider_token(mut self, token: impl Into<String>) -> Self {
        self.provider_token = Some(token.into());
        self
    }

    pub fn with_time_zone(mut self, time_zone: Tz) -> Self {
        self.time_zone = time_zone;
        self
    }

    /// Builds a session from validated claims
    ///
    /// # Errors
    ///
    /// [`SessionError::MissingProviderToken`] when the user signed in through
    /// `calendar_provider` and `provider_token` is absent or empty.
    pub fn resolve(
        claims: Claims,
        provider_token: Option<String>,
        time_zone: Tz,
        calendar_provider: &str,
    ) -> Result<Self, SessionError> {
        let provider_token = provider_token.filter(|t| !t.trim().is_empty());
        let provider = claims.app_metadata.provider;

        if provider.as_deref() == Some(calendar_provider) && provider_token.is_none() {
            return Err(SessionError::MissingProviderToken {
                provider: calendar_provider.to_string(),
            });
        }

        Ok(Self {
            user_id: claims.sub,
            email: claims.email,
            provider,
            provider_token,
            time_zone,
        })
    }

    /// Calendar bearer token, when present and non-empty
    pub fn calendar_token(&self) -> Option<&str> {
        self.provider_token.as_deref().filter(|t| !t.is_empty())
    }

    pub fn info(&self) -> SessionInfo {
        SessionInfo {
            user_id: self.user_id,
            email: self.email.clone(),
            provider: self.provider.clone(),
            calendar_linked: self.calendar_token().is_some(),
            time_zone: self.time_zone.name().to_string(),
        }
    }
}

/// Parses an IANA time zone name
pub fn parse_time_zone(name: &str) -> Result<Tz, SessionError> {
    name.trim()
        .parse::<Tz>()
        .map_err(|_| SessionError::InvalidTimeZone(name.to_string()))
}
