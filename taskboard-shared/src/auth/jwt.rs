/// Identity provider access tokens
///
/// The identity provider signs access tokens with HS256 using a shared
/// secret. This module validates them and extracts the claims the task
/// board needs: the user id, email, audience, and the provider the user
/// signed in with (`app_metadata.provider`).
///
/// Minting tokens is only needed by tests and local tooling; production
/// tokens come from the provider.
///
/// # Example
///
/// ```
/// use taskboard_shared::auth::jwt::{create_token, validate_token, Claims};
/// use uuid::Uuid;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let secret = "a-shared-secret-of-at-least-32-bytes!";
/// let user_id = Uuid::new_v4();
///
/// let claims = Claims::new(user_id, Some("ada@example.com".into()), Some("google".into()), "authenticated");
/// let token = create_token(&claims, secret)?;
///
/// let validated = validate_token(&token, secret, "authenticated")?;
/// assert_eq!(validated.sub, user_id);
/// assert_eq!(validated.provider(), Some("google"));
/// # Ok(())
/// # }
/// # example().unwrap();
/// ```

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Default lifetime of tokens minted by [`Claims::new`]
pub const DEFAULT_TOKEN_LIFETIME_HOURS: i64 = 1;

/// Error type for JWT operations
#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    /// Failed to create token
    #[error("Failed to create token: {0}")]
    CreateError(String),

    /// Failed to validate token
    #[error("Failed to validate token: {0}")]
    ValidationError(String),

    /// Token has expired
    #[error("Token has expired")]
    Expired,

    /// Token was issued for another audience
    #[error("Invalid audience: expected {expected}")]
    InvalidAudience { expected: String },
}

/// Provider-managed metadata embedded in the token
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppMetadata {
    /// Sign-in provider, e.g. `"google"` or `"email"`
    #[serde(default)]
    pub provider: Option<String>,
}

/// Access token claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject - User ID
    pub sub: Uuid,

    /// User email, when the provider shares it
    #[serde(default)]
    pub email: Option<String>,

    /// Audience
    pub aud: String,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration time (Unix timestamp)
    pub exp: i64,

    /// Database role granted to the token
    #[serde(default)]
    pub role: Option<String>,

    #[serde(default)]
    pub app_metadata: AppMetadata,
}

impl Claims {
    /// Creates claims expiring after [`DEFAULT_TOKEN_LIFETIME_HOURS`]
    pub fn new(
        user_id: Uuid,
        email: Option<String>,
        provider: Option<String>,
        audience: &str,
    ) -> Self {
        Self::with_expiration(
            user_id,
            email,
            provider,
            audience,
            Duration::hours(DEFAULT_TOKEN_LIFETIME_HOURS),
        )
    }

    /// Creates claims with a custom lifetime (may be negative in tests)
    pub fn with_expiration(
        user_id: Uuid,
        email: Option<String>,
        provider: Option<String>,
        audience: &str,
        expires_in: Duration,
    ) -> Self {
        let now = Utc::now();

        Self {
            sub: user_id,
            email,
            aud: audience.to_string(),
            iat: now.timestamp(),
            exp: (now + expires_in).timestamp(),
            role: Some(audience.to_string()),
            app_metadata: AppMetadata { provider },
        }
    }

    /// Sign-in provider name
    pub fn provider(&self) -> Option<&str> {
        self.app_metadata.provider.as_deref()
    }

    /// Checks if token has expired
    pub fn is_expired(&self) -> bool {
        Utc::now().timestamp() >= self.exp
    }
}

/// Signs claims with HS256
pub fn create_token(claims: &Claims, secret: &str) -> Result<String, JwtError> {
    let header = Header::new(Algorithm::HS256);
    let key = EncodingKey::from_secret(secret.as_bytes());

    encode(&header, claims, &key)
        .map_err(|e| JwtError::CreateError(format!("Token encoding failed: {}", e)))
}

/// Validates an access token and extracts its claims
///
/// Verifies the HS256 signature, the expiration, and the audience.
///
/// # Errors
///
/// - [`JwtError::Expired`] when `exp` is in the past
/// - [`JwtError::InvalidAudience`] when `aud` does not match
/// - [`JwtError::ValidationError`] for anything else
pub fn validate_token(token: &str, secret: &str, audience: &str) -> Result<Claims, JwtError> {
    let key = DecodingKey::from_secret(secret.as_bytes());

    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_audience(&[audience]);
    validation.validate_exp = true;
    validation.leeway = 0;

    let token_data = decode::<Claims>(token, &key, &validation).map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => JwtError::Expired,
        jsonwebtoken::errors::ErrorKind::InvalidAudience => JwtError::InvalidAudience {
            expected: audience.to_string(),
        },
        _ => JwtError::ValidationError(format!("Token validation failed: {}", e)),
    })?;

    Ok(token_data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret-key-at-least-32-bytes-long";

    fn claims(provider: Option<&str>) -> Claims {
        Claims::new(
            Uuid::new_v4(),
            Some("user@example.com".to_string()),
            provider.map(str::to_string),
            "authenticated",
        )
    }

    #[test]
    fn test_round_trip() {
        let claims = claims(Some("google"));
        let token = create_token(&claims, SECRET).unwrap();
        let validated = validate_token(&token, SECRET, "authenticated").unwrap();

        assert_eq!(validated.sub, claims.sub);
        assert_eq!(validated.email.as_deref(), Some("user@example.com"));
        assert_eq!(validated.provider(), Some("google"));
    }

    #[test]
    fn test_wrong_secret() {
        let token = create_token(&claims(None), SECRET).unwrap();
        let result = validate_token(&token, "another-secret-key-at-least-32-bytes", "authenticated");
        assert!(matches!(result, Err(JwtError::ValidationError(_))));
    }

    #[test]
    fn test_expired() {
        let claims = Claims::with_expiration(
            Uuid::new_v4(),
            None,
            None,
            "authenticated",
            Duration::hours(-1),
        );
        assert!(claims.is_expired());

        let token = create_token(&claims, SECRET).unwrap();
        let result = validate_token(&token, SECRET, "authenticated");
        assert!(matches!(result, Err(JwtError::Expired)));
    }

    #[test]
    fn test_wrong_audience() {
        let token = create_token(&claims(None), SECRET).unwrap();
        let result = validate_token(&token, SECRET, "service_role");
        assert!(matches!(result, Err(JwtError::InvalidAudience { .. })));
    }

    #[test]
    fn test_minimal_provider_token_parses() {
        // Provider tokens may omit email, role and app_metadata
        #[derive(Serialize)]
        struct Minimal {
            sub: Uuid,
            aud: String,
            iat: i64,
            exp: i64,
        }

        let now = Utc::now().timestamp();
        let token = encode(
            &Header::new(Algorithm::HS256),
            &Minimal {
                sub: Uuid::new_v4(),
                aud: "authenticated".to_string(),
                iat: now,
                exp: now + 600,
            },
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap();

        let claims = validate_token(&token, SECRET, "authenticated").unwrap();
        assert!(claims.email.is_none());
        assert!(claims.provider().is_none());
    }
}
