/// Configuration management for the API server
///
/// Loaded from environment variables, with a `.env` file honored in
/// development.
///
/// # Environment Variables
///
/// - `API_HOST`: Host to bind to (default: 0.0.0.0)
/// - `API_PORT`: Port to bind to (default: 8080)
/// - `CORS_ORIGINS`: Comma-separated allowed origins, or `*` (default: *)
/// - `PRODUCTION`: Enables HSTS (default: false)
/// - `DATABASE_URL`: PostgreSQL connection string (required)
/// - `DATABASE_MAX_CONNECTIONS`: Pool size (default: 10)
/// - `JWT_SECRET`: Identity provider signing secret (required, 32+ chars)
/// - `JWT_AUDIENCE`: Expected `aud` claim (default: authenticated)
/// - `CALENDAR_PROVIDER`: Sign-in provider that must carry a calendar token (default: google)
/// - `CALENDAR_EVENTS_URL`: Events collection URL (default: Google primary calendar)
/// - `CALENDAR_TIMEOUT_SECS`: Calendar request timeout (default: none)
/// - `DEFAULT_TIME_ZONE`: Zone used when a request has no `X-Time-Zone` (default: UTC)
/// - `DELETE_POLICY`: `proceed` or `block` (default: proceed)
/// - `LOG_FORMAT`: `json` for JSON logs (default: text)
///
/// # Example
///
/// ```no_run
/// use taskboard_api::config::Config;
///
/// # fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// println!("Server will listen on {}", config.bind_address());
/// # Ok(())
/// # }
/// ```

use std::env;
use std::str::FromStr;
use std::time::Duration;

use chrono_tz::Tz;
use taskboard_shared::auth::middleware::SessionConfig;
use taskboard_shared::calendar::google::GOOGLE_EVENTS_URL;
use taskboard_shared::db::pool::DatabaseConfig;
use taskboard_shared::sync::DeletePolicy;

/// Complete application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub api: ApiConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub calendar: CalendarConfig,
    pub delete_policy: DeletePolicy,
    pub log_format: LogFormat,
}

/// API server configuration
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,

    /// Allowed CORS origins; `["*"]` allows any
    pub cors_origins: Vec<String>,

    /// Production mode turns on HSTS
    pub production: bool,
}

/// Identity token settings
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Shared HS256 secret of the identity provider
    pub jwt_secret: String,
    pub audience: String,
    pub calendar_provider: String,
    pub default_time_zone: Tz,
}

/// Calendar API settings
#[derive(Debug, Clone)]
pub struct CalendarConfig {
    pub events_url: String,
    pub timeout: Option<Duration>,
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl Config {
    /// Loads configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if a required variable is missing or a value cannot
    /// be parsed.
    pub fn from_env() -> anyhow::Result<Self> {
        // Load .env file if present (for development)
        dotenvy::dotenv().ok();

        let host = env::var("API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = parse_var("API_PORT", 8080u16)?;
        let cors_origins = parse_origins(&env::var("CORS_ORIGINS").unwrap_or_else(|_| "*".to_string()));
        let production = parse_var("PRODUCTION", false)?;

        let database_url = env::var("DATABASE_URL")
            .map_err(|_| anyhow::anyhow!("DATABASE_URL environment variable is required"))?;
        let max_connections = parse_var("DATABASE_MAX_CONNECTIONS", 10u32)?;

        let jwt_secret = env::var("JWT_SECRET")
            .map_err(|_| anyhow::anyhow!("JWT_SECRET environment variable is required"))?;
        if jwt_secret.len() < 32 {
            anyhow::bail!("JWT_SECRET must be at least 32 characters long");
        }

        let default_time_zone = env::var("DEFAULT_TIME_ZONE")
            .unwrap_or_else(|_| "UTC".to_string())
            .parse::<Tz>()
            .map_err(|e| anyhow::anyhow!("DEFAULT_TIME_ZONE is not a valid time zone: {}", e))?;

        let timeout = match env::var("CALENDAR_TIMEOUT_SECS") {
            Ok(secs) if !secs.trim().is_empty() => Some(Duration::from_secs(secs.trim().parse()?)),
            _ => None,
        };

        let delete_policy = parse_var("DELETE_POLICY", DeletePolicy::Proceed)?;

        let log_format = match env::var("LOG_FORMAT").as_deref().map(str::trim) {
            Ok("json") => LogFormat::Json,
            _ => LogFormat::Text,
        };

        Ok(Self {
            api: ApiConfig {
                host,
                port,
                cors_origins,
                production,
            },
            database: DatabaseConfig {
                max_connections,
                ..DatabaseConfig::with_url(database_url)
            },
            auth: AuthConfig {
                jwt_secret,
                audience: env::var("JWT_AUDIENCE").unwrap_or_else(|_| "authenticated".to_string()),
                calendar_provider: env::var("CALENDAR_PROVIDER")
                    .unwrap_or_else(|_| "google".to_string()),
                default_time_zone,
            },
            calendar: CalendarConfig {
                events_url: env::var("CALENDAR_EVENTS_URL")
                    .unwrap_or_else(|_| GOOGLE_EVENTS_URL.to_string()),
                timeout,
            },
            delete_policy,
            log_format,
        })
    }

    /// Returns the server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }

    /// Settings handed to the session middleware
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            jwt_secret: self.auth.jwt_secret.clone(),
            audience: self.auth.audience.clone(),
            calendar_provider: self.auth.calendar_provider.clone(),
            default_time_zone: self.auth.default_time_zone,
        }
    }
}

fn parse_var<T>(name: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(value) if !value.trim().is_empty() => value
            .trim()
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("{} has an invalid value: {}", name, e)),
        _ => Ok(default),
    }
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> Config {
        Config {
            api: ApiConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
                cors_origins: vec!["*".to_string()],
                production: false,
            },
            database: DatabaseConfig::with_url("postgresql://localhost/test"),
            auth: AuthConfig {
                jwt_secret: "test-secret-key-at-least-32-bytes-long".to_string(),
                audience: "authenticated".to_string(),
                calendar_provider: "google".to_string(),
                default_time_zone: chrono_tz::UTC,
            },
            calendar: CalendarConfig {
                events_url: GOOGLE_EVENTS_URL.to_string(),
                timeout: None,
            },
            delete_policy: DeletePolicy::Proceed,
            log_format: LogFormat::Text,
        }
    }

    #[test]
    fn test_bind_address() {
        assert_eq!(test_config().bind_address(), "127.0.0.1:8080");
    }

    #[test]
    fn test_session_config() {
        let mut config = test_config();
        config.auth.default_time_zone = chrono_tz::Europe::Berlin;

        let session = config.session_config();
        assert_eq!(session.audience, "authenticated");
        assert_eq!(session.calendar_provider, "google");
        assert_eq!(session.default_time_zone, chrono_tz::Europe::Berlin);
    }

    #[test]
    fn test_parse_origins() {
        assert_eq!(
            parse_origins("http://localhost:3000, https://board.example.com,"),
            vec!["http://localhost:3000", "https://board.example.com"]
        );
        assert_eq!(parse_origins("*"), vec!["*"]);
        assert!(parse_origins("").is_empty());
    }
}
