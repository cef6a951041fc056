/// Application state and router builder
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use taskboard_api::{app::AppState, config::Config};
/// use taskboard_shared::calendar::google::GoogleCalendarClient;
/// use taskboard_shared::db::pool::create_pool;
/// use taskboard_shared::store::postgres::PgTaskStore;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let pool = create_pool(config.database.clone()).await?;
/// let calendar = GoogleCalendarClient::with_events_url(&config.calendar.events_url, config.calendar.timeout)?;
/// let state = AppState::new(Arc::new(PgTaskStore::new(pool)), Arc::new(calendar), config);
/// let app = taskboard_api::app::build_router(state);
/// # Ok(())
/// # }
/// ```

use crate::{config::Config, middleware::security::SecurityHeadersLayer};
use axum::{
    http::{header, HeaderName, HeaderValue, Method},
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use taskboard_shared::auth::middleware::{
    session_middleware, SessionConfig, PROVIDER_TOKEN_HEADER, TIME_ZONE_HEADER,
};
use taskboard_shared::calendar::CalendarApi;
use taskboard_shared::store::TaskStore;
use taskboard_shared::sync::SyncCoordinator;
use tokio_util::sync::CancellationToken;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Shared application state
///
/// Cloned for each request via Axum's `State` extractor; every field is
/// reference counted.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn TaskStore>,

    /// Calendar-aware task writes
    pub sync: SyncCoordinator,

    /// Token and header settings for the session middleware
    pub session: Arc<SessionConfig>,

    pub config: Arc<Config>,

    /// Cancelled on shutdown; ends open event streams
    pub shutdown: CancellationToken,
}

impl AppState {
    pub fn new(store: Arc<dyn TaskStore>, calendar: Arc<dyn CalendarApi>, config: Config) -> Self {
        let sync = SyncCoordinator::new(store.clone(), calendar, config.delete_policy);
        Self {
            store,
            sync,
            session: Arc::new(config.session_config()),
            config: Arc::new(config),
            shutdown: CancellationToken::new(),
        }
    }

    pub fn with_shutdown(mut self, shutdown: CancellationToken) -> Self {
        self.shutdown = shutdown;
        self
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// # Architecture
///
/// ```text
/// /
/// ├── GET /health                     # Health check (public)
/// └── /v1/                            # Session required
///     ├── GET    /session
///     ├── GET    /tasks?date=
///     ├── POST   /tasks
///     ├── GET    /tasks/stream?date=  # SSE
///     ├── PUT    /tasks/:id
///     ├── DELETE /tasks/:id
///     ├── POST   /tasks/:id/duplicate
///     └── POST   /tasks/:id/complete
/// ```
///
/// # Middleware Stack
///
/// Applied in order (bottom to top):
/// 1. Security headers
/// 2. CORS (tower-http CorsLayer)
/// 3. Logging (tower-http TraceLayer)
/// 4. Session resolution (`/v1` only)
pub fn build_router(state: AppState) -> Router {
    use crate::routes;

    let health_routes = Router::new().route("/health", get(routes::health::health_check));

    let v1_routes = Router::new()
        .route("/session", get(routes::session::current_session))
        .route(
            "/tasks",
            get(routes::tasks::list_tasks).post(routes::tasks::create_task),
        )
        .route("/tasks/stream", get(routes::stream::stream_tasks))
        .route(
            "/tasks/:id",
            axum::routing::put(routes::tasks::update_task).delete(routes::tasks::delete_task),
        )
        .route("/tasks/:id/duplicate", post(routes::tasks::duplicate_task))
        .route("/tasks/:id/complete", post(routes::tasks::complete_task))
        .layer(axum::middleware::from_fn_with_state(
            state.session.clone(),
            session_middleware,
        ));

    let cors = cors_layer(&state.config.api.cors_origins);

    Router::new()
        .merge(health_routes)
        .nest("/v1", v1_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors)
        .layer(SecurityHeadersLayer::new(state.config.api.production))
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|origin| origin == "*") {
        // Development mode: permissive CORS
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            HeaderName::from_static(PROVIDER_TOKEN_HEADER),
            HeaderName::from_static(TIME_ZONE_HEADER),
        ])
        .allow_credentials(true)
        .max_age(std::time::Duration::from_secs(3600))
}
