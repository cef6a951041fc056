/// Session endpoint
///
/// `GET /v1/session` reports who the caller is and whether a calendar token
/// came with the request. An invalid session never reaches this handler:
/// the middleware answers 401 `session_invalid` and the client signs out.

use axum::{Extension, Json};
use taskboard_shared::auth::session::{Session, SessionInfo};

pub async fn current_session(Extension(session): Extension<Session>) -> Json<SessionInfo> {
    Json(session.info())
}
