use axum::{
    extract::{FromRequestParts, Request, State},
    http::{request::Parts, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use uuid::Uuid;

use crate::state::AppState;

/// Cookie carrying the session id. A browser-session cookie: no Max-Age, so
/// closing the browser ends the session from the client's point of view.
pub const SESSION_COOKIE: &str = "docchat_session";

/// The caller's session id, inserted by [`session_middleware`].
#[derive(Debug, Clone, Copy)]
pub struct SessionId(pub Uuid);

impl<S: Send + Sync> FromRequestParts<S> for SessionId {
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        // Absent only if the route was wired without the middleware
        parts
            .extensions
            .get::<SessionId>()
            .copied()
            .ok_or(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

/// Resolve the caller's session from the cookie, creating one when the cookie
/// is missing, malformed, or points at an expired session. Fresh sessions get
/// a Set-Cookie on the way out.
pub async fn session_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Response {
    // Idle sessions are collected lazily, on whichever request comes next
    state.sessions.prune_expired();

    let jar = CookieJar::from_headers(req.headers());
    let existing = jar
        .get(SESSION_COOKIE)
        .and_then(|c| Uuid::parse_str(c.value()).ok())
        .filter(|id| state.sessions.contains(*id));

    let (id, fresh) = match existing {
        Some(id) => (id, false),
        None => (state.sessions.create(), true),
    };

    req.extensions_mut().insert(SessionId(id));

    let response = next.run(req).await;

    if fresh {
        tracing::debug!("Started session {id}");
        let cookie = Cookie::build((SESSION_COOKIE, id.to_string()))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .build();
        (jar.add(cookie), response).into_response()
    } else {
        response
    }
}
