use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::middleware::session::SessionId;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct UnlockRequest {
    pub password: String,
}

#[derive(Serialize)]
pub struct SessionStatusResponse {
    pub unlocked: bool,
    pub index_ready: bool,
    pub chunks: usize,
    pub questions_asked: usize,
}

fn status_of(state: &AppState, id: SessionId) -> SessionStatusResponse {
    state
        .sessions
        .with_session(id.0, |session| SessionStatusResponse {
            unlocked: session.unlocked,
            index_ready: session.index.is_some(),
            chunks: session.index.as_ref().map(|i| i.len()).unwrap_or(0),
            questions_asked: session.history.len(),
        })
        .unwrap_or(SessionStatusResponse {
            unlocked: false,
            index_ready: false,
            chunks: 0,
            questions_asked: 0,
        })
}

/// Readable while locked; the UI polls this to decide which screen to show.
pub async fn status(
    State(state): State<AppState>,
    session_id: SessionId,
) -> Json<SessionStatusResponse> {
    Json(status_of(&state, session_id))
}

/// A mismatch leaves the session locked and retryable.
pub async fn unlock(
    State(state): State<AppState>,
    session_id: SessionId,
    Json(payload): Json<UnlockRequest>,
) -> Result<Json<SessionStatusResponse>, AppError> {
    let accepted = state
        .sessions
        .with_session(session_id.0, |session| {
            session.unlock(&payload.password, &state.config.auth.password)
        })
        .unwrap_or(false);

    if !accepted {
        return Err(AppError::WrongPassword);
    }

    Ok(Json(status_of(&state, session_id)))
}
