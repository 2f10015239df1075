use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::middleware::session::SessionId;
use crate::routes::require_unlocked;
use crate::services::answer::{self, MISSING_INDEX_MESSAGE};
use crate::session::ChatEntry;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct AskRequest {
    pub question: String,
}

#[derive(Debug, Serialize)]
pub struct AskResponse {
    pub answer: String,
    pub history: Vec<ChatEntry>,
}

#[derive(Serialize)]
pub struct TranscriptResponse {
    pub history: Vec<ChatEntry>,
}

/// Without a built index the fixed guidance message comes back and history is
/// left untouched. A successful answer appends exactly one entry. The response
/// carries the whole transcript so the UI can render every turn.
pub async fn ask(
    State(state): State<AppState>,
    session_id: SessionId,
    Json(payload): Json<AskRequest>,
) -> Result<Json<AskResponse>, AppError> {
    require_unlocked(&state, session_id)?;

    let question = payload.question.trim().to_string();
    if question.is_empty() {
        return Err(AppError::Validation("Question cannot be empty".to_string()));
    }

    // Clone what the answerer needs; the session lock is never held across
    // an await.
    let (index, history) = state
        .sessions
        .with_session(session_id.0, |session| {
            (session.index.clone(), session.history.clone())
        })
        .ok_or(AppError::Locked)?;

    let Some(index) = index else {
        return Ok(Json(AskResponse {
            answer: MISSING_INDEX_MESSAGE.to_string(),
            history,
        }));
    };

    let answer = answer::answer(&state.config.llm, &index, &history, &question).await?;

    let history = state
        .sessions
        .with_session(session_id.0, |session| {
            session.push_entry(question.clone(), answer.clone());
            session.history.clone()
        })
        .ok_or_else(|| {
            AppError::Internal(anyhow::anyhow!("Session disappeared while answering"))
        })?;

    Ok(Json(AskResponse { answer, history }))
}

/// The session's transcript, oldest first.
pub async fn transcript(
    State(state): State<AppState>,
    session_id: SessionId,
) -> Result<Json<TranscriptResponse>, AppError> {
    require_unlocked(&state, session_id)?;

    let history = state
        .sessions
        .with_session(session_id.0, |session| session.history.clone())
        .unwrap_or_default();

    Ok(Json(TranscriptResponse { history }))
}
