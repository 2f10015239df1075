pub mod auth;
pub mod chat;
pub mod documents;
pub mod health;

use crate::errors::AppError;
use crate::middleware::session::SessionId;
use crate::state::AppState;

/// Reject callers whose session has not passed the password gate.
pub(crate) fn require_unlocked(state: &AppState, id: SessionId) -> Result<(), AppError> {
    let unlocked = state
        .sessions
        .with_session(id.0, |session| session.unlocked)
        .unwrap_or(false);

    if unlocked {
        Ok(())
    } else {
        Err(AppError::Locked)
    }
}
