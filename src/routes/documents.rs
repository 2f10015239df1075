use axum::{
    extract::{Multipart, State},
    Json,
};
use serde::Serialize;

use crate::errors::AppError;
use crate::middleware::session::SessionId;
use crate::routes::require_unlocked;
use crate::services::{chunker, extract, llm};
use crate::state::AppState;

/// Hard cap per uploaded file.
pub const MAX_FILE_SIZE: usize = 50 * 1024 * 1024; // 50 MB

/// Request body cap, applied at the router: room for a multi-file upload
/// plus multipart framing.
pub const MAX_UPLOAD_BYTES: usize = 200 * 1024 * 1024; // 200 MB

#[derive(Debug, Serialize)]
pub struct ProcessResponse {
    pub documents: usize,
    pub characters: usize,
    pub chunks: usize,
}

/// Extract, chunk and embed the uploaded PDFs in upload order, then install
/// the resulting index in the session. Replaces any index built earlier;
/// history is untouched.
pub async fn process(
    State(state): State<AppState>,
    session_id: SessionId,
    mut multipart: Multipart,
) -> Result<Json<ProcessResponse>, AppError> {
    require_unlocked(&state, session_id)?;

    let mut files: Vec<extract::UploadedPdf> = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Invalid multipart data: {e}")))?
    {
        let filename = field.file_name().unwrap_or("unnamed.pdf").to_string();
        let content_type = field
            .content_type()
            .unwrap_or("application/pdf")
            .to_string();

        if !extract::is_pdf(&content_type, &filename) {
            return Err(AppError::Validation(format!(
                "Only PDF files are supported, got '{filename}'"
            )));
        }

        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::Validation(format!("Failed to read '{filename}': {e}")))?;

        if data.len() > MAX_FILE_SIZE {
            return Err(AppError::Validation(format!(
                "File too large. Maximum size is {} MB",
                MAX_FILE_SIZE / 1024 / 1024
            )));
        }

        files.push(extract::UploadedPdf {
            filename,
            bytes: data.to_vec(),
        });
    }

    if files.is_empty() {
        return Err(AppError::Validation("No files provided".to_string()));
    }

    // Parse failures are server-side faults: the filename-tagged cause goes
    // to the log, the client gets the redacted 500.
    let text = extract::extract_all(&files).await?;

    if text.trim().is_empty() {
        return Err(AppError::Validation(
            "No text could be extracted from the uploaded files".to_string(),
        ));
    }

    let characters = text.chars().count();
    let chunks = chunker::chunk_text(&text, chunker::CHUNK_SIZE, chunker::CHUNK_OVERLAP);
    let index = llm::embed_chunks(&state.config.llm, &chunks).await?;

    tracing::info!(
        "Processed {} file(s): {characters} chars into {} chunk(s), index dimension {}",
        files.len(),
        chunks.len(),
        index.dimension()
    );

    let response = ProcessResponse {
        documents: files.len(),
        characters,
        chunks: chunks.len(),
    };

    state
        .sessions
        .with_session(session_id.0, |session| session.install_index(index))
        .ok_or_else(|| {
            AppError::Internal(anyhow::anyhow!("Session disappeared during processing"))
        })?;

    Ok(Json(response))
}
