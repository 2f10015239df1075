use anyhow::{Context, Result};

/// MIME types accepted for upload. `application/octet-stream` is the generic
/// fallback some browsers send; those are admitted by extension instead.
pub const SUPPORTED_MIME_TYPES: &[&str] = &["application/pdf", "application/octet-stream"];

/// One uploaded file, as read off the multipart stream.
pub struct UploadedPdf {
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// Check whether an uploaded part looks like a PDF, by MIME type or extension.
pub fn is_pdf(content_type: &str, filename: &str) -> bool {
    if content_type == "application/pdf" {
        return true;
    }
    if !SUPPORTED_MIME_TYPES.contains(&content_type) {
        return false;
    }
    extension_from_filename(filename)
        .map(|ext| ext == "pdf")
        .unwrap_or(false)
}

/// Extract and concatenate the text of every file, in upload order.
///
/// A corrupt or encrypted PDF fails the whole batch; the error names the
/// offending file.
pub async fn extract_all(files: &[UploadedPdf]) -> Result<String> {
    let mut text = String::new();
    for file in files {
        let extracted = extract_text(&file.bytes, &file.filename)
            .await
            .with_context(|| format!("Could not extract text from '{}'", file.filename))?;
        text.push_str(&extracted);
    }
    Ok(text)
}

/// Extract the text of one PDF.
///
/// PDF parsing is CPU-bound, so it runs on the blocking thread pool via
/// `spawn_blocking` rather than stalling the async runtime.
pub async fn extract_text(bytes: &[u8], filename: &str) -> Result<String> {
    let bytes = bytes.to_vec();
    let fname = filename.to_string();

    tracing::info!(
        "extract_text: starting extraction for '{fname}' ({} bytes)",
        bytes.len()
    );

    let handle = tokio::task::spawn_blocking(move || {
        let result = extract_pdf(&bytes);
        match &result {
            Ok(text) => {
                tracing::info!("extract_text: '{fname}' succeeded, {} chars", text.len())
            }
            Err(e) => tracing::error!("extract_text: '{fname}' failed: {e:#}"),
        }
        result
    });

    // Time out after 120 seconds to avoid hanging forever on problematic files
    match tokio::time::timeout(std::time::Duration::from_secs(120), handle).await {
        Ok(join_result) => join_result.context("Text extraction task panicked")?,
        Err(_) => anyhow::bail!("Text extraction timed out after 120s for '{filename}'"),
    }
}

fn extract_pdf(bytes: &[u8]) -> Result<String> {
    // Try pdftotext (poppler) first — much faster and handles complex PDFs better
    match extract_pdf_pdftotext(bytes) {
        Ok(text) if !text.trim().is_empty() => {
            tracing::info!("PDF extracted via pdftotext ({} chars)", text.len());
            return Ok(text);
        }
        Ok(_) => tracing::warn!("pdftotext returned empty text, falling back to pdf_extract"),
        Err(e) => tracing::warn!("pdftotext failed ({e:#}), falling back to pdf_extract"),
    }

    // Fallback to pure-Rust pdf_extract
    tracing::info!("Extracting PDF via pdf_extract (this may be slow for large files)");
    pdf_extract::extract_text_from_mem(bytes).context("Failed to extract text from PDF")
}

fn extract_pdf_pdftotext(bytes: &[u8]) -> Result<String> {
    use std::io::Write;
    use std::process::Command;

    // Write bytes to a temp file (pdftotext reads from file)
    let mut tmp = tempfile::NamedTempFile::new().context("Failed to create temp file")?;
    tmp.write_all(bytes).context("Failed to write PDF to temp file")?;
    tmp.flush()?;

    let output = Command::new("pdftotext")
        .arg("-layout")
        .arg(tmp.path())
        .arg("-") // output to stdout
        .output()
        .context("Failed to run pdftotext — is poppler-utils installed?")?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        anyhow::bail!("pdftotext exited with {}: {stderr}", output.status);
    }

    String::from_utf8(output.stdout).context("pdftotext output is not valid UTF-8")
}

fn extension_from_filename(filename: &str) -> Option<String> {
    filename.rsplit('.').next().map(|e| e.to_lowercase())
}
