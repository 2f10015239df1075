use anyhow::Result;
use rig::client::embeddings::EmbeddingsClient;
use rig::client::{ProviderClient, ProviderValue};
use rig::embeddings::EmbeddingModel;
use rig::providers::gemini;

use crate::config::LlmConfig;
use crate::services::vector::ChunkIndex;

/// Build the Gemini client. The same key serves completions and embeddings.
pub fn gemini_client(api_key: &str) -> Result<gemini::Client<reqwest::Client>> {
    if api_key.is_empty() {
        anyhow::bail!("No Gemini API key configured. Set APP__LLM__API_KEY.");
    }

    let client: gemini::Client<reqwest::Client> =
        gemini::Client::from_val(ProviderValue::Simple(api_key.to_string()));
    Ok(client)
}

/// Embed every chunk and build a fresh index from the results.
///
/// The index dimension is taken from the first embedding the provider
/// returns; Gemini guarantees a fixed dimension per embedding model, so any
/// later mismatch is a provider fault and surfaces as an error.
pub async fn embed_chunks(config: &LlmConfig, chunks: &[String]) -> Result<ChunkIndex> {
    let client = gemini_client(&config.api_key)?;
    let model = client.embedding_model(&config.embedding_model);

    let mut index: Option<ChunkIndex> = None;

    for (i, chunk) in chunks.iter().enumerate() {
        let embedding = model
            .embed_text(chunk)
            .await
            .map_err(|e| anyhow::anyhow!("Embedding failed for chunk {i}: {e}"))?;

        // The index stores f32 vectors
        let vector: Vec<f32> = embedding.vec.iter().map(|&v| v as f32).collect();
        index
            .get_or_insert_with(|| ChunkIndex::new(vector.len()))
            .insert(vector, chunk.clone())?;
    }

    index.ok_or_else(|| anyhow::anyhow!("No chunks to embed"))
}

/// Embed a question for similarity search against a chunk index.
pub async fn embed_query(config: &LlmConfig, question: &str) -> Result<Vec<f32>> {
    let client = gemini_client(&config.api_key)?;
    let model = client.embedding_model(&config.embedding_model);

    let embedding = model
        .embed_text(question)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to embed question: {e}"))?;

    Ok(embedding.vec.iter().map(|&v| v as f32).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_requires_api_key() {
        assert!(gemini_client("").is_err());
        assert!(gemini_client("test-key").is_ok());
    }

    #[tokio::test]
    async fn test_embed_chunks_requires_api_key() {
        let config = LlmConfig {
            api_key: String::new(),
            model: "gemini-2.0-flash".to_string(),
            embedding_model: "text-embedding-004".to_string(),
            max_retries: 2,
            top_k: 4,
        };

        assert!(embed_chunks(&config, &["chunk".to_string()]).await.is_err());
        assert!(embed_query(&config, "question").await.is_err());
    }
}
