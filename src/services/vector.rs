use anyhow::{anyhow, Result};

/// A chunk returned from a similarity lookup, best match first.
#[derive(Debug, Clone)]
pub struct ScoredChunk {
    pub score: f32,
    pub content: String,
}

/// In-memory nearest-neighbor index over a session's chunks.
///
/// Holds `(embedding, chunk text)` pairs of one fixed dimension and answers
/// top-k queries with an exact cosine scan. Rebuilt wholesale whenever the
/// session processes a new upload; there is no incremental update or deletion.
#[derive(Debug)]
pub struct ChunkIndex {
    dimension: usize,
    entries: Vec<(Vec<f32>, String)>,
}

impl ChunkIndex {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            entries: Vec::new(),
        }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Add a chunk and its embedding. The index takes ownership of the chunk
    /// text; vectors must match the index dimension and be finite.
    pub fn insert(&mut self, vector: Vec<f32>, content: String) -> Result<()> {
        if vector.len() != self.dimension {
            return Err(anyhow!(
                "Invalid vector dimensions: expected {}, got {}",
                self.dimension,
                vector.len()
            ));
        }
        if vector.iter().any(|v| !v.is_finite()) {
            return Err(anyhow!("Invalid vector values: contains NaN or Infinity"));
        }

        self.entries.push((vector, content));
        Ok(())
    }

    /// Return the `top_k` most similar chunks, sorted by score descending.
    pub fn search(&self, query: &[f32], top_k: usize) -> Result<Vec<ScoredChunk>> {
        if query.len() != self.dimension {
            return Err(anyhow!(
                "Invalid query dimensions: expected {}, got {}",
                self.dimension,
                query.len()
            ));
        }

        let mut results: Vec<ScoredChunk> = self
            .entries
            .iter()
            .map(|(vector, content)| ScoredChunk {
                score: cosine_similarity(query, vector),
                content: content.clone(),
            })
            .collect();

        results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        results.truncate(top_k);

        Ok(results)
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let mag_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let mag_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if mag_a == 0.0 || mag_b == 0.0 {
        0.0
    } else {
        dot / (mag_a * mag_b)
    }
}
