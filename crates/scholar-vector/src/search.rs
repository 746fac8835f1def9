use std::sync::Arc;

use scholar_core::traits::VectorIndex;
use scholar_core::types::{KnnQuery, Score, ScoredCandidate};
use scholar_core::vector_math::{cosine, normalize};
use scholar_core::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchOptions {
    pub top_k: usize,
    /// Candidates scoring below this cosine are dropped.
    pub min_cosine: f32,
    /// Number of ANN neighbours fetched before reranking.
    pub candidate_pool: usize,
}

impl Default for SearchOptions {
    fn default() -> Self { Self { top_k: 10, min_cosine: 0.0, candidate_pool: 5000 } }
}

pub struct EmbeddingSearcher {
    index: Arc<dyn VectorIndex>,
}

impl EmbeddingSearcher {
    pub fn new(index: Arc<dyn VectorIndex>) -> Self { Self { index } }

    /// Top `top_k` papers by exact cosine to `vector`, best first.
    ///
    /// Phase 1 asks the index for `candidate_pool` approximate neighbours
    /// (ids only). Phase 2 refetches those documents with their stored
    /// vectors in one multi-get and scores them exactly. Documents without a
    /// stored vector, or with a different dimensionality, are skipped.
    ///
    /// Ordering is a stable sort on score, so equal scores keep the order the
    /// index returned them in (ANN rank).
    pub async fn search(&self, vector: &[f32], options: SearchOptions) -> Result<Vec<ScoredCandidate>> {
        if vector.is_empty() {
            return Err(Error::Validation("Invalid embedding provided".to_string()));
        }
        if options.candidate_pool == 0 || options.top_k == 0 {
            return Ok(Vec::new());
        }

        let query = normalize(vector);
        let ids = self.index.knn_ids(&KnnQuery { vector: query.clone(), k: options.candidate_pool }).await?;
        if ids.is_empty() {
            tracing::debug!("no ANN candidates");
            return Ok(Vec::new());
        }

        let docs = self.index.multi_get(&ids).await?;
        let fetched = docs.len();
        let mut scored: Vec<ScoredCandidate> = docs
            .into_iter()
            .filter_map(|mut paper| {
                let stored = paper.embedding.take()?;
                if stored.len() != query.len() {
                    tracing::warn!(id = %paper.id, dim = stored.len(), expected = query.len(), "skipping candidate with mismatched dimension");
                    return None;
                }
                let score = cosine(&query, &normalize(&stored));
                Some(ScoredCandidate { paper, score: Score::Cosine(score) })
            })
            .filter(|c| c.score() >= options.min_cosine)
            .collect();

        scored.sort_by(|a, b| b.score().partial_cmp(&a.score()).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(options.top_k);
        tracing::debug!(candidates = ids.len(), fetched, kept = scored.len(), "reranked");
        Ok(scored)
    }
}
