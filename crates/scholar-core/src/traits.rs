use async_trait::async_trait;

use crate::error::Result;
use crate::types::{EmbeddingVector, KnnQuery, LexicalQuery, PaperId, PaperRecord, ScoredCandidate};

/// Maps query text to a dense vector.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<EmbeddingVector>;
}

/// ANN retrieval plus bulk point lookup against the document index.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Identifiers of the approximate nearest neighbours, best first.
    async fn knn_ids(&self, query: &KnnQuery) -> Result<Vec<PaperId>>;
    /// Full stored records, vectors included. Unknown ids are omitted.
    async fn multi_get(&self, ids: &[PaperId]) -> Result<Vec<PaperRecord>>;
}

/// Full-text retrieval against the document index.
#[async_trait]
pub trait LexicalIndex: Send + Sync {
    /// Hits ordered by backend relevance, each carrying a `Score::Lexical`.
    async fn search_lexical(&self, query: &LexicalQuery) -> Result<Vec<ScoredCandidate>>;
}
