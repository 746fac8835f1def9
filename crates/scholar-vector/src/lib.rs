//! scholar-vector
//!
//! Two-phase semantic search: approximate candidate recall from the index,
//! then an exact cosine rerank over the refetched stored vectors.

pub mod search;

pub use search::{EmbeddingSearcher, SearchOptions};
