use std::sync::Arc;

use scholar_core::traits::LexicalIndex;
use scholar_core::types::{FieldBoost, LexicalQuery, ScoredCandidate};
use scholar_core::Result;

use crate::retry::{retry, RetryPolicy, Sleeper, TokioSleeper};

const TITLE_BOOST: f32 = 5.0;
const ABSTRACT_BOOST: f32 = 2.0;
const VENUE_BOOST: f32 = 1.0;
const TITLE_PHRASE_BOOST: f32 = 10.0;

/// Fuzzy match over title/abstract/venue, or an exact title phrase ranked
/// above any field-level match.
pub fn compound_query(keywords: &str, size: usize) -> LexicalQuery {
    LexicalQuery {
        text: keywords.to_string(),
        fields: vec![
            FieldBoost { field: "title", boost: TITLE_BOOST },
            FieldBoost { field: "abstract", boost: ABSTRACT_BOOST },
            FieldBoost { field: "venue", boost: VENUE_BOOST },
        ],
        phrase_field: "title",
        phrase_boost: TITLE_PHRASE_BOOST,
        size,
    }
}

pub struct KeywordSearcher {
    index: Arc<dyn LexicalIndex>,
    policy: RetryPolicy,
    sleeper: Arc<dyn Sleeper>,
}

impl KeywordSearcher {
    pub fn new(index: Arc<dyn LexicalIndex>) -> Self {
        Self { index, policy: RetryPolicy::default(), sleeper: Arc::new(TokioSleeper) }
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// Hits in backend relevance order, retried while the index is busy.
    pub async fn search(&self, keywords: &str, size: usize) -> Result<Vec<ScoredCandidate>> {
        let query = compound_query(keywords, size);
        let (query, index) = (&query, &self.index);
        let hits = retry(&self.policy, self.sleeper.as_ref(), move |attempt| async move {
            tracing::debug!(attempt, "keyword search attempt");
            index.search_lexical(query).await
        })
        .await?;
        tracing::debug!(hits = hits.len(), "keyword search complete");
        Ok(hits)
    }
}
