//! Domain types shared by the keyword and embedding searchers.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

pub type PaperId = String;
pub type EmbeddingVector = Vec<f32>;

/// Which searcher a query is routed to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SearchMethod {
    Embedding,
    Keyword,
}

impl FromStr for SearchMethod {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "embedding" => Ok(Self::Embedding),
            "keyword" => Ok(Self::Keyword),
            other => Err(Error::Validation(format!("unknown search method '{other}'"))),
        }
    }
}

impl fmt::Display for SearchMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Embedding => f.write_str("embedding"),
            Self::Keyword => f.write_str("keyword"),
        }
    }
}

/// A validated search request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    pub text: String,
    pub method: SearchMethod,
    pub size: usize,
}

impl Query {
    /// Build a query; `text` must contain something other than whitespace and
    /// `size` must be positive.
    pub fn new(text: impl Into<String>, method: SearchMethod, size: usize) -> Result<Self> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(Error::Validation("query text must not be empty".to_string()));
        }
        if size == 0 {
            return Err(Error::Validation("size must be positive".to_string()));
        }
        Ok(Self { text, method, size })
    }
}

/// A paper as stored in the index.
///
/// `id` is the index document identifier. `embedding` is read from the index
/// for reranking and never written back out to callers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaperRecord {
    #[serde(default, alias = "corpusid", deserialize_with = "de::id_string")]
    pub id: PaperId,
    #[serde(default, deserialize_with = "de::nullable_string")]
    pub title: String,
    #[serde(default, deserialize_with = "de::authors")]
    pub authors: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub venue: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    #[serde(default, alias = "citationcount", skip_serializing_if = "Option::is_none")]
    pub citation_count: Option<u64>,
    #[serde(default, rename = "abstract", skip_serializing_if = "Option::is_none")]
    pub abstract_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing)]
    pub embedding: Option<EmbeddingVector>,
}

/// Relevance attached to a paper. Serialized under the key the producing
/// searcher uses: `_cosine_score` or `_score`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum Score {
    #[serde(rename = "_cosine_score")]
    Cosine(f32),
    #[serde(rename = "_score")]
    Lexical(f32),
}

impl Score {
    pub fn value(self) -> f32 {
        match self {
            Self::Cosine(v) | Self::Lexical(v) => v,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredCandidate {
    #[serde(flatten)]
    pub paper: PaperRecord,
    #[serde(flatten)]
    pub score: Score,
}

impl ScoredCandidate {
    pub fn score(&self) -> f32 { self.score.value() }
}

/// Ranked output of one search call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResult {
    pub papers: Vec<ScoredCandidate>,
    pub total: usize,
    /// Wall-clock milliseconds spent in the searcher.
    pub took: u64,
}

impl SearchResult {
    pub fn new(papers: Vec<ScoredCandidate>, took: u64) -> Self {
        let total = papers.len();
        Self { papers, total, took }
    }
}

/// ANN request: `k` approximate neighbours of an already-normalized vector.
#[derive(Debug, Clone, PartialEq)]
pub struct KnnQuery {
    pub vector: EmbeddingVector,
    pub k: usize,
}

/// Field name plus boost for a multi-field match.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldBoost {
    pub field: &'static str,
    pub boost: f32,
}

/// Compound lexical query: a fuzzy multi-field match OR an exact phrase on a
/// single field, at least one of which must match.
#[derive(Debug, Clone, PartialEq)]
pub struct LexicalQuery {
    pub text: String,
    pub fields: Vec<FieldBoost>,
    pub phrase_field: &'static str,
    pub phrase_boost: f32,
    pub size: usize,
}

mod de {
    use super::{Deserialize, Deserializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Text(String),
        Number(u64),
    }

    pub fn nullable_string<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
        Ok(Option::<String>::deserialize(d)?.unwrap_or_default())
    }

    pub fn id_string<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
        Ok(match Option::<Id>::deserialize(d)? {
            Some(Id::Text(s)) => s,
            Some(Id::Number(n)) => n.to_string(),
            None => String::new(),
        })
    }

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Author {
        Name(String),
        Object { name: String },
    }

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Authors {
        Joined(String),
        List(Vec<Author>),
    }

    /// Accepts `"A, B"`, `["A", "B"]` or `[{"name": "A"}, ...]`.
    pub fn authors<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
        Ok(match Option::<Authors>::deserialize(d)? {
            Some(Authors::Joined(s)) => s,
            Some(Authors::List(list)) => list
                .into_iter()
                .map(|a| match a {
                    Author::Name(n) | Author::Object { name: n } => n,
                })
                .collect::<Vec<_>>()
                .join(", "),
            None => String::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn method_parses_case_insensitively() {
        assert_eq!("Embedding".parse::<SearchMethod>().unwrap(), SearchMethod::Embedding);
        assert_eq!("keyword".parse::<SearchMethod>().unwrap(), SearchMethod::Keyword);
        assert!("fuzzy".parse::<SearchMethod>().unwrap_err().is_validation());
    }

    #[test]
    fn query_rejects_blank_text_and_zero_size() {
        assert!(Query::new("   ", SearchMethod::Keyword, 10).is_err());
        assert!(Query::new("graphs", SearchMethod::Keyword, 0).is_err());
        assert!(Query::new("graphs", SearchMethod::Keyword, 1).is_ok());
    }

    #[test]
    fn paper_accepts_author_shapes() {
        let joined: PaperRecord = serde_json::from_value(json!({"title": "t", "authors": "A, B"})).unwrap();
        let list: PaperRecord = serde_json::from_value(json!({"title": "t", "authors": ["A", "B"]})).unwrap();
        let objects: PaperRecord =
            serde_json::from_value(json!({"title": "t", "authors": [{"name": "A"}, {"name": "B"}]})).unwrap();
        assert_eq!(joined.authors, "A, B");
        assert_eq!(list.authors, "A, B");
        assert_eq!(objects.authors, "A, B");
    }

    #[test]
    fn paper_reads_numeric_corpus_id_and_lowercase_citations() {
        let p: PaperRecord = serde_json::from_value(json!({
            "corpusid": 12345, "title": "t", "citationcount": 7, "abstract": "abs", "year": 2020
        }))
        .unwrap();
        assert_eq!(p.id, "12345");
        assert_eq!(p.citation_count, Some(7));
        assert_eq!(p.abstract_text.as_deref(), Some("abs"));
    }

    #[test]
    fn paper_tolerates_null_fields() {
        let p: PaperRecord = serde_json::from_value(json!({
            "corpusid": null, "title": null, "authors": null, "venue": null, "year": null, "abstract": null
        }))
        .unwrap();
        assert_eq!(p.title, "");
        assert_eq!(p.authors, "");
        assert!(p.venue.is_none() && p.year.is_none());
    }

    #[test]
    fn scored_candidate_serializes_flat_without_embedding() {
        let paper = PaperRecord {
            id: "p1".into(),
            title: "Attention".into(),
            embedding: Some(vec![1.0, 0.0]),
            ..PaperRecord::default()
        };
        let c = ScoredCandidate { paper, score: Score::Cosine(0.5) };
        let v = serde_json::to_value(&c).unwrap();
        assert_eq!(v["id"], "p1");
        assert_eq!(v["_cosine_score"], 0.5);
        assert!(v.get("embedding").is_none());
        assert!(v.get("_score").is_none());

        let lexical = ScoredCandidate { paper: PaperRecord::default(), score: Score::Lexical(8.0) };
        assert_eq!(serde_json::to_value(&lexical).unwrap()["_score"], 8.0);
    }
}
