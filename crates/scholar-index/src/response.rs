//! Typed views of index responses. Raw JSON never leaves this module.

use serde::Deserialize;
use serde_json::{Map, Value};

use scholar_core::types::{PaperId, PaperRecord, Score, ScoredCandidate};
use scholar_core::{Error, Result};

#[derive(Debug, Deserialize)]
pub struct SearchResponse {
    pub hits: Hits,
}

#[derive(Debug, Default, Deserialize)]
pub struct Hits {
    #[serde(default)]
    pub hits: Vec<Hit>,
}

#[derive(Debug, Deserialize)]
pub struct Hit {
    #[serde(rename = "_id", default)]
    pub id: Option<String>,
    #[serde(rename = "_score", default)]
    pub score: Option<f32>,
    #[serde(rename = "_source", default)]
    pub source: Option<Map<String, Value>>,
}

#[derive(Debug, Deserialize)]
pub struct MgetResponse {
    #[serde(default)]
    pub docs: Vec<MgetDoc>,
}

#[derive(Debug, Deserialize)]
pub struct MgetDoc {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub found: bool,
    #[serde(rename = "_source", default)]
    pub source: Option<Map<String, Value>>,
}

/// Build a record from `_id` and `_source`, taking the vector from
/// `vector_field`. The index id always wins over any id in the source.
pub fn paper_from_source(id: &str, mut source: Map<String, Value>, vector_field: &str) -> Result<PaperRecord> {
    let vector = source.remove(vector_field);
    let mut paper: PaperRecord =
        serde_json::from_value(Value::Object(source)).map_err(|e| Error::Decode(format!("document {id}: {e}")))?;
    paper.id = id.to_string();
    paper.embedding = match vector {
        None | Some(Value::Null) => None,
        Some(v) => Some(serde_json::from_value(v).map_err(|e| Error::Decode(format!("document {id} vector: {e}")))?),
    };
    Ok(paper)
}

pub fn hit_ids(response: SearchResponse) -> Vec<PaperId> {
    response.hits.hits.into_iter().filter_map(|h| h.id.filter(|id| !id.is_empty())).collect()
}

/// A document that cannot be decoded is logged and skipped; it never fails
/// the rest of the response.
fn decoded(result: Result<PaperRecord>) -> Option<PaperRecord> {
    result.map_err(|e| tracing::warn!(error = %e, "skipping undecodable document")).ok()
}

pub fn lexical_candidates(response: SearchResponse, vector_field: &str) -> Vec<ScoredCandidate> {
    response
        .hits
        .hits
        .into_iter()
        .filter_map(|h| Some((h.id?, h.score.unwrap_or(0.0), h.source.unwrap_or_default())))
        .filter_map(|(id, score, source)| {
            let paper = decoded(paper_from_source(&id, source, vector_field))?;
            Some(ScoredCandidate { paper, score: Score::Lexical(score) })
        })
        .collect()
}

pub fn found_papers(response: MgetResponse, vector_field: &str) -> Vec<PaperRecord> {
    response
        .docs
        .into_iter()
        .filter(|d| d.found)
        .filter_map(|d| d.source.map(|s| (d.id, s)))
        .filter_map(|(id, source)| decoded(paper_from_source(&id, source, vector_field)))
        .collect()
}
