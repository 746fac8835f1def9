//! scholar-hybrid
//!
//! Single entry point over the two searchers. `SearchGateway::handle` is the
//! only place internal errors become an external response.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::{Duration, Instant};

use scholar_core::config::{Posture, SearchSettings, Settings};
use scholar_core::traits::Embedder;
use scholar_core::types::{Query, SearchMethod, SearchResult};
use scholar_core::{Error, Result};
use scholar_embed::get_default_embedder;
use scholar_index::OpenSearchClient;
use scholar_text::{KeywordSearcher, RetryPolicy};
use scholar_vector::{EmbeddingSearcher, SearchOptions};

/// Request as it arrives on the wire; every field may be missing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchRequest {
    pub query: Option<String>,
    pub method: Option<String>,
    pub size: Option<i64>,
}

impl SearchRequest {
    /// Read a request from loosely typed JSON. Wrong field types are
    /// validation failures, not decode failures. A `size` given as an
    /// integer string is accepted.
    pub fn from_value(value: &Value) -> Result<Self> {
        let Value::Object(fields) = value else {
            return Err(Error::Validation("Request body must be a JSON object".to_string()));
        };
        Ok(Self { query: text_field(fields, "query")?, method: text_field(fields, "method")?, size: size_field(fields)? })
    }
}

fn text_field(fields: &Map<String, Value>, name: &str) -> Result<Option<String>> {
    match fields.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(Error::Validation(format!("{name} must be a string"))),
    }
}

fn size_field(fields: &Map<String, Value>) -> Result<Option<i64>> {
    let invalid = || Error::Validation("size must be an integer".to_string());
    match fields.get("size") {
        None | Some(Value::Null) => Ok(None),
        // u64 beyond i64 saturates; it is clamped to max_size later anyway.
        Some(Value::Number(n)) => n.as_i64().or_else(|| n.as_u64().map(|_| i64::MAX)).map(Some).ok_or_else(invalid),
        Some(Value::String(s)) => s.trim().parse().map(Some).map_err(|_| invalid()),
        Some(_) => Err(invalid()),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub details: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ResponseBody {
    Success(SearchResult),
    Failure(ErrorBody),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResponse {
    pub status: u16,
    pub body: ResponseBody,
}

impl SearchResponse {
    pub fn is_success(&self) -> bool { self.status == 200 }
}

pub struct SearchGateway {
    embedder: Arc<dyn Embedder>,
    semantic: EmbeddingSearcher,
    keyword: KeywordSearcher,
    settings: SearchSettings,
    posture: Posture,
}

impl SearchGateway {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        semantic: EmbeddingSearcher,
        keyword: KeywordSearcher,
        settings: SearchSettings,
        posture: Posture,
    ) -> Self {
        Self { embedder, semantic, keyword, settings, posture }
    }

    /// Wire up the OpenSearch client and the configured embedder. The index
    /// client is shared by both searchers.
    pub fn connect(settings: &Settings, posture: Posture) -> Result<Self> {
        let index = Arc::new(OpenSearchClient::new(&settings.index)?);
        let embedder: Arc<dyn Embedder> = get_default_embedder(&settings.embedding, posture)?.into();
        let policy = RetryPolicy::new(settings.search.max_attempts, Duration::from_millis(settings.search.backoff_unit_ms));
        Ok(Self::new(
            embedder,
            EmbeddingSearcher::new(index.clone()),
            KeywordSearcher::new(index).with_policy(policy),
            settings.search.clone(),
            posture,
        ))
    }

    /// Validate a wire request into a `Query`, applying the default size and
    /// clamping into `1..=max_size`.
    pub fn parse_request(&self, request: &SearchRequest) -> Result<Query> {
        let text = request.query.as_deref().map(str::trim).filter(|q| !q.is_empty());
        let method = request.method.as_deref().map(str::trim).filter(|m| !m.is_empty());
        let (Some(text), Some(method)) = (text, method) else {
            return Err(Error::Validation("Query and method required".to_string()));
        };
        let method: SearchMethod = method.parse()?;
        let max = self.settings.max_size.max(1);
        let size = request
            .size
            .map_or(self.settings.default_size, |s| usize::try_from(s.max(1)).unwrap_or(max))
            .clamp(1, max);
        Query::new(text, method, size)
    }

    pub async fn run(&self, query: &Query) -> Result<SearchResult> {
        tracing::info!(method = %query.method, query = %query.text, size = query.size, "search");
        let start = Instant::now();
        let papers = match query.method {
            SearchMethod::Embedding => {
                let vector = self.embedder.embed(&query.text).await?;
                let options = SearchOptions {
                    top_k: query.size,
                    min_cosine: self.settings.min_cosine,
                    candidate_pool: self.settings.candidate_pool,
                };
                self.semantic.search(&vector, options).await?
            }
            SearchMethod::Keyword => self.keyword.search(&query.text, query.size).await?,
        };
        let took = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
        tracing::info!(found = papers.len(), took_ms = took, "search complete");
        Ok(SearchResult::new(papers, took))
    }

    /// Handle a raw JSON request body. Malformed JSON and mistyped fields
    /// are answered with 400 like any other invalid request.
    pub async fn handle_json(&self, raw: &str) -> SearchResponse {
        let request = serde_json::from_str::<Value>(raw)
            .map_err(|e| Error::Validation(format!("Malformed request body: {e}")))
            .and_then(|value| SearchRequest::from_value(&value));
        match request {
            Ok(request) => self.handle(request).await,
            Err(err) => self.reject(&err),
        }
    }

    pub async fn handle(&self, request: SearchRequest) -> SearchResponse {
        let query = match self.parse_request(&request) {
            Ok(q) => q,
            Err(err) => return self.reject(&err),
        };
        match self.run(&query).await {
            Ok(result) => SearchResponse { status: 200, body: ResponseBody::Success(result) },
            Err(err) => {
                tracing::error!(method = %query.method, query = %query.text, error = ?err, "search failed");
                self.failure(500, "Search failed", &err)
            }
        }
    }

    fn reject(&self, err: &Error) -> SearchResponse {
        tracing::warn!(error = %err, "rejected search request");
        let message = match err {
            Error::Validation(m) => m.as_str(),
            _ => "Invalid request",
        };
        self.failure(400, message, err)
    }

    fn failure(&self, status: u16, message: &str, err: &Error) -> SearchResponse {
        let stack = self.posture.is_development().then(|| error_trace(err));
        SearchResponse {
            status,
            body: ResponseBody::Failure(ErrorBody { error: message.to_string(), details: err.to_string(), stack }),
        }
    }
}

fn error_trace(err: &Error) -> String {
    let mut trace = format!("{err:?}");
    let mut source = std::error::Error::source(err);
    while let Some(cause) = source {
        trace.push_str(&format!("\ncaused by: {cause}"));
        source = cause.source();
    }
    trace
}
