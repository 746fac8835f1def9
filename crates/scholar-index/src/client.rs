use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;

use scholar_core::config::IndexSettings;
use scholar_core::traits::{LexicalIndex, VectorIndex};
use scholar_core::types::{KnnQuery, LexicalQuery, PaperId, PaperRecord, ScoredCandidate};
use scholar_core::{Error, Result};

use crate::dsl::{knn_body, lexical_body, mget_body};
use crate::response::{found_papers, hit_ids, lexical_candidates, MgetResponse, SearchResponse};

const SERVICE: &str = "OpenSearch";
const TRANSPORT_RETRY_DELAY: Duration = Duration::from_millis(250);

/// Shared, stateless-per-call client for one index. Build once at startup
/// and hand out behind an `Arc`.
pub struct OpenSearchClient {
    http: reqwest::Client,
    base_url: String,
    index: String,
    vector_field: String,
    username: Option<String>,
    password: Option<String>,
    max_retries: u32,
}

impl OpenSearchClient {
    pub fn new(settings: &IndexSettings) -> Result<Self> {
        if settings.host.trim().is_empty() {
            return Err(Error::InvalidConfig("index.host is required".to_string()));
        }
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(settings.request_timeout_ms))
            .danger_accept_invalid_certs(settings.accept_invalid_certs)
            .build()
            .map_err(|e| Error::InvalidConfig(format!("index http client: {e}")))?;
        let base_url = if settings.host.contains("://") {
            settings.host.trim_end_matches('/').to_string()
        } else {
            format!("https://{}", settings.host.trim_end_matches('/'))
        };
        Ok(Self {
            http,
            base_url,
            index: settings.index_name.clone(),
            vector_field: settings.vector_field.clone(),
            username: settings.username.clone(),
            password: settings.password.clone(),
            max_retries: settings.max_retries,
        })
    }

    pub fn base_url(&self) -> &str { &self.base_url }

    fn endpoint(&self, action: &str) -> String { format!("{}/{}/{}", self.base_url, self.index, action) }

    /// POST a JSON body. Connection failures, dropped connections and
    /// timeouts are retried up to `max_retries` times; HTTP error statuses
    /// are not.
    async fn post<T: DeserializeOwned>(&self, action: &str, body: &Value) -> Result<T> {
        let url = self.endpoint(action);
        let mut attempt = 0u32;
        let response = loop {
            let mut request = self.http.post(&url).json(body);
            if let Some(user) = &self.username {
                request = request.basic_auth(user, self.password.as_ref());
            }
            match request.send().await {
                Ok(response) => break response,
                Err(e) if is_transient(&e) && attempt < self.max_retries => {
                    attempt += 1;
                    tracing::warn!(%url, attempt, error = %e, "index transport error, retrying");
                    tokio::time::sleep(TRANSPORT_RETRY_DELAY).await;
                }
                Err(e) => return Err(Error::Transport(format!("{SERVICE} {action}: {e}"))),
            }
        };

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            if status == reqwest::StatusCode::SERVICE_UNAVAILABLE {
                return Err(Error::Busy { status: status.as_u16(), body });
            }
            return Err(Error::Upstream { service: SERVICE, status: status.as_u16(), body });
        }
        response.json::<T>().await.map_err(|e| Error::Decode(format!("{SERVICE} {action}: {e}")))
    }
}

fn is_transient(e: &reqwest::Error) -> bool { e.is_connect() || e.is_timeout() || e.is_request() }

#[async_trait]
impl VectorIndex for OpenSearchClient {
    async fn knn_ids(&self, query: &KnnQuery) -> Result<Vec<PaperId>> {
        let response: SearchResponse = self.post("_search", &knn_body(query, &self.vector_field)).await?;
        Ok(hit_ids(response))
    }

    async fn multi_get(&self, ids: &[PaperId]) -> Result<Vec<PaperRecord>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let response: MgetResponse = self.post("_mget", &mget_body(ids)).await?;
        Ok(found_papers(response, &self.vector_field))
    }
}

#[async_trait]
impl LexicalIndex for OpenSearchClient {
    async fn search_lexical(&self, query: &LexicalQuery) -> Result<Vec<ScoredCandidate>> {
        let response: SearchResponse = self.post("_search", &lexical_body(query, &self.vector_field)).await?;
        Ok(lexical_candidates(response, &self.vector_field))
    }
}
