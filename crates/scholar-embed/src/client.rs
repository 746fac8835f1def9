//! SPECTER embedding client.
//!
//! The provider accepts at most 16 papers per request. Larger inputs are
//! partitioned, the chunk requests run concurrently, and the responses are
//! merged by `paper_id` because the provider does not promise to echo
//! papers in request order.

use async_trait::async_trait;
use futures::future::try_join_all;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

use scholar_core::batch::{partition, reassemble};
use scholar_core::config::EmbeddingSettings;
use scholar_core::traits::Embedder;
use scholar_core::types::EmbeddingVector;
use scholar_core::{Error, Result};

/// Correlation id used for the single paper built from a query string.
pub const QUERY_ID: &str = "QUERY";

const SERVICE: &str = "SPECTER API";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaperInput {
    pub paper_id: String,
    pub title: String,
    #[serde(rename = "abstract", default)]
    pub abstract_text: String,
}

impl PaperInput {
    pub fn query(text: &str) -> Self {
        Self { paper_id: QUERY_ID.to_string(), title: text.to_string(), abstract_text: String::new() }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    #[serde(alias = "id")]
    pub paper_id: String,
    pub embedding: EmbeddingVector,
}

#[derive(Debug, Deserialize)]
struct ProviderResponse {
    #[serde(alias = "predictions")]
    preds: Vec<Prediction>,
}

/// One round trip to the provider for a single batch.
#[async_trait]
pub trait EmbeddingTransport: Send + Sync {
    async fn post_batch(&self, batch: &[PaperInput]) -> Result<Vec<Prediction>>;
}

#[async_trait]
impl<T: EmbeddingTransport + ?Sized> EmbeddingTransport for std::sync::Arc<T> {
    async fn post_batch(&self, batch: &[PaperInput]) -> Result<Vec<Prediction>> { (**self).post_batch(batch).await }
}

pub struct HttpEmbeddingTransport {
    client: reqwest::Client,
    url: String,
}

impl HttpEmbeddingTransport {
    pub fn new(settings: &EmbeddingSettings) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(settings.timeout_ms))
            .build()
            .map_err(|e| Error::InvalidConfig(format!("embedding http client: {e}")))?;
        Ok(Self::with_client(client, &settings.url))
    }

    pub fn with_client(client: reqwest::Client, url: &str) -> Self { Self { client, url: url.to_string() } }
}

#[async_trait]
impl EmbeddingTransport for HttpEmbeddingTransport {
    async fn post_batch(&self, batch: &[PaperInput]) -> Result<Vec<Prediction>> {
        let response = self
            .client
            .post(&self.url)
            .json(batch)
            .send()
            .await
            .map_err(|e| Error::Transport(format!("{SERVICE}: {e}")))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Upstream { service: SERVICE, status: status.as_u16(), body });
        }
        let parsed: ProviderResponse =
            response.json().await.map_err(|e| Error::Decode(format!("{SERVICE} response: {e}")))?;
        Ok(parsed.preds)
    }
}

pub struct EmbeddingClient<T = HttpEmbeddingTransport> {
    transport: T,
    batch_size: usize,
}

impl<T: EmbeddingTransport> EmbeddingClient<T> {
    pub fn new(transport: T, batch_size: usize) -> Self { Self { transport, batch_size: batch_size.max(1) } }

    /// Embed every paper. Any failed batch fails the whole call.
    pub async fn embed_papers(&self, papers: &[PaperInput]) -> Result<HashMap<String, EmbeddingVector>> {
        let requests = partition(papers, self.batch_size).map(|chunk| self.transport.post_batch(chunk));
        let responses = try_join_all(requests).await?;
        tracing::debug!(papers = papers.len(), batches = responses.len(), "embedded batches");
        Ok(reassemble(
            responses.into_iter().map(|preds| preds.into_iter().map(|p| (p.paper_id, p.embedding))),
        ))
    }

    pub async fn embed_text(&self, text: &str) -> Result<EmbeddingVector> {
        let mut by_id = self.embed_papers(&[PaperInput::query(text)]).await?;
        by_id.remove(QUERY_ID).ok_or_else(|| Error::Upstream {
            service: SERVICE,
            status: 200,
            body: format!("response has no embedding for {QUERY_ID}"),
        })
    }
}

#[async_trait]
impl<T: EmbeddingTransport> Embedder for EmbeddingClient<T> {
    async fn embed(&self, text: &str) -> Result<EmbeddingVector> { self.embed_text(text).await }
}
