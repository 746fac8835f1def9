//! scholar-embed
//!
//! Query embedding through the remote SPECTER provider (`client`) and a
//! deterministic hashing embedder for offline development (`fake`).

pub mod client;
pub mod fake;

pub use client::{EmbeddingClient, EmbeddingTransport, HttpEmbeddingTransport, PaperInput, Prediction, QUERY_ID};
pub use fake::FakeEmbedder;

use scholar_core::config::{EmbeddingSettings, Posture};
use scholar_core::traits::Embedder;
use scholar_core::{Error, Result};

/// The remote provider client, or the hashing embedder when
/// `embedding.use_fake` is set (`APP_EMBEDDING__USE_FAKE=true`). The hashing
/// embedder is refused under the production posture.
pub fn get_default_embedder(settings: &EmbeddingSettings, posture: Posture) -> Result<Box<dyn Embedder>> {
    if settings.use_fake {
        if posture == Posture::Production {
            return Err(Error::InvalidConfig("fake embeddings are not allowed in production".to_string()));
        }
        tracing::info!(dim = settings.fake_dim, "using FakeEmbedder");
        return Ok(Box::new(FakeEmbedder::new(settings.fake_dim)));
    }
    let transport = HttpEmbeddingTransport::new(settings)?;
    Ok(Box::new(EmbeddingClient::new(transport, settings.batch_size)))
}
