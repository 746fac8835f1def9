//! Batch-embed papers read from stdin as `[{"paper_id","title","abstract"}]`
//! and write the `{paper_id: embedding}` map to a JSON file.

use std::env;
use std::path::PathBuf;

use scholar_cli::{init_tracing, load_config, read_stdin};
use scholar_core::config::EmbeddingSettings;
use scholar_embed::{EmbeddingClient, HttpEmbeddingTransport, PaperInput};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let mut out = PathBuf::from("query_embedding.json");
    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--out" | "-o" => out = args.next().map(PathBuf::from).ok_or_else(|| anyhow::anyhow!("--out needs a path"))?,
            other => anyhow::bail!("unexpected argument: {}", other),
        }
    }

    // The index is not needed here, so a missing index.host is fine.
    let settings: EmbeddingSettings = load_config()?.get("embedding")?;
    let papers: Vec<PaperInput> = serde_json::from_str(&read_stdin()?)?;

    let client = EmbeddingClient::new(HttpEmbeddingTransport::new(&settings)?, settings.batch_size);
    let embeddings = client.embed_papers(&papers).await?;

    std::fs::write(&out, serde_json::to_string_pretty(&embeddings)?)?;
    tracing::info!(papers = papers.len(), embedded = embeddings.len(), path = %out.display(), "embeddings saved");
    Ok(())
}
