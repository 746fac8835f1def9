//! Shared setup for the `scholar` binaries.

use std::io::Read;

use scholar_core::config::Config;
use scholar_hybrid::SearchRequest;

/// Log to stderr so stdout stays clean JSON. `RUST_LOG` overrides `info`.
pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

pub fn load_config() -> anyhow::Result<Config> {
    Config::load().map_err(|e| {
        tracing::error!(error = %e, "failed to load config");
        e
    })
}

/// Build a request from `query <text> [--method m] [--size n]` arguments.
pub fn request_from_args(args: &[String]) -> anyhow::Result<SearchRequest> {
    let mut request = SearchRequest { method: Some("embedding".to_string()), ..SearchRequest::default() };
    let mut words = Vec::new();
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--method" | "-m" => request.method = iter.next().cloned(),
            "--size" | "-n" => {
                let raw = iter.next().ok_or_else(|| anyhow::anyhow!("--size needs a value"))?;
                request.size = Some(raw.parse().map_err(|e| anyhow::anyhow!("invalid --size '{}': {}", raw, e))?);
            }
            _ => words.push(arg.clone()),
        }
    }
    if !words.is_empty() {
        request.query = Some(words.join(" "));
    }
    Ok(request)
}

pub fn read_stdin() -> anyhow::Result<String> {
    let mut input = String::new();
    std::io::stdin().read_to_string(&mut input)?;
    Ok(input)
}
