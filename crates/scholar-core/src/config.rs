//! Lightweight configuration loader and path helpers.
//!
//! Uses Figment to merge `config.toml` + `config.<env>.toml` + `APP_*` env vars
//! (`__` separates nested keys, e.g. `APP_INDEX__HOST`). The environment name
//! comes from `RUST_ENV` and also decides the deployment [`Posture`].
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

use crate::error::Error;

pub const DEFAULT_INDEX_NAME: &str = "semantic-scholar-papers";
pub const DEFAULT_EMBEDDING_URL: &str = "https://model-apis.semanticscholar.org/specter/v1/invoke";
pub const MAX_EMBEDDING_BATCH: usize = 16;

/// Whether internal error detail may be shown to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Posture {
    Development,
    Production,
    Testing,
}

impl Posture {
    /// Only `dev`/`development` expose error detail; unknown names are
    /// treated as production.
    pub fn from_env_name(name: &str) -> Self {
        match name {
            "dev" | "development" => Self::Development,
            "test" | "testing" => Self::Testing,
            _ => Self::Production,
        }
    }

    pub fn is_development(self) -> bool { self == Self::Development }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexSettings {
    /// Base URL of the index, e.g. `https://search.example.org:9200`.
    pub host: String,
    pub index_name: String,
    pub vector_field: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub request_timeout_ms: u64,
    /// Transport-level retries for connection failures and timeouts.
    pub max_retries: u32,
    pub accept_invalid_certs: bool,
}

impl Default for IndexSettings {
    fn default() -> Self {
        Self {
            host: String::new(),
            index_name: DEFAULT_INDEX_NAME.to_string(),
            vector_field: "embedding".to_string(),
            username: None,
            password: None,
            request_timeout_ms: 1_800_000,
            max_retries: 2,
            accept_invalid_certs: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    pub url: String,
    pub batch_size: usize,
    pub timeout_ms: u64,
    /// Use the deterministic hashing embedder instead of the remote provider.
    pub use_fake: bool,
    pub fake_dim: usize,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            url: DEFAULT_EMBEDDING_URL.to_string(),
            batch_size: MAX_EMBEDDING_BATCH,
            timeout_ms: 60_000,
            use_fake: false,
            fake_dim: 768,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSettings {
    pub default_size: usize,
    pub max_size: usize,
    pub min_cosine: f32,
    pub candidate_pool: usize,
    pub max_attempts: u32,
    pub backoff_unit_ms: u64,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self { default_size: 100, max_size: 1000, min_cosine: 0.0, candidate_pool: 5000, max_attempts: 3, backoff_unit_ms: 2000 }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub index: IndexSettings,
    pub embedding: EmbeddingSettings,
    pub search: SearchSettings,
}

impl Settings {
    pub fn validate(&self) -> Result<(), Error> {
        if self.index.host.trim().is_empty() {
            return Err(Error::InvalidConfig("index.host is required".to_string()));
        }
        if !(1..=MAX_EMBEDDING_BATCH).contains(&self.embedding.batch_size) {
            return Err(Error::InvalidConfig(format!(
                "embedding.batch_size must be within 1..={MAX_EMBEDDING_BATCH}, got {}",
                self.embedding.batch_size
            )));
        }
        if self.search.max_size == 0 || self.search.default_size == 0 {
            return Err(Error::InvalidConfig("search sizes must be positive".to_string()));
        }
        if self.search.max_attempts == 0 {
            return Err(Error::InvalidConfig("search.max_attempts must be at least 1".to_string()));
        }
        Ok(())
    }
}

pub struct Config {
    figment: Figment,
    env_name: String,
}

impl Config {
    /// Load from the directory named by `APP_CONFIG_DIR` (default: cwd) using
    /// the `RUST_ENV` environment (default: `dev`).
    pub fn load() -> anyhow::Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());
        let dir = env::var("APP_CONFIG_DIR").map(expand_path).unwrap_or_else(|_| PathBuf::from("."));
        Self::load_from(&dir, &env_name)
    }

    pub fn load_from(dir: &Path, env_name: &str) -> anyhow::Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(Settings::default())).merge(Toml::file(dir.join("config.toml")));
        match env_name {
            "dev" | "development" => figment = figment.merge(Toml::file(dir.join("config.dev.toml"))),
            "prod" | "production" => figment = figment.merge(Toml::file(dir.join("config.prod.toml"))),
            "test" | "testing" => figment = figment.merge(Toml::file(dir.join("config.test.toml"))),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));
        Ok(Self { figment, env_name: env_name.to_string() })
    }

    pub fn get<T>(&self, key: &str) -> anyhow::Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| anyhow::anyhow!("Failed to get '{}': {}", key, e))
    }

    /// Typed, validated settings.
    pub fn settings(&self) -> anyhow::Result<Settings> {
        let settings: Settings = self.figment.extract().map_err(|e| anyhow::anyhow!("Failed to load settings: {}", e))?;
        settings.validate()?;
        self.validate_for_env(&settings)?;
        Ok(settings)
    }

    pub fn env_name(&self) -> &str { &self.env_name }

    pub fn posture(&self) -> Posture { Posture::from_env_name(&self.env_name) }

    fn validate_for_env(&self, settings: &Settings) -> anyhow::Result<()> {
        if self.posture() == Posture::Production && settings.embedding.use_fake {
            anyhow::bail!("fake embeddings are not allowed in production");
        }
        Ok(())
    }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    // Expand env vars first
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    // Expand ~ at start
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}
