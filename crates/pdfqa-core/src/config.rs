//! Layered configuration and path helpers.
//!
//! Uses Figment to merge `config.toml` + `config.<env>.toml` + `APP_*` env vars
//! (nested with `__`, e.g. `APP_SERVER__PORT`). `GEMINI_API_KEY` and
//! `DOCUMENT_STORE_PATH` are accepted as aliases for the two secrets.

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

use crate::chunker::Chunker;
use crate::error::{Error, Result};

pub struct Config {
    figment: Figment,
    env_name: String,
}

impl Config {
    pub fn load() -> Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());
        Ok(Self { figment: Self::layered(&env_name), env_name })
    }

    fn layered(env_name: &str) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Settings::default())).merge(Toml::file("config.toml"));
        match env_name {
            "dev" | "development" => figment = figment.merge(Toml::file("config.dev.toml")),
            "prod" | "production" => figment = figment.merge(Toml::file("config.prod.toml")),
            "test" | "testing" => figment = figment.merge(Toml::file("config.test.toml")),
            _ => {}
        }
        figment
            .merge(Env::raw().only(&["GEMINI_API_KEY"]).map(|_| "generation.api_key".into()))
            .merge(Env::raw().only(&["DOCUMENT_STORE_PATH"]).map(|_| "store.uri".into()))
            .merge(Env::prefixed("APP_").split("__"))
    }

    pub fn env_name(&self) -> &str { &self.env_name }

    /// Extract the full typed settings. Does not validate.
    pub fn settings(&self) -> Result<Settings> {
        self.figment.extract().map_err(|e| Error::InvalidConfig(e.to_string()))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub server: ServerSettings,
    pub chunking: ChunkingSettings,
    pub retrieval: RetrievalSettings,
    pub embedding: EmbeddingSettings,
    pub store: StoreSettings,
    pub generation: GenerationSettings,
    pub workers: WorkerSettings,
    pub ingest: IngestSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub cors_origins: Vec<String>,
    pub max_upload_bytes: usize,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            cors_origins: vec!["http://localhost:5173".to_string(), "http://localhost:3000".to_string()],
            max_upload_bytes: 25 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingSettings {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
}

impl Default for ChunkingSettings {
    fn default() -> Self { Self { chunk_size: 1000, chunk_overlap: 100 } }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalSettings {
    pub top_k: usize,
}

impl Default for RetrievalSettings {
    fn default() -> Self { Self { top_k: 4 } }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    pub model_dir: Option<String>,
    pub use_fake: bool,
    pub fake_dim: usize,
    pub max_len: usize,
    pub batch_size: usize,
}

impl Default for EmbeddingSettings {
    fn default() -> Self { Self { model_dir: None, use_fake: false, fake_dim: 384, max_len: 256, batch_size: 32 } }
}

impl EmbeddingSettings {
    /// `use_fake`, or `APP_USE_FAKE_EMBEDDINGS=1|true` in the environment.
    pub fn fake_requested(&self) -> bool {
        self.use_fake
            || env::var("APP_USE_FAKE_EMBEDDINGS")
                .ok()
                .is_some_and(|v| v == "1" || v.eq_ignore_ascii_case("true"))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    pub uri: Option<String>,
    pub table: String,
    pub delete_page_size: usize,
}

impl Default for StoreSettings {
    fn default() -> Self { Self { uri: None, table: "pdf_documents".to_string(), delete_page_size: 500 } }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationSettings {
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            model: "gemini-1.5-pro-latest".to_string(),
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            timeout_secs: 120,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerSettings {
    pub max_blocking: usize,
}

impl Default for WorkerSettings {
    fn default() -> Self { Self { max_blocking: 4 } }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestSettings {
    pub upload_dir: Option<String>,
}

impl Settings {
    /// Checks shared by every entry point: tunables must be usable.
    pub fn validate(&self) -> Result<()> {
        self.chunker()?;
        if self.retrieval.top_k == 0 {
            return Err(Error::InvalidConfig("retrieval.top_k must be greater than zero".to_string()));
        }
        if self.workers.max_blocking == 0 {
            return Err(Error::InvalidConfig("workers.max_blocking must be greater than zero".to_string()));
        }
        if self.store.delete_page_size == 0 {
            return Err(Error::InvalidConfig("store.delete_page_size must be greater than zero".to_string()));
        }
        if self.embedding.batch_size == 0 {
            return Err(Error::InvalidConfig("embedding.batch_size must be greater than zero".to_string()));
        }
        Ok(())
    }

    /// Stricter checks for the server: both secrets are mandatory.
    pub fn validate_for_server(&self) -> Result<()> {
        self.validate()?;
        self.store_uri()?;
        self.api_key()?;
        Ok(())
    }

    pub fn chunker(&self) -> Result<Chunker> {
        Chunker::new(self.chunking.chunk_size, self.chunking.chunk_overlap)
    }

    pub fn store_uri(&self) -> Result<PathBuf> {
        match self.store.uri.as_deref().map(str::trim) {
            Some(uri) if !uri.is_empty() => Ok(expand_path(uri)),
            _ => Err(Error::InvalidConfig("store.uri (or DOCUMENT_STORE_PATH) is required".to_string())),
        }
    }

    pub fn api_key(&self) -> Result<&str> {
        match self.generation.api_key.as_deref().map(str::trim) {
            Some(key) if !key.is_empty() => Ok(key),
            _ => Err(Error::InvalidConfig("Missing Gemini API Key (generation.api_key or GEMINI_API_KEY)".to_string())),
        }
    }

    pub fn upload_dir(&self) -> PathBuf {
        self.ingest.upload_dir.as_deref().map_or_else(env::temp_dir, expand_path)
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
