//! Configuration loader, typed engine/provider settings and path helpers.
//!
//! Uses Figment to merge `config.toml` + `config.<env>.toml` + `APP_*` env vars.
//! Nested keys in the environment are separated by `__`
//! (`APP_ENGINE__CHUNK_SIZE=400`).

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

pub struct Config {
    figment: Figment,
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(Path::new("."))
    }

    /// Loads the layered configuration with config files looked up in `dir`.
    pub fn load_from(dir: &Path) -> Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());

        let mut figment = Figment::new()
            .merge(Serialized::default("engine", EngineConfig::default()))
            .merge(Serialized::default("provider", ProviderConfig::default()))
            .merge(Toml::file(dir.join("config.toml")));
        match env_name.as_str() {
            "dev" | "development" => figment = figment.merge(Toml::file(dir.join("config.dev.toml"))),
            "prod" | "production" => figment = figment.merge(Toml::file(dir.join("config.prod.toml"))),
            "test" | "testing" => figment = figment.merge(Toml::file(dir.join("config.test.toml"))),
            other => tracing::warn!(env = other, "unknown RUST_ENV, only config.toml is used"),
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));

        Ok(Self { figment })
    }

    pub fn from_figment(figment: Figment) -> Self {
        Self { figment }
    }

    pub fn get<T>(&self, key: &str) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| Error::Configuration(format!("failed to get '{}': {}", key, e)))
    }

    /// The validated `engine` section.
    pub fn engine(&self) -> Result<EngineConfig> {
        let engine: EngineConfig = self.get("engine")?;
        engine.validate()?;
        Ok(engine)
    }

    pub fn provider(&self) -> Result<ProviderConfig> {
        let provider: ProviderConfig = self.get("provider")?;
        provider.validate()?;
        Ok(provider)
    }

    /// `data.document`, expanded. `None` when the key is absent.
    pub fn document_path(&self) -> Option<PathBuf> {
        self.get::<String>("data.document").ok().map(expand_path)
    }
}

/// Stopword list applied by the lexical analyzer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StopwordPolicy {
    #[default]
    None,
    Spanish,
    English,
}

/// Settings consumed by the retrieval engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Words per chunk.
    pub chunk_size: usize,
    /// Words shared by consecutive chunks; must stay below `chunk_size`.
    pub chunk_overlap: usize,
    pub top_k: usize,
    /// Keep only the N most frequent terms; `None` keeps every term.
    pub vocabulary_cap: Option<usize>,
    /// 1 for unigrams, 2 for unigrams + bigrams.
    pub ngram_max: usize,
    pub stopwords: StopwordPolicy,
    /// Number of key concepts taken from the top chunk.
    pub key_terms: usize,
    /// Length of the excerpt used when no sentence matches a key concept.
    pub fallback_prefix_chars: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            chunk_size: 300,
            chunk_overlap: 50,
            top_k: 3,
            vocabulary_cap: None,
            ngram_max: 2,
            stopwords: StopwordPolicy::None,
            key_terms: 5,
            fallback_prefix_chars: 300,
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<()> {
        validate_chunking(self.chunk_size, self.chunk_overlap)?;
        if self.top_k == 0 {
            return Err(Error::Configuration("top_k must be at least 1".into()));
        }
        if self.vocabulary_cap == Some(0) {
            return Err(Error::Configuration("vocabulary_cap must be at least 1 when set".into()));
        }
        if !(1..=2).contains(&self.ngram_max) {
            return Err(Error::Configuration(format!("ngram_max must be 1 or 2, got {}", self.ngram_max)));
        }
        if self.key_terms == 0 {
            return Err(Error::Configuration("key_terms must be at least 1".into()));
        }
        if self.fallback_prefix_chars == 0 {
            return Err(Error::Configuration("fallback_prefix_chars must be at least 1".into()));
        }
        Ok(())
    }
}

pub fn validate_chunking(size: usize, overlap: usize) -> Result<()> {
    if size == 0 {
        return Err(Error::Configuration("chunk_size must be greater than 0".into()));
    }
    if overlap >= size {
        return Err(Error::Configuration(format!(
            "chunk_overlap ({}) must be smaller than chunk_size ({})",
            overlap, size
        )));
    }
    Ok(())
}

/// Settings for the OpenAI-compatible embedding/generation collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub base_url: String,
    pub embedding_model: String,
    /// Vector size of `embedding_model`; `None` uses the known model table or
    /// the first response.
    pub embedding_dim: Option<usize>,
    pub chat_model: String,
    /// Name of the environment variable holding the API credential.
    pub api_key_env: String,
    pub timeout_secs: u64,
    pub batch_size: usize,
    pub temperature: f32,
    pub answer_language: String,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com".to_string(),
            embedding_model: "text-embedding-3-small".to_string(),
            embedding_dim: None,
            chat_model: "gpt-4o-mini".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            timeout_secs: 30,
            batch_size: 64,
            temperature: 0.1,
            answer_language: "Spanish".to_string(),
        }
    }
}

impl ProviderConfig {
    pub fn validate(&self) -> Result<()> {
        if self.timeout_secs == 0 {
            return Err(Error::Configuration("provider.timeout_secs must be at least 1".into()));
        }
        if self.batch_size == 0 {
            return Err(Error::Configuration("provider.batch_size must be at least 1".into()));
        }
        if self.embedding_dim == Some(0) {
            return Err(Error::Configuration("provider.embedding_dim must be at least 1".into()));
        }
        Ok(())
    }

    /// Reads the credential from `api_key_env`. The token is opaque to the engine.
    pub fn api_key(&self) -> Option<String> {
        env::var(&self.api_key_env).ok().filter(|k| !k.trim().is_empty())
    }
}

/// `${VAR}`/`$VAR` and a leading `~` expanded; unknown variables are left as written.
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let raw = input.as_ref();
    let with_env = shellexpand::env(raw).unwrap_or(std::borrow::Cow::Borrowed(raw));
    PathBuf::from(shellexpand::tilde(&with_env).as_ref())
}
