//! OpenAI-compatible embedding and chat-completion clients.
//!
//! Every failure (missing credential, transport error, timeout, non-2xx
//! status, malformed body) becomes `Error::Dependency`. Nothing is retried.

use std::sync::OnceLock;
use std::time::Duration;

use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};

use agrorag_core::config::ProviderConfig;
use agrorag_core::error::{Error, Result};
use agrorag_core::traits::{Embedder, Generator};

struct ApiClient {
    http: Client,
    base_url: String,
    api_key: String,
}

impl ApiClient {
    fn new(base_url: &str, api_key: String, timeout: Duration) -> Result<Self> {
        if api_key.trim().is_empty() {
            return Err(Error::dependency("credentials", "API key is empty"));
        }
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::dependency("http client", e))?;
        Ok(Self { http, base_url: base_url.trim_end_matches('/').to_string(), api_key })
    }

    fn from_config(cfg: &ProviderConfig) -> Result<Self> {
        let api_key = cfg.api_key().ok_or_else(|| {
            Error::dependency("credentials", format!("environment variable {} is not set", cfg.api_key_env))
        })?;
        Self::new(&cfg.base_url, api_key, Duration::from_secs(cfg.timeout_secs))
    }

    fn post<B, R>(&self, path: &str, context: &str, body: &B) -> Result<R>
    where
        B: Serialize,
        R: for<'de> Deserialize<'de>,
    {
        let url = format!("{}{}", self.base_url, path);
        let resp = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .map_err(|e| Error::dependency(context, e))?;
        let status = resp.status();
        if !status.is_success() {
            let detail = resp.text().unwrap_or_default();
            return Err(Error::dependency(context, format!("HTTP {}: {}", status, detail.trim())));
        }
        resp.json::<R>().map_err(|e| Error::dependency(context, e))
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    index: usize,
    embedding: Vec<f32>,
}

/// Vector size of the well-known OpenAI embedding models.
fn known_dim(model: &str) -> Option<usize> {
    match model {
        "text-embedding-3-large" => Some(3072),
        "text-embedding-3-small" | "text-embedding-ada-002" => Some(1536),
        _ => None,
    }
}

/// Embedder for `/v1/embeddings`. The vector size comes from
/// `provider.embedding_dim`, the known model table, or else the first response;
/// every later vector must match it.
pub struct OpenAiEmbedder {
    client: ApiClient,
    model: String,
    dim: OnceLock<usize>,
    id: String,
}

impl OpenAiEmbedder {
    pub fn new(base_url: &str, api_key: String, model: &str, timeout: Duration) -> Result<Self> {
        let client = ApiClient::new(base_url, api_key, timeout)?;
        Ok(Self::with_client(client, model))
    }

    pub fn from_config(cfg: &ProviderConfig) -> Result<Self> {
        let embedder = Self::with_client(ApiClient::from_config(cfg)?, &cfg.embedding_model);
        Ok(match cfg.embedding_dim {
            Some(dim) => embedder.with_dim(dim),
            None => embedder,
        })
    }

    /// Fixes the expected vector size instead of relying on the model table.
    pub fn with_dim(mut self, dim: usize) -> Self {
        self.dim = OnceLock::from(dim);
        self
    }

    fn with_client(client: ApiClient, model: &str) -> Self {
        let dim = known_dim(model).map(OnceLock::from).unwrap_or_default();
        Self { client, model: model.to_string(), dim, id: format!("openai:{}", model) }
    }
}

impl Embedder for OpenAiEmbedder {
    fn embedder_id(&self) -> &str {
        &self.id
    }

    /// 0 for an unknown model until the first response has been seen.
    fn dim(&self) -> usize {
        self.dim.get().copied().unwrap_or(0)
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let body = EmbeddingRequest { model: &self.model, input: texts };
        let mut resp: EmbeddingResponse = self.client.post("/v1/embeddings", "embeddings", &body)?;
        if resp.data.len() != texts.len() {
            return Err(Error::dependency(
                "embeddings",
                format!("expected {} vectors, got {}", texts.len(), resp.data.len()),
            ));
        }
        resp.data.sort_by_key(|d| d.index);
        let first_len = resp.data.first().map_or(0, |d| d.embedding.len());
        let expected = *self.dim.get_or_init(|| {
            tracing::info!(model = %self.model, dim = first_len, "embedding size taken from response");
            first_len
        });
        if let Some(bad) = resp.data.iter().find(|d| d.embedding.len() != expected) {
            return Err(Error::dependency(
                "embeddings",
                format!("dim mismatch: got {} expected {}", bad.embedding.len(), expected),
            ));
        }
        Ok(resp.data.into_iter().map(|d| d.embedding).collect())
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    messages: [ChatMessage<'a>; 1],
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: Option<String>,
}

pub struct OpenAiGenerator {
    client: ApiClient,
    model: String,
    temperature: f32,
}

impl OpenAiGenerator {
    pub fn new(base_url: &str, api_key: String, model: &str, temperature: f32, timeout: Duration) -> Result<Self> {
        let client = ApiClient::new(base_url, api_key, timeout)?;
        Ok(Self { client, model: model.to_string(), temperature })
    }

    pub fn from_config(cfg: &ProviderConfig) -> Result<Self> {
        Ok(Self {
            client: ApiClient::from_config(cfg)?,
            model: cfg.chat_model.clone(),
            temperature: cfg.temperature,
        })
    }
}

impl Generator for OpenAiGenerator {
    fn generate(&self, prompt: &str) -> Result<String> {
        let body = ChatRequest {
            model: &self.model,
            temperature: self.temperature,
            messages: [ChatMessage { role: "user", content: prompt }],
        };
        let resp: ChatResponse = self.client.post("/v1/chat/completions", "chat completion", &body)?;
        let text = resp
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();
        tracing::debug!(model = %self.model, chars = text.len(), "generation received");
        Ok(text)
    }
}
