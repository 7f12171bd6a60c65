pub mod gemini;
pub mod types;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use gemini::{GeminiProvider, ModelInfo, DEFAULT_GEMINI_MODEL, GEMINI_API_BASE};
pub use types::*;

/// Boundary to a hosted generative-language service.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn generate(&self, request: ChatRequest) -> Result<String, ChatError>;
    async fn health(&self) -> Result<(), ChatError> {
        Ok(())
    }
}

// ============================================================
// Provider Configuration
// ============================================================

/// Provider type identifier.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProviderType {
    #[default]
    Gemini,
    /// Offline echo backend, no network access
    Stub,
}

fn default_model() -> String {
    DEFAULT_GEMINI_MODEL.to_string()
}

fn default_timeout_secs() -> u64 {
    120
}

/// Configuration for the chat backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(rename = "type", default)]
    pub provider_type: ProviderType,
    #[serde(default)]
    pub api_key: Option<String>,
    /// Custom base URL (defaults to the public Gemini endpoint)
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub max_output_tokens: Option<u32>,
    #[serde(default)]
    pub temperature: Option<f32>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self::new(ProviderType::Gemini)
    }
}

impl ProviderConfig {
    pub fn new(provider_type: ProviderType) -> Self {
        Self {
            provider_type,
            api_key: None,
            base_url: None,
            model: default_model(),
            timeout_secs: default_timeout_secs(),
            max_output_tokens: None,
            temperature: None,
        }
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// API key with empty strings (e.g. an unset `${VAR}`) treated as absent.
    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref().filter(|k| !k.trim().is_empty())
    }
}

/// Build the Gemini client described by `config`, regardless of its type.
pub fn gemini_from_config(config: &ProviderConfig) -> Result<GeminiProvider> {
    let key = config
        .api_key()
        .ok_or_else(|| anyhow!("gemini requires api_key"))?;
    let mut gemini = GeminiProvider::new(key)
        .with_model(config.model.clone())
        .with_timeout(Duration::from_secs(config.timeout_secs))
        .with_max_output_tokens(config.max_output_tokens)
        .with_temperature(config.temperature);
    if let Some(base_url) = &config.base_url {
        gemini = gemini.with_base_url(base_url.clone());
    }
    Ok(gemini)
}

/// Create a backend from configuration.
pub fn create_provider(config: &ProviderConfig) -> Result<Arc<dyn ChatBackend>> {
    let provider: Arc<dyn ChatBackend> = match config.provider_type {
        ProviderType::Gemini => Arc::new(gemini_from_config(config)?),
        ProviderType::Stub => Arc::new(StubProvider),
    };
    tracing::info!(
        provider = ?config.provider_type,
        model = %config.model,
        "chat backend ready"
    );
    Ok(provider)
}

/// Offline backend that echoes the head entry of the request.
pub struct StubProvider;

#[async_trait]
impl ChatBackend for StubProvider {
    async fn generate(&self, request: ChatRequest) -> Result<String, ChatError> {
        let head = request.head().map(|m| m.text()).unwrap_or_default();
        Ok(format!(
            "[stub:{} messages] {}",
            request.messages.len(),
            head
        ))
    }
}
