use std::{fs, path::Path};

use anyhow::{anyhow, Context, Result};
use neurochat_provider::{ProviderConfig, ProviderType};
use neurochat_schema::PredictionLabel;
use serde::{Deserialize, Serialize};

use crate::context::HistoryReplay;

pub const CONFIG_FILE_NAME: &str = "neurochat.yaml";

fn default_app_name() -> String {
    "neurochat".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_app_name")]
    pub name: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            name: default_app_name(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ConversationConfig {
    #[serde(default)]
    pub history_replay: HistoryReplay,
}

fn default_classifier_label() -> PredictionLabel {
    PredictionLabel::VeryMildDemented
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierConfig {
    /// Label reported for every upload
    #[serde(default = "default_classifier_label")]
    pub label: PredictionLabel,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            label: default_classifier_label(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct NeurochatConfig {
    #[serde(default)]
    pub app: AppConfig,
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub conversation: ConversationConfig,
    #[serde(default)]
    pub classifier: ClassifierConfig,
}

/// Replaces every `${VAR}` with the value of the environment variable.
/// Unset variables become empty strings.
pub fn resolve_env_var(raw: &str) -> String {
    let mut output = String::new();
    let mut rest = raw;

    while let Some(start) = rest.find("${") {
        output.push_str(&rest[..start]);

        let candidate = &rest[start + 2..];
        let Some(end) = candidate.find('}') else {
            output.push_str(&rest[start..]);
            return output;
        };

        let key = &candidate[..end];
        output.push_str(&std::env::var(key).unwrap_or_default());
        rest = &candidate[end + 1..];
    }

    output.push_str(rest);
    output
}

pub fn load_config(path: &Path) -> Result<NeurochatConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read config file: {}", path.display()))?;
    let mut config = parse_config(&content)
        .with_context(|| format!("failed to parse yaml file: {}", path.display()))?;

    resolve_config_env(&mut config);
    validate_config(&config)?;
    Ok(config)
}

/// Loads `path` if it exists, otherwise falls back to defaults with the
/// api key taken from `GOOGLE_API_KEY`.
pub fn load_config_or_default(path: &Path) -> Result<NeurochatConfig> {
    if path.exists() {
        return load_config(path);
    }
    tracing::info!(path = %path.display(), "config file not found, using defaults");
    let mut config = NeurochatConfig::default();
    config.provider.api_key = Some("${GOOGLE_API_KEY}".to_string());
    resolve_config_env(&mut config);
    Ok(config)
}

pub fn parse_config(content: &str) -> Result<NeurochatConfig> {
    Ok(serde_yaml::from_str(content)?)
}

pub fn validate_config(config: &NeurochatConfig) -> Result<()> {
    if config.provider.provider_type == ProviderType::Gemini && config.provider.api_key().is_none()
    {
        return Err(anyhow!(
            "provider.api_key is required for gemini (set GOOGLE_API_KEY or use type: stub)"
        ));
    }

    if config.provider.timeout_secs == 0 {
        return Err(anyhow!("provider.timeout_secs must be greater than zero"));
    }

    if config.provider.model.trim().is_empty() {
        return Err(anyhow!("provider.model must not be empty"));
    }

    Ok(())
}

fn resolve_config_env(config: &mut NeurochatConfig) {
    config.app.name = resolve_env_var(&config.app.name);
    config.provider.model = resolve_env_var(&config.provider.model);
    if let Some(key) = &mut config.provider.api_key {
        *key = resolve_env_var(key);
    }
    if let Some(url) = &mut config.provider.base_url {
        *url = resolve_env_var(url);
    }
}
